//! Revenue and cost rollup for a simulation run

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::DefaultPrices;
use crate::models::{CostBreakdown, CrudeOption, FinancialResults, Product, ProductQuantities};

/// Market price per barrel of each product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceTable(BTreeMap<Product, f64>);

impl PriceTable {
    pub fn price(&self, product: Product) -> f64 {
        self.0.get(&product).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, product: Product, price: f64) {
        self.0.insert(product, price);
    }

    pub fn iter(&self) -> impl Iterator<Item = (Product, f64)> + '_ {
        self.0.iter().map(|(p, v)| (*p, *v))
    }
}

impl From<&DefaultPrices> for PriceTable {
    fn from(defaults: &DefaultPrices) -> Self {
        Self(Product::ALL.into_iter().map(|p| (p, defaults.price(p))).collect())
    }
}

impl Default for PriceTable {
    fn default() -> Self {
        Self::from(&DefaultPrices::default())
    }
}

impl FromIterator<(Product, f64)> for PriceTable {
    fn from_iter<I: IntoIterator<Item = (Product, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn ratio_or_zero(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 || !denominator.is_finite() {
        0.0
    } else {
        numerator / denominator
    }
}

/// Costs of charging `crude_quantity` barrels of `crude`
pub fn crude_costs(crude: &CrudeOption, crude_quantity: f64) -> CostBreakdown {
    let purchase = crude_quantity * crude.purchase_price;
    let transport = crude_quantity * crude.transport_cost;
    let operational = crude_quantity * crude.operational_cost;
    CostBreakdown {
        purchase,
        transport,
        operational,
        total: purchase + transport + operational,
    }
}

/// Full financial outcome of refining `crude_quantity` barrels into `produced`
pub fn rollup(
    crude: &CrudeOption,
    crude_quantity: f64,
    produced: &ProductQuantities,
    prices: &PriceTable,
) -> FinancialResults {
    let revenue_by_product: ProductQuantities = Product::ALL
        .into_iter()
        .map(|p| (p, produced.get(p) * prices.price(p)))
        .collect();
    let total_revenue = revenue_by_product.total();
    let costs = crude_costs(crude, crude_quantity);
    let gross_profit = total_revenue - costs.total;

    FinancialResults {
        revenue_by_product,
        total_revenue,
        profit_margin: ratio_or_zero(gross_profit, total_revenue),
        cost_per_barrel: ratio_or_zero(costs.total, crude_quantity),
        gross_profit,
        costs,
    }
}
