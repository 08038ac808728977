//! Data models for crudes, products and simulation results

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ErrorReport, SimulationError};

/// Refined product categories. The set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Product {
    Gas,
    Naphtha,
    Kerosene,
    Mgo4,
    Mgo6,
}

impl Product {
    pub const ALL: [Product; 5] = [
        Product::Gas,
        Product::Naphtha,
        Product::Kerosene,
        Product::Mgo4,
        Product::Mgo6,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Product::Gas => "gas",
            Product::Naphtha => "naphtha",
            Product::Kerosene => "kerosene",
            Product::Mgo4 => "mgo4",
            Product::Mgo6 => "mgo6",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Product::Gas => "Gas",
            Product::Naphtha => "Naphtha",
            Product::Kerosene => "Kerosene",
            Product::Mgo4 => "MGO 4",
            Product::Mgo6 => "MGO 6",
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Product {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace([' ', '-', '_'], "");
        Product::ALL
            .into_iter()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| SimulationError::InvalidInput(format!("unknown product '{}'", s)))
    }
}

/// A named, priced crude assay. Costs are per barrel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrudeOption {
    pub name: String,
    pub api: f64,
    pub sulfur: f64, // wt %
    pub purchase_price: f64,
    pub transport_cost: f64,
    pub operational_cost: f64,
}

impl CrudeOption {
    /// Reject malformed options. Assay ranges are checked by the yield model.
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.name.trim().is_empty() {
            return Err(SimulationError::InvalidInput("crude name is empty".to_string()));
        }
        let fields = [
            ("api", self.api),
            ("sulfur", self.sulfur),
            ("purchasePrice", self.purchase_price),
            ("transportCost", self.transport_cost),
            ("operationalCost", self.operational_cost),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                return Err(SimulationError::InvalidInput(format!(
                    "{} of '{}' is not a finite number",
                    field, self.name
                )));
            }
        }
        for (field, value) in &fields[2..] {
            if *value < 0.0 {
                return Err(SimulationError::InvalidInput(format!(
                    "{} of '{}' is negative ({})",
                    field, self.name, value
                )));
            }
        }
        Ok(())
    }

    /// Landed cost of one barrel
    pub fn cost_per_barrel(&self) -> f64 {
        self.purchase_price + self.transport_cost + self.operational_cost
    }
}

/// Product -> quantity in barrels. Absent products read as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductQuantities(BTreeMap<Product, f64>);

impl ProductQuantities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, product: Product) -> f64 {
        self.0.get(&product).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, product: Product, quantity: f64) {
        self.0.insert(product, quantity);
    }

    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Product, f64)> + '_ {
        self.0.iter().map(|(p, q)| (*p, *q))
    }

    /// Element-wise sum over all products
    pub fn plus(&self, other: &ProductQuantities) -> ProductQuantities {
        Product::ALL
            .into_iter()
            .map(|p| (p, self.get(p) + other.get(p)))
            .collect()
    }
}

impl FromIterator<(Product, f64)> for ProductQuantities {
    fn from_iter<I: IntoIterator<Item = (Product, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Fraction of input crude converted to each product
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductYields(BTreeMap<Product, f64>);

impl ProductYields {
    pub fn get(&self, product: Product) -> f64 {
        self.0.get(&product).copied().unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Product, f64)> + '_ {
        self.0.iter().map(|(p, f)| (*p, *f))
    }

    /// Products this crude cannot produce at all
    pub fn impossible_products(&self) -> Vec<Product> {
        Product::ALL
            .into_iter()
            .filter(|p| self.get(*p) <= 0.0)
            .collect()
    }

    /// Absolute quantities for a given crude amount
    pub fn apply(&self, crude_amount: f64) -> ProductQuantities {
        Product::ALL
            .into_iter()
            .map(|p| (p, self.get(p) * crude_amount))
            .collect()
    }
}

impl FromIterator<(Product, f64)> for ProductYields {
    fn from_iter<I: IntoIterator<Item = (Product, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Output of the products -> crude solve
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionResults {
    pub exact: ProductQuantities,
    pub by_products: ProductQuantities,
}

impl ProductionResults {
    pub fn total(&self) -> ProductQuantities {
        self.exact.plus(&self.by_products)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostBreakdown {
    pub purchase: f64,
    pub transport: f64,
    pub operational: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialResults {
    pub revenue_by_product: ProductQuantities,
    pub total_revenue: f64,
    pub costs: CostBreakdown,
    pub gross_profit: f64,
    pub profit_margin: f64,
    pub cost_per_barrel: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrudeToProductsResults {
    pub crude_amount: f64,
    pub yields: ProductYields,
    pub production: ProductQuantities,
    pub financials: FinancialResults,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductsToCrudeResults {
    pub required_crude: f64,
    pub production: ProductionResults,
    pub financials: FinancialResults,
}

/// Either the computed result or the reason there is none
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Outcome<T> {
    Result(T),
    Error(ErrorReport),
}

/// Envelope returned by every simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResults<T> {
    pub crude_type: Option<String>,
    pub crude_details: Option<CrudeOption>,
    #[serde(flatten)]
    pub outcome: Outcome<T>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub impossible_products: Vec<Product>,
}

impl<T> SimulationResults<T> {
    pub fn success(crude: &CrudeOption, result: T, impossible_products: Vec<Product>) -> Self {
        Self {
            crude_type: Some(crude.name.clone()),
            crude_details: Some(crude.clone()),
            outcome: Outcome::Result(result),
            impossible_products,
        }
    }

    pub fn failure(crude: Option<&CrudeOption>, error: &SimulationError) -> Self {
        let impossible_products = match error {
            SimulationError::InfeasibleProduct { products, .. } => products.clone(),
            _ => Vec::new(),
        };
        Self {
            crude_type: crude.map(|c| c.name.clone()),
            crude_details: crude.cloned(),
            outcome: Outcome::Error(ErrorReport::from(error)),
            impossible_products,
        }
    }

    pub fn result(&self) -> Option<&T> {
        match &self.outcome {
            Outcome::Result(r) => Some(r),
            Outcome::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorReport> {
        match &self.outcome {
            Outcome::Result(_) => None,
            Outcome::Error(e) => Some(e),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self.outcome, Outcome::Result(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crude() -> CrudeOption {
        CrudeOption {
            name: "Mesa 30".to_string(),
            api: 30.0,
            sulfur: 1.0,
            purchase_price: 70.0,
            transport_cost: 3.0,
            operational_cost: 5.0,
        }
    }

    #[test]
    fn product_parses_loose_spellings() {
        assert_eq!("MGO 4".parse::<Product>().unwrap(), Product::Mgo4);
        assert_eq!("mgo-6".parse::<Product>().unwrap(), Product::Mgo6);
        assert_eq!("Naphtha".parse::<Product>().unwrap(), Product::Naphtha);
        assert!("diesel".parse::<Product>().is_err());
    }

    #[test]
    fn negative_costs_are_rejected() {
        let mut c = crude();
        assert!(c.validate().is_ok());
        c.transport_cost = -1.0;
        assert!(matches!(c.validate(), Err(SimulationError::InvalidInput(_))));
    }

    #[test]
    fn non_finite_assay_is_rejected() {
        let mut c = crude();
        c.api = f64::NAN;
        assert!(c.validate().is_err());
    }

    #[test]
    fn quantities_serialize_with_product_keys() {
        let q: ProductQuantities = [(Product::Gas, 1.5), (Product::Mgo4, 2.0)].into_iter().collect();
        let json = serde_json::to_string(&q).unwrap();
        assert_eq!(json, r#"{"gas":1.5,"mgo4":2.0}"#);
        let back: ProductQuantities = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get(Product::Mgo4), 2.0);
        assert_eq!(back.get(Product::Kerosene), 0.0);
    }

    #[test]
    fn envelope_carries_exactly_one_of_result_or_error() {
        let ok = SimulationResults::success(&crude(), 42u32, Vec::new());
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["result"], 42);
        assert!(json.get("error").is_none());
        assert!(json.get("impossibleProducts").is_none());

        let err = SimulationError::InfeasibleProduct {
            products: vec![Product::Gas],
            reason: "no yield".to_string(),
        };
        let failed: SimulationResults<u32> = SimulationResults::failure(None, &err);
        let json = serde_json::to_value(&failed).unwrap();
        assert!(json.get("result").is_none());
        assert_eq!(json["error"]["kind"], "infeasibleProduct");
        assert_eq!(json["impossibleProducts"][0], "gas");
        assert!(failed.result().is_none());
    }
}
