//! Refining simulator: crude -> products and products -> crude runs

use std::fmt;

use tracing::{debug, warn};

use crate::config::SimulatorConfig;
use crate::error::SimulationError;
use crate::financials::{self, PriceTable};
use crate::models::{
    CrudeOption, CrudeToProductsResults, FinancialResults, Product, ProductQuantities,
    ProductsToCrudeResults, SimulationResults,
};
use crate::solver::{self, CrudeRequirement};
use crate::yield_model::{LinearAssayModel, YieldModel};

pub struct Simulator {
    model: Box<dyn YieldModel>,
    prices: PriceTable,
    capacity: Option<f64>,
    tolerance: f64,
}

impl Simulator {
    pub fn new(model: Box<dyn YieldModel>, prices: PriceTable) -> Self {
        Self {
            model,
            prices,
            capacity: None,
            tolerance: SimulatorConfig::default().tolerance,
        }
    }

    /// Linear assay model, capacity and tolerance from `config`; prices from `prices`
    pub fn from_config(config: &SimulatorConfig, prices: PriceTable) -> Self {
        Self {
            model: Box::new(LinearAssayModel::new(config.yield_model.clone())),
            prices,
            capacity: config.refinery_capacity,
            tolerance: config.tolerance,
        }
    }

    pub fn with_capacity(mut self, capacity: Option<f64>) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn prices(&self) -> &PriceTable {
        &self.prices
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Refine `crude_amount` barrels of `crude`
    pub fn simulate_crude_to_products(
        &self,
        crude: &CrudeOption,
        crude_amount: f64,
    ) -> SimulationResults<CrudeToProductsResults> {
        match self.crude_to_products(crude, crude_amount) {
            Ok((results, impossible)) => SimulationResults::success(crude, results, impossible),
            Err(e) => {
                warn!(crude = %crude.name, error = %e, "crude to products failed");
                SimulationResults::failure(Some(crude), &e)
            }
        }
    }

    fn crude_to_products(
        &self,
        crude: &CrudeOption,
        crude_amount: f64,
    ) -> Result<(CrudeToProductsResults, Vec<Product>), SimulationError> {
        if let Some(cap) = self.capacity {
            if crude_amount > cap {
                return Err(SimulationError::InvalidInput(format!(
                    "crude amount {} exceeds refinery capacity {}",
                    crude_amount, cap
                )));
            }
        }
        let (yields, production) = self.model.produce(crude, crude_amount)?;
        let impossible = yields.impossible_products();
        let financials = financials::rollup(crude, crude_amount, &production, &self.prices);
        debug!(
            crude = %crude.name,
            amount = crude_amount,
            produced = production.total(),
            profit = financials.gross_profit,
            "crude to products"
        );
        Ok((
            CrudeToProductsResults {
                crude_amount,
                yields,
                production,
                financials,
            },
            impossible,
        ))
    }

    /// Cheapest-in-crude run from `catalog` that covers `basket`
    pub fn simulate_products_to_crude(
        &self,
        catalog: &[CrudeOption],
        basket: &ProductQuantities,
    ) -> SimulationResults<ProductsToCrudeResults> {
        let solved = solver::solve(self.model.as_ref(), catalog, basket, self.capacity);
        self.finish_inverse(None, solved)
    }

    /// Run that covers `basket` using `crude` only
    pub fn simulate_products_to_crude_with(
        &self,
        crude: &CrudeOption,
        basket: &ProductQuantities,
    ) -> SimulationResults<ProductsToCrudeResults> {
        let solved = solver::solve_for_crude(self.model.as_ref(), crude, basket, self.capacity);
        self.finish_inverse(Some(crude), solved)
    }

    fn finish_inverse(
        &self,
        requested_crude: Option<&CrudeOption>,
        solved: Result<CrudeRequirement, SimulationError>,
    ) -> SimulationResults<ProductsToCrudeResults> {
        let req = match solved.and_then(|req| self.check_consistency(req)) {
            Ok(req) => req,
            Err(e) => {
                warn!(error = %e, "products to crude failed");
                return SimulationResults::failure(requested_crude, &e);
            }
        };

        let produced = req.production.total();
        let financials = financials::rollup(&req.crude, req.required_crude, &produced, &self.prices);
        debug!(
            crude = %req.crude.name,
            required = req.required_crude,
            profit = financials.gross_profit,
            "products to crude"
        );
        let impossible = req.yields.impossible_products();
        SimulationResults::success(
            &req.crude,
            ProductsToCrudeResults {
                required_crude: req.required_crude,
                production: req.production,
                financials,
            },
            impossible,
        )
    }

    /// Re-run the forward model on the solved crude and compare
    fn check_consistency(&self, req: CrudeRequirement) -> Result<CrudeRequirement, SimulationError> {
        let (_, forward) = self.model.produce(&req.crude, req.required_crude)?;
        let solved = req.production.total();
        for product in Product::ALL {
            let (a, b) = (forward.get(product), solved.get(product));
            if !within_tolerance(a, b, self.tolerance) {
                return Err(SimulationError::Computation(format!(
                    "{} from '{}' is {} forward but {} solved",
                    product, req.crude.name, a, b
                )));
            }
        }
        Ok(req)
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::from_config(&SimulatorConfig::default(), PriceTable::default())
    }
}

/// Whether two crude amounts agree within a relative tolerance
pub fn within_tolerance(expected: f64, actual: f64, tolerance: f64) -> bool {
    (expected - actual).abs() <= tolerance * expected.abs().max(1.0)
}

fn write_header<T>(f: &mut fmt::Formatter<'_>, title: &str, run: &SimulationResults<T>) -> fmt::Result {
    writeln!(f, "=== {} ===", title)?;
    if let Some(crude) = &run.crude_details {
        writeln!(
            f,
            "Crude: {} (API {:.1}, sulfur {:.2}%, landed cost {:.2}/bbl)",
            crude.name,
            crude.api,
            crude.sulfur,
            crude.cost_per_barrel()
        )?;
    }
    Ok(())
}

fn write_footer<T>(f: &mut fmt::Formatter<'_>, run: &SimulationResults<T>) -> fmt::Result {
    if !run.impossible_products.is_empty() {
        let names: Vec<_> = run.impossible_products.iter().map(|p| p.label()).collect();
        writeln!(f)?;
        writeln!(f, "Not producible from this crude: {}", names.join(", "))?;
    }
    if let Some(err) = run.error() {
        writeln!(f)?;
        writeln!(f, "Error: {}", err)?;
    }
    Ok(())
}

fn write_financials(f: &mut fmt::Formatter<'_>, fin: &FinancialResults) -> fmt::Result {
    writeln!(f, "Financials:")?;
    writeln!(f, "  Revenue:       {:>14.2}", fin.total_revenue)?;
    writeln!(f, "  Purchase:      {:>14.2}", fin.costs.purchase)?;
    writeln!(f, "  Transport:     {:>14.2}", fin.costs.transport)?;
    writeln!(f, "  Operational:   {:>14.2}", fin.costs.operational)?;
    writeln!(f, "  Total cost:    {:>14.2}", fin.costs.total)?;
    writeln!(f, "  Gross profit:  {:>14.2}", fin.gross_profit)?;
    writeln!(f, "  Margin:        {:>13.1}%", fin.profit_margin * 100.0)?;
    writeln!(f, "  Cost/bbl:      {:>14.2}", fin.cost_per_barrel)?;
    Ok(())
}

impl fmt::Display for SimulationResults<CrudeToProductsResults> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_header(f, "Crude to Products", self)?;
        if let Some(r) = self.result() {
            writeln!(f, "Crude charged: {:.2} bbl", r.crude_amount)?;
            writeln!(f)?;
            writeln!(f, "{:<10} {:>8} {:>14} {:>14}", "Product", "Yield", "Barrels", "Revenue")?;
            writeln!(f, "{}", "-".repeat(49))?;
            for p in Product::ALL {
                writeln!(
                    f,
                    "{:<10} {:>7.2}% {:>14.2} {:>14.2}",
                    p.label(),
                    r.yields.get(p) * 100.0,
                    r.production.get(p),
                    r.financials.revenue_by_product.get(p)
                )?;
            }
            writeln!(f)?;
            write_financials(f, &r.financials)?;
        }
        write_footer(f, self)
    }
}

impl fmt::Display for SimulationResults<ProductsToCrudeResults> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_header(f, "Products to Crude", self)?;
        if let Some(r) = self.result() {
            writeln!(f, "Crude required: {:.2} bbl", r.required_crude)?;
            writeln!(f)?;
            writeln!(f, "{:<10} {:>14} {:>14} {:>14}", "Product", "Requested", "By-product", "Revenue")?;
            writeln!(f, "{}", "-".repeat(55))?;
            for p in Product::ALL {
                writeln!(
                    f,
                    "{:<10} {:>14.2} {:>14.2} {:>14.2}",
                    p.label(),
                    r.production.exact.get(p),
                    r.production.by_products.get(p),
                    r.financials.revenue_by_product.get(p)
                )?;
            }
            writeln!(f)?;
            write_financials(f, &r.financials)?;
        }
        write_footer(f, self)
    }
}
