//! Crude oil refining simulator.
//!
//! Two mirror-image runs are supported: refining a quantity of crude into
//! products ([`Simulator::simulate_crude_to_products`]) and working back from a
//! basket of products to the crude that has to be charged
//! ([`Simulator::simulate_products_to_crude`]). Both return a
//! [`SimulationResults`] envelope that serializes to plain JSON.

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod financials;
pub mod logging;
pub mod models;
pub mod simulator;
pub mod solver;
pub mod yield_model;

pub use config::SimulatorConfig;
pub use error::{ErrorKind, ErrorReport, SimulationError};
pub use financials::PriceTable;
pub use models::{
    CostBreakdown, CrudeOption, CrudeToProductsResults, FinancialResults, Product,
    ProductQuantities, ProductYields, ProductionResults, ProductsToCrudeResults,
    SimulationResults,
};
pub use simulator::Simulator;
pub use yield_model::{LinearAssayModel, YieldModel};
