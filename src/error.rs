//! Simulation error taxonomy

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Product;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("cannot produce {}: {reason}", join_products(.products))]
    InfeasibleProduct {
        products: Vec<Product>,
        reason: String,
    },

    #[error("computation failed: {0}")]
    Computation(String),
}

impl SimulationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SimulationError::InvalidInput(_) => ErrorKind::InvalidInput,
            SimulationError::InfeasibleProduct { .. } => ErrorKind::InfeasibleProduct,
            SimulationError::Computation(_) => ErrorKind::Computation,
        }
    }
}

fn join_products(products: &[Product]) -> String {
    products
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    InvalidInput,
    InfeasibleProduct,
    Computation,
}

/// Serializable form of a [`SimulationError`] carried in the result envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&SimulationError> for ErrorReport {
    fn from(err: &SimulationError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infeasible_message_lists_products() {
        let err = SimulationError::InfeasibleProduct {
            products: vec![Product::Gas, Product::Mgo6],
            reason: "zero yield on every crude".to_string(),
        };
        assert_eq!(err.to_string(), "cannot produce gas, mgo6: zero yield on every crude");
        assert_eq!(ErrorReport::from(&err).kind, ErrorKind::InfeasibleProduct);
    }
}
