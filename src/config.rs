//! Simulator configuration

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::models::Product;

/// Linear response of one product's yield to the crude assay
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YieldCoefficients {
    pub base: f64,
    pub api: f64,    // per degree API above reference
    pub sulfur: f64, // per wt% sulfur above reference
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct YieldModelConfig {
    pub gas: YieldCoefficients,
    pub naphtha: YieldCoefficients,
    pub kerosene: YieldCoefficients,
    pub mgo4: YieldCoefficients,
    pub mgo6: YieldCoefficients,
    pub reference_api: f64,
    pub reference_sulfur: f64,
    pub min_api: f64,
    pub max_api: f64,
    pub max_sulfur: f64,
    pub max_recovery: f64, // fraction of crude volume recoverable as product
    /// Fractions below this are treated as zero yield
    pub min_fraction: f64,
}

impl YieldModelConfig {
    pub fn coefficients(&self, product: Product) -> YieldCoefficients {
        match product {
            Product::Gas => self.gas,
            Product::Naphtha => self.naphtha,
            Product::Kerosene => self.kerosene,
            Product::Mgo4 => self.mgo4,
            Product::Mgo6 => self.mgo6,
        }
    }
}

impl Default for YieldModelConfig {
    fn default() -> Self {
        Self {
            gas: YieldCoefficients { base: 0.05, api: 0.0015, sulfur: -0.002 },
            naphtha: YieldCoefficients { base: 0.20, api: 0.006, sulfur: -0.010 },
            kerosene: YieldCoefficients { base: 0.15, api: 0.002, sulfur: -0.008 },
            mgo4: YieldCoefficients { base: 0.25, api: -0.001, sulfur: -0.030 },
            mgo6: YieldCoefficients { base: 0.25, api: -0.008, sulfur: 0.020 },
            reference_api: 30.0,
            reference_sulfur: 1.0,
            min_api: 5.0,
            max_api: 60.0,
            max_sulfur: 6.0,
            max_recovery: 0.95,
            min_fraction: 1e-9,
        }
    }
}

/// Market price per barrel of each product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DefaultPrices {
    pub gas: f64,
    pub naphtha: f64,
    pub kerosene: f64,
    pub mgo4: f64,
    pub mgo6: f64,
}

impl DefaultPrices {
    pub fn price(&self, product: Product) -> f64 {
        match product {
            Product::Gas => self.gas,
            Product::Naphtha => self.naphtha,
            Product::Kerosene => self.kerosene,
            Product::Mgo4 => self.mgo4,
            Product::Mgo6 => self.mgo6,
        }
    }
}

impl Default for DefaultPrices {
    fn default() -> Self {
        Self {
            gas: 45.0,
            naphtha: 78.0,
            kerosene: 95.0,
            mgo4: 88.0,
            mgo6: 62.0,
        }
    }
}

pub const DEFAULT_REFINERY_CAPACITY: f64 = 900_000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimulatorConfig {
    pub yield_model: YieldModelConfig,
    pub prices: DefaultPrices,
    /// Largest crude run the refinery can take, in barrels. None means unbounded.
    pub refinery_capacity: Option<f64>,
    /// Relative tolerance used when checking solver round trips
    /// (absolute for quantities below one barrel)
    pub tolerance: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            yield_model: YieldModelConfig::default(),
            prices: DefaultPrices::default(),
            // one month at a 30,000 bbl/day plant
            refinery_capacity: Some(DEFAULT_REFINERY_CAPACITY),
            tolerance: 1e-6,
        }
    }
}

impl SimulatorConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: SimulatorConfig = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when given, otherwise use defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let ym = &self.yield_model;
        if !(ym.max_recovery > 0.0 && ym.max_recovery <= 1.0) {
            bail!("maxRecovery must be in (0, 1], got {}", ym.max_recovery);
        }
        if !(ym.min_api.is_finite() && ym.max_api.is_finite() && ym.min_api < ym.max_api) {
            bail!("API range [{}, {}] is empty", ym.min_api, ym.max_api);
        }
        if !(ym.max_sulfur.is_finite() && ym.max_sulfur > 0.0) {
            bail!("maxSulfur must be positive, got {}", ym.max_sulfur);
        }
        if !(ym.min_fraction.is_finite() && (0.0..0.01).contains(&ym.min_fraction)) {
            bail!("minFraction must be in [0, 0.01), got {}", ym.min_fraction);
        }
        for product in Product::ALL {
            let c = ym.coefficients(product);
            if !(c.base.is_finite() && c.api.is_finite() && c.sulfur.is_finite()) {
                bail!("yield coefficients for {} are not finite", product);
            }
            let price = self.prices.price(product);
            if !(price.is_finite() && price >= 0.0) {
                bail!("default price for {} must be non-negative, got {}", product, price);
            }
        }
        if let Some(cap) = self.refinery_capacity {
            if !(cap.is_finite() && cap > 0.0) {
                bail!("refineryCapacity must be positive, got {}", cap);
            }
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            bail!("tolerance must be positive, got {}", self.tolerance);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        SimulatorConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "refineryCapacity": 50000, "prices": {{ "gas": 40, "naphtha": 70, "kerosene": 90, "mgo4": 80, "mgo6": 60 }} }}"#).unwrap();

        let config = SimulatorConfig::load(file.path()).unwrap();
        assert_eq!(config.refinery_capacity, Some(50000.0));
        assert_eq!(config.prices.gas, 40.0);
        assert_eq!(config.yield_model, YieldModelConfig::default());
    }

    #[test]
    fn bad_recovery_is_rejected() {
        let mut config = SimulatorConfig::default();
        config.yield_model.max_recovery = 1.2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn default_capacity_is_bounded_and_can_be_lifted() {
        assert_eq!(
            SimulatorConfig::default().refinery_capacity,
            Some(DEFAULT_REFINERY_CAPACITY)
        );

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "refineryCapacity": null }}"#).unwrap();
        let config = SimulatorConfig::load(file.path()).unwrap();
        assert_eq!(config.refinery_capacity, None);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = SimulatorConfig::load(Path::new("/nonexistent/refinery.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/refinery.json"));
    }
}
