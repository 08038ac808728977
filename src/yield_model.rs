//! Crude assay -> product yield model

use tracing::debug;

use crate::config::YieldModelConfig;
use crate::error::SimulationError;
use crate::models::{CrudeOption, Product, ProductQuantities, ProductYields};

/// Maps a crude assay to the fraction of each product it yields.
///
/// Implementations must return non-negative fractions whose total does not
/// exceed 1, so that produced volume never exceeds the crude charged.
pub trait YieldModel: Send + Sync {
    fn fractions(&self, crude: &CrudeOption) -> Result<ProductYields, SimulationError>;

    /// Yields plus absolute quantities for `amount` barrels of crude
    fn produce(
        &self,
        crude: &CrudeOption,
        amount: f64,
    ) -> Result<(ProductYields, ProductQuantities), SimulationError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(SimulationError::InvalidInput(format!(
                "crude amount must be a non-negative number, got {}",
                amount
            )));
        }
        let yields = self.fractions(crude)?;
        let produced = yields.apply(amount);
        Ok((yields, produced))
    }
}

/// Yields that move linearly with API gravity and sulfur around a reference crude
#[derive(Debug, Clone, Default)]
pub struct LinearAssayModel {
    config: YieldModelConfig,
}

impl LinearAssayModel {
    pub fn new(config: YieldModelConfig) -> Self {
        Self { config }
    }

    fn check_range(&self, crude: &CrudeOption) -> Result<(), SimulationError> {
        let c = &self.config;
        if crude.api < c.min_api || crude.api > c.max_api {
            return Err(SimulationError::InvalidInput(format!(
                "API gravity {} of '{}' is outside the supported range [{}, {}]",
                crude.api, crude.name, c.min_api, c.max_api
            )));
        }
        if crude.sulfur < 0.0 || crude.sulfur > c.max_sulfur {
            return Err(SimulationError::InvalidInput(format!(
                "sulfur {}% of '{}' is outside the supported range [0, {}]",
                crude.sulfur, crude.name, c.max_sulfur
            )));
        }
        Ok(())
    }
}

impl YieldModel for LinearAssayModel {
    fn fractions(&self, crude: &CrudeOption) -> Result<ProductYields, SimulationError> {
        crude.validate()?;
        self.check_range(crude)?;

        let c = &self.config;
        let d_api = crude.api - c.reference_api;
        let d_sulfur = crude.sulfur - c.reference_sulfur;

        // anything under min_fraction, including rounding residue, is zero yield
        let raw: Vec<(Product, f64)> = Product::ALL
            .into_iter()
            .map(|p| {
                let k = c.coefficients(p);
                let f = k.base + k.api * d_api + k.sulfur * d_sulfur;
                (p, if f < c.min_fraction { 0.0 } else { f })
            })
            .collect();

        let total: f64 = raw.iter().map(|(_, f)| f).sum();
        let scale = if total > c.max_recovery {
            c.max_recovery / total
        } else {
            1.0
        };

        let yields: ProductYields = raw.into_iter().map(|(p, f)| (p, f * scale)).collect();
        debug!(crude = %crude.name, total = yields.total(), scale, "computed yields");
        Ok(yields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn crude(api: f64, sulfur: f64) -> CrudeOption {
        CrudeOption {
            name: format!("API {} / S {}", api, sulfur),
            api,
            sulfur,
            purchase_price: 60.0,
            transport_cost: 2.0,
            operational_cost: 4.0,
        }
    }

    #[test]
    fn reference_crude_gets_base_fractions() {
        let model = LinearAssayModel::default();
        let y = model.fractions(&crude(30.0, 1.0)).unwrap();
        assert!((y.get(Product::Gas) - 0.05).abs() < 1e-12);
        assert!((y.get(Product::Naphtha) - 0.20).abs() < 1e-12);
        assert!((y.get(Product::Mgo6) - 0.25).abs() < 1e-12);
        assert!((y.total() - 0.90).abs() < 1e-12);
        assert!(y.impossible_products().is_empty());
    }

    #[test]
    fn lighter_crude_shifts_towards_light_ends() {
        let model = LinearAssayModel::default();
        let light = model.fractions(&crude(42.0, 0.5)).unwrap();
        let heavy = model.fractions(&crude(16.0, 2.5)).unwrap();
        assert!(light.get(Product::Naphtha) > heavy.get(Product::Naphtha));
        assert!(light.get(Product::Mgo6) < heavy.get(Product::Mgo6));
    }

    #[test]
    fn very_light_sweet_crude_cannot_make_mgo6() {
        let model = LinearAssayModel::default();
        let y = model.fractions(&crude(60.0, 0.0)).unwrap();
        assert_eq!(y.get(Product::Mgo6), 0.0);
        assert_eq!(y.impossible_products(), vec![Product::Mgo6]);
        // raw total is above max recovery so the fractions are scaled down
        assert!((y.total() - 0.95).abs() < 1e-12);
    }

    #[test]
    fn rounding_residue_counts_as_zero_yield() {
        // MGO 6 is exactly 0.25 - 0.24 - 0.01 here
        let model = LinearAssayModel::default();
        let y = model.fractions(&crude(60.0, 0.5)).unwrap();
        assert_eq!(y.get(Product::Mgo6), 0.0);
        assert_eq!(y.impossible_products(), vec![Product::Mgo6]);
    }

    #[test]
    fn out_of_range_assay_is_rejected() {
        let model = LinearAssayModel::default();
        assert!(matches!(
            model.fractions(&crude(70.0, 1.0)),
            Err(SimulationError::InvalidInput(_))
        ));
        assert!(matches!(
            model.fractions(&crude(30.0, 7.5)),
            Err(SimulationError::InvalidInput(_))
        ));
    }

    #[test]
    fn zero_amount_produces_nothing() {
        let model = LinearAssayModel::default();
        let (_, produced) = model.produce(&crude(30.0, 1.0), 0.0).unwrap();
        assert_eq!(produced.total(), 0.0);
    }

    #[test]
    fn negative_amount_is_invalid() {
        let model = LinearAssayModel::default();
        assert!(model.produce(&crude(30.0, 1.0), -5.0).is_err());
        assert!(model.produce(&crude(30.0, 1.0), f64::NAN).is_err());
    }

    proptest! {
        #[test]
        fn produced_volume_never_exceeds_crude(
            api in 5.0f64..=60.0,
            sulfur in 0.0f64..=6.0,
            amount in 0.0f64..1.0e7,
        ) {
            let model = LinearAssayModel::default();
            let (yields, produced) = model.produce(&crude(api, sulfur), amount).unwrap();
            prop_assert!(yields.iter().all(|(_, f)| f >= 0.0));
            prop_assert!(produced.iter().all(|(_, q)| q >= 0.0));
            prop_assert!(produced.total() <= amount * (1.0 + 1e-12));
        }
    }
}
