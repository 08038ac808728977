//! Products -> crude solver
//!
//! Works out how much crude has to be charged to cover a target basket of
//! products. Whatever the crude yields beyond the basket is reported as
//! by-products rather than dropped.

use tracing::{debug, warn};

use crate::error::SimulationError;
use crate::models::{CrudeOption, Product, ProductQuantities, ProductYields, ProductionResults};
use crate::yield_model::YieldModel;

/// Crude run that satisfies a basket
#[derive(Debug, Clone, PartialEq)]
pub struct CrudeRequirement {
    pub crude: CrudeOption,
    pub required_crude: f64,
    pub yields: ProductYields,
    pub production: ProductionResults,
}

/// Check a basket before solving
pub fn validate_basket(basket: &ProductQuantities) -> Result<(), SimulationError> {
    if basket.is_empty() {
        return Err(SimulationError::InvalidInput("product basket is empty".to_string()));
    }
    for (product, quantity) in basket.iter() {
        if !quantity.is_finite() || quantity < 0.0 {
            return Err(SimulationError::InvalidInput(format!(
                "requested {} must be a non-negative number, got {}",
                product, quantity
            )));
        }
    }
    Ok(())
}

/// Requested products the crude cannot deliver, either because it yields none
/// of them or because the crude run needed for them alone exceeds `capacity`.
fn blocking_products(
    yields: &ProductYields,
    basket: &ProductQuantities,
    capacity: Option<f64>,
) -> Vec<Product> {
    basket
        .iter()
        .filter(|(_, q)| *q > 0.0)
        .filter(|(p, q)| {
            let y = yields.get(*p);
            y <= 0.0 || capacity.is_some_and(|cap| q / y > cap)
        })
        .map(|(p, _)| p)
        .collect()
}

/// Solve the basket against a single crude.
pub fn solve_for_crude(
    model: &dyn YieldModel,
    crude: &CrudeOption,
    basket: &ProductQuantities,
    capacity: Option<f64>,
) -> Result<CrudeRequirement, SimulationError> {
    validate_basket(basket)?;
    let yields = model.fractions(crude)?;

    let blocked = blocking_products(&yields, basket, capacity);
    if !blocked.is_empty() {
        return Err(SimulationError::InfeasibleProduct {
            products: blocked,
            reason: format!("not attainable from '{}'", crude.name),
        });
    }

    let required_crude = basket
        .iter()
        .filter(|(_, q)| *q > 0.0)
        .map(|(p, q)| q / yields.get(p))
        .fold(0.0, f64::max);
    if !required_crude.is_finite() {
        return Err(SimulationError::Computation(format!(
            "required crude for '{}' is not finite",
            crude.name
        )));
    }

    let produced = yields.apply(required_crude);
    let mut exact = ProductQuantities::new();
    let mut by_products = ProductQuantities::new();
    for product in Product::ALL {
        let made = produced.get(product);
        let wanted = basket.get(product).min(made);
        exact.set(product, wanted);
        by_products.set(product, made - wanted);
    }

    Ok(CrudeRequirement {
        crude: crude.clone(),
        required_crude,
        yields,
        production: ProductionResults { exact, by_products },
    })
}

/// Pick the crude from `catalog` that covers the basket with the least crude.
/// Ties go to the crude listed first.
pub fn solve(
    model: &dyn YieldModel,
    catalog: &[CrudeOption],
    basket: &ProductQuantities,
    capacity: Option<f64>,
) -> Result<CrudeRequirement, SimulationError> {
    validate_basket(basket)?;
    if catalog.is_empty() {
        return Err(SimulationError::InvalidInput("crude catalog is empty".to_string()));
    }

    let mut best: Option<CrudeRequirement> = None;
    // Fewest blocked products seen so far, reported when nothing is feasible
    let mut closest: Option<Vec<Product>> = None;
    let mut last_invalid: Option<SimulationError> = None;

    for crude in catalog {
        match solve_for_crude(model, crude, basket, capacity) {
            Ok(req) => {
                debug!(crude = %crude.name, required = req.required_crude, "feasible crude");
                if best
                    .as_ref()
                    .is_none_or(|b| req.required_crude < b.required_crude)
                {
                    best = Some(req);
                }
            }
            Err(SimulationError::InfeasibleProduct { products, .. }) => {
                if closest.as_ref().is_none_or(|c| products.len() < c.len()) {
                    closest = Some(products);
                }
            }
            Err(e) => {
                warn!(crude = %crude.name, error = %e, "skipping crude");
                last_invalid = Some(e);
            }
        }
    }

    if let Some(req) = best {
        return Ok(req);
    }
    match (closest, last_invalid) {
        (Some(products), _) => Err(SimulationError::InfeasibleProduct {
            products,
            reason: format!("not attainable from any of {} crudes in the catalog", catalog.len()),
        }),
        (None, Some(e)) => Err(e),
        (None, None) => Err(SimulationError::Computation(
            "no crude evaluated".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::yield_model::LinearAssayModel;

    fn crude(name: &str, api: f64, sulfur: f64) -> CrudeOption {
        CrudeOption {
            name: name.to_string(),
            api,
            sulfur,
            purchase_price: 70.0,
            transport_cost: 3.0,
            operational_cost: 5.0,
        }
    }

    fn basket(items: &[(Product, f64)]) -> ProductQuantities {
        items.iter().copied().collect()
    }

    #[test]
    fn limiting_product_sets_the_crude_run() {
        let model = LinearAssayModel::default();
        // reference crude: naphtha 0.20, kerosene 0.15
        let req = solve_for_crude(
            &model,
            &crude("Mesa 30", 30.0, 1.0),
            &basket(&[(Product::Naphtha, 200.0), (Product::Kerosene, 300.0)]),
            None,
        )
        .unwrap();

        assert!((req.required_crude - 2000.0).abs() < 1e-9);
        let exact = &req.production.exact;
        assert!((exact.get(Product::Kerosene) - 300.0).abs() < 1e-9);
        assert!((exact.get(Product::Naphtha) - 200.0).abs() < 1e-9);
        // 400 bbl of naphtha made, 200 wanted
        assert!((req.production.by_products.get(Product::Naphtha) - 200.0).abs() < 1e-9);
        assert!((req.production.by_products.get(Product::Mgo6) - 500.0).abs() < 1e-9);
        assert_eq!(exact.get(Product::Gas), 0.0);
    }

    #[test]
    fn production_matches_forward_yields() {
        let model = LinearAssayModel::default();
        let c = crude("Merey 16", 16.0, 2.5);
        let req = solve_for_crude(&model, &c, &basket(&[(Product::Mgo6, 1000.0)]), None).unwrap();
        let (_, forward) = model.produce(&c, req.required_crude).unwrap();
        let total = req.production.total();
        for p in Product::ALL {
            assert!((forward.get(p) - total.get(p)).abs() < 1e-6);
        }
    }

    #[test]
    fn zero_yield_product_is_infeasible() {
        let model = LinearAssayModel::default();
        let err = solve_for_crude(
            &model,
            &crude("Condensate", 60.0, 0.0),
            &basket(&[(Product::Mgo6, 10.0), (Product::Gas, 5.0)]),
            None,
        )
        .unwrap_err();
        assert_eq!(
            err,
            SimulationError::InfeasibleProduct {
                products: vec![Product::Mgo6],
                reason: "not attainable from 'Condensate'".to_string(),
            }
        );
    }

    #[test]
    fn catalog_search_picks_the_smallest_run() {
        let model = LinearAssayModel::default();
        let catalog = vec![
            crude("Merey 16", 16.0, 2.5),
            crude("Santa Barbara", 39.0, 0.5),
            crude("Mesa 30", 30.0, 1.0),
        ];
        let req = solve(&model, &catalog, &basket(&[(Product::Naphtha, 1000.0)]), None).unwrap();
        assert_eq!(req.crude.name, "Santa Barbara");
    }

    #[test]
    fn capacity_makes_large_baskets_infeasible() {
        let model = LinearAssayModel::default();
        let catalog = vec![crude("Mesa 30", 30.0, 1.0), crude("Santa Barbara", 39.0, 0.5)];
        let err = solve(
            &model,
            &catalog,
            &basket(&[(Product::Gas, 1.0e6), (Product::Naphtha, 10.0)]),
            Some(100_000.0),
        )
        .unwrap_err();
        match err {
            SimulationError::InfeasibleProduct { products, .. } => {
                assert_eq!(products, vec![Product::Gas]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_and_negative_baskets_are_invalid() {
        let model = LinearAssayModel::default();
        let catalog = vec![crude("Mesa 30", 30.0, 1.0)];
        assert!(matches!(
            solve(&model, &catalog, &ProductQuantities::new(), None),
            Err(SimulationError::InvalidInput(_))
        ));
        assert!(matches!(
            solve(&model, &catalog, &basket(&[(Product::Gas, -1.0)]), None),
            Err(SimulationError::InvalidInput(_))
        ));
    }

    #[test]
    fn all_zero_basket_needs_no_crude() {
        let model = LinearAssayModel::default();
        let req = solve_for_crude(
            &model,
            &crude("Mesa 30", 30.0, 1.0),
            &basket(&[(Product::Gas, 0.0)]),
            None,
        )
        .unwrap();
        assert_eq!(req.required_crude, 0.0);
        assert_eq!(req.production.total().total(), 0.0);
    }
}
