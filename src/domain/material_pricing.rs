//! Per-material unit prices for the three customer tiers.

use super::entities::MaterialPriceResult;
use super::rate_config::{DynamicCostVars, MaterialRateVariables, MaterialRecord, RateShapeError};

/// Rounds down to the nearest multiple of `significance`. Zero significance yields zero.
pub fn floor_to_significance(number: f64, significance: f64) -> f64 {
    if significance == 0.0 {
        return 0.0;
    }
    (number / significance).floor() * significance
}

/// Rounds up to the nearest multiple of `significance`. Zero significance yields zero.
pub fn ceil_to_significance(number: f64, significance: f64) -> f64 {
    if significance == 0.0 {
        return 0.0;
    }
    (number / significance).ceil() * significance
}

/// Prices already-validated rate variables.
///
/// The preferred base is rounded down; corporate and wholesale bases are
/// derived from it and rounded up.
pub fn price_rate_variables(vars: &MaterialRateVariables, significance: f64) -> MaterialPriceResult {
    let preferred_base = floor_to_significance(
        vars.preferred.historical_price * vars.preferred.fine_tune_modifier,
        significance,
    );
    let corporate_base =
        ceil_to_significance(preferred_base * vars.corporate.historical_factor, significance);
    let wholesale_base =
        ceil_to_significance(preferred_base * vars.wholesale.historical_factor, significance);

    MaterialPriceResult {
        preferred_base,
        preferred_value: preferred_base * (1.0 - vars.preferred.discount),
        corporate_base,
        corporate_value: corporate_base * (1.0 - vars.corporate.discount),
        wholesale_base,
        wholesale_value: wholesale_base * (1.0 - vars.wholesale.discount),
    }
}

pub fn price_material(
    record: &MaterialRecord,
    significance: f64,
) -> Result<MaterialPriceResult, RateShapeError> {
    let vars = record.rate_variables()?;
    Ok(price_rate_variables(&vars, significance))
}

/// Like [`price_material`], but a malformed record prices as all zeros. The
/// shape error comes back alongside so the caller can report it.
pub fn price_material_or_zero(
    record: &MaterialRecord,
    significance: f64,
) -> (MaterialPriceResult, Option<RateShapeError>) {
    match price_material(record, significance) {
        Ok(prices) => (prices, None),
        Err(err) => (MaterialPriceResult::zero(), Some(err)),
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DynamicProductionCost {
    /// Material, loading and labour cost before setup amortization.
    pub base_cost: f64,
    /// Cost that replaces the global production constant for one entry.
    pub per_entry_cost: f64,
}

pub fn dynamic_production_cost(vars: &DynamicCostVars, quantity: u32) -> DynamicProductionCost {
    if quantity == 0 {
        return DynamicProductionCost::default();
    }
    let roll_area_sqft = (vars.material_length_in * vars.material_width_in) / 144.0;
    let material_unit_cost = if roll_area_sqft == 0.0 {
        0.0
    } else {
        vars.roll_cost / roll_area_sqft
    };
    let setup_cost = (vars.time_constant / 60.0) * vars.hourly_rate;
    let base_cost = material_unit_cost * vars.area_factor + vars.loading + vars.labour;
    // loading is counted twice: once in the base and once per entry
    let per_entry_cost = base_cost + setup_cost / f64::from(quantity) + vars.loading;

    DynamicProductionCost {
        base_cost,
        per_entry_cost,
    }
}

/// Production cost for an entry: the material's dynamic override when it
/// declares one, else the global default.
pub fn production_cost_for(record: Option<&MaterialRecord>, quantity: u32, default_cost: f64) -> f64 {
    match record.and_then(MaterialRecord::dynamic_cost_vars) {
        Some(vars) => dynamic_production_cost(&vars, quantity).per_entry_cost,
        None => default_cost,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    fn record(preferred_price: f64, corporate: f64, wholesale: f64) -> MaterialRecord {
        MaterialRecord(json!({
            "Preferred": {
                "preferred_historical_price": preferred_price,
                "preferred_fine_tune_modifier": 1.0,
                "preferred_discount_value": 0.1
            },
            "Corporate": {
                "corporate_historical_price": corporate,
                "corporate_discount_value": 0.05
            },
            "Wholesale": {
                "wholesale_historical_price": wholesale,
                "wholesale_discount_value": 0.0
            }
        }))
    }

    #[test]
    fn preferred_base_is_floored_and_discounted() {
        let prices = price_material(&record(10.0, 1.2, 0.8), 0.25).unwrap();
        assert_close(prices.preferred_base, 10.0);
        assert_close(prices.preferred_value, 9.0);
    }

    #[test]
    fn corporate_and_wholesale_are_ceiled_from_preferred_base() {
        let prices = price_material(&record(10.0, 1.2, 0.81), 0.25).unwrap();
        assert_close(prices.corporate_base, 12.0);
        assert_close(prices.corporate_value, 11.4);
        // 8.1 rounds up to the next quarter
        assert_close(prices.wholesale_base, 8.25);
        assert_close(prices.wholesale_value, 8.25);
    }

    #[test]
    fn fractional_preferred_price_rounds_down() {
        let prices = price_material(&record(7.4, 1.0, 1.0), 0.25).unwrap();
        assert_close(prices.preferred_base, 7.25);
        assert_close(prices.corporate_base, 7.25);
    }

    #[test]
    fn zero_significance_prices_everything_as_zero() {
        let prices = price_material(&record(10.0, 1.2, 0.8), 0.0).unwrap();
        assert!(prices.is_zero());
    }

    #[test]
    fn removing_any_required_key_zeroes_all_six_prices() {
        let required = [
            ("Preferred", "preferred_historical_price"),
            ("Preferred", "preferred_fine_tune_modifier"),
            ("Preferred", "preferred_discount_value"),
            ("Corporate", "corporate_historical_price"),
            ("Corporate", "corporate_discount_value"),
            ("Wholesale", "wholesale_historical_price"),
            ("Wholesale", "wholesale_discount_value"),
        ];
        for (group, key) in required {
            let mut raw = record(10.0, 1.2, 0.8).0;
            raw[group].as_object_mut().unwrap().remove(key);
            let (prices, shape_error) = price_material_or_zero(&MaterialRecord(raw), 0.25);
            assert!(prices.is_zero(), "{group}.{key} removed but prices were {prices:?}");
            assert!(
                matches!(shape_error, Some(RateShapeError::MissingKey { key: missing, .. }) if missing == key),
                "{group}.{key} removed but error was {shape_error:?}"
            );
        }
    }

    #[test]
    fn dynamic_cost_follows_roll_and_setup_formula() {
        let vars = DynamicCostVars {
            roll_cost: 150.0,
            material_length_in: 1800.0,
            material_width_in: 54.0,
            area_factor: 10.0,
            loading: 2.0,
            labour: 5.0,
            time_constant: 30.0,
            hourly_rate: 60.0,
        };
        let cost = dynamic_production_cost(&vars, 3);
        // 1800 * 54 / 144 = 675 sq' per roll
        let unit = 150.0 / 675.0;
        assert_close(cost.base_cost, unit * 10.0 + 2.0 + 5.0);
        assert_close(cost.per_entry_cost, cost.base_cost + 30.0 / 3.0 + 2.0);
    }

    #[test]
    fn dynamic_cost_guards_zero_roll_area_and_quantity() {
        let vars = DynamicCostVars {
            roll_cost: 150.0,
            material_length_in: 0.0,
            material_width_in: 54.0,
            area_factor: 10.0,
            loading: 1.0,
            labour: 1.0,
            time_constant: 0.0,
            hourly_rate: 0.0,
        };
        assert_close(dynamic_production_cost(&vars, 2).base_cost, 2.0);
        assert_eq!(dynamic_production_cost(&vars, 0), DynamicProductionCost::default());
    }

    #[test]
    fn production_cost_prefers_material_override() {
        let plain = record(10.0, 1.2, 0.8);
        assert_close(production_cost_for(Some(&plain), 2, 16.21), 16.21);
        assert_close(production_cost_for(None, 2, 16.21), 16.21);

        let mut raw = plain.0.clone();
        raw["prodcuts_an_vars"] = json!({"AT_Labour": 4.0, "AS_Laminate_Loading": 1.0});
        assert_close(production_cost_for(Some(&MaterialRecord(raw)), 2, 16.21), 6.0);
    }

    proptest! {
        #[test]
        fn zero_significance_always_yields_zero(x in -1.0e6f64..1.0e6) {
            prop_assert_eq!(floor_to_significance(x, 0.0), 0.0);
            prop_assert_eq!(ceil_to_significance(x, 0.0), 0.0);
        }

        /// Power-of-two increments keep the division exact, so the bounds hold
        /// without tolerance.
        #[test]
        fn rounding_brackets_the_input(
            x in -1.0e6f64..1.0e6,
            s in prop::sample::select(vec![0.125f64, 0.25, 0.5, 1.0, 2.0]),
        ) {
            let low = floor_to_significance(x, s);
            let high = ceil_to_significance(x, s);
            prop_assert!(low <= x);
            prop_assert!(x <= high);
            prop_assert_eq!((low / s).fract(), 0.0);
            prop_assert_eq!((high / s).fract(), 0.0);
        }

        #[test]
        fn rounding_brackets_the_input_for_decimal_increments(
            x in -1.0e6f64..1.0e6,
            s in prop::sample::select(vec![0.1f64, 0.05, 0.3, 1.5, 7.0]),
        ) {
            let eps = 1e-9 * x.abs().max(1.0);
            let low = floor_to_significance(x, s);
            let high = ceil_to_significance(x, s);
            prop_assert!(low <= x + eps);
            prop_assert!(x <= high + eps);
            prop_assert!(high - low <= s + eps);
            prop_assert!(((low / s) - (low / s).round()).abs() < 1e-6);
            prop_assert!(((high / s) - (high / s).round()).abs() < 1e-6);
        }
    }
}
