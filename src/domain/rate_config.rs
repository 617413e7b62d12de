//! Rate tables the pricing engine reads from.
//!
//! A [`RateConfiguration`] is parsed once and never mutated afterwards; edits
//! made by admin tooling produce a fresh instance (see
//! [`crate::infra::config_loader::ConfigHandle`]). String-keyed tables keep
//! the order they had in the source document because the first entry of a
//! table is the default selection for an entry that names none.

use std::{collections::BTreeMap, fmt, marker::PhantomData};

use serde::{
    de::{MapAccess, Visitor},
    ser::SerializeMap,
    Deserialize, Deserializer, Serialize, Serializer,
};
use serde_json::Value;
use thiserror::Error;

use super::entities::{CustomerType, SINGLE_SIDED};

pub const DEFAULT_ROUNDING_SIGNIFICANCE: f64 = 0.25;
pub const DEFAULT_PRODUCTION_COST: f64 = 16.21;

/// Ordered `label -> value` table.
///
/// Behaves like a map for lookups but remembers insertion order. A repeated
/// label replaces the earlier value in place.
#[derive(Clone, Debug, PartialEq)]
pub struct LabeledTable<V> {
    entries: Vec<(String, V)>,
}

impl<V> Default for LabeledTable<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<V> LabeledTable<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: impl Into<String>, value: V) {
        let label = label.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == label) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((label, value)),
        }
    }

    pub fn get(&self, label: &str) -> Option<&V> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == label)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.get(label).is_some()
    }

    pub fn first(&self) -> Option<(&str, &V)> {
        self.entries
            .first()
            .map(|(label, value)| (label.as_str(), value))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(label, _)| label.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries
            .iter()
            .map(|(label, value)| (label.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> FromIterator<(String, V)> for LabeledTable<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (label, value) in iter {
            table.insert(label, value);
        }
        table
    }
}

impl<V: Serialize> Serialize for LabeledTable<V> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, value) in &self.entries {
            map.serialize_entry(label, value)?;
        }
        map.end()
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for LabeledTable<V> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TableVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for TableVisitor<V> {
            type Value = LabeledTable<V>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of labels to values")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut table = LabeledTable::new();
                while let Some((label, value)) = access.next_entry::<String, V>()? {
                    table.insert(label, value);
                }
                Ok(table)
            }
        }

        deserializer.deserialize_map(TableVisitor(PhantomData))
    }
}

/// One row of the banner/mesh finishing ladder: `[minSqft, price, label]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BannerMeshTier(pub f64, pub f64, pub String);

impl BannerMeshTier {
    pub fn min_sqft(&self) -> f64 {
        self.0
    }

    pub fn price(&self) -> f64 {
        self.1
    }

    pub fn label(&self) -> &str {
        &self.2
    }
}

/// A finishing option is either a flat per-sq' price or a size ladder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FinishingRate {
    Flat(f64),
    Tiered(Vec<BannerMeshTier>),
}

/// `[description, [preferredPct, corporatePct, wholesalePct]]`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VolumeDiscountTier(pub String, pub [f64; 3]);

impl VolumeDiscountTier {
    pub fn description(&self) -> &str {
        &self.0
    }

    pub fn percentages(&self) -> [f64; 3] {
        self.1
    }

    pub fn percentage_for(&self, customer_type: CustomerType) -> f64 {
        self.1[customer_type.index()]
    }
}

/// `[description, signedPct]`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommodityAdjustmentTier(pub String, pub f64);

impl CommodityAdjustmentTier {
    pub fn description(&self) -> &str {
        &self.0
    }

    pub fn percentage(&self) -> f64 {
        self.1
    }
}

/// Three-variable group that collapses to `(variable_1 / variable_2) * variable_3`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VariableGroup {
    #[serde(default)]
    pub variable_1: f64,
    #[serde(default = "default_divisor")]
    pub variable_2: f64,
    #[serde(default)]
    pub variable_3: f64,
}

fn default_divisor() -> f64 {
    1.0
}

impl Default for VariableGroup {
    fn default() -> Self {
        Self {
            variable_1: 0.0,
            variable_2: 1.0,
            variable_3: 0.0,
        }
    }
}

impl VariableGroup {
    pub fn value(&self) -> f64 {
        if self.variable_2 == 0.0 {
            return 0.0;
        }
        (self.variable_1 / self.variable_2) * self.variable_3
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdditionalCostsConfig {
    /// Fixed surcharge group applied when a cut option is selected.
    #[serde(rename = "cons_bx_4", default, skip_serializing_if = "Option::is_none")]
    pub cut_setup: Option<VariableGroup>,
    /// Fixed surcharge group applied when a finishing option is selected.
    #[serde(rename = "cons_bx_6", default, skip_serializing_if = "Option::is_none")]
    pub finishing_setup: Option<VariableGroup>,
    #[serde(rename = "prodcuts_an", default = "default_production_cost")]
    pub production_cost: f64,
}

fn default_production_cost() -> f64 {
    DEFAULT_PRODUCTION_COST
}

impl Default for AdditionalCostsConfig {
    fn default() -> Self {
        Self {
            cut_setup: None,
            finishing_setup: None,
            production_cost: DEFAULT_PRODUCTION_COST,
        }
    }
}

/// Derived surcharge constants used by the line-item formula.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct AdditionalCostConstants {
    pub cut_setup_cost: f64,
    pub finishing_setup_cost: f64,
    /// Global additional production cost; a material with dynamic cost
    /// variables overrides it per entry.
    pub default_production_cost: f64,
}

impl Default for AdditionalCostConstants {
    fn default() -> Self {
        AdditionalCostsConfig::default().constants()
    }
}

impl AdditionalCostsConfig {
    pub fn constants(&self) -> AdditionalCostConstants {
        AdditionalCostConstants {
            cut_setup_cost: self.cut_setup.clone().unwrap_or_default().value(),
            finishing_setup_cost: self.finishing_setup.clone().unwrap_or_default().value(),
            default_production_cost: self.production_cost,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RateShapeError {
    #[error("rate group `{0}` is missing")]
    MissingGroup(&'static str),
    #[error("`{group}.{key}` is missing")]
    MissingKey {
        group: &'static str,
        key: &'static str,
    },
    #[error("`{group}.{key}` is not a number")]
    WrongType {
        group: &'static str,
        key: &'static str,
    },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PreferredRates {
    pub historical_price: f64,
    pub fine_tune_modifier: f64,
    pub discount: f64,
}

/// Corporate and wholesale rates are factors applied to the preferred base.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TierRates {
    pub historical_factor: f64,
    pub discount: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaterialRateVariables {
    pub preferred: PreferredRates,
    pub corporate: TierRates,
    pub wholesale: TierRates,
}

/// Inputs of the per-material additional production cost.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DynamicCostVars {
    #[serde(rename = "AW_Roll_Costs", default)]
    pub roll_cost: f64,
    #[serde(rename = "AU_Material_Length", default = "default_divisor")]
    pub material_length_in: f64,
    #[serde(rename = "AV_Material_Width", default = "default_divisor")]
    pub material_width_in: f64,
    #[serde(rename = "AQ_SQ", default)]
    pub area_factor: f64,
    #[serde(rename = "AS_Laminate_Loading", default)]
    pub loading: f64,
    #[serde(rename = "AT_Labour", default)]
    pub labour: f64,
    /// Setup time in minutes.
    #[serde(rename = "constant_BY8", default)]
    pub time_constant: f64,
    #[serde(rename = "Per_hour_rate", default)]
    pub hourly_rate: f64,
}

const DYNAMIC_COST_KEYS: [&str; 2] = ["prodcuts_an_vars", "dynamicCostVars"];

/// Raw rate variables of one material.
///
/// Kept as JSON so that one malformed material does not prevent the rest of
/// the configuration from loading; the shape is checked when it is priced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaterialRecord(pub Value);

impl MaterialRecord {
    pub fn rate_variables(&self) -> Result<MaterialRateVariables, RateShapeError> {
        Ok(MaterialRateVariables {
            preferred: PreferredRates {
                historical_price: self.number("Preferred", "preferred_historical_price")?,
                fine_tune_modifier: self.number("Preferred", "preferred_fine_tune_modifier")?,
                discount: self.number("Preferred", "preferred_discount_value")?,
            },
            corporate: TierRates {
                historical_factor: self.number("Corporate", "corporate_historical_price")?,
                discount: self.number("Corporate", "corporate_discount_value")?,
            },
            wholesale: TierRates {
                historical_factor: self.number("Wholesale", "wholesale_historical_price")?,
                discount: self.number("Wholesale", "wholesale_discount_value")?,
            },
        })
    }

    /// Dynamic cost variables, when the material declares a non-empty group.
    pub fn dynamic_cost_vars(&self) -> Option<DynamicCostVars> {
        let raw = DYNAMIC_COST_KEYS
            .iter()
            .find_map(|key| self.0.get(*key))?;
        if raw.as_object().map(|fields| fields.is_empty()).unwrap_or(true) {
            return None;
        }
        match serde_json::from_value(raw.clone()) {
            Ok(vars) => Some(vars),
            Err(err) => {
                tracing::warn!(%err, "ignoring malformed dynamic cost variables");
                None
            }
        }
    }

    fn number(&self, group: &'static str, key: &'static str) -> Result<f64, RateShapeError> {
        let fields = self
            .0
            .get(group)
            .filter(|value| value.is_object())
            .ok_or(RateShapeError::MissingGroup(group))?;
        fields
            .get(key)
            .ok_or(RateShapeError::MissingKey { group, key })?
            .as_f64()
            .ok_or(RateShapeError::WrongType { group, key })
    }
}

/// Every table the engine consults, keyed the way the source document is.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RateConfiguration {
    #[serde(rename = "MATERIALS", default)]
    pub materials: LabeledTable<LabeledTable<MaterialRecord>>,
    #[serde(rename = "SIDES_TIERS_MAP", default)]
    pub sides_tier_costs: LabeledTable<f64>,
    #[serde(rename = "SIDEDNESS_OPTIONS", default)]
    pub sidedness_options: Vec<String>,
    #[serde(rename = "SPECIALTY_FINISHING", default)]
    pub specialty_finishing: LabeledTable<LabeledTable<FinishingRate>>,
    #[serde(rename = "CUSTOMER_TYPES", default)]
    pub customer_types: Vec<String>,
    #[serde(rename = "VOLUME_DISCOUNT_TIERS", default)]
    pub volume_discount_tiers: BTreeMap<u32, VolumeDiscountTier>,
    #[serde(rename = "PRINT_ADJUSTMENT_FIXED", default)]
    pub print_adjustments: LabeledTable<f64>,
    #[serde(
        rename = "PRINT_ADJUSTMENT_COMMODITY",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub commodity_adjustments: BTreeMap<u32, CommodityAdjustmentTier>,
    #[serde(rename = "MULTIPLES_MAP", default)]
    pub quantity_multipliers: BTreeMap<u32, f64>,
    #[serde(rename = "FALL_BACK_VALUE", default = "default_significance")]
    pub rounding_significance: f64,
    #[serde(rename = "CUT_COST_MAP", default)]
    pub cut_costs: LabeledTable<f64>,
    #[serde(rename = "ADDITIONAL_TIME_MAP", default)]
    pub additional_time_costs: LabeledTable<f64>,
    #[serde(rename = "ADDED_INSTALL_MAP", default)]
    pub added_install_costs: LabeledTable<f64>,
    #[serde(rename = "ADDITIONAL_COSTS", default)]
    pub additional_costs: AdditionalCostsConfig,
}

fn default_significance() -> f64 {
    DEFAULT_ROUNDING_SIGNIFICANCE
}

impl Default for RateConfiguration {
    fn default() -> Self {
        Self {
            materials: LabeledTable::new(),
            sides_tier_costs: LabeledTable::new(),
            sidedness_options: Vec::new(),
            specialty_finishing: LabeledTable::new(),
            customer_types: Vec::new(),
            volume_discount_tiers: BTreeMap::new(),
            print_adjustments: LabeledTable::new(),
            commodity_adjustments: BTreeMap::new(),
            quantity_multipliers: BTreeMap::new(),
            rounding_significance: DEFAULT_ROUNDING_SIGNIFICANCE,
            cut_costs: LabeledTable::new(),
            additional_time_costs: LabeledTable::new(),
            added_install_costs: LabeledTable::new(),
            additional_costs: AdditionalCostsConfig::default(),
        }
    }
}

impl RateConfiguration {
    pub fn material(&self, material_type: &str, name: &str) -> Option<&MaterialRecord> {
        self.materials.get(material_type)?.get(name)
    }

    pub fn material_types(&self) -> impl Iterator<Item = &str> {
        self.materials.labels()
    }

    pub fn materials_of(&self, material_type: &str) -> Vec<&str> {
        self.materials
            .get(material_type)
            .map(|names| names.labels().collect())
            .unwrap_or_default()
    }

    pub fn sidedness_options(&self) -> impl Iterator<Item = &str> {
        self.sidedness_options.iter().map(String::as_str)
    }

    /// Sidedness of an entry that names none: the first configured option.
    pub fn default_sidedness(&self) -> &str {
        self.sidedness_options
            .first()
            .map(String::as_str)
            .unwrap_or(SINGLE_SIDED)
    }

    /// Customer types offered by the configuration, all of them when the list is absent.
    /// Unrecognised labels are skipped.
    pub fn customer_types(&self) -> Vec<CustomerType> {
        if self.customer_types.is_empty() {
            return CustomerType::ALL.to_vec();
        }
        self.customer_types
            .iter()
            .filter_map(|label| CustomerType::from_label(label))
            .collect()
    }

    pub fn tier_descriptions(&self) -> impl Iterator<Item = &str> {
        self.sides_tier_costs.labels()
    }

    pub fn finishing_types(&self) -> impl Iterator<Item = &str> {
        self.specialty_finishing.labels()
    }

    pub fn finishing_options(&self, finishing_type: &str) -> Option<&LabeledTable<FinishingRate>> {
        self.specialty_finishing.get(finishing_type)
    }

    pub fn cut_options(&self) -> impl Iterator<Item = &str> {
        self.cut_costs.labels()
    }

    pub fn additional_time_options(&self) -> impl Iterator<Item = &str> {
        self.additional_time_costs.labels()
    }

    pub fn added_install_options(&self) -> impl Iterator<Item = &str> {
        self.added_install_costs.labels()
    }

    /// Discount tiers in ascending threshold order, as `(minSqft, tier)`.
    pub fn discount_tiers(&self) -> impl Iterator<Item = (u32, &VolumeDiscountTier)> {
        self.volume_discount_tiers
            .iter()
            .map(|(min_sqft, tier)| (*min_sqft, tier))
    }

    pub fn discount_tier_by_label(&self, label: &str) -> Option<(u32, &VolumeDiscountTier)> {
        self.discount_tiers()
            .find(|(_, tier)| tier.description() == label)
    }

    pub fn additional_cost_constants(&self) -> AdditionalCostConstants {
        self.additional_costs.constants()
    }
}
