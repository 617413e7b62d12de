use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use super::tiers::{AdjustmentSelection, DiscountTierSelection, MultiplierSelection};

/// Pricing tier of the customer a quote is prepared for.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum CustomerType {
    #[default]
    Preferred,
    Corporate,
    Wholesale,
}

impl CustomerType {
    pub const ALL: [CustomerType; 3] = [
        CustomerType::Preferred,
        CustomerType::Corporate,
        CustomerType::Wholesale,
    ];

    /// Position of this tier inside `[preferred, corporate, wholesale]` triples.
    pub fn index(self) -> usize {
        match self {
            CustomerType::Preferred => 0,
            CustomerType::Corporate => 1,
            CustomerType::Wholesale => 2,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CustomerType::Preferred => "Preferred",
            CustomerType::Corporate => "Corporate",
            CustomerType::Wholesale => "Wholesale",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|customer| customer.label().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for CustomerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A length given as whole feet plus inches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeetInches {
    #[serde(default)]
    pub feet: u32,
    #[serde(default)]
    pub inches: u32,
}

impl FeetInches {
    pub fn new(feet: u32, inches: u32) -> Self {
        Self { feet, inches }
    }

    pub fn total_inches(&self) -> f64 {
        f64::from(self.feet) * 12.0 + f64::from(self.inches)
    }
}

/// One quote line as supplied by the form layer.
///
/// Option fields left as `None` take the suggested or first configured value
/// when the entry is priced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineItemInput {
    #[serde(default = "new_entry_id")]
    pub id: String,
    pub material_type: String,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub width: FeetInches,
    #[serde(default)]
    pub height: FeetInches,
    #[serde(default = "default_qty")]
    pub qty: u32,
    /// Takes the first configured sidedness when absent.
    #[serde(default)]
    pub sidedness: Option<String>,
    #[serde(default)]
    pub sides_tier: Option<String>,
    #[serde(default)]
    pub finishing_type: Option<String>,
    #[serde(default)]
    pub finishing_option: Option<String>,
    #[serde(default)]
    pub cut_option: Option<String>,
    #[serde(default)]
    pub additional_time_option: Option<String>,
    #[serde(default)]
    pub added_install_option: Option<String>,
    #[serde(default)]
    pub print_adjustment: Option<String>,
    /// Volume discount tier label for this entry; the order's tier when absent.
    #[serde(default)]
    pub discount_tier: Option<String>,
}

pub const SINGLE_SIDED: &str = "Single Sided";
pub const DOUBLE_SIDED: &str = "Double Sided";
pub const NO_PRINT: &str = "No Print";

fn new_entry_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn default_qty() -> u32 {
    1
}

impl LineItemInput {
    pub fn new(material_type: impl Into<String>, material: impl Into<String>) -> Self {
        Self {
            id: new_entry_id(),
            material_type: material_type.into(),
            material: Some(material.into()),
            width: FeetInches::default(),
            height: FeetInches::default(),
            qty: default_qty(),
            sidedness: None,
            sides_tier: None,
            finishing_type: None,
            finishing_option: None,
            cut_option: None,
            additional_time_option: None,
            added_install_option: None,
            print_adjustment: None,
            discount_tier: None,
        }
    }

    pub fn with_size(mut self, width: FeetInches, height: FeetInches) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_qty(mut self, qty: u32) -> Self {
        self.qty = qty;
        self
    }

    pub fn with_sidedness(mut self, sidedness: impl Into<String>) -> Self {
        self.sidedness = Some(sidedness.into());
        self
    }

    pub fn with_finishing(
        mut self,
        finishing_type: impl Into<String>,
        option: Option<String>,
    ) -> Self {
        self.finishing_type = Some(finishing_type.into());
        self.finishing_option = option;
        self
    }

    pub fn with_cut(mut self, cut_option: impl Into<String>) -> Self {
        self.cut_option = Some(cut_option.into());
        self
    }

    pub fn with_additional_time(mut self, option: impl Into<String>) -> Self {
        self.additional_time_option = Some(option.into());
        self
    }

    pub fn with_added_install(mut self, option: impl Into<String>) -> Self {
        self.added_install_option = Some(option.into());
        self
    }

    pub fn with_print_adjustment(mut self, label: impl Into<String>) -> Self {
        self.print_adjustment = Some(label.into());
        self
    }

    pub fn with_discount_tier(mut self, label: impl Into<String>) -> Self {
        self.discount_tier = Some(label.into());
        self
    }

    pub fn sqft_per_piece(&self) -> f64 {
        (self.width.total_inches() * self.height.total_inches()) / 144.0
    }

    pub fn total_sqft(&self) -> f64 {
        self.sqft_per_piece() * f64::from(self.qty)
    }
}

/// Base (sticker) and net (after standard discount) unit prices per tier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct MaterialPriceResult {
    pub preferred_base: f64,
    pub preferred_value: f64,
    pub corporate_base: f64,
    pub corporate_value: f64,
    pub wholesale_base: f64,
    pub wholesale_value: f64,
}

impl MaterialPriceResult {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn base_for(&self, customer_type: CustomerType) -> f64 {
        match customer_type {
            CustomerType::Preferred => self.preferred_base,
            CustomerType::Corporate => self.corporate_base,
            CustomerType::Wholesale => self.wholesale_base,
        }
    }

    pub fn net_for(&self, customer_type: CustomerType) -> f64 {
        match customer_type {
            CustomerType::Preferred => self.preferred_value,
            CustomerType::Corporate => self.corporate_value,
            CustomerType::Wholesale => self.wholesale_value,
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::zero()
    }
}

/// Configuration tables an entry can name an option from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionTable {
    SidesTier,
    FinishingType,
    FinishingOption,
    CutCost,
    AdditionalTime,
    AddedInstall,
    PrintAdjustment,
    DiscountTier,
}

/// Why a computed figure fell back to zero or a default.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DegradedReason {
    MaterialNotFound {
        material_type: String,
        material: Option<String>,
    },
    MalformedRateVariables {
        detail: String,
    },
    ZeroQuantity,
    UnknownOption {
        table: OptionTable,
        label: String,
    },
}

/// Priced view of one line item.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EntryQuote {
    pub id: String,
    pub qty: u32,
    pub sqft_per_piece: f64,
    pub total_sqft: f64,
    pub sidedness: String,
    pub sides_tier: String,
    pub finishing: String,
    pub material_prices: MaterialPriceResult,
    pub production_cost: f64,
    pub discount_tier: DiscountTierSelection,
    pub print_adjustment: AdjustmentSelection,
    /// Bracket for the number of entries sharing this material. Display only.
    pub material_multiplier: MultiplierSelection,
    /// Sum of the add-on unit costs times quantity.
    pub addon_cost: f64,
    pub prices: BTreeMap<CustomerType, f64>,
    pub degraded: Vec<DegradedReason>,
}

impl EntryQuote {
    pub fn price_for(&self, customer_type: CustomerType) -> f64 {
        self.prices.get(&customer_type).copied().unwrap_or_default()
    }

    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }
}

/// Order-level result for the selected customer type.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OrderTotals {
    pub customer_type: CustomerType,
    pub entry_count: usize,
    pub total_sqft: f64,
    pub total_base_price: f64,
    pub total_addon_cost: f64,
    pub discount_tier: DiscountTierSelection,
    pub discount_pct: f64,
    pub print_adjustment: AdjustmentSelection,
    pub multiplier: MultiplierSelection,
    pub entries: Vec<EntryQuote>,
    pub grand_total: f64,
    pub degraded: Vec<DegradedReason>,
}

impl OrderTotals {
    /// True when the order or any of its entries fell back to a default.
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty() || self.entries.iter().any(EntryQuote::is_degraded)
    }
}
