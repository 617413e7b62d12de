//! Threshold lookups that turn a measurement into a labelled tier.
//!
//! Two scan disciplines are in use and each table sticks to one:
//!
//! - ascending scan, overwrite while the threshold is met (volume discounts),
//!   which lands on the largest threshold not exceeding the input;
//! - descending scan, first threshold met wins (sides ladders, multipliers,
//!   banner/mesh ladder, commodity adjustments).
//!
//! On sorted tables both pick the same row; they differ only when a literal
//! list is not sorted, which is why the banner/mesh ladder is scanned in the
//! order it is written.

use std::collections::BTreeMap;

use serde::Serialize;

use super::entities::{CustomerType, DOUBLE_SIDED, NO_PRINT, SINGLE_SIDED};
use super::rate_config::{
    BannerMeshTier, CommodityAdjustmentTier, LabeledTable, RateConfiguration, VolumeDiscountTier,
};

pub const NOT_APPLICABLE: &str = "N/A";
pub const NO_PRINT_TIER: &str = "NO PRINT";
pub const NO_ADJUSTMENT: &str = "no adjustment";
pub const BANNER_TYPE: &str = "Banner";
pub const BANNER_MESH_FINISHING: &str = "Banner/Mesh";
pub const NOTHING_SPECIAL: &str = "Nothing Special";

const SINGLE_SIDED_LADDER: [(f64, &str); 3] = [
    (1.0, "STANDARD OVER 1sq'"),
    (0.5, "SMALL Between 1sq' - 0.5sq'"),
    (0.25, "SMALL BETWEEN 0.5 - .25 sq' /peice"),
];
const SINGLE_SIDED_SMALLEST: &str = "SMALLEST UNDER 0.05 sq' /peice";

const DOUBLE_SIDED_LADDER: [(f64, &str); 3] = [
    (1.0, "DOUBLE SIDED Over 1 SQ'"),
    (0.5, "DOUBLE SIDED between 1sq' - 0.5sq' per peice"),
    (0.25, "DOUBLE SIDED under 0.5 - .25 sq' /peice"),
];
const DOUBLE_SIDED_SMALLEST: &str = "DOUBLE SIDED under 0.05 sq' /peice";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sidedness {
    SingleSided,
    DoubleSided,
    NoPrint,
    Other,
}

impl Sidedness {
    pub fn parse(label: &str) -> Self {
        match label.trim() {
            SINGLE_SIDED => Sidedness::SingleSided,
            DOUBLE_SIDED => Sidedness::DoubleSided,
            NO_PRINT => Sidedness::NoPrint,
            _ => Sidedness::Other,
        }
    }
}

fn ladder_pick(sqft: f64, ladder: &[(f64, &'static str)], catch_all: &'static str) -> &'static str {
    ladder
        .iter()
        .find(|(min_sqft, _)| sqft >= *min_sqft)
        .map(|(_, label)| *label)
        .unwrap_or(catch_all)
}

/// Suggested sides tier for a piece. `None` for a sidedness with no ladder.
pub fn suggested_sides_tier(sqft_per_piece: f64, sidedness: &str) -> Option<&'static str> {
    match Sidedness::parse(sidedness) {
        Sidedness::NoPrint => Some(NO_PRINT_TIER),
        Sidedness::SingleSided => Some(ladder_pick(
            sqft_per_piece,
            &SINGLE_SIDED_LADDER,
            SINGLE_SIDED_SMALLEST,
        )),
        Sidedness::DoubleSided => Some(ladder_pick(
            sqft_per_piece,
            &DOUBLE_SIDED_LADDER,
            DOUBLE_SIDED_SMALLEST,
        )),
        Sidedness::Other => None,
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DiscountTierSelection {
    pub label: String,
    pub min_sqft: Option<u32>,
    /// `[preferred, corporate, wholesale]`
    pub percentages: [f64; 3],
}

impl DiscountTierSelection {
    pub fn not_applicable() -> Self {
        Self {
            label: NOT_APPLICABLE.to_string(),
            min_sqft: None,
            percentages: [0.0; 3],
        }
    }

    pub fn from_tier(min_sqft: u32, tier: &VolumeDiscountTier) -> Self {
        Self {
            label: tier.description().to_string(),
            min_sqft: Some(min_sqft),
            percentages: tier.percentages(),
        }
    }

    pub fn percentage_for(&self, customer_type: CustomerType) -> f64 {
        self.percentages[customer_type.index()]
    }

    pub fn is_applicable(&self) -> bool {
        self.min_sqft.is_some()
    }
}

pub fn suggested_discount_tier(
    total_order_sqft: f64,
    tiers: &BTreeMap<u32, VolumeDiscountTier>,
) -> DiscountTierSelection {
    let mut selection = DiscountTierSelection::not_applicable();
    for (min_sqft, tier) in tiers {
        if total_order_sqft >= f64::from(*min_sqft) {
            selection = DiscountTierSelection::from_tier(*min_sqft, tier);
        }
    }
    selection
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MultiplierSelection {
    pub label: String,
    pub min_entries: Option<u32>,
    pub factor: f64,
}

impl MultiplierSelection {
    pub fn not_applicable() -> Self {
        Self {
            label: NOT_APPLICABLE.to_string(),
            min_entries: None,
            factor: 1.0,
        }
    }
}

fn multiplier_label(min_entries: u32) -> String {
    if min_entries == 1 {
        "1 entry".to_string()
    } else {
        format!("{min_entries}+ entries")
    }
}

pub fn multiplier_for(entry_count: usize, multipliers: &BTreeMap<u32, f64>) -> MultiplierSelection {
    multipliers
        .iter()
        .rev()
        .find(|(min_entries, _)| entry_count as u64 >= u64::from(**min_entries))
        .map(|(min_entries, factor)| MultiplierSelection {
            label: multiplier_label(*min_entries),
            min_entries: Some(*min_entries),
            factor: *factor,
        })
        .unwrap_or_else(MultiplierSelection::not_applicable)
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BannerMeshSelection {
    pub label: String,
    pub price: f64,
}

/// First row of the ladder, top-down, whose threshold the piece meets.
pub fn banner_mesh_tier(
    sqft_per_piece: f64,
    option_name: &str,
    ladder: &[BannerMeshTier],
) -> BannerMeshSelection {
    ladder
        .iter()
        .find(|tier| sqft_per_piece >= tier.min_sqft())
        .map(|tier| BannerMeshSelection {
            label: format!("{} - {option_name}", tier.label()),
            price: tier.price(),
        })
        .unwrap_or_else(|| BannerMeshSelection {
            label: NOT_APPLICABLE.to_string(),
            price: 0.0,
        })
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AdjustmentSelection {
    pub label: String,
    pub percentage: f64,
}

impl AdjustmentSelection {
    pub fn new(label: impl Into<String>, percentage: f64) -> Self {
        Self {
            label: label.into(),
            percentage,
        }
    }

    pub fn not_applicable() -> Self {
        Self::new(NOT_APPLICABLE, 0.0)
    }
}

fn commodity_label(description: &str) -> String {
    format!("Commodity discount ({description})")
}

/// Volume-driven print adjustment, highest threshold first.
pub fn commodity_adjustment(
    total_order_sqft: f64,
    tiers: &BTreeMap<u32, CommodityAdjustmentTier>,
) -> Option<AdjustmentSelection> {
    tiers
        .iter()
        .rev()
        .find(|(min_sqft, _)| total_order_sqft >= f64::from(**min_sqft))
        .map(|(_, tier)| AdjustmentSelection::new(commodity_label(tier.description()), tier.percentage()))
}

#[derive(Clone, Debug, PartialEq)]
pub struct PrintAdjustmentOptions {
    pub options: LabeledTable<f64>,
    pub suggested: AdjustmentSelection,
}

impl PrintAdjustmentOptions {
    pub fn select(&self, label: &str) -> Option<AdjustmentSelection> {
        self.options
            .get(label)
            .map(|percentage| AdjustmentSelection::new(label, *percentage))
    }
}

/// Fixed adjustments plus the commodity adjustment the order qualifies for.
///
/// The commodity adjustment is the suggestion when one applies; otherwise
/// `"no adjustment"` if configured, else the first fixed adjustment.
pub fn print_adjustment_options(
    total_order_sqft: f64,
    config: &RateConfiguration,
) -> PrintAdjustmentOptions {
    let mut options = config.print_adjustments.clone();
    let commodity = commodity_adjustment(total_order_sqft, &config.commodity_adjustments);
    if let Some(selection) = &commodity {
        options.insert(selection.label.clone(), selection.percentage);
    }

    let suggested = commodity
        .or_else(|| {
            options
                .get(NO_ADJUSTMENT)
                .map(|percentage| AdjustmentSelection::new(NO_ADJUSTMENT, *percentage))
        })
        .or_else(|| {
            config
                .print_adjustments
                .first()
                .map(|(label, percentage)| AdjustmentSelection::new(label, *percentage))
        })
        .unwrap_or_else(AdjustmentSelection::not_applicable);

    PrintAdjustmentOptions { options, suggested }
}

/// Finishing type suggested from the material type and the longest side in inches.
pub fn suggested_finishing_type(material_type: &str, width_in: f64, height_in: f64) -> &'static str {
    if material_type == BANNER_TYPE {
        return BANNER_MESH_FINISHING;
    }
    let longest = width_in.max(height_in);
    if longest > 3.0 {
        "Over 3\" object"
    } else if longest >= 1.0 {
        "3\" - 1\" OBJECT"
    } else if longest > 0.0 {
        "UNDER 1\""
    } else {
        NOTHING_SPECIAL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn volume_tiers() -> BTreeMap<u32, VolumeDiscountTier> {
        serde_json::from_value(json!({
            "10000": ["10K+ sq'", [0.35, 0.351, 0.302]],
            "1000": ["1K - 3K sq'", [0.22, 0.221, 0.152]],
            "100": ["100 - 200 sq'", [0.03, 0.031, 0.032]],
            "50": ["50 - 100 sq'", [0.0, 0.0, 0.0]]
        }))
        .unwrap()
    }

    fn multipliers() -> BTreeMap<u32, f64> {
        serde_json::from_value(json!({
            "20": 100000, "10": 8, "5": 5, "4": 3, "3": 2, "2": 1.5, "1": 1
        }))
        .unwrap()
    }

    #[test]
    fn single_sided_ladder_picks_band() {
        assert_eq!(suggested_sides_tier(1.0, SINGLE_SIDED), Some("STANDARD OVER 1sq'"));
        assert_eq!(
            suggested_sides_tier(0.6, SINGLE_SIDED),
            Some("SMALL Between 1sq' - 0.5sq'")
        );
        assert_eq!(
            suggested_sides_tier(0.25, SINGLE_SIDED),
            Some("SMALL BETWEEN 0.5 - .25 sq' /peice")
        );
        assert_eq!(suggested_sides_tier(0.05, SINGLE_SIDED), Some(SINGLE_SIDED_SMALLEST));
    }

    #[test]
    fn double_sided_and_no_print_ladders() {
        assert_eq!(
            suggested_sides_tier(0.5, DOUBLE_SIDED),
            Some("DOUBLE SIDED between 1sq' - 0.5sq' per peice")
        );
        assert_eq!(suggested_sides_tier(0.0, DOUBLE_SIDED), Some(DOUBLE_SIDED_SMALLEST));
        assert_eq!(suggested_sides_tier(40.0, NO_PRINT), Some(NO_PRINT_TIER));
        assert_eq!(suggested_sides_tier(40.0, "Triple Sided"), None);
    }

    #[test]
    fn discount_tier_takes_largest_threshold_reached() {
        let tiers = volume_tiers();
        let selection = suggested_discount_tier(2500.0, &tiers);
        assert_eq!(selection.label, "1K - 3K sq'");
        assert_eq!(selection.min_sqft, Some(1000));
        assert_eq!(selection.percentage_for(CustomerType::Corporate), 0.221);

        assert_eq!(suggested_discount_tier(100.0, &tiers).label, "100 - 200 sq'");
        assert_eq!(suggested_discount_tier(50_000.0, &tiers).label, "10K+ sq'");
    }

    #[test]
    fn discount_tier_below_every_threshold_is_not_applicable() {
        let selection = suggested_discount_tier(10.0, &volume_tiers());
        assert_eq!(selection, DiscountTierSelection::not_applicable());
        assert!(!selection.is_applicable());
        assert_eq!(
            suggested_discount_tier(500.0, &BTreeMap::new()).label,
            NOT_APPLICABLE
        );
    }

    #[test]
    fn multiplier_uses_largest_bracket_not_exceeding_count() {
        let map = multipliers();
        let six = multiplier_for(6, &map);
        assert_eq!(six.label, "5+ entries");
        assert_eq!(six.min_entries, Some(5));
        assert_eq!(six.factor, 5.0);

        let one = multiplier_for(1, &map);
        assert_eq!(one.label, "1 entry");
        assert_eq!(one.factor, 1.0);

        assert_eq!(multiplier_for(25, &map).factor, 100000.0);
    }

    #[test]
    fn multiplier_defaults_when_nothing_matches() {
        assert_eq!(multiplier_for(0, &multipliers()), MultiplierSelection::not_applicable());
        assert_eq!(multiplier_for(3, &BTreeMap::new()).factor, 1.0);
    }

    #[test]
    fn banner_mesh_ladder_is_first_match_from_top() {
        let ladder = vec![
            BannerMeshTier(500.0, 0.20, "OVER 500 sq' per piece".into()),
            BannerMeshTier(200.0, 0.42, "200 sq' - 500sq' per piece".into()),
            BannerMeshTier(50.0, 1.00, "50 sq' - 100sq' per piece".into()),
            BannerMeshTier(0.0, 1.32, "UNDER 50 sq' per piece".into()),
        ];
        let selection = banner_mesh_tier(250.0, "POCKET", &ladder);
        assert_eq!(selection.label, "200 sq' - 500sq' per piece - POCKET");
        assert_eq!(selection.price, 0.42);
        assert_eq!(banner_mesh_tier(12.0, "POCKET", &ladder).price, 1.32);
    }

    #[test]
    fn banner_mesh_ladder_keeps_written_order() {
        // an unsorted ladder is not re-sorted: the first row met wins
        let ladder = vec![
            BannerMeshTier(0.0, 1.32, "catch-all".into()),
            BannerMeshTier(500.0, 0.20, "large".into()),
        ];
        assert_eq!(banner_mesh_tier(900.0, "POCKET", &ladder).price, 1.32);
    }

    #[test]
    fn banner_mesh_ladder_without_match_is_not_applicable() {
        let empty = banner_mesh_tier(10.0, "POCKET", &[]);
        assert_eq!(empty.label, NOT_APPLICABLE);
        assert_eq!(empty.price, 0.0);

        let ladder = vec![BannerMeshTier(50.0, 1.0, "50+".into())];
        assert_eq!(banner_mesh_tier(10.0, "POCKET", &ladder).label, NOT_APPLICABLE);
    }

    #[test]
    fn commodity_adjustment_becomes_the_suggestion() {
        let config: RateConfiguration = serde_json::from_value(json!({
            "PRINT_ADJUSTMENT_FIXED": {"retail": 0.101, "no adjustment": 0.0},
            "PRINT_ADJUSTMENT_COMMODITY": {
                "1000": ["1K - 3Ksq'", -0.22],
                "50": ["50 - 100 sq'", -0.051]
            }
        }))
        .unwrap();

        let small = print_adjustment_options(10.0, &config);
        assert_eq!(small.suggested, AdjustmentSelection::new(NO_ADJUSTMENT, 0.0));
        assert_eq!(small.options.len(), 2);

        let large = print_adjustment_options(1500.0, &config);
        assert_eq!(large.suggested.label, "Commodity discount (1K - 3Ksq')");
        assert_eq!(large.suggested.percentage, -0.22);
        assert_eq!(
            large.select("Commodity discount (1K - 3Ksq')"),
            Some(large.suggested.clone())
        );
        assert_eq!(large.select("retail").map(|s| s.percentage), Some(0.101));
    }

    #[test]
    fn adjustment_suggestion_falls_back_to_first_fixed_label() {
        let config: RateConfiguration = serde_json::from_value(json!({
            "PRINT_ADJUSTMENT_FIXED": {"retail": 0.101, "Promo": 0.05}
        }))
        .unwrap();
        assert_eq!(
            print_adjustment_options(0.0, &config).suggested,
            AdjustmentSelection::new("retail", 0.101)
        );
        assert_eq!(
            print_adjustment_options(0.0, &RateConfiguration::default()).suggested,
            AdjustmentSelection::not_applicable()
        );
    }

    #[test]
    fn finishing_type_suggestion_by_material_and_size() {
        assert_eq!(suggested_finishing_type("Banner", 1.0, 1.0), BANNER_MESH_FINISHING);
        assert_eq!(suggested_finishing_type("Rigid", 24.0, 2.0), "Over 3\" object");
        assert_eq!(suggested_finishing_type("Rigid", 3.0, 1.0), "3\" - 1\" OBJECT");
        assert_eq!(suggested_finishing_type("Decal", 0.5, 0.5), "UNDER 1\"");
        assert_eq!(suggested_finishing_type("Decal", 0.0, 0.0), NOTHING_SPECIAL);
    }
}
