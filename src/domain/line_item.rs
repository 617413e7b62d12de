//! Per-entry pricing.
//!
//! An entry is first resolved against the rate tables into plain unit costs
//! ([`ResolvedLineItem`]), then priced for each customer type by the six-part
//! formula in [`price_entry`].

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, warn};

use super::entities::{
    CustomerType, DegradedReason, LineItemInput, MaterialPriceResult, OptionTable,
};
use super::material_pricing::{price_material_or_zero, production_cost_for};
use super::rate_config::{AdditionalCostConstants, FinishingRate, LabeledTable, RateConfiguration};
use super::tiers::{
    banner_mesh_tier, suggested_finishing_type, suggested_sides_tier, AdjustmentSelection,
    BANNER_MESH_FINISHING, BANNER_TYPE, NOTHING_SPECIAL, NOT_APPLICABLE,
};

/// Markup applied to every piece price.
pub const ENTRY_MARKUP: f64 = 1.10;
/// Multiplier used inside the per-entry formula so an entry's price does not
/// move when other entries are added to the order.
pub const STABLE_ENTRY_MULTIPLIER: f64 = 1.0;
/// Added to the setup-cost divisor for corporate and wholesale customers.
pub const NON_PREFERRED_SETUP_OFFSET: f64 = 0.5;

/// Unit costs of one entry after its options were looked up.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct EntryCostInputs {
    pub qty: u32,
    pub sqft_per_piece: f64,
    pub total_sqft: f64,
    pub sides_cost_per_unit: f64,
    pub finishing_price_per_unit: f64,
    pub cut_cost_per_unit: f64,
    pub additional_time_cost_per_unit: f64,
    pub added_install_cost_per_unit: f64,
}

impl EntryCostInputs {
    pub fn addon_unit_cost(&self) -> f64 {
        self.sides_cost_per_unit
            + self.finishing_price_per_unit
            + self.cut_cost_per_unit
            + self.additional_time_cost_per_unit
            + self.added_install_cost_per_unit
    }
}

/// Order-wide figures one entry is priced with.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EntryRates {
    pub discount_pct: f64,
    pub adjustment_pct: f64,
    pub multiplier: f64,
    pub production_cost: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct EntryBreakdown {
    pub part_a_base: f64,
    pub part_a_discounted: f64,
    pub part_b: f64,
    pub part_c: f64,
    pub part_d: f64,
    pub part_e: f64,
    pub part_f: f64,
    pub piece_price: f64,
    pub entry_total: f64,
}

fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

fn setup_divisor(customer_type: CustomerType, multiplier: f64) -> f64 {
    match customer_type {
        CustomerType::Preferred => multiplier,
        CustomerType::Corporate | CustomerType::Wholesale => multiplier + NON_PREFERRED_SETUP_OFFSET,
    }
}

/// Evaluates the six-part entry formula.
///
/// `active_base_amount` is the customer type's base price from the material
/// pricer. A zero quantity prices as zero.
pub fn price_entry(
    costs: &EntryCostInputs,
    customer_type: CustomerType,
    active_base_amount: f64,
    rates: &EntryRates,
    constants: &AdditionalCostConstants,
) -> EntryBreakdown {
    if costs.qty == 0 {
        return EntryBreakdown::default();
    }
    let qty = f64::from(costs.qty);
    let sqft = costs.sqft_per_piece;

    let part_a_base = active_base_amount * sqft * costs.sides_cost_per_unit;
    let part_a_discounted = part_a_base * (1.0 - (rates.discount_pct + rates.adjustment_pct));

    let part_b = costs.cut_cost_per_unit * sqft + part_a_discounted;

    let part_c_numerator = costs.finishing_price_per_unit * sqft * qty
        + safe_div(rates.production_cost, rates.multiplier);
    let part_c = part_c_numerator / qty;

    let divisor = setup_divisor(customer_type, rates.multiplier);
    let part_d = if costs.cut_cost_per_unit > 0.0 {
        safe_div(constants.cut_setup_cost, divisor) / qty
    } else {
        0.0
    };
    let part_e = if costs.finishing_price_per_unit > 0.0 {
        safe_div(constants.finishing_setup_cost, divisor) / qty
    } else {
        0.0
    };

    let part_f = costs.additional_time_cost_per_unit / qty + costs.added_install_cost_per_unit;

    let piece_price = part_b + part_c + part_d + part_e + part_f;
    let entry_total = piece_price * ENTRY_MARKUP;

    debug!(
        customer = %customer_type,
        part_a_base,
        part_a_discounted,
        part_b,
        part_c,
        part_d,
        part_e,
        part_f,
        piece_price,
        entry_total,
        "priced entry"
    );

    EntryBreakdown {
        part_a_base,
        part_a_discounted,
        part_b,
        part_c,
        part_d,
        part_e,
        part_f,
        piece_price,
        entry_total,
    }
}

/// A line item with every option turned into a number.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedLineItem {
    pub id: String,
    /// `false` when the material could not be found; such an entry prices as zero.
    pub material_found: bool,
    pub costs: EntryCostInputs,
    pub material_prices: MaterialPriceResult,
    pub production_cost: f64,
    pub sidedness: String,
    pub sides_tier: String,
    pub finishing: String,
    pub print_adjustment: AdjustmentSelection,
    pub degraded: Vec<DegradedReason>,
}

struct Resolver<'a> {
    config: &'a RateConfiguration,
    degraded: Vec<DegradedReason>,
}

impl<'a> Resolver<'a> {
    fn unknown(&mut self, table: OptionTable, label: &str) {
        warn!(?table, label, "unknown option, costing as zero");
        self.degraded.push(DegradedReason::UnknownOption {
            table,
            label: label.to_string(),
        });
    }

    /// Named label from a flat table, or its first entry when none is named.
    fn flat_cost(
        &mut self,
        table: &LabeledTable<f64>,
        kind: OptionTable,
        label: Option<&str>,
    ) -> f64 {
        match label {
            Some(label) => match table.get(label) {
                Some(cost) => *cost,
                None => {
                    self.unknown(kind, label);
                    0.0
                }
            },
            None => table.first().map(|(_, cost)| *cost).unwrap_or_default(),
        }
    }

    fn sides_tier(
        &mut self,
        item: &LineItemInput,
        sidedness: &str,
        sqft_per_piece: f64,
    ) -> (String, f64) {
        let config = self.config;
        let table = &config.sides_tier_costs;
        if let Some(label) = item.sides_tier.as_deref() {
            let cost = self.flat_cost(table, OptionTable::SidesTier, Some(label));
            return (label.to_string(), cost);
        }
        let suggested = suggested_sides_tier(sqft_per_piece, sidedness)
            .filter(|label| table.contains(label))
            .map(|label| (label.to_string(), table.get(label).copied().unwrap_or_default()));
        suggested
            .or_else(|| table.first().map(|(label, cost)| (label.to_string(), *cost)))
            .unwrap_or_else(|| (NOT_APPLICABLE.to_string(), 0.0))
    }

    fn finishing_type(&mut self, item: &LineItemInput) -> Option<String> {
        let config = self.config;
        let finishing = &config.specialty_finishing;
        match item.finishing_type.as_deref() {
            Some(NOTHING_SPECIAL) | None
                if item.material_type == BANNER_TYPE && finishing.contains(BANNER_MESH_FINISHING) =>
            {
                Some(BANNER_MESH_FINISHING.to_string())
            }
            Some(label) if finishing.contains(label) => Some(label.to_string()),
            Some(label) => {
                self.unknown(OptionTable::FinishingType, label);
                None
            }
            None => {
                let suggested = suggested_finishing_type(
                    &item.material_type,
                    item.width.total_inches(),
                    item.height.total_inches(),
                );
                if finishing.contains(suggested) {
                    Some(suggested.to_string())
                } else {
                    finishing.first().map(|(label, _)| label.to_string())
                }
            }
        }
    }

    fn finishing(&mut self, item: &LineItemInput, sqft_per_piece: f64) -> (String, f64) {
        let Some(finishing_type) = self.finishing_type(item) else {
            return (NOT_APPLICABLE.to_string(), 0.0);
        };
        let config = self.config;
        let Some(options) = config.finishing_options(&finishing_type) else {
            return (NOT_APPLICABLE.to_string(), 0.0);
        };

        // a size ladder overrides whatever option was named
        let ladder = options.iter().find_map(|(name, rate)| match rate {
            FinishingRate::Tiered(tiers) => Some((name, tiers)),
            FinishingRate::Flat(_) => None,
        });
        if let Some((name, tiers)) = ladder {
            let selection = banner_mesh_tier(sqft_per_piece, name, tiers);
            return (selection.label, selection.price);
        }

        let named = match item.finishing_option.as_deref() {
            Some(label) => match options.get(label) {
                Some(rate) => Some((label, rate)),
                None => {
                    self.unknown(OptionTable::FinishingOption, label);
                    return (label.to_string(), 0.0);
                }
            },
            None => options.first(),
        };
        match named {
            Some((label, FinishingRate::Flat(price))) => (label.to_string(), *price),
            _ => (NOT_APPLICABLE.to_string(), 0.0),
        }
    }

    fn print_adjustment(
        &mut self,
        item: &LineItemInput,
        order_adjustment: &AdjustmentSelection,
        available: &LabeledTable<f64>,
    ) -> AdjustmentSelection {
        match item.print_adjustment.as_deref() {
            Some(label) => match available.get(label) {
                Some(percentage) => AdjustmentSelection::new(label, *percentage),
                None => {
                    self.unknown(OptionTable::PrintAdjustment, label);
                    order_adjustment.clone()
                }
            },
            None => order_adjustment.clone(),
        }
    }
}

/// Looks up every option of `item` in `config`.
///
/// `order_adjustment` is used when the entry names no print adjustment of its
/// own; `adjustments` lists the labels an entry may name.
pub fn resolve_line_item(
    item: &LineItemInput,
    config: &RateConfiguration,
    order_adjustment: &AdjustmentSelection,
    adjustments: &LabeledTable<f64>,
) -> ResolvedLineItem {
    let mut resolver = Resolver {
        config,
        degraded: Vec::new(),
    };
    let sqft_per_piece = item.sqft_per_piece();

    let record = item
        .material
        .as_deref()
        .and_then(|name| config.material(&item.material_type, name));
    let material_prices = match record {
        Some(record) => {
            let (prices, shape_error) = price_material_or_zero(record, config.rounding_significance);
            if let Some(err) = shape_error {
                warn!(entry = %item.id, %err, "material rate variables malformed, pricing as zero");
                resolver.degraded.push(DegradedReason::MalformedRateVariables {
                    detail: err.to_string(),
                });
            }
            prices
        }
        None => {
            warn!(
                entry = %item.id,
                material_type = %item.material_type,
                material = ?item.material,
                "material not found, entry prices as zero"
            );
            resolver.degraded.push(DegradedReason::MaterialNotFound {
                material_type: item.material_type.clone(),
                material: item.material.clone(),
            });
            MaterialPriceResult::zero()
        }
    };
    if item.qty == 0 {
        resolver.degraded.push(DegradedReason::ZeroQuantity);
    }

    let sidedness = item
        .sidedness
        .as_deref()
        .unwrap_or_else(|| config.default_sidedness())
        .to_string();
    let (sides_tier, sides_cost_per_unit) = resolver.sides_tier(item, &sidedness, sqft_per_piece);
    let (finishing, finishing_price_per_unit) = resolver.finishing(item, sqft_per_piece);
    let cut_cost_per_unit = resolver.flat_cost(
        &config.cut_costs,
        OptionTable::CutCost,
        item.cut_option.as_deref(),
    );
    let additional_time_cost_per_unit = resolver.flat_cost(
        &config.additional_time_costs,
        OptionTable::AdditionalTime,
        item.additional_time_option.as_deref(),
    );
    let added_install_cost_per_unit = resolver.flat_cost(
        &config.added_install_costs,
        OptionTable::AddedInstall,
        item.added_install_option.as_deref(),
    );
    let print_adjustment = resolver.print_adjustment(item, order_adjustment, adjustments);

    let production_cost = production_cost_for(
        record,
        item.qty,
        config.additional_cost_constants().default_production_cost,
    );

    ResolvedLineItem {
        id: item.id.clone(),
        material_found: record.is_some(),
        costs: EntryCostInputs {
            qty: item.qty,
            sqft_per_piece,
            total_sqft: item.total_sqft(),
            sides_cost_per_unit,
            finishing_price_per_unit,
            cut_cost_per_unit,
            additional_time_cost_per_unit,
            added_install_cost_per_unit,
        },
        material_prices,
        production_cost,
        sidedness,
        sides_tier,
        finishing,
        print_adjustment,
        degraded: resolver.degraded,
    }
}

/// Prices a resolved entry for all three customer types.
///
/// `discount_percentages` is the selected volume tier's
/// `[preferred, corporate, wholesale]` triple.
pub fn price_all_customer_types(
    entry: &ResolvedLineItem,
    discount_percentages: [f64; 3],
    constants: &AdditionalCostConstants,
) -> BTreeMap<CustomerType, EntryBreakdown> {
    CustomerType::ALL
        .into_iter()
        .map(|customer_type| {
            let breakdown = if entry.material_found {
                let rates = EntryRates {
                    discount_pct: discount_percentages[customer_type.index()],
                    adjustment_pct: entry.print_adjustment.percentage,
                    multiplier: STABLE_ENTRY_MULTIPLIER,
                    production_cost: entry.production_cost,
                };
                price_entry(
                    &entry.costs,
                    customer_type,
                    entry.material_prices.base_for(customer_type),
                    &rates,
                    constants,
                )
            } else {
                EntryBreakdown::default()
            };
            (customer_type, breakdown)
        })
        .collect()
}
