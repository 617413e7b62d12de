//! Order aggregation: combines every line item into one [`OrderTotals`].
//!
//! Preferred customers are charged the sum of their entry totals. Corporate and
//! wholesale customers are charged from the order subtotal: material net value
//! plus add-ons, discounted and adjusted per entry, then scaled once by the
//! order-wide multiplier.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::entities::{
    CustomerType, DegradedReason, EntryQuote, LineItemInput, OptionTable, OrderTotals,
};
use super::line_item::{price_all_customer_types, resolve_line_item, ResolvedLineItem};
use super::rate_config::RateConfiguration;
use super::tiers::{
    multiplier_for, print_adjustment_options, suggested_discount_tier, DiscountTierSelection,
};

/// Everything the aggregator needs besides the rate tables.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QuoteRequest {
    #[serde(default)]
    pub customer_type: CustomerType,
    #[serde(default)]
    pub line_items: Vec<LineItemInput>,
    /// Volume discount tier label; the suggested tier is used when absent.
    /// Entries naming their own tier override it.
    #[serde(default)]
    pub discount_tier: Option<String>,
    /// Order-wide print adjustment label; the suggested adjustment is used when absent.
    #[serde(default)]
    pub print_adjustment: Option<String>,
}

impl QuoteRequest {
    pub fn new(customer_type: CustomerType, line_items: Vec<LineItemInput>) -> Self {
        Self {
            customer_type,
            line_items,
            discount_tier: None,
            print_adjustment: None,
        }
    }

    pub fn with_discount_tier(mut self, label: impl Into<String>) -> Self {
        self.discount_tier = Some(label.into());
        self
    }

    pub fn with_print_adjustment(mut self, label: impl Into<String>) -> Self {
        self.print_adjustment = Some(label.into());
        self
    }

    pub fn total_sqft(&self) -> f64 {
        self.line_items.iter().map(LineItemInput::total_sqft).sum()
    }
}

/// Tier named by `label`, or `fallback` when there is no label. An unknown
/// label is reported in `degraded` and also gets `fallback`.
fn select_discount_tier(
    label: Option<&str>,
    fallback: impl FnOnce() -> DiscountTierSelection,
    config: &RateConfiguration,
    degraded: &mut Vec<DegradedReason>,
) -> DiscountTierSelection {
    let Some(label) = label else {
        return fallback();
    };
    match config.discount_tier_by_label(label) {
        Some((min_sqft, tier)) => DiscountTierSelection::from_tier(min_sqft, tier),
        None => {
            warn!(label, "unknown discount tier, using the fallback tier");
            degraded.push(DegradedReason::UnknownOption {
                table: OptionTable::DiscountTier,
                label: label.to_string(),
            });
            fallback()
        }
    }
}

/// Number of entries per material name, for the per-material multiplier display.
fn entries_per_material(items: &[LineItemInput]) -> BTreeMap<&str, usize> {
    let mut counts = BTreeMap::new();
    for name in items.iter().filter_map(|item| item.material.as_deref()) {
        *counts.entry(name).or_insert(0) += 1;
    }
    counts
}

/// Corporate and wholesale contribution of one entry before the order multiplier.
fn subtotal_contribution(
    entry: &ResolvedLineItem,
    customer_type: CustomerType,
    discount_pct: f64,
) -> f64 {
    if !entry.material_found || entry.costs.qty == 0 {
        return 0.0;
    }
    let material = entry.costs.total_sqft * entry.material_prices.net_for(customer_type);
    let addons = entry.costs.addon_unit_cost() * f64::from(entry.costs.qty);
    (material + addons) * (1.0 - discount_pct) * (1.0 + entry.print_adjustment.percentage)
}

/// Prices a whole quote for the request's customer type.
///
/// Never fails: missing materials and unknown labels contribute zero and are
/// listed in the `degraded` fields of the result.
pub fn aggregate(request: &QuoteRequest, config: &RateConfiguration) -> OrderTotals {
    let customer_type = request.customer_type;
    let mut degraded = Vec::new();

    let order_sqft = request.total_sqft();
    let discount_tier = select_discount_tier(
        request.discount_tier.as_deref(),
        || suggested_discount_tier(order_sqft, &config.volume_discount_tiers),
        config,
        &mut degraded,
    );
    let discount_pct = discount_tier.percentage_for(customer_type);
    let multiplier = multiplier_for(request.line_items.len(), &config.quantity_multipliers);

    let adjustments = print_adjustment_options(order_sqft, config);
    let print_adjustment = match request.print_adjustment.as_deref() {
        Some(label) => adjustments.select(label).unwrap_or_else(|| {
            warn!(label, "unknown print adjustment, using the suggested adjustment");
            degraded.push(DegradedReason::UnknownOption {
                table: OptionTable::PrintAdjustment,
                label: label.to_string(),
            });
            adjustments.suggested.clone()
        }),
        None => adjustments.suggested.clone(),
    };

    let constants = config.additional_cost_constants();
    let per_material = entries_per_material(&request.line_items);

    let mut entries = Vec::with_capacity(request.line_items.len());
    let mut total_base_price = 0.0;
    let mut total_addon_cost = 0.0;
    let mut entry_sum = 0.0;
    let mut subtotal = 0.0;

    for item in &request.line_items {
        let mut resolved = resolve_line_item(item, config, &print_adjustment, &adjustments.options);
        let entry_tier = select_discount_tier(
            item.discount_tier.as_deref(),
            || discount_tier.clone(),
            config,
            &mut resolved.degraded,
        );
        let breakdowns = price_all_customer_types(&resolved, entry_tier.percentages, &constants);
        let prices: BTreeMap<CustomerType, f64> = breakdowns
            .iter()
            .map(|(customer, breakdown)| (*customer, breakdown.entry_total))
            .collect();

        let addon_cost = if resolved.material_found {
            resolved.costs.addon_unit_cost() * f64::from(resolved.costs.qty)
        } else {
            0.0
        };
        total_addon_cost += addon_cost;
        total_base_price +=
            resolved.costs.total_sqft * resolved.material_prices.net_for(customer_type);
        entry_sum += prices.get(&customer_type).copied().unwrap_or_default();
        subtotal += subtotal_contribution(
            &resolved,
            customer_type,
            entry_tier.percentage_for(customer_type),
        );

        let material_count = item
            .material
            .as_deref()
            .and_then(|name| per_material.get(name))
            .copied()
            .unwrap_or(0);

        entries.push(EntryQuote {
            id: resolved.id,
            qty: resolved.costs.qty,
            sqft_per_piece: resolved.costs.sqft_per_piece,
            total_sqft: resolved.costs.total_sqft,
            sidedness: resolved.sidedness,
            sides_tier: resolved.sides_tier,
            finishing: resolved.finishing,
            material_prices: resolved.material_prices,
            production_cost: resolved.production_cost,
            discount_tier: entry_tier,
            print_adjustment: resolved.print_adjustment,
            material_multiplier: multiplier_for(material_count, &config.quantity_multipliers),
            addon_cost,
            prices,
            degraded: resolved.degraded,
        });
    }

    let grand_total = match customer_type {
        CustomerType::Preferred => entry_sum,
        CustomerType::Corporate | CustomerType::Wholesale => subtotal * multiplier.factor,
    };

    info!(
        customer = %customer_type,
        entries = entries.len(),
        order_sqft,
        discount_tier = %discount_tier.label,
        multiplier = multiplier.factor,
        grand_total,
        "aggregated quote"
    );

    OrderTotals {
        customer_type,
        entry_count: entries.len(),
        total_sqft: order_sqft,
        total_base_price,
        total_addon_cost,
        discount_tier,
        discount_pct,
        print_adjustment,
        multiplier,
        entries,
        grand_total,
        degraded,
    }
}
