//! Pricing engine: rate tables, lookups and the entry and order formulas.

pub mod entities;
pub mod line_item;
pub mod material_pricing;
pub mod order;
pub mod rate_config;
pub mod tiers;

pub use entities::{
    CustomerType, DegradedReason, EntryQuote, FeetInches, LineItemInput, MaterialPriceResult,
    OptionTable, OrderTotals,
};
pub use line_item::{
    price_all_customer_types, price_entry, resolve_line_item, EntryBreakdown, EntryCostInputs,
    EntryRates, ResolvedLineItem,
};
pub use material_pricing::{
    ceil_to_significance, dynamic_production_cost, floor_to_significance, price_material,
    price_material_or_zero, DynamicProductionCost,
};
pub use order::{aggregate, QuoteRequest};
pub use rate_config::{
    AdditionalCostConstants, FinishingRate, LabeledTable, MaterialRecord, RateConfiguration,
    RateShapeError,
};
pub use tiers::{
    banner_mesh_tier, multiplier_for, print_adjustment_options, suggested_discount_tier,
    suggested_finishing_type, suggested_sides_tier, AdjustmentSelection, DiscountTierSelection,
    MultiplierSelection,
};
