//! Quote pricing for print and signage line items.
//!
//! [`domain`] holds the engine, a set of pure functions over an immutable
//! [`RateConfiguration`]. [`infra`] loads and reloads that configuration.

pub mod domain;
pub mod infra;
pub mod util;

pub use domain::{
    aggregate, CustomerType, EntryQuote, FeetInches, LineItemInput, OrderTotals, QuoteRequest,
    RateConfiguration,
};
pub use infra::{ConfigError, ConfigHandle, ConfigSource};
