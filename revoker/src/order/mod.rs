//! Shopify order payloads.
//!
//! Only the fields needed to resolve entitlements and identify the purchaser
//! are modeled; everything else in the webhook body is ignored.

pub mod types;

pub use types::{CancellationEvent, Customer, LineItem, ORDERS_CANCELLED_TOPIC};
