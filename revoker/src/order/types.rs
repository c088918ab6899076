//! Shopify `orders/cancelled` webhook body.

use serde::Deserialize;

/// The only topic that triggers revocation.
pub const ORDERS_CANCELLED_TOPIC: &str = "orders/cancelled";

/// A cancelled order as delivered in the webhook body.
#[derive(Debug, Clone, Deserialize)]
pub struct CancellationEvent {
    /// Shopify order id
    pub id: u64,
    /// Purchaser email, may be null
    #[serde(default)]
    pub email: Option<String>,
    /// Customer sub-record, may be null or absent
    #[serde(default)]
    pub customer: Option<Customer>,
    /// Ordered line items
    #[serde(default)]
    pub line_items: Vec<LineItem>,
}

/// Customer record nested in an order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Customer {
    #[serde(default)]
    pub email: Option<String>,
}

/// A single order line.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub variant_id: Option<u64>,
    #[serde(default)]
    pub product_id: Option<u64>,
}

impl CancellationEvent {
    /// Purchaser email: the top-level field first, then the customer record.
    /// Blank values count as absent.
    pub fn purchaser_email(&self) -> Option<&str> {
        non_blank(self.email.as_deref()).or_else(|| {
            self.customer
                .as_ref()
                .and_then(|customer| non_blank(customer.email.as_deref()))
        })
    }
}

impl LineItem {
    /// SKU if present and non-empty.
    pub fn sku(&self) -> Option<&str> {
        self.sku.as_deref().filter(|sku| !sku.is_empty())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
