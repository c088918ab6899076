//! Web server module for handling inbound Shopify webhooks.
//!
//! This module provides:
//! - Signature verification over the raw request body
//! - The order-cancellation handler that revokes LearnWorlds enrollments
//! - A health endpoint

pub mod handlers;
pub mod signature;

use axum::{
    routing::{any, get},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{
    health, revoke_enrollments, shopify_webhook, AppState, HealthResponse, RevokeOutcome,
    WebhookResponse,
};
pub use signature::{compute_signature, verify_shopify_webhook, RejectReason};

/// Path Shopify delivers webhooks to.
pub const WEBHOOK_PATH: &str = "/api/shopify-webhook";

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(WEBHOOK_PATH, any(shopify_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
