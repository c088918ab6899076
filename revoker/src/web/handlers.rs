//! Webhook endpoint handlers.
//!
//! The Shopify handler walks a fixed sequence of checks. Each check either
//! advances or ends the request with a response:
//! 1. Method and configuration
//! 2. Signature over the raw body
//! 3. Topic filter, payload parse, purchaser email
//! 4. Entitlement resolution
//! 5. User lookup, enrollment listing, revocation
//!
//! Expected no-op outcomes answer 200 so Shopify does not redeliver.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{HeaderMap, Method, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::entitlement::{resolve_target_courses, TargetCourseSet};
use crate::learnworlds::{LearningPlatform, PlatformError};
use crate::order::{CancellationEvent, ORDERS_CANCELLED_TOPIC};
use crate::web::signature::{
    verify_shopify_webhook, RejectReason, HEADER_HMAC, HEADER_SHOP_DOMAIN, HEADER_TOPIC,
    HEADER_WEBHOOK_ID,
};
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub platform: Arc<dyn LearningPlatform>,
}

impl AppState {
    pub fn new(config: Config, platform: Arc<dyn LearningPlatform>) -> Self {
        Self {
            config: Arc::new(config),
            platform,
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Shopify Webhook
// =============================================================================

/// Webhook response body.
///
/// Successful outcomes carry `ok` plus either `message` or
/// `unenrolled_count`; failures carry only `error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ok: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unenrolled_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WebhookResponse {
    /// Handled without side effects.
    pub fn acknowledged(message: impl Into<String>) -> Self {
        Self {
            ok: Some(true),
            message: Some(message.into()),
            unenrolled_count: None,
            error: None,
        }
    }

    /// Revocation finished.
    pub fn unenrolled(count: usize) -> Self {
        Self {
            ok: Some(true),
            message: None,
            unenrolled_count: Some(count),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            ok: None,
            message: None,
            unenrolled_count: None,
            error: Some(message.into()),
        }
    }
}

type WebhookReply = (StatusCode, Json<WebhookResponse>);

fn reply(status: StatusCode, body: WebhookResponse) -> WebhookReply {
    (status, Json(body))
}

/// Result of the remote part of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevokeOutcome {
    UserNotFound,
    Unenrolled(usize),
}

/// Shopify webhook endpoint.
///
/// Routed for every method so that non-POST requests get a JSON 405.
pub async fn shopify_webhook(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> WebhookReply {
    if method != Method::POST {
        warn!(method = %method, "shopify_webhook_method_not_allowed");
        return reply(
            StatusCode::METHOD_NOT_ALLOWED,
            WebhookResponse::error("Method Not Allowed"),
        );
    }

    if let Err(e) = state.config.check_required() {
        error!(error = %e, "shopify_webhook_config_incomplete");
        return reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            WebhookResponse::error(e.to_string()),
        );
    }

    let topic = header_str(&headers, HEADER_TOPIC).unwrap_or_default();

    info!(
        topic = topic,
        shop_domain = header_str(&headers, HEADER_SHOP_DOMAIN).unwrap_or_default(),
        webhook_id = header_str(&headers, HEADER_WEBHOOK_ID).unwrap_or_default(),
        has_signature = headers.contains_key(HEADER_HMAC),
        "shopify_webhook_received"
    );

    let verified = body
        .map_err(|rejection| RejectReason::Internal(rejection.body_text()))
        .and_then(|raw| {
            verify_shopify_webhook(
                &raw,
                headers.get(HEADER_HMAC).map(|v| v.as_bytes()),
                &state.config.shopify_webhook_secret,
            )
            .map(|()| raw)
        });

    let raw_body = match verified {
        Ok(raw) => raw,
        Err(reason) => {
            warn!(reason = %reason, "shopify_webhook_unauthorized");
            return reply(
                StatusCode::UNAUTHORIZED,
                WebhookResponse::error(reason.to_string()),
            );
        }
    };

    if topic != ORDERS_CANCELLED_TOPIC {
        info!(topic = topic, "shopify_webhook_topic_ignored");
        return reply(
            StatusCode::OK,
            WebhookResponse::acknowledged("Ignored non-cancelled topic"),
        );
    }

    let order: CancellationEvent = match serde_json::from_slice(&raw_body) {
        Ok(order) => order,
        Err(e) => {
            warn!(error = %e, body_length = raw_body.len(), "shopify_webhook_invalid_json");
            return reply(StatusCode::BAD_REQUEST, WebhookResponse::error("Invalid JSON"));
        }
    };

    let Some(email) = order.purchaser_email() else {
        info!(order_id = order.id, "shopify_order_without_email");
        return reply(
            StatusCode::OK,
            WebhookResponse::acknowledged("No customer email on order"),
        );
    };

    let resolution = match resolve_target_courses(
        &order.line_items,
        &state.config.sku_to_course_id,
        state.platform.as_ref(),
    )
    .await
    {
        Ok(resolution) => resolution,
        Err(e) => return platform_failure(order.id, e),
    };

    let Some(courses) = resolution.courses() else {
        info!(
            order_id = order.id,
            line_items = order.line_items.len(),
            "shopify_order_without_mapped_courses"
        );
        return reply(
            StatusCode::OK,
            WebhookResponse::acknowledged("No mapped SKUs to course IDs"),
        );
    };

    info!(
        order_id = order.id,
        source = resolution.source(),
        course_count = courses.len(),
        "shopify_order_courses_resolved"
    );

    match revoke_enrollments(state.platform.as_ref(), email, courses).await {
        Ok(RevokeOutcome::UserNotFound) => {
            info!(order_id = order.id, "learnworlds_user_not_found");
            reply(
                StatusCode::OK,
                WebhookResponse::acknowledged("User not found in LearnWorlds"),
            )
        }
        Ok(RevokeOutcome::Unenrolled(count)) => {
            info!(order_id = order.id, unenrolled_count = count, "unenroll_complete");
            reply(StatusCode::OK, WebhookResponse::unenrolled(count))
        }
        Err(e) => platform_failure(order.id, e),
    }
}

/// Look up the purchaser and delete each enrollment in `courses`.
///
/// Deletions run one at a time in listing order. A failure stops the loop;
/// enrollments already deleted stay deleted.
pub async fn revoke_enrollments(
    platform: &dyn LearningPlatform,
    email: &str,
    courses: &TargetCourseSet,
) -> Result<RevokeOutcome, PlatformError> {
    let Some(user) = platform.find_user_by_email(email).await? else {
        return Ok(RevokeOutcome::UserNotFound);
    };

    let targeted: Vec<_> = platform
        .list_user_enrollments(&user.id)
        .await?
        .into_iter()
        .filter(|enrollment| courses.contains(&enrollment.product_id))
        .collect();

    for (done, enrollment) in targeted.iter().enumerate() {
        if let Err(e) = platform.unenroll_enrollment(&enrollment.id).await {
            error!(
                user_id = %user.id,
                enrollment_id = %enrollment.id,
                already_removed = done,
                "unenroll_failed"
            );
            return Err(e);
        }
    }

    Ok(RevokeOutcome::Unenrolled(targeted.len()))
}

fn platform_failure(order_id: u64, e: PlatformError) -> WebhookReply {
    error!(order_id = order_id, error = %e, "learnworlds_call_failed");
    reply(
        StatusCode::INTERNAL_SERVER_ERROR,
        WebhookResponse::error(e.to_string()),
    )
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
