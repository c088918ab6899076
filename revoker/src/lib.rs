//! Enrollment revoker - Shopify cancellations to LearnWorlds unenrollments.
//!
//! When Shopify reports a cancelled order, the webhook handler verifies the
//! signature, works out which courses the order granted, and deletes the
//! purchaser's matching LearnWorlds enrollments.
//!
//! ## Flow
//!
//! ```text
//! Shopify → verify HMAC → parse order → resolve courses → find user → unenroll
//! ```

pub mod config;
pub mod entitlement;
pub mod learnworlds;
pub mod order;
pub mod web;

// Re-export commonly used types
pub use config::{Config, ConfigError, SkuCourseMap};
pub use entitlement::{resolve_target_courses, Resolution, TargetCourseSet};
pub use learnworlds::{LearnWorldsClient, LearningPlatform, PlatformError};
pub use order::{CancellationEvent, LineItem};
pub use web::{router, AppState};
