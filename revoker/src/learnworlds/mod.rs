//! LearnWorlds learning-platform integration.
//!
//! The handler depends only on the [`LearningPlatform`] trait; the reqwest
//! backed [`LearnWorldsClient`] is the production implementation.

pub mod client;
pub mod types;

use std::collections::BTreeSet;

use async_trait::async_trait;
use thiserror::Error;

pub use client::LearnWorldsClient;
pub use types::{Course, Enrollment, PlatformUser};

/// A failed call to the learning platform.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("LearnWorlds request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LearnWorlds returned {status} for {endpoint}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Invalid LearnWorlds URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Unexpected LearnWorlds response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Operations the webhook handler needs from the learning platform.
#[async_trait]
pub trait LearningPlatform: Send + Sync {
    /// Find the user registered with `email`, if any.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<PlatformUser>, PlatformError>;

    /// List every enrollment the user currently holds.
    async fn list_user_enrollments(&self, user_id: &str) -> Result<Vec<Enrollment>, PlatformError>;

    /// Delete a single enrollment.
    async fn unenroll_enrollment(&self, enrollment_id: &str) -> Result<(), PlatformError>;

    /// Resolve course ids whose title matches one of `names`, ignoring case.
    async fn find_product_ids_by_names(
        &self,
        names: &BTreeSet<String>,
    ) -> Result<BTreeSet<String>, PlatformError>;
}
