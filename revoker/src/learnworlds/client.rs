//! reqwest implementation of [`LearningPlatform`] against the LearnWorlds REST API.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{info, warn};
use url::Url;

use super::types::{Course, DataEnvelope, Enrollment, PlatformUser};
use super::{LearningPlatform, PlatformError};
use crate::Config;

/// Longest error body excerpt carried in [`PlatformError::Status`].
const ERROR_BODY_LIMIT: usize = 300;

/// LearnWorlds API client.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct LearnWorldsClient {
    http: Client,
    base_url: String,
    token: String,
    client_id: Option<String>,
}

impl LearnWorldsClient {
    /// Create a client for `base_url` authenticating with `token`.
    pub fn new(
        base_url: &str,
        token: &str,
        client_id: Option<String>,
        timeout: Duration,
    ) -> Result<Self, PlatformError> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            client_id,
        })
    }

    /// Create a client from the platform settings in `config`.
    pub fn from_config(config: &Config) -> Result<Self, PlatformError> {
        Self::new(
            &config.learnworlds_api_base,
            &config.learnworlds_api_token,
            config.learnworlds_client_id.clone(),
            Duration::from_millis(config.request_timeout_ms),
        )
    }

    /// Build `{base}/{segments...}` with each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, PlatformError> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request
            .bearer_auth(&self.token)
            .header("Accept", "application/json");

        match &self.client_id {
            Some(id) => request.header("Lw-Client", id),
            None => request,
        }
    }

    async fn get_list<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<DataEnvelope<T>, PlatformError> {
        let endpoint = url.path().to_string();
        let response = self
            .authorize(self.http.get(url))
            .query(query)
            .send()
            .await?;
        let response = ensure_success(&endpoint, response).await?;
        let bytes = response.bytes().await?;

        serde_json::from_slice(&bytes).map_err(|source| PlatformError::Decode { endpoint, source })
    }
}

/// Turn a non-2xx response into [`PlatformError::Status`].
async fn ensure_success(endpoint: &str, response: Response) -> Result<Response, PlatformError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let mut body = response.text().await.unwrap_or_default();
    if body.len() > ERROR_BODY_LIMIT {
        let mut cut = ERROR_BODY_LIMIT;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }

    warn!(
        endpoint = endpoint,
        status_code = status.as_u16(),
        "learnworlds_request_failed"
    );

    Err(PlatformError::Status {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        body,
    })
}

fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

#[async_trait]
impl LearningPlatform for LearnWorldsClient {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<PlatformUser>, PlatformError> {
        let url = self.endpoint(&["users"])?;
        let users = self
            .get_list::<PlatformUser>(url, &[("email", email.to_string())])
            .await?
            .data;

        info!(match_count = users.len(), "learnworlds_user_lookup_complete");

        Ok(users.into_iter().next())
    }

    async fn list_user_enrollments(&self, user_id: &str) -> Result<Vec<Enrollment>, PlatformError> {
        let url = self.endpoint(&["users", user_id, "enrollments"])?;
        let enrollments = self.get_list::<Enrollment>(url, &[]).await?.data;

        info!(
            user_id = user_id,
            enrollment_count = enrollments.len(),
            "learnworlds_enrollments_listed"
        );

        Ok(enrollments)
    }

    async fn unenroll_enrollment(&self, enrollment_id: &str) -> Result<(), PlatformError> {
        let url = self.endpoint(&["enrollments", enrollment_id])?;
        let endpoint = url.path().to_string();

        let response = self.authorize(self.http.delete(url)).send().await?;
        ensure_success(&endpoint, response).await?;

        info!(enrollment_id = enrollment_id, "learnworlds_enrollment_deleted");

        Ok(())
    }

    async fn find_product_ids_by_names(
        &self,
        names: &BTreeSet<String>,
    ) -> Result<BTreeSet<String>, PlatformError> {
        let wanted: BTreeSet<String> = names
            .iter()
            .map(|name| normalize_title(name))
            .filter(|name| !name.is_empty())
            .collect();

        let mut found = BTreeSet::new();
        if wanted.is_empty() {
            return Ok(found);
        }

        let mut page = 1;
        loop {
            let url = self.endpoint(&["courses"])?;
            let listing = self
                .get_list::<Course>(url, &[("page", page.to_string())])
                .await?;

            found.extend(
                listing
                    .data
                    .into_iter()
                    .filter(|course| wanted.contains(&normalize_title(&course.title)))
                    .map(|course| course.id),
            );

            let total_pages = listing.meta.map(|meta| meta.total_pages).unwrap_or(page);
            if page >= total_pages {
                break;
            }
            page += 1;
        }

        info!(
            title_count = wanted.len(),
            pages_walked = page,
            matched_courses = found.len(),
            "learnworlds_title_lookup_complete"
        );

        Ok(found)
    }
}
