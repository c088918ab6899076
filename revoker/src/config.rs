//! Configuration module for environment variable parsing.
//!
//! Loading never fails: blank or malformed values fall back to defaults so the
//! server can start and report incomplete configuration per request instead.

use std::collections::HashMap;
use std::env;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

pub const SHOPIFY_WEBHOOK_SECRET: &str = "SHOPIFY_WEBHOOK_SECRET";
pub const LEARNWORLDS_API_BASE: &str = "LEARNWORLDS_API_BASE";
pub const LEARNWORLDS_API_TOKEN: &str = "LEARNWORLDS_API_TOKEN";

/// Static SKU → course id mapping. Keys match exactly, case-sensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct SkuCourseMap(HashMap<String, String>);

impl SkuCourseMap {
    pub fn new(entries: HashMap<String, String>) -> Self {
        Self(entries)
    }

    /// Look up the course mapped to `sku`. Empty SKUs never match.
    pub fn course_for(&self, sku: &str) -> Option<&str> {
        if sku.is_empty() {
            return None;
        }
        self.0
            .get(sku)
            .map(String::as_str)
            .filter(|course| !course.is_empty())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SkuCourseMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Required settings are missing or blank.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Missing required env vars: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Shared secret Shopify signs webhook bodies with
    pub shopify_webhook_secret: String,

    /// LearnWorlds API base URL, without trailing slash
    pub learnworlds_api_base: String,

    /// LearnWorlds bearer token
    pub learnworlds_api_token: String,

    /// Optional LearnWorlds client id, sent as the `Lw-Client` header
    pub learnworlds_client_id: Option<String>,

    /// SKU → course id mapping
    pub sku_to_course_id: SkuCourseMap,

    /// HTTP request timeout in milliseconds for platform calls
    pub request_timeout_ms: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Config {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),

            shopify_webhook_secret: read_trimmed(SHOPIFY_WEBHOOK_SECRET),

            learnworlds_api_base: read_trimmed(LEARNWORLDS_API_BASE)
                .trim_end_matches('/')
                .to_string(),

            learnworlds_api_token: read_trimmed(LEARNWORLDS_API_TOKEN),

            learnworlds_client_id: env::var("LEARNWORLDS_CLIENT_ID")
                .ok()
                .filter(|v| !v.trim().is_empty()),

            sku_to_course_id: parse_sku_map("SKU_TO_COURSE_ID"),

            request_timeout_ms: env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(15_000),
        }
    }

    /// Names of required settings that are blank, in declaration order.
    pub fn missing_required(&self) -> Vec<&'static str> {
        [
            (SHOPIFY_WEBHOOK_SECRET, &self.shopify_webhook_secret),
            (LEARNWORLDS_API_BASE, &self.learnworlds_api_base),
            (LEARNWORLDS_API_TOKEN, &self.learnworlds_api_token),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    /// Check that every required setting is present.
    pub fn check_required(&self) -> Result<(), ConfigError> {
        let missing = self.missing_required();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Missing(missing))
        }
    }
}

/// Read an env var with surrounding whitespace (e.g. a trailing newline) removed.
fn read_trimmed(name: &str) -> String {
    env::var(name)
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

/// Parse a JSON object of string → string from an env var.
fn parse_sku_map(name: &str) -> SkuCourseMap {
    let raw = match env::var(name) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => return SkuCourseMap::default(),
    };

    match serde_json::from_str::<SkuCourseMap>(&raw) {
        Ok(map) => map,
        Err(e) => {
            warn!(env_var = name, error = %e, "Invalid SKU map JSON, using empty map");
            SkuCourseMap::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_config() -> Config {
        Config {
            port: 8080,
            shopify_webhook_secret: "secret".to_string(),
            learnworlds_api_base: "https://school.example.com/admin/api/v2".to_string(),
            learnworlds_api_token: "token".to_string(),
            learnworlds_client_id: None,
            sku_to_course_id: SkuCourseMap::default(),
            request_timeout_ms: 15_000,
        }
    }

    #[test]
    fn test_parse_sku_map_valid() {
        env::set_var("TEST_SKU_MAP_VALID", r#"{"ABC123": "C1", "abc123": "C2"}"#);
        let map = parse_sku_map("TEST_SKU_MAP_VALID");
        assert_eq!(map.len(), 2);
        assert_eq!(map.course_for("ABC123"), Some("C1"));
        assert_eq!(map.course_for("abc123"), Some("C2"));
        assert_eq!(map.course_for("Abc123"), None);
        env::remove_var("TEST_SKU_MAP_VALID");
    }

    #[test]
    fn test_read_trimmed_strips_newline() {
        env::set_var("TEST_TRIMMED_SECRET", "shpss_abc\n");
        assert_eq!(read_trimmed("TEST_TRIMMED_SECRET"), "shpss_abc");
        env::remove_var("TEST_TRIMMED_SECRET");
        assert_eq!(read_trimmed("TEST_TRIMMED_SECRET"), "");
    }

    #[test]
    fn test_parse_sku_map_malformed() {
        env::set_var("TEST_SKU_MAP_BAD", "{not json");
        assert!(parse_sku_map("TEST_SKU_MAP_BAD").is_empty());
        env::remove_var("TEST_SKU_MAP_BAD");
    }

    #[test]
    fn test_parse_sku_map_default() {
        assert!(parse_sku_map("NONEXISTENT_SKU_MAP").is_empty());
    }

    #[test]
    fn test_empty_sku_never_matches() {
        let map: SkuCourseMap = [("", "C1"), ("X", "")].into_iter().collect();
        assert_eq!(map.course_for(""), None);
        assert_eq!(map.course_for("X"), None);
    }

    #[test]
    fn test_check_required_complete() {
        assert_eq!(complete_config().check_required(), Ok(()));
    }

    #[test]
    fn test_check_required_lists_missing() {
        let config = Config {
            shopify_webhook_secret: "   ".to_string(),
            learnworlds_api_token: String::new(),
            ..complete_config()
        };

        let err = config.check_required().unwrap_err();
        assert_eq!(
            err,
            ConfigError::Missing(vec![SHOPIFY_WEBHOOK_SECRET, LEARNWORLDS_API_TOKEN])
        );
        assert_eq!(
            err.to_string(),
            "Missing required env vars: SHOPIFY_WEBHOOK_SECRET, LEARNWORLDS_API_TOKEN"
        );
    }
}
