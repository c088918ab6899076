//! LearnWorlds API response shapes.
//!
//! Every list endpoint answers with a `{"data": [...]}` envelope. A response
//! without `data` is a decode error rather than an empty list.

use serde::Deserialize;

/// A LearnWorlds user.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlatformUser {
    pub id: String,
    #[serde(default)]
    pub email: String,
}

/// An enrollment linking a user to a course (product).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Enrollment {
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    pub product_id: String,
}

/// A course in the school catalog.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Course {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

/// `{"data": [...]}` list envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct DataEnvelope<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub meta: Option<PageMeta>,
}

/// Pagination metadata on catalog listings.
#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct PageMeta {
    #[serde(default = "first_page", rename = "totalPages")]
    pub total_pages: u32,
}

fn first_page() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enrollment_envelope() {
        let json = r#"{"data": [{"id": "e1", "user_id": "u1", "product_id": "C1"}]}"#;
        let parsed: DataEnvelope<Enrollment> = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.data[0].product_id, "C1");
        assert!(parsed.meta.is_none());
    }

    #[test]
    fn test_missing_data_is_an_error() {
        let json = r#"{"users": [{"id": "u1", "email": "a@example.com"}]}"#;
        assert!(serde_json::from_str::<DataEnvelope<PlatformUser>>(json).is_err());
    }

    #[test]
    fn test_page_meta() {
        let json = r#"{"data": [], "meta": {"page": 2, "totalPages": 3}}"#;
        let parsed: DataEnvelope<Course> = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.meta.unwrap().total_pages, 3);
    }
}
