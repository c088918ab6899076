//! Entitlement resolution: which courses does a cancelled order revoke?
//!
//! SKU mappings are authoritative. Titles are only sent to the platform when
//! no line item carries a mapped SKU.

use std::collections::BTreeSet;

use tracing::info;

use crate::config::SkuCourseMap;
use crate::learnworlds::{LearningPlatform, PlatformError};
use crate::order::LineItem;

/// Deduplicated course ids targeted by one order.
pub type TargetCourseSet = BTreeSet<String>;

/// Outcome of resolving an order's line items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// At least one SKU mapped through the static table.
    Sku(TargetCourseSet),
    /// No SKU mapped; courses were found by title.
    Title(TargetCourseSet),
    /// Nothing to revoke.
    NoMapping,
}

impl Resolution {
    /// The resolved course ids, `None` for [`Resolution::NoMapping`].
    pub fn courses(&self) -> Option<&TargetCourseSet> {
        match self {
            Resolution::Sku(courses) | Resolution::Title(courses) => Some(courses),
            Resolution::NoMapping => None,
        }
    }

    pub fn source(&self) -> &'static str {
        match self {
            Resolution::Sku(_) => "sku",
            Resolution::Title(_) => "title",
            Resolution::NoMapping => "none",
        }
    }
}

/// Map line items to course ids through the static SKU table only.
pub fn courses_from_skus(items: &[LineItem], sku_map: &SkuCourseMap) -> TargetCourseSet {
    items
        .iter()
        .filter_map(|item| item.sku())
        .filter_map(|sku| sku_map.course_for(sku))
        .map(str::to_string)
        .collect()
}

/// Distinct trimmed, non-empty titles across all line items.
pub fn fallback_titles(items: &[LineItem]) -> BTreeSet<String> {
    items
        .iter()
        .map(|item| item.title.trim())
        .filter(|title| !title.is_empty())
        .map(str::to_string)
        .collect()
}

/// Resolve the courses an order entitles its purchaser to.
///
/// The title lookup is a remote call and only happens when the SKU table
/// yields nothing.
pub async fn resolve_target_courses(
    items: &[LineItem],
    sku_map: &SkuCourseMap,
    platform: &dyn LearningPlatform,
) -> Result<Resolution, PlatformError> {
    let by_sku = courses_from_skus(items, sku_map);
    if !by_sku.is_empty() {
        info!(course_count = by_sku.len(), "entitlements_resolved_by_sku");
        return Ok(Resolution::Sku(by_sku));
    }

    let titles = fallback_titles(items);
    if titles.is_empty() {
        return Ok(Resolution::NoMapping);
    }

    let by_title: TargetCourseSet = platform
        .find_product_ids_by_names(&titles)
        .await?
        .into_iter()
        .filter(|course| !course.is_empty())
        .collect();

    info!(
        title_count = titles.len(),
        course_count = by_title.len(),
        "entitlements_resolved_by_title"
    );

    if by_title.is_empty() {
        Ok(Resolution::NoMapping)
    } else {
        Ok(Resolution::Title(by_title))
    }
}
