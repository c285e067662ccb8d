//! Homepage shelf curation models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::jersey::JerseySummary;

/// Section kinds mirror the labels the curation UI offers; `custom` covers
/// everything else.
pub const SECTION_KINDS: &[&str] = &[
    "top-picks",
    "best-deals",
    "new-arrivals",
    "trending",
    "custom",
];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HomepageSection {
    pub id: String,
    pub title: String,
    pub kind: String,
    pub visible: bool,
    pub order_index: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HomepageProduct {
    pub id: String,
    pub section_id: String,
    pub jersey_id: String,
    pub order_index: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionProduct {
    pub id: String,
    pub jersey_id: String,
    pub order_index: i64,
    pub jersey: JerseySummary,
}

/// Section with its products expanded, ordered for display.
#[derive(Debug, Clone, Serialize)]
pub struct SectionWithProducts {
    pub id: String,
    pub title: String,
    pub kind: String,
    pub visible: bool,
    pub order_index: i64,
    pub products: Vec<SectionProduct>,
}

impl SectionWithProducts {
    pub fn from_parts(section: HomepageSection, products: Vec<SectionProduct>) -> Self {
        Self {
            id: section.id,
            title: section.title,
            kind: section.kind,
            visible: section.visible,
            order_index: section.order_index,
            products,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateSectionRequest {
    pub title: String,
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSectionRequest {
    pub title: Option<String>,
    pub visible: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct AddSectionProductRequest {
    pub jersey_id: String,
}
