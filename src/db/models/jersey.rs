//! Jersey listing and per-size stock models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Jersey {
    pub id: String,
    pub seller_id: String,
    pub title: String,
    pub club: String,
    pub season: Option<String>,
    pub quality: String,
    /// Whole rupees.
    pub price: i64,
    /// JSON array of public image URLs, stored as text.
    pub image_url: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Jersey {
    /// Decode the stored image list. Older rows may hold a bare URL instead
    /// of a JSON array; treat those as a single-element list.
    pub fn image_urls(&self) -> Vec<String> {
        if let Ok(urls) = serde_json::from_str::<Vec<String>>(&self.image_url) {
            return urls;
        }
        if self.image_url.is_empty() {
            Vec::new()
        } else {
            vec![self.image_url.clone()]
        }
    }

    pub fn first_image(&self) -> Option<String> {
        self.image_urls().into_iter().next()
    }
}

/// One row per (jersey, size); stock is clamped at zero on every write path.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JerseyStock {
    pub id: String,
    pub jersey_id: String,
    pub size: String,
    pub stock: i64,
}

/// Size/quantity pair used both in create/update requests and responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizeStock {
    pub size: String,
    pub stock: i64,
}

/// Compact jersey view embedded in cart rows, order items, and homepage
/// shelves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JerseySummary {
    pub id: String,
    pub title: String,
    pub club: String,
    pub quality: String,
    pub price: i64,
    pub image_url: Option<String>,
}

impl From<&Jersey> for JerseySummary {
    fn from(jersey: &Jersey) -> Self {
        Self {
            id: jersey.id.clone(),
            title: jersey.title.clone(),
            club: jersey.club.clone(),
            quality: jersey.quality.clone(),
            price: jersey.price,
            image_url: jersey.first_image(),
        }
    }
}

/// Full jersey view for the product page, sizes ordered by size label.
#[derive(Debug, Clone, Serialize)]
pub struct JerseyDetail {
    pub id: String,
    pub seller_id: String,
    pub title: String,
    pub club: String,
    pub season: Option<String>,
    pub quality: String,
    pub price: i64,
    pub image_urls: Vec<String>,
    pub sizes: Vec<SizeStock>,
    pub created_at: String,
}

impl JerseyDetail {
    pub fn from_parts(jersey: Jersey, stock: Vec<JerseyStock>) -> Self {
        Self {
            image_urls: jersey.image_urls(),
            sizes: stock
                .into_iter()
                .map(|s| SizeStock {
                    size: s.size,
                    stock: s.stock,
                })
                .collect(),
            id: jersey.id,
            seller_id: jersey.seller_id,
            title: jersey.title,
            club: jersey.club,
            season: jersey.season,
            quality: jersey.quality,
            price: jersey.price,
            created_at: jersey.created_at,
        }
    }
}

/// Seller dashboard view of one listing.
#[derive(Debug, Clone, Serialize)]
pub struct SellerListing {
    pub id: String,
    pub title: String,
    pub club: String,
    pub quality: String,
    pub price: i64,
    pub image_url: Option<String>,
    pub sizes: Vec<SizeStock>,
    pub total_stock: i64,
    /// "active" while any size has stock, "out_of_stock" otherwise.
    pub status: &'static str,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateJerseyRequest {
    pub title: String,
    pub club: String,
    pub season: Option<String>,
    pub quality: String,
    pub price: i64,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<SizeStock>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateJerseyRequest {
    pub title: Option<String>,
    pub club: Option<String>,
    pub season: Option<String>,
    pub quality: Option<String>,
    pub price: Option<i64>,
    pub image_urls: Option<Vec<String>>,
}

/// Replaces the per-size stock of one listing.
#[derive(Debug, Deserialize)]
pub struct UpdateStockRequest {
    pub sizes: Vec<SizeStock>,
}

#[derive(Debug, Deserialize)]
pub struct ListJerseysParams {
    pub club: Option<String>,
    pub quality: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jersey_with_images(image_url: &str) -> Jersey {
        Jersey {
            id: "j1".to_string(),
            seller_id: "s1".to_string(),
            title: "Home Kit 2015".to_string(),
            club: "Barcelona".to_string(),
            season: Some("2015/16".to_string()),
            quality: "player-version".to_string(),
            price: 899,
            image_url: image_url.to_string(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_image_urls_json_array() {
        let jersey = jersey_with_images(r#"["https://a/1.jpg","https://a/2.jpg"]"#);
        assert_eq!(jersey.image_urls().len(), 2);
        assert_eq!(jersey.first_image().unwrap(), "https://a/1.jpg");
    }

    #[test]
    fn test_image_urls_bare_string() {
        let jersey = jersey_with_images("https://a/only.jpg");
        assert_eq!(jersey.image_urls(), vec!["https://a/only.jpg".to_string()]);
    }

    #[test]
    fn test_image_urls_empty() {
        let jersey = jersey_with_images("");
        assert!(jersey.image_urls().is_empty());
        assert!(jersey.first_image().is_none());
    }
}
