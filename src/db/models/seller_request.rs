//! Seller onboarding request models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApprovalStatus::Pending => write!(f, "pending"),
            ApprovalStatus::Approved => write!(f, "approved"),
            ApprovalStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for ApprovalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ApprovalStatus::Pending),
            "approved" => Ok(ApprovalStatus::Approved),
            "rejected" => Ok(ApprovalStatus::Rejected),
            _ => Err(format!("Unknown approval status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SellerRequest {
    pub id: String,
    pub user_id: String,
    pub full_name: String,
    pub phone_number: String,
    pub email: String,
    pub instagram_link: Option<String>,
    pub whatsapp_number: Option<String>,
    pub store_name: String,
    pub years_in_business: Option<i64>,
    pub address: String,
    pub approval_status: String,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateSellerRequestRequest {
    pub full_name: String,
    pub phone_number: String,
    pub email: String,
    pub instagram_link: Option<String>,
    pub whatsapp_number: Option<String>,
    pub store_name: String,
    pub years_in_business: Option<i64>,
    pub address: String,
}

/// Admin decision on a pending request.
#[derive(Debug, Deserialize)]
pub struct ReviewSellerRequestRequest {
    pub action: ReviewAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewAction {
    Approve,
    Reject,
}

#[derive(Debug, Deserialize)]
pub struct ListSellerRequestsParams {
    pub status: Option<String>,
}
