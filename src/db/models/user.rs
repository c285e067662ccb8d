//! User, role, and session models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Platform roles. Sellers and admins are regular users whose role was
/// upgraded (seller via an approved request, admin via bootstrap config).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Buyer,
    Seller,
    Admin,
}

impl Role {
    /// Sellers manage their own listings and orders; admins can do the same
    /// plus platform-wide oversight.
    pub fn can_sell(&self) -> bool {
        matches!(self, Role::Seller | Role::Admin)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Buyer => write!(f, "buyer"),
            Role::Seller => write!(f, "seller"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "buyer" => Ok(Role::Buyer),
            "seller" => Ok(Role::Seller),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub role: String,
    pub email_verified: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    /// Parse the stored role, defaulting to buyer for anything unrecognized.
    pub fn role_enum(&self) -> Role {
        self.role.parse().unwrap_or(Role::Buyer)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub token_hash: String,
    pub expires_at: String,
    pub created_at: String,
}

/// Pending email confirmation. The raw token is only ever in the mailed link;
/// the table holds its SHA-256 hash.
#[derive(Debug, Clone, FromRow)]
pub struct EmailVerification {
    pub id: String,
    pub user_id: String,
    pub token_hash: String,
    pub expires_at: String,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!("seller".parse::<Role>(), Ok(Role::Seller));
        assert_eq!("ADMIN".parse::<Role>(), Ok(Role::Admin));
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_capabilities() {
        assert!(!Role::Buyer.can_sell());
        assert!(Role::Seller.can_sell());
        assert!(Role::Admin.can_sell());
        assert!(Role::Admin.is_admin());
        assert!(!Role::Seller.is_admin());
    }
}
