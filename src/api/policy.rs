//! Route authorization: one policy table, one enforcement point.
//!
//! Every protected subtree is listed here and nowhere else. The middleware
//! resolves the longest matching prefix for the request path and rejects
//! before any handler runs; handlers only use the `User` extractor for
//! identity and ownership scoping, never for role checks.

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use std::sync::Arc;

use crate::db::Role;
use crate::AppState;

use super::auth::{extract_token, get_current_user};
use super::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    Public,
    /// Any signed-in user.
    Authenticated,
    /// Sellers and admins.
    Seller,
    /// Admins only.
    Admin,
}

impl RouteAccess {
    pub fn permits(&self, role: Role) -> bool {
        match self {
            RouteAccess::Public | RouteAccess::Authenticated => true,
            RouteAccess::Seller => role.can_sell(),
            RouteAccess::Admin => role.is_admin(),
        }
    }
}

/// The route→required-role table. Prefixes are segment-aligned; paths not
/// covered by any entry are public.
const POLICY: &[(&str, RouteAccess)] = &[
    ("/api/admin", RouteAccess::Admin),
    ("/api/seller", RouteAccess::Seller),
    ("/api/seller-requests", RouteAccess::Authenticated),
    ("/api/cart", RouteAccess::Authenticated),
    ("/api/orders", RouteAccess::Authenticated),
    ("/api/auth/me", RouteAccess::Authenticated),
    ("/api/auth/refresh", RouteAccess::Authenticated),
    ("/api/auth/logout", RouteAccess::Authenticated),
];

/// True when `path` equals `prefix` or sits beneath it as a path segment;
/// `/api/seller-requests` is NOT beneath `/api/seller`.
fn matches_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Resolve the access requirement for a request path.
pub fn required_access(path: &str) -> RouteAccess {
    POLICY
        .iter()
        .filter(|(prefix, _)| matches_prefix(path, prefix))
        .max_by_key(|(prefix, _)| prefix.len())
        .map(|(_, access)| *access)
        .unwrap_or(RouteAccess::Public)
}

/// The single enforcement point, applied once at the router root.
pub async fn authorize(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let access = required_access(request.uri().path());
    if access == RouteAccess::Public {
        return Ok(next.run(request).await);
    }

    let token = extract_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;
    let user = get_current_user(&state.db, &state.config, &token).await?;

    if !access.permits(user.role_enum()) {
        return Err(ApiError::forbidden(
            "You do not have access to this resource",
        ));
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_and_seller_subtrees() {
        assert_eq!(required_access("/api/admin/orders"), RouteAccess::Admin);
        assert_eq!(required_access("/api/admin"), RouteAccess::Admin);
        assert_eq!(
            required_access("/api/seller/jerseys/abc/stock"),
            RouteAccess::Seller
        );
    }

    #[test]
    fn test_seller_requests_is_not_under_seller() {
        // "/api/seller-requests" shares a string prefix with "/api/seller"
        // but is its own route: any signed-in buyer may apply.
        assert_eq!(
            required_access("/api/seller-requests"),
            RouteAccess::Authenticated
        );
    }

    #[test]
    fn test_buyer_routes_require_login_only() {
        assert_eq!(required_access("/api/cart"), RouteAccess::Authenticated);
        assert_eq!(
            required_access("/api/orders/xyz/payment"),
            RouteAccess::Authenticated
        );
    }

    #[test]
    fn test_everything_else_is_public() {
        assert_eq!(required_access("/api/jerseys"), RouteAccess::Public);
        assert_eq!(required_access("/api/homepage"), RouteAccess::Public);
        assert_eq!(required_access("/api/auth/login"), RouteAccess::Public);
        assert_eq!(required_access("/health"), RouteAccess::Public);
    }

    #[test]
    fn test_permits_matrix() {
        assert!(!RouteAccess::Seller.permits(Role::Buyer));
        assert!(RouteAccess::Seller.permits(Role::Seller));
        assert!(RouteAccess::Seller.permits(Role::Admin));
        assert!(!RouteAccess::Admin.permits(Role::Seller));
        assert!(RouteAccess::Admin.permits(Role::Admin));
        assert!(RouteAccess::Authenticated.permits(Role::Buyer));
    }
}
