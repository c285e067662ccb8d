mod analytics;
pub mod auth;
mod cart;
mod catalog;
mod error;
mod homepage;
mod jerseys;
mod orders;
mod policy;
mod sellers;
mod uploads;
mod validation;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Account routes; /me, /refresh, and /logout are marked authenticated in
    // the policy table, the rest are public
    let auth_routes = Router::new()
        .route("/signup", post(auth::signup))
        .route("/confirm", get(auth::confirm))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me));

    let api_routes = Router::new()
        // Catalog (public)
        .route("/jerseys", get(catalog::list_jerseys))
        .route("/jerseys/:id", get(catalog::get_jersey))
        .route("/homepage", get(catalog::homepage_feed))
        // Cart and checkout (buyer)
        .route("/cart", get(cart::list_cart).post(cart::add_to_cart))
        .route("/cart/:id", put(cart::update_cart_item).delete(cart::remove_cart_item))
        .route("/cart/checkout", post(orders::place_order))
        // Orders (buyer)
        .route("/orders", get(orders::list_my_orders))
        .route("/orders/:id", get(orders::get_order))
        .route("/orders/:id/payment", get(orders::payment_request))
        // Seller onboarding (any signed-in user)
        .route("/seller-requests", post(sellers::create_seller_request))
        // Seller dashboard
        .route("/seller/jerseys", get(jerseys::list_my_jerseys).post(jerseys::create_jersey))
        .route("/seller/jerseys/:id", put(jerseys::update_jersey).delete(jerseys::delete_jersey))
        .route("/seller/jerseys/:id/stock", get(jerseys::get_stock).put(jerseys::update_stock))
        .route("/seller/uploads", post(uploads::upload_images))
        .route("/seller/orders", get(orders::seller_orders))
        .route("/seller/orders/:id/status", put(orders::update_order_status_seller))
        .route("/seller/analytics", get(analytics::seller_analytics))
        // Admin dashboard
        .route("/admin/orders", get(orders::admin_orders))
        .route("/admin/orders/:id/status", put(orders::update_order_status_admin))
        .route("/admin/seller-requests", get(sellers::admin_list_seller_requests))
        .route("/admin/seller-requests/:id", put(sellers::review_seller_request))
        .route("/admin/jerseys/:id", delete(jerseys::admin_delete_jersey))
        .route("/admin/analytics", get(analytics::admin_analytics))
        .route(
            "/admin/homepage/sections",
            get(homepage::list_sections).post(homepage::create_section),
        )
        .route(
            "/admin/homepage/sections/:id",
            put(homepage::update_section).delete(homepage::delete_section),
        )
        .route(
            "/admin/homepage/sections/:id/products",
            post(homepage::add_section_product),
        )
        .route(
            "/admin/homepage/products/:id",
            delete(homepage::remove_section_product),
        );

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/auth", auth_routes)
        .nest("/api", api_routes)
        // Single authorization enforcement point for every route above
        .layer(middleware::from_fn_with_state(
            state.clone(),
            policy::authorize,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
