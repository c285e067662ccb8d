//! Order placement, order management, and payment request links.
//!
//! Checkout and cancellation are single transactions: an order either lands
//! with its items, stock decrements, and cart cleanup all applied, or not at
//! all. Checkout is idempotent per client-generated request id, so a retried
//! call can never double-charge stock.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sqlx::Sqlite;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{
    CartItem, CheckoutRequest, Jersey, JerseySummary, ListOrdersParams, Order, OrderItem,
    OrderItemDetail, OrderResponse, OrderStatus, PaymentRequestResponse, ShippingDetails,
    UpdateOrderStatusRequest, User,
};
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{
    validate_email, validate_phone, validate_pincode, validate_required_text, validate_uuid,
};

fn validate_shipping(shipping: &ShippingDetails) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Err(e) = validate_required_text(&shipping.full_name, "Full name", 100) {
        errors.add("full_name", e);
    }
    if let Err(e) = validate_email(&shipping.email) {
        errors.add("email", e);
    }
    if let Err(e) = validate_phone(&shipping.phone) {
        errors.add("phone", e);
    }
    if let Err(e) = validate_required_text(&shipping.address, "Address", 500) {
        errors.add("address", e);
    }
    if let Err(e) = validate_required_text(&shipping.city, "City", 100) {
        errors.add("city", e);
    }
    if let Err(e) = validate_required_text(&shipping.state, "State", 100) {
        errors.add("state", e);
    }
    if let Err(e) = validate_pincode(&shipping.pincode) {
        errors.add("pincode", e);
    }

    errors.finish()
}

/// Place an order from the selected cart rows.
///
/// The whole placement runs in one transaction keyed by the client's
/// `request_id`: replays return the already-created order untouched.
pub async fn place_order(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(req): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    if let Err(e) = validate_uuid(&req.request_id, "request_id") {
        return Err(ApiError::validation_field("request_id", e));
    }
    validate_shipping(&req.shipping)?;
    if req.item_ids.is_empty() {
        return Err(ApiError::validation_field("item_ids", "No items selected"));
    }

    let mut seen = std::collections::HashSet::new();
    let item_ids: Vec<&String> = req
        .item_ids
        .iter()
        .filter(|id| seen.insert(id.as_str()))
        .collect();

    let mut tx = state.db.begin().await?;

    // Replay of an already-processed checkout
    let existing: Option<Order> =
        sqlx::query_as("SELECT * FROM orders WHERE user_id = ? AND request_id = ?")
            .bind(&user.id)
            .bind(&req.request_id)
            .fetch_optional(&mut *tx)
            .await?;
    if let Some(order) = existing {
        drop(tx);
        let items = load_order_items(&state, &order.id, None).await?;
        return Ok((StatusCode::OK, Json(OrderResponse::from_parts(order, items))));
    }

    // Resolve the selected cart rows; they must all belong to the caller
    let mut cart_rows: Vec<(CartItem, Jersey)> = Vec::new();
    for &item_id in &item_ids {
        let item: Option<CartItem> =
            sqlx::query_as("SELECT * FROM cart_items WHERE id = ? AND user_id = ?")
                .bind(item_id)
                .bind(&user.id)
                .fetch_optional(&mut *tx)
                .await?;
        let item = item.ok_or_else(|| ApiError::not_found("Cart item not found"))?;

        let jersey: Option<Jersey> = sqlx::query_as("SELECT * FROM jerseys WHERE id = ?")
            .bind(&item.jersey_id)
            .fetch_optional(&mut *tx)
            .await?;
        let jersey =
            jersey.ok_or_else(|| ApiError::conflict("A selected jersey is no longer available"))?;

        cart_rows.push((item, jersey));
    }

    let total_amount: i64 = cart_rows
        .iter()
        .map(|(item, jersey)| jersey.price * item.quantity)
        .sum();

    let order_id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    let shipping_json = serde_json::to_string(&req.shipping)
        .map_err(|e| ApiError::internal(format!("Failed to encode shipping details: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO orders (id, user_id, request_id, total_amount, status, payment_status, shipping_address, created_at, updated_at)
        VALUES (?, ?, ?, ?, 'pending', 'pending', ?, ?, ?)
        "#,
    )
    .bind(&order_id)
    .bind(&user.id)
    .bind(&req.request_id)
    .bind(total_amount)
    .bind(&shipping_json)
    .bind(&now)
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    for (item, jersey) in &cart_rows {
        sqlx::query(
            "INSERT INTO order_items (id, order_id, jersey_id, size, quantity, price) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&order_id)
        .bind(&item.jersey_id)
        .bind(&item.size)
        .bind(item.quantity)
        .bind(jersey.price)
        .execute(&mut *tx)
        .await?;

        // Clamp at zero rather than going negative; a missing stock row is
        // tolerated and skipped
        sqlx::query(
            "UPDATE jersey_stock SET stock = MAX(0, stock - ?) WHERE jersey_id = ? AND size = ?",
        )
        .bind(item.quantity)
        .bind(&item.jersey_id)
        .bind(&item.size)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM cart_items WHERE id = ?")
            .bind(&item.id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    tracing::info!(
        "Order {} placed by {} for {} item(s), total {}",
        order_id,
        user.email,
        cart_rows.len(),
        total_amount
    );

    let order: Order = sqlx::query_as("SELECT * FROM orders WHERE id = ?")
        .bind(&order_id)
        .fetch_one(&state.db)
        .await?;
    let items = load_order_items(&state, &order_id, None).await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderResponse::from_parts(order, items)),
    ))
}

/// Load an order's items with jersey summaries; with a seller filter, only
/// that seller's items are returned.
async fn load_order_items(
    state: &AppState,
    order_id: &str,
    seller_id: Option<&str>,
) -> Result<Vec<OrderItemDetail>, ApiError> {
    let items =
        sqlx::query_as::<_, OrderItem>("SELECT * FROM order_items WHERE order_id = ?")
            .bind(order_id)
            .fetch_all(&state.db)
            .await?;

    let mut details = Vec::new();
    for item in items {
        let jersey = sqlx::query_as::<_, Jersey>("SELECT * FROM jerseys WHERE id = ?")
            .bind(&item.jersey_id)
            .fetch_optional(&state.db)
            .await?;

        if let Some(seller_id) = seller_id {
            match &jersey {
                Some(j) if j.seller_id == seller_id => {}
                _ => continue,
            }
        }

        details.push(OrderItemDetail {
            id: item.id,
            jersey_id: item.jersey_id,
            size: item.size,
            quantity: item.quantity,
            price: item.price,
            jersey: jersey.as_ref().map(JerseySummary::from),
        });
    }

    Ok(details)
}

/// Buyer order history.
pub async fn list_my_orders(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE user_id = ? ORDER BY created_at DESC",
    )
    .bind(&user.id)
    .fetch_all(&state.db)
    .await?;

    let mut responses = Vec::new();
    for order in orders {
        let items = load_order_items(&state, &order.id, None).await?;
        responses.push(OrderResponse::from_parts(order, items));
    }

    Ok(Json(responses))
}

async fn owned_order(state: &AppState, user: &User, id: &str) -> Result<Order, ApiError> {
    if let Err(e) = validate_uuid(id, "order_id") {
        return Err(ApiError::validation_field("order_id", e));
    }

    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Order not found"))?;

    if order.user_id != user.id {
        return Err(ApiError::not_found("Order not found"));
    }

    Ok(order)
}

pub async fn get_order(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = owned_order(&state, &user, &id).await?;
    let items = load_order_items(&state, &order.id, None).await?;
    Ok(Json(OrderResponse::from_parts(order, items)))
}

/// Build the UPI deep link a payment page renders as a QR code.
fn build_upi_uri(vpa: &str, payee_name: &str, amount: i64, note: &str) -> String {
    format!(
        "upi://pay?pa={}&pn={}&am={}&cu=INR&tn={}",
        vpa,
        urlencoding::encode(payee_name),
        amount,
        urlencoding::encode(note)
    )
}

/// Static payment-request data for an order. There is no payment callback;
/// completion stays a user-asserted step.
pub async fn payment_request(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<PaymentRequestResponse>, ApiError> {
    let order = owned_order(&state, &user, &id).await?;

    let short_id: String = order.id.chars().take(8).collect();
    let note = format!("Jersey Central order {}", short_id);
    let payment = &state.config.payment;

    Ok(Json(PaymentRequestResponse {
        upi_uri: build_upi_uri(&payment.upi_vpa, &payment.payee_name, order.total_amount, &note),
        order_id: order.id,
        amount: order.total_amount,
        currency: "INR",
        payee_vpa: payment.upi_vpa.clone(),
        payee_name: payment.payee_name.clone(),
        note,
    }))
}

/// Orders containing at least one of the seller's jerseys, with only the
/// seller's items expanded.
pub async fn seller_orders(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = sqlx::query_as::<_, Order>(
        r#"
        SELECT DISTINCT o.* FROM orders o
        JOIN order_items oi ON oi.order_id = o.id
        JOIN jerseys j ON j.id = oi.jersey_id
        WHERE j.seller_id = ?
        ORDER BY o.created_at DESC
        "#,
    )
    .bind(&user.id)
    .fetch_all(&state.db)
    .await?;

    let mut responses = Vec::new();
    for order in orders {
        let items = load_order_items(&state, &order.id, Some(&user.id)).await?;
        responses.push(OrderResponse::from_parts(order, items));
    }

    Ok(Json(responses))
}

/// Platform-wide order list for the admin dashboard.
pub async fn admin_orders(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListOrdersParams>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let status_filter = match &params.status {
        Some(raw) => Some(
            raw.parse::<OrderStatus>()
                .map_err(|e| ApiError::validation_field("status", e))?,
        ),
        None => None,
    };

    let orders = match status_filter {
        Some(status) => {
            sqlx::query_as::<_, Order>(
                "SELECT * FROM orders WHERE status = ? ORDER BY created_at DESC",
            )
            .bind(status.to_string())
            .fetch_all(&state.db)
            .await?
        }
        None => {
            sqlx::query_as::<_, Order>("SELECT * FROM orders ORDER BY created_at DESC")
                .fetch_all(&state.db)
                .await?
        }
    };

    let mut responses = Vec::new();
    for order in orders {
        let items = load_order_items(&state, &order.id, None).await?;
        responses.push(OrderResponse::from_parts(order, items));
    }

    Ok(Json(responses))
}

/// Put every item's quantity back on the matching stock row, creating rows
/// that have since disappeared.
async fn restore_stock(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    order_id: &str,
) -> Result<(), ApiError> {
    let items =
        sqlx::query_as::<_, OrderItem>("SELECT * FROM order_items WHERE order_id = ?")
            .bind(order_id)
            .fetch_all(&mut **tx)
            .await?;

    for item in items {
        let updated = sqlx::query(
            "UPDATE jersey_stock SET stock = stock + ? WHERE jersey_id = ? AND size = ?",
        )
        .bind(item.quantity)
        .bind(&item.jersey_id)
        .bind(&item.size)
        .execute(&mut **tx)
        .await?;

        if updated.rows_affected() == 0 {
            sqlx::query(
                "INSERT INTO jersey_stock (id, jersey_id, size, stock) VALUES (?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&item.jersey_id)
            .bind(&item.size)
            .bind(item.quantity)
            .execute(&mut **tx)
            .await?;
        }
    }

    Ok(())
}

/// Apply a status change. The restock on cancellation happens in the same
/// transaction, and only on the first transition into cancelled.
async fn transition_status(
    state: &AppState,
    order_id: &str,
    new_status: OrderStatus,
) -> Result<Order, ApiError> {
    let mut tx = state.db.begin().await?;

    let order: Order = sqlx::query_as("SELECT * FROM orders WHERE id = ?")
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ApiError::not_found("Order not found"))?;

    let was_cancelled = order.status_enum() == Some(OrderStatus::Cancelled);
    if new_status == OrderStatus::Cancelled && !was_cancelled {
        restore_stock(&mut tx, order_id).await?;
    }

    sqlx::query("UPDATE orders SET status = ?, updated_at = ? WHERE id = ?")
        .bind(new_status.to_string())
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(order_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    let order: Order = sqlx::query_as("SELECT * FROM orders WHERE id = ?")
        .bind(order_id)
        .fetch_one(&state.db)
        .await?;

    tracing::info!("Order {} moved to {}", order_id, new_status);
    Ok(order)
}

/// Seller status transition; the order must contain the seller's items.
pub async fn update_order_status_seller(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
    Json(req): Json<UpdateOrderStatusRequest>,
) -> Result<Json<Order>, ApiError> {
    if let Err(e) = validate_uuid(&id, "order_id") {
        return Err(ApiError::validation_field("order_id", e));
    }
    let new_status: OrderStatus = req
        .status
        .parse()
        .map_err(|e| ApiError::validation_field("status", e))?;

    let involvement: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM order_items oi
        JOIN jerseys j ON j.id = oi.jersey_id
        WHERE oi.order_id = ? AND j.seller_id = ?
        "#,
    )
    .bind(&id)
    .bind(&user.id)
    .fetch_one(&state.db)
    .await?;
    if involvement.0 == 0 {
        return Err(ApiError::not_found("Order not found"));
    }

    let order = transition_status(&state, &id, new_status).await?;
    Ok(Json(order))
}

/// Admin status transition over any order.
pub async fn update_order_status_admin(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateOrderStatusRequest>,
) -> Result<Json<Order>, ApiError> {
    if let Err(e) = validate_uuid(&id, "order_id") {
        return Err(ApiError::validation_field("order_id", e));
    }
    let new_status: OrderStatus = req
        .status
        .parse()
        .map_err(|e| ApiError::validation_field("status", e))?;

    let order = transition_status(&state, &id, new_status).await?;
    Ok(Json(order))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::{connect_in_memory, DbPool};

    async fn test_state() -> Arc<AppState> {
        let db = connect_in_memory().await;
        Arc::new(AppState::new(Config::default(), db, None))
    }

    async fn seed_user(db: &DbPool, email: &str, role: &str) -> User {
        let now = chrono::Utc::now().to_rfc3339();
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            password_hash: String::new(),
            full_name: "Test User".to_string(),
            role: role.to_string(),
            email_verified: true,
            created_at: now.clone(),
            updated_at: now,
        };
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, full_name, role, email_verified, created_at, updated_at) VALUES (?, ?, ?, ?, ?, 1, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(&user.role)
        .bind(&user.created_at)
        .bind(&user.updated_at)
        .execute(db)
        .await
        .unwrap();
        user
    }

    async fn seed_jersey(db: &DbPool, seller_id: &str, title: &str, price: i64) -> String {
        let id = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO jerseys (id, seller_id, title, club, season, quality, price, image_url, created_at, updated_at) VALUES (?, ?, ?, 'Test FC', NULL, 'fan-version', ?, '[]', ?, ?)",
        )
        .bind(&id)
        .bind(seller_id)
        .bind(title)
        .bind(price)
        .bind(&now)
        .bind(&now)
        .execute(db)
        .await
        .unwrap();
        id
    }

    async fn set_stock(db: &DbPool, jersey_id: &str, size: &str, stock: i64) {
        sqlx::query(
            "INSERT INTO jersey_stock (id, jersey_id, size, stock) VALUES (?, ?, ?, ?) ON CONFLICT (jersey_id, size) DO UPDATE SET stock = excluded.stock",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(jersey_id)
        .bind(size)
        .bind(stock)
        .execute(db)
        .await
        .unwrap();
    }

    async fn stock_of(db: &DbPool, jersey_id: &str, size: &str) -> Option<i64> {
        sqlx::query_as::<_, (i64,)>(
            "SELECT stock FROM jersey_stock WHERE jersey_id = ? AND size = ?",
        )
        .bind(jersey_id)
        .bind(size)
        .fetch_optional(db)
        .await
        .unwrap()
        .map(|r| r.0)
    }

    async fn add_cart(db: &DbPool, user_id: &str, jersey_id: &str, size: &str, qty: i64) -> String {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO cart_items (id, user_id, jersey_id, size, quantity, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(user_id)
        .bind(jersey_id)
        .bind(size)
        .bind(qty)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(db)
        .await
        .unwrap();
        id
    }

    fn shipping() -> ShippingDetails {
        ShippingDetails {
            full_name: "Ravi Kumar".to_string(),
            email: "ravi@example.com".to_string(),
            phone: "+919876543210".to_string(),
            address: "12 MG Road".to_string(),
            city: "Bengaluru".to_string(),
            state: "Karnataka".to_string(),
            pincode: "560001".to_string(),
        }
    }

    fn checkout_request(item_ids: Vec<String>) -> CheckoutRequest {
        CheckoutRequest {
            request_id: Uuid::new_v4().to_string(),
            item_ids,
            shipping: shipping(),
        }
    }

    #[tokio::test]
    async fn test_checkout_totals_items_and_stock() {
        let state = test_state().await;
        let seller = seed_user(&state.db, "seller@example.com", "seller").await;
        let buyer = seed_user(&state.db, "buyer@example.com", "buyer").await;

        let jersey_a = seed_jersey(&state.db, &seller.id, "Jersey A", 500).await;
        let jersey_b = seed_jersey(&state.db, &seller.id, "Jersey B", 300).await;
        set_stock(&state.db, &jersey_a, "M", 10).await;
        set_stock(&state.db, &jersey_b, "L", 5).await;

        let item_a = add_cart(&state.db, &buyer.id, &jersey_a, "M", 2).await;
        let item_b = add_cart(&state.db, &buyer.id, &jersey_b, "L", 1).await;

        let (status, Json(order)) = place_order(
            State(state.clone()),
            buyer.clone(),
            Json(checkout_request(vec![item_a, item_b])),
        )
        .await
        .unwrap();

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(order.total_amount, 1300);
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.status, "pending");
        assert_eq!(stock_of(&state.db, &jersey_a, "M").await, Some(8));
        assert_eq!(stock_of(&state.db, &jersey_b, "L").await, Some(4));

        // The ordered cart rows are gone
        let remaining: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM cart_items WHERE user_id = ?")
                .bind(&buyer.id)
                .fetch_one(&state.db)
                .await
                .unwrap();
        assert_eq!(remaining.0, 0);
    }

    #[tokio::test]
    async fn test_checkout_clamps_stock_at_zero() {
        let state = test_state().await;
        let seller = seed_user(&state.db, "seller@example.com", "seller").await;
        let buyer = seed_user(&state.db, "buyer@example.com", "buyer").await;

        let jersey = seed_jersey(&state.db, &seller.id, "Scarce Kit", 700).await;
        set_stock(&state.db, &jersey, "S", 1).await;
        let item = add_cart(&state.db, &buyer.id, &jersey, "S", 3).await;

        let (_, Json(order)) = place_order(
            State(state.clone()),
            buyer,
            Json(checkout_request(vec![item])),
        )
        .await
        .unwrap();

        assert_eq!(order.total_amount, 2100);
        // Stock floors at zero instead of going to -2
        assert_eq!(stock_of(&state.db, &jersey, "S").await, Some(0));
    }

    #[tokio::test]
    async fn test_checkout_replay_is_idempotent() {
        let state = test_state().await;
        let seller = seed_user(&state.db, "seller@example.com", "seller").await;
        let buyer = seed_user(&state.db, "buyer@example.com", "buyer").await;

        let jersey = seed_jersey(&state.db, &seller.id, "Jersey A", 500).await;
        set_stock(&state.db, &jersey, "M", 10).await;
        let item = add_cart(&state.db, &buyer.id, &jersey, "M", 2).await;

        let req = checkout_request(vec![item]);
        let request_id = req.request_id.clone();

        let (first_status, Json(first)) =
            place_order(State(state.clone()), buyer.clone(), Json(req))
                .await
                .unwrap();
        assert_eq!(first_status, StatusCode::CREATED);

        // Same request id again, e.g. a client retry after a lost response
        let replay = CheckoutRequest {
            request_id,
            item_ids: vec!["ignored".to_string()],
            shipping: shipping(),
        };
        let (replay_status, Json(second)) =
            place_order(State(state.clone()), buyer, Json(replay))
                .await
                .unwrap();

        assert_eq!(replay_status, StatusCode::OK);
        assert_eq!(second.id, first.id);
        assert_eq!(stock_of(&state.db, &jersey, "M").await, Some(8));

        let order_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders")
            .fetch_one(&state.db)
            .await
            .unwrap();
        assert_eq!(order_count.0, 1);
    }

    #[tokio::test]
    async fn test_checkout_rejects_blank_shipping_fields() {
        let state = test_state().await;
        let buyer = seed_user(&state.db, "buyer@example.com", "buyer").await;

        let mut req = checkout_request(vec![Uuid::new_v4().to_string()]);
        req.shipping.pincode = String::new();
        req.shipping.city = "  ".to_string();

        let err = place_order(State(state.clone()), buyer, Json(req))
            .await
            .unwrap_err();
        let msg = format!("{}", err);
        assert!(msg.contains("validation_error"), "got: {}", msg);
    }

    #[tokio::test]
    async fn test_checkout_rolls_back_on_foreign_cart_item() {
        let state = test_state().await;
        let seller = seed_user(&state.db, "seller@example.com", "seller").await;
        let buyer = seed_user(&state.db, "buyer@example.com", "buyer").await;
        let other = seed_user(&state.db, "other@example.com", "buyer").await;

        let jersey = seed_jersey(&state.db, &seller.id, "Jersey A", 500).await;
        set_stock(&state.db, &jersey, "M", 10).await;
        let mine = add_cart(&state.db, &buyer.id, &jersey, "M", 1).await;
        let theirs = add_cart(&state.db, &other.id, &jersey, "M", 1).await;

        let err = place_order(
            State(state.clone()),
            buyer,
            Json(checkout_request(vec![mine.clone(), theirs])),
        )
        .await
        .unwrap_err();
        assert!(format!("{}", err).contains("not_found"));

        // Nothing was applied: no order, stock untouched, cart intact
        let order_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders")
            .fetch_one(&state.db)
            .await
            .unwrap();
        assert_eq!(order_count.0, 0);
        assert_eq!(stock_of(&state.db, &jersey, "M").await, Some(10));
        let still_there: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM cart_items WHERE id = ?")
                .bind(&mine)
                .fetch_one(&state.db)
                .await
                .unwrap();
        assert_eq!(still_there.0, 1);
    }

    #[tokio::test]
    async fn test_cancellation_restores_stock_once() {
        let state = test_state().await;
        let seller = seed_user(&state.db, "seller@example.com", "seller").await;
        let buyer = seed_user(&state.db, "buyer@example.com", "buyer").await;

        let jersey = seed_jersey(&state.db, &seller.id, "Jersey A", 500).await;
        set_stock(&state.db, &jersey, "M", 10).await;
        let item = add_cart(&state.db, &buyer.id, &jersey, "M", 2).await;

        let (_, Json(order)) = place_order(
            State(state.clone()),
            buyer,
            Json(checkout_request(vec![item])),
        )
        .await
        .unwrap();
        assert_eq!(stock_of(&state.db, &jersey, "M").await, Some(8));

        let Json(cancelled) = update_order_status_seller(
            State(state.clone()),
            seller.clone(),
            Path(order.id.clone()),
            Json(UpdateOrderStatusRequest {
                status: "cancelled".to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(cancelled.status, "cancelled");
        assert_eq!(stock_of(&state.db, &jersey, "M").await, Some(10));

        // Cancelling again must not restock a second time
        update_order_status_seller(
            State(state.clone()),
            seller,
            Path(order.id.clone()),
            Json(UpdateOrderStatusRequest {
                status: "cancelled".to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(stock_of(&state.db, &jersey, "M").await, Some(10));
    }

    #[tokio::test]
    async fn test_cancellation_recreates_missing_stock_row() {
        let state = test_state().await;
        let seller = seed_user(&state.db, "seller@example.com", "seller").await;
        let buyer = seed_user(&state.db, "buyer@example.com", "buyer").await;

        let jersey = seed_jersey(&state.db, &seller.id, "Jersey A", 500).await;
        set_stock(&state.db, &jersey, "M", 5).await;
        let item = add_cart(&state.db, &buyer.id, &jersey, "M", 2).await;

        let (_, Json(order)) = place_order(
            State(state.clone()),
            buyer,
            Json(checkout_request(vec![item])),
        )
        .await
        .unwrap();

        // The seller retired the size in the meantime
        sqlx::query("DELETE FROM jersey_stock WHERE jersey_id = ? AND size = 'M'")
            .bind(&jersey)
            .execute(&state.db)
            .await
            .unwrap();

        update_order_status_seller(
            State(state.clone()),
            seller,
            Path(order.id.clone()),
            Json(UpdateOrderStatusRequest {
                status: "cancelled".to_string(),
            }),
        )
        .await
        .unwrap();

        assert_eq!(stock_of(&state.db, &jersey, "M").await, Some(2));
    }

    #[tokio::test]
    async fn test_seller_cannot_touch_unrelated_order() {
        let state = test_state().await;
        let seller = seed_user(&state.db, "seller@example.com", "seller").await;
        let outsider = seed_user(&state.db, "other-seller@example.com", "seller").await;
        let buyer = seed_user(&state.db, "buyer@example.com", "buyer").await;

        let jersey = seed_jersey(&state.db, &seller.id, "Jersey A", 500).await;
        set_stock(&state.db, &jersey, "M", 5).await;
        let item = add_cart(&state.db, &buyer.id, &jersey, "M", 1).await;

        let (_, Json(order)) = place_order(
            State(state.clone()),
            buyer,
            Json(checkout_request(vec![item])),
        )
        .await
        .unwrap();

        let err = update_order_status_seller(
            State(state.clone()),
            outsider,
            Path(order.id.clone()),
            Json(UpdateOrderStatusRequest {
                status: "confirmed".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert!(format!("{}", err).contains("not_found"));
    }

    #[tokio::test]
    async fn test_status_rejects_unknown_vocabulary() {
        let state = test_state().await;
        let err = update_order_status_admin(
            State(state),
            Path(Uuid::new_v4().to_string()),
            Json(UpdateOrderStatusRequest {
                status: "fulfilled".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert!(format!("{}", err).contains("validation_error"));
    }

    #[test]
    fn test_upi_uri_encodes_payee_and_note() {
        let uri = build_upi_uri("store@upi", "Jersey Central", 1300, "Jersey Central order 1a2b3c4d");
        assert_eq!(
            uri,
            "upi://pay?pa=store@upi&pn=Jersey%20Central&am=1300&cu=INR&tn=Jersey%20Central%20order%201a2b3c4d"
        );
    }
}
