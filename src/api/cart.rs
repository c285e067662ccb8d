//! Cart endpoints, scoped to the session user.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{
    AddCartItemRequest, CartItem, CartItemResponse, Jersey, JerseyStock, JerseySummary,
    UpdateCartItemRequest, User,
};
use crate::AppState;

use super::error::ApiError;
use super::validation::{validate_quantity, validate_size, validate_uuid};

/// List the caller's cart with jersey details.
pub async fn list_cart(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<Vec<CartItemResponse>>, ApiError> {
    let items = sqlx::query_as::<_, CartItem>(
        "SELECT * FROM cart_items WHERE user_id = ? ORDER BY created_at DESC",
    )
    .bind(&user.id)
    .fetch_all(&state.db)
    .await?;

    let mut responses = Vec::new();
    for item in items {
        let jersey = sqlx::query_as::<_, Jersey>("SELECT * FROM jerseys WHERE id = ?")
            .bind(&item.jersey_id)
            .fetch_optional(&state.db)
            .await?;
        // Rows whose jersey was deleted are dropped from the view
        if let Some(jersey) = jersey {
            responses.push(CartItemResponse {
                id: item.id,
                jersey_id: item.jersey_id,
                size: item.size,
                quantity: item.quantity,
                jersey: JerseySummary::from(&jersey),
            });
        }
    }

    Ok(Json(responses))
}

/// Add a jersey/size to the cart. Re-adding the same size merges quantities.
pub async fn add_to_cart(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(req): Json<AddCartItemRequest>,
) -> Result<(StatusCode, Json<CartItem>), ApiError> {
    if let Err(e) = validate_uuid(&req.jersey_id, "jersey_id") {
        return Err(ApiError::validation_field("jersey_id", e));
    }
    if let Err(e) = validate_size(&req.size) {
        return Err(ApiError::validation_field("size", e));
    }
    if let Err(e) = validate_quantity(req.quantity) {
        return Err(ApiError::validation_field("quantity", e));
    }

    let jersey = sqlx::query_as::<_, Jersey>("SELECT * FROM jerseys WHERE id = ?")
        .bind(&req.jersey_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Jersey not found"))?;

    // The size must be offered and in stock to enter a cart
    let stock = sqlx::query_as::<_, JerseyStock>(
        "SELECT * FROM jersey_stock WHERE jersey_id = ? AND size = ?",
    )
    .bind(&jersey.id)
    .bind(&req.size)
    .fetch_optional(&state.db)
    .await?;
    match stock {
        Some(row) if row.stock > 0 => {}
        _ => {
            return Err(ApiError::conflict(format!(
                "Size {} is out of stock",
                req.size
            )))
        }
    }

    let item = sqlx::query_as::<_, CartItem>(
        r#"
        INSERT INTO cart_items (id, user_id, jersey_id, size, quantity, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT (user_id, jersey_id, size)
        DO UPDATE SET quantity = cart_items.quantity + excluded.quantity
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&user.id)
    .bind(&req.jersey_id)
    .bind(&req.size)
    .bind(req.quantity)
    .bind(chrono::Utc::now().to_rfc3339())
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_cart_item(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
    Json(req): Json<UpdateCartItemRequest>,
) -> Result<Json<CartItem>, ApiError> {
    if let Err(e) = validate_quantity(req.quantity) {
        return Err(ApiError::validation_field("quantity", e));
    }

    let result = sqlx::query("UPDATE cart_items SET quantity = ? WHERE id = ? AND user_id = ?")
        .bind(req.quantity)
        .bind(&id)
        .bind(&user.id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Cart item not found"));
    }

    let item = sqlx::query_as::<_, CartItem>("SELECT * FROM cart_items WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;

    Ok(Json(item))
}

pub async fn remove_cart_item(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let result = sqlx::query("DELETE FROM cart_items WHERE id = ? AND user_id = ?")
        .bind(&id)
        .bind(&user.id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Cart item not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}
