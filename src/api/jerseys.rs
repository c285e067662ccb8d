//! Seller listing management: create/update/delete jerseys and adjust
//! per-size stock.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{
    CreateJerseyRequest, Jersey, JerseyDetail, JerseyStock, SellerListing, SizeStock,
    UpdateJerseyRequest, UpdateStockRequest, User,
};
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{
    validate_label, validate_price, validate_size, validate_stock, validate_title, validate_uuid,
};

fn validate_create_request(req: &CreateJerseyRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Err(e) = validate_title(&req.title) {
        errors.add("title", e);
    }
    if let Err(e) = validate_label(&req.club, "Club") {
        errors.add("club", e);
    }
    if let Err(e) = validate_label(&req.quality, "Quality") {
        errors.add("quality", e);
    }
    if let Err(e) = validate_price(req.price) {
        errors.add("price", e);
    }

    let mut seen = std::collections::HashSet::new();
    for entry in &req.sizes {
        if let Err(e) = validate_size(&entry.size) {
            errors.add("sizes", e);
        } else if !seen.insert(entry.size.clone()) {
            errors.add("sizes", format!("Duplicate size '{}'", entry.size));
        }
        if let Err(e) = validate_stock(entry.stock) {
            errors.add("sizes", e);
        }
    }

    errors.finish()
}

/// List the seller's own jerseys with stock totals for the dashboard.
pub async fn list_my_jerseys(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<Vec<SellerListing>>, ApiError> {
    let jerseys = sqlx::query_as::<_, Jersey>(
        "SELECT * FROM jerseys WHERE seller_id = ? ORDER BY created_at DESC",
    )
    .bind(&user.id)
    .fetch_all(&state.db)
    .await?;

    let mut listings = Vec::new();
    for jersey in jerseys {
        let stock = sqlx::query_as::<_, JerseyStock>(
            "SELECT * FROM jersey_stock WHERE jersey_id = ? ORDER BY size",
        )
        .bind(&jersey.id)
        .fetch_all(&state.db)
        .await?;

        let total_stock: i64 = stock.iter().map(|s| s.stock).sum();
        listings.push(SellerListing {
            id: jersey.id.clone(),
            title: jersey.title.clone(),
            club: jersey.club.clone(),
            quality: jersey.quality.clone(),
            price: jersey.price,
            image_url: jersey.first_image(),
            sizes: stock
                .into_iter()
                .map(|s| SizeStock {
                    size: s.size,
                    stock: s.stock,
                })
                .collect(),
            total_stock,
            status: if total_stock > 0 {
                "active"
            } else {
                "out_of_stock"
            },
            created_at: jersey.created_at,
        });
    }

    Ok(Json(listings))
}

/// Create a listing together with its initial stock rows. Sizes with zero
/// stock are skipped, matching how listings are drafted.
pub async fn create_jersey(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(req): Json<CreateJerseyRequest>,
) -> Result<(StatusCode, Json<JerseyDetail>), ApiError> {
    validate_create_request(&req)?;

    let id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    let image_url = serde_json::to_string(&req.image_urls)
        .map_err(|e| ApiError::internal(format!("Failed to encode image list: {}", e)))?;

    let mut tx = state.db.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO jerseys (id, seller_id, title, club, season, quality, price, image_url, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&user.id)
    .bind(req.title.trim())
    .bind(req.club.trim())
    .bind(&req.season)
    .bind(req.quality.trim())
    .bind(req.price)
    .bind(&image_url)
    .bind(&now)
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    for entry in req.sizes.iter().filter(|s| s.stock > 0) {
        sqlx::query(
            "INSERT INTO jersey_stock (id, jersey_id, size, stock) VALUES (?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&id)
        .bind(&entry.size)
        .bind(entry.stock)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    let jersey = sqlx::query_as::<_, Jersey>("SELECT * FROM jerseys WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;
    let stock = sqlx::query_as::<_, JerseyStock>(
        "SELECT * FROM jersey_stock WHERE jersey_id = ? ORDER BY size",
    )
    .bind(&id)
    .fetch_all(&state.db)
    .await?;

    tracing::info!("Seller {} listed jersey '{}'", user.email, jersey.title);

    Ok((StatusCode::CREATED, Json(JerseyDetail::from_parts(jersey, stock))))
}

/// Load a jersey and check it belongs to the caller.
async fn owned_jersey(state: &AppState, user: &User, id: &str) -> Result<Jersey, ApiError> {
    if let Err(e) = validate_uuid(id, "jersey_id") {
        return Err(ApiError::validation_field("jersey_id", e));
    }

    let jersey = sqlx::query_as::<_, Jersey>("SELECT * FROM jerseys WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Jersey not found"))?;

    if jersey.seller_id != user.id {
        return Err(ApiError::not_found("Jersey not found"));
    }

    Ok(jersey)
}

pub async fn update_jersey(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
    Json(req): Json<UpdateJerseyRequest>,
) -> Result<Json<Jersey>, ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if let Some(title) = &req.title {
        if let Err(e) = validate_title(title) {
            errors.add("title", e);
        }
    }
    if let Some(club) = &req.club {
        if let Err(e) = validate_label(club, "Club") {
            errors.add("club", e);
        }
    }
    if let Some(quality) = &req.quality {
        if let Err(e) = validate_label(quality, "Quality") {
            errors.add("quality", e);
        }
    }
    if let Some(price) = req.price {
        if let Err(e) = validate_price(price) {
            errors.add("price", e);
        }
    }
    errors.finish()?;

    let _jersey = owned_jersey(&state, &user, &id).await?;

    let image_url = match &req.image_urls {
        Some(urls) => Some(
            serde_json::to_string(urls)
                .map_err(|e| ApiError::internal(format!("Failed to encode image list: {}", e)))?,
        ),
        None => None,
    };
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        UPDATE jerseys SET
            title = COALESCE(?, title),
            club = COALESCE(?, club),
            season = COALESCE(?, season),
            quality = COALESCE(?, quality),
            price = COALESCE(?, price),
            image_url = COALESCE(?, image_url),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&req.title)
    .bind(&req.club)
    .bind(&req.season)
    .bind(&req.quality)
    .bind(req.price)
    .bind(&image_url)
    .bind(&now)
    .bind(&id)
    .execute(&state.db)
    .await?;

    let jersey = sqlx::query_as::<_, Jersey>("SELECT * FROM jerseys WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;

    Ok(Json(jersey))
}

/// Delete one of the caller's listings. Listings that already have orders
/// stay, so order history keeps its references.
pub async fn delete_jersey(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let jersey = owned_jersey(&state, &user, &id).await?;
    delete_listing(&state, &jersey).await
}

/// Admin removal of any listing.
pub async fn admin_delete_jersey(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if let Err(e) = validate_uuid(&id, "jersey_id") {
        return Err(ApiError::validation_field("jersey_id", e));
    }

    let jersey = sqlx::query_as::<_, Jersey>("SELECT * FROM jerseys WHERE id = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Jersey not found"))?;

    delete_listing(&state, &jersey).await
}

async fn delete_listing(state: &AppState, jersey: &Jersey) -> Result<StatusCode, ApiError> {
    let ordered: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM order_items WHERE jersey_id = ?")
            .bind(&jersey.id)
            .fetch_one(&state.db)
            .await?;
    if ordered.0 > 0 {
        return Err(ApiError::conflict(
            "Jersey has been ordered and cannot be deleted",
        ));
    }

    sqlx::query("DELETE FROM jerseys WHERE id = ?")
        .bind(&jersey.id)
        .execute(&state.db)
        .await?;

    tracing::info!("Deleted jersey '{}' ({})", jersey.title, jersey.id);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_stock(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<Vec<SizeStock>>, ApiError> {
    let jersey = owned_jersey(&state, &user, &id).await?;

    let stock = sqlx::query_as::<_, JerseyStock>(
        "SELECT * FROM jersey_stock WHERE jersey_id = ? ORDER BY size",
    )
    .bind(&jersey.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(
        stock
            .into_iter()
            .map(|s| SizeStock {
                size: s.size,
                stock: s.stock,
            })
            .collect(),
    ))
}

/// Replace the per-size stock of a listing. Sizes absent from the request are
/// removed; listed sizes are upserted with their new count.
pub async fn update_stock(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
    Json(req): Json<UpdateStockRequest>,
) -> Result<Json<Vec<SizeStock>>, ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    let mut seen = std::collections::HashSet::new();
    for entry in &req.sizes {
        if let Err(e) = validate_size(&entry.size) {
            errors.add("sizes", e);
        } else if !seen.insert(entry.size.clone()) {
            errors.add("sizes", format!("Duplicate size '{}'", entry.size));
        }
        if let Err(e) = validate_stock(entry.stock) {
            errors.add("sizes", e);
        }
    }
    errors.finish()?;

    let jersey = owned_jersey(&state, &user, &id).await?;

    let mut tx = state.db.begin().await?;

    sqlx::query("DELETE FROM jersey_stock WHERE jersey_id = ?")
        .bind(&jersey.id)
        .execute(&mut *tx)
        .await?;

    for entry in &req.sizes {
        sqlx::query(
            "INSERT INTO jersey_stock (id, jersey_id, size, stock) VALUES (?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&jersey.id)
        .bind(&entry.size)
        .bind(entry.stock)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    let stock = sqlx::query_as::<_, JerseyStock>(
        "SELECT * FROM jersey_stock WHERE jersey_id = ? ORDER BY size",
    )
    .bind(&jersey.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(
        stock
            .into_iter()
            .map(|s| SizeStock {
                size: s.size,
                stock: s.stock,
            })
            .collect(),
    ))
}
