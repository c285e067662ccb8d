//! Admin curation of homepage shelves.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{
    AddSectionProductRequest, CreateSectionRequest, HomepageSection, Jersey, SectionWithProducts,
    UpdateSectionRequest, SECTION_KINDS,
};
use crate::AppState;

use super::catalog::load_section_products;
use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{validate_required_text, validate_uuid};

/// All sections for the curation view, hidden ones included.
pub async fn list_sections(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SectionWithProducts>>, ApiError> {
    let sections = sqlx::query_as::<_, HomepageSection>(
        "SELECT * FROM homepage_sections ORDER BY order_index",
    )
    .fetch_all(&state.db)
    .await?;

    let mut results = Vec::new();
    for section in sections {
        let products = load_section_products(&state, &section.id).await?;
        results.push(SectionWithProducts::from_parts(section, products));
    }

    Ok(Json(results))
}

/// Create a section, appended after the existing ones.
pub async fn create_section(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSectionRequest>,
) -> Result<(StatusCode, Json<HomepageSection>), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if let Err(e) = validate_required_text(&req.title, "Section title", 100) {
        errors.add("title", e);
    }
    let kind = req.kind.as_deref().unwrap_or("custom");
    if !SECTION_KINDS.contains(&kind) {
        errors.add(
            "kind",
            format!("Unknown section kind '{}'. Allowed: {}", kind, SECTION_KINDS.join(", ")),
        );
    }
    errors.finish()?;

    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM homepage_sections")
        .fetch_one(&state.db)
        .await?;

    let id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO homepage_sections (id, title, kind, visible, order_index, created_at) VALUES (?, ?, ?, 1, ?, ?)",
    )
    .bind(&id)
    .bind(req.title.trim())
    .bind(kind)
    .bind(count.0)
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(&state.db)
    .await?;

    let section = sqlx::query_as::<_, HomepageSection>(
        "SELECT * FROM homepage_sections WHERE id = ?",
    )
    .bind(&id)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(section)))
}

/// Rename a section or toggle its visibility.
pub async fn update_section(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateSectionRequest>,
) -> Result<Json<HomepageSection>, ApiError> {
    if let Err(e) = validate_uuid(&id, "section_id") {
        return Err(ApiError::validation_field("section_id", e));
    }
    if let Some(title) = &req.title {
        if let Err(e) = validate_required_text(title, "Section title", 100) {
            return Err(ApiError::validation_field("title", e));
        }
    }

    let _existing = sqlx::query_as::<_, HomepageSection>(
        "SELECT * FROM homepage_sections WHERE id = ?",
    )
    .bind(&id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Section not found"))?;

    sqlx::query(
        r#"
        UPDATE homepage_sections SET
            title = COALESCE(?, title),
            visible = COALESCE(?, visible)
        WHERE id = ?
        "#,
    )
    .bind(&req.title)
    .bind(req.visible)
    .bind(&id)
    .execute(&state.db)
    .await?;

    let section = sqlx::query_as::<_, HomepageSection>(
        "SELECT * FROM homepage_sections WHERE id = ?",
    )
    .bind(&id)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(section))
}

/// Remove a section and everything on it.
pub async fn delete_section(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if let Err(e) = validate_uuid(&id, "section_id") {
        return Err(ApiError::validation_field("section_id", e));
    }

    let mut tx = state.db.begin().await?;

    sqlx::query("DELETE FROM homepage_products WHERE section_id = ?")
        .bind(&id)
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query("DELETE FROM homepage_sections WHERE id = ?")
        .bind(&id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Section not found"));
    }

    tx.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Pin a jersey onto a shelf, appended after the existing products.
pub async fn add_section_product(
    State(state): State<Arc<AppState>>,
    Path(section_id): Path<String>,
    Json(req): Json<AddSectionProductRequest>,
) -> Result<(StatusCode, Json<SectionWithProducts>), ApiError> {
    if let Err(e) = validate_uuid(&section_id, "section_id") {
        return Err(ApiError::validation_field("section_id", e));
    }
    if let Err(e) = validate_uuid(&req.jersey_id, "jersey_id") {
        return Err(ApiError::validation_field("jersey_id", e));
    }

    let section = sqlx::query_as::<_, HomepageSection>(
        "SELECT * FROM homepage_sections WHERE id = ?",
    )
    .bind(&section_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Section not found"))?;

    let _jersey = sqlx::query_as::<_, Jersey>("SELECT * FROM jerseys WHERE id = ?")
        .bind(&req.jersey_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Jersey not found"))?;

    let count: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM homepage_products WHERE section_id = ?")
            .bind(&section_id)
            .fetch_one(&state.db)
            .await?;

    sqlx::query(
        "INSERT INTO homepage_products (id, section_id, jersey_id, order_index) VALUES (?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&section_id)
    .bind(&req.jersey_id)
    .bind(count.0)
    .execute(&state.db)
    .await
    .map_err(|e| {
        if e.to_string().contains("UNIQUE constraint failed") {
            ApiError::conflict("Jersey is already in this section")
        } else {
            ApiError::from(e)
        }
    })?;

    let products = load_section_products(&state, &section_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(SectionWithProducts::from_parts(section, products)),
    ))
}

/// Take a product off its shelf.
pub async fn remove_section_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if let Err(e) = validate_uuid(&id, "product_id") {
        return Err(ApiError::validation_field("product_id", e));
    }

    let result = sqlx::query("DELETE FROM homepage_products WHERE id = ?")
        .bind(&id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Section product not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}
