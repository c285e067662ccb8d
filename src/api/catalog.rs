//! Public catalog endpoints: browse jerseys, product detail, homepage feed.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::db::{
    HomepageProduct, HomepageSection, Jersey, JerseyDetail, JerseyStock, JerseySummary,
    ListJerseysParams, SectionProduct, SectionWithProducts,
};
use crate::AppState;

use super::error::ApiError;
use super::validation::validate_uuid;

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

/// Browse the catalog with optional club/quality filters and title search.
pub async fn list_jerseys(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListJerseysParams>,
) -> Result<Json<PaginatedResponse<JerseySummary>>, ApiError> {
    let page = params.page.unwrap_or(1).max(1);
    let per_page = params.per_page.unwrap_or(20).clamp(1, 100);

    let mut filters = String::new();
    if params.club.is_some() {
        filters.push_str(" AND club = ?");
    }
    if params.quality.is_some() {
        filters.push_str(" AND quality = ?");
    }
    if params.search.is_some() {
        filters.push_str(" AND title LIKE ?");
    }

    let search_pattern = params.search.as_ref().map(|s| format!("%{}%", s));

    let sql = format!(
        "SELECT * FROM jerseys WHERE 1=1{} ORDER BY created_at DESC LIMIT ? OFFSET ?",
        filters
    );
    let mut query = sqlx::query_as::<_, Jersey>(&sql);
    if let Some(club) = &params.club {
        query = query.bind(club);
    }
    if let Some(quality) = &params.quality {
        query = query.bind(quality);
    }
    if let Some(pattern) = &search_pattern {
        query = query.bind(pattern);
    }
    let jerseys = query
        .bind(per_page as i64)
        .bind(((page - 1) * per_page) as i64)
        .fetch_all(&state.db)
        .await?;

    let count_sql = format!("SELECT COUNT(*) FROM jerseys WHERE 1=1{}", filters);
    let mut count_query = sqlx::query_as::<_, (i64,)>(&count_sql);
    if let Some(club) = &params.club {
        count_query = count_query.bind(club);
    }
    if let Some(quality) = &params.quality {
        count_query = count_query.bind(quality);
    }
    if let Some(pattern) = &search_pattern {
        count_query = count_query.bind(pattern);
    }
    let total = count_query.fetch_one(&state.db).await?;

    Ok(Json(PaginatedResponse {
        data: jerseys.iter().map(JerseySummary::from).collect(),
        total: total.0,
        page,
        per_page,
    }))
}

/// Product page: jersey plus its per-size stock, sizes ordered by label.
pub async fn get_jersey(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JerseyDetail>, ApiError> {
    if let Err(e) = validate_uuid(&id, "jersey_id") {
        return Err(ApiError::validation_field("jersey_id", e));
    }

    let jersey = sqlx::query_as::<_, Jersey>("SELECT * FROM jerseys WHERE id = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Jersey not found"))?;

    let stock = sqlx::query_as::<_, JerseyStock>(
        "SELECT * FROM jersey_stock WHERE jersey_id = ? ORDER BY size",
    )
    .bind(&id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(JerseyDetail::from_parts(jersey, stock)))
}

/// The landing page feed: visible sections in display order, products
/// expanded in display order.
pub async fn homepage_feed(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SectionWithProducts>>, ApiError> {
    let sections = sqlx::query_as::<_, HomepageSection>(
        "SELECT * FROM homepage_sections WHERE visible = 1 ORDER BY order_index",
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

/// Shared by the public feed and the admin curation view.
pub(super) async fn load_section_products(
    state: &AppState,
    section_id: &str,
) -> Result<Vec<SectionProduct>, ApiError> {
    let rows = sqlx::query_as::<_, HomepageProduct>(
        "SELECT * FROM homepage_products WHERE section_id = ? ORDER BY order_index",
    )
    .bind(section_id)
    .fetch_all(&state.db)
    .await?;

    let mut products = Vec::new();
    for row in rows {
        let jersey = sqlx::query_as::<_, Jersey>("SELECT * FROM jerseys WHERE id = ?")
            .bind(&row.jersey_id)
            .fetch_optional(&state.db)
            .await?;
        // A jersey deleted after curation just drops off the shelf
        if let Some(jersey) = jersey {
            products.push(SectionProduct {
                id: row.id,
                jersey_id: row.jersey_id,
                order_index: row.order_index,
                jersey: JerseySummary::from(&jersey),
            });
        }
    }

    Ok(products)
}
