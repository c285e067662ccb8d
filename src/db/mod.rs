mod models;

pub use models::*;

use anyhow::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

pub type DbPool = SqlitePool;

/// Execute a SQL migration file, properly handling comments
async fn execute_sql(pool: &SqlitePool, sql: &str) -> Result<()> {
    for statement in sql.split(';') {
        // Strip SQL comment lines (lines starting with --)
        let cleaned: String = statement
            .lines()
            .filter(|line| !line.trim().starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n");
        let trimmed = cleaned.trim();
        if !trimmed.is_empty() {
            sqlx::query(trimmed).execute(pool).await?;
        }
    }
    Ok(())
}

pub async fn init(data_dir: &Path) -> Result<DbPool> {
    let db_path = data_dir.join("jersey-central.db");
    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    info!("Initializing database at {}", db_path.display());

    let pool = connect(&db_url).await?;

    info!("Database initialized successfully");
    Ok(pool)
}

/// Open a pool against any SQLite URL and bring the schema up to date.
pub async fn connect(db_url: &str) -> Result<DbPool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await?;

    setup(&pool).await?;
    Ok(pool)
}

async fn setup(pool: &SqlitePool) -> Result<()> {
    // Enable WAL mode for better concurrency
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(pool)
        .await?;
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(pool)
        .await?;

    run_migrations(pool).await?;
    Ok(())
}

async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    info!("Running database migrations...");

    // Migration 001: Initial schema
    execute_sql(pool, include_str!("../../migrations/001_initial.sql")).await?;

    // Migration 002: Seller onboarding requests
    let has_seller_requests_table: Option<(String,)> = sqlx::query_as(
        "SELECT name FROM sqlite_master WHERE type='table' AND name='seller_requests'",
    )
    .fetch_optional(pool)
    .await?;
    if has_seller_requests_table.is_none() {
        execute_sql(pool, include_str!("../../migrations/002_seller_requests.sql")).await?;
    }

    // Migration 003: Homepage curation tables
    let has_homepage_sections_table: Option<(String,)> = sqlx::query_as(
        "SELECT name FROM sqlite_master WHERE type='table' AND name='homepage_sections'",
    )
    .fetch_optional(pool)
    .await?;
    if has_homepage_sections_table.is_none() {
        execute_sql(pool, include_str!("../../migrations/003_homepage.sql")).await?;
    }

    info!("Migrations completed");
    Ok(())
}

/// In-memory pool with the full schema, for tests. Capped at one connection:
/// every `sqlite::memory:` connection is its own database.
#[cfg(test)]
pub async fn connect_in_memory() -> DbPool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory database should open");
    setup(&pool)
        .await
        .expect("in-memory schema should initialize");
    pool
}
