//! Sales analytics for the seller and admin dashboards.
//!
//! Nothing is materialized: every request loads the raw order rows and folds
//! them in one pass. The fold itself is a pure function over flattened sale
//! rows so the windowing and ranking logic is testable without a database.

use axum::{extract::State, Json};
use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::db::User;
use crate::AppState;

use super::error::ApiError;

/// One order item flattened with its order and jersey context.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SaleRow {
    pub order_id: String,
    pub created_at: String,
    pub jersey_id: String,
    pub title: String,
    pub seller_id: String,
    pub seller_name: String,
    pub quantity: i64,
    pub price: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeekBucket {
    pub week: String,
    pub sales: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthBucket {
    pub month: String,
    pub sales: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductStat {
    pub jersey_id: String,
    pub name: String,
    pub units_sold: i64,
    pub revenue: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SellerStat {
    pub seller_id: String,
    pub name: String,
    pub orders: i64,
    pub units_sold: i64,
    pub revenue: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SalesReport {
    pub total_sales: i64,
    pub total_orders: i64,
    pub this_week_sales: i64,
    pub this_month_sales: i64,
    pub weekly: Vec<WeekBucket>,
    pub monthly: Vec<MonthBucket>,
    pub top_products: Vec<ProductStat>,
}

const TOP_N: usize = 5;

/// First instant of the month `months_back` before the current one.
fn month_start(now: DateTime<Utc>, months_back: i32) -> DateTime<Utc> {
    let total = now.year() * 12 + now.month0() as i32 - months_back;
    let year = total.div_euclid(12);
    let month = total.rem_euclid(12) as u32 + 1;
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).unwrap()
}

/// Fold flattened sale rows into the dashboard report.
///
/// Revenue is `price × quantity` over order items; trailing windows are 7 and
/// 30 days, weekly buckets cover the last 4 weeks (oldest first), monthly
/// buckets the last 6 calendar months including the current one. Top products
/// rank by revenue with ties broken by id so the order is stable.
pub fn aggregate_sales(rows: &[SaleRow], now: DateTime<Utc>) -> SalesReport {
    let week_ago = now - Duration::days(7);
    let month_ago = now - Duration::days(30);

    let mut order_first_seen: HashMap<String, DateTime<Utc>> = HashMap::new();
    let mut product_stats: HashMap<String, ProductStat> = HashMap::new();
    let mut dated_totals: Vec<(DateTime<Utc>, i64)> = Vec::new();

    let mut total_sales = 0i64;
    for row in rows {
        let Ok(created) = DateTime::parse_from_rfc3339(&row.created_at) else {
            continue;
        };
        let created = created.with_timezone(&Utc);
        let line_total = row.price * row.quantity;

        total_sales += line_total;
        order_first_seen.entry(row.order_id.clone()).or_insert(created);
        dated_totals.push((created, line_total));

        let stat = product_stats
            .entry(row.jersey_id.clone())
            .or_insert_with(|| ProductStat {
                jersey_id: row.jersey_id.clone(),
                name: row.title.clone(),
                units_sold: 0,
                revenue: 0,
            });
        stat.units_sold += row.quantity;
        stat.revenue += line_total;
    }

    let this_week_sales = dated_totals
        .iter()
        .filter(|(created, _)| *created >= week_ago)
        .map(|(_, total)| total)
        .sum();
    let this_month_sales = dated_totals
        .iter()
        .filter(|(created, _)| *created >= month_ago)
        .map(|(_, total)| total)
        .sum();

    let mut weekly = Vec::with_capacity(4);
    for k in 0..4u32 {
        let start = now - Duration::days(7 * (4 - k) as i64);
        let end = start + Duration::days(7);
        let sales = dated_totals
            .iter()
            .filter(|(created, _)| *created >= start && *created < end)
            .map(|(_, total)| total)
            .sum();
        weekly.push(WeekBucket {
            week: format!("Week {}", k + 1),
            sales,
        });
    }

    let mut monthly = Vec::with_capacity(6);
    for i in (0..6i32).rev() {
        let start = month_start(now, i);
        let end = month_start(now, i - 1);
        let sales = dated_totals
            .iter()
            .filter(|(created, _)| *created >= start && *created < end)
            .map(|(_, total)| total)
            .sum();
        monthly.push(MonthBucket {
            month: start.format("%b %y").to_string(),
            sales,
        });
    }

    let mut top_products: Vec<ProductStat> = product_stats.into_values().collect();
    top_products.sort_by(|a, b| {
        b.revenue
            .cmp(&a.revenue)
            .then_with(|| a.jersey_id.cmp(&b.jersey_id))
    });
    top_products.truncate(TOP_N);

    SalesReport {
        total_sales,
        total_orders: order_first_seen.len() as i64,
        this_week_sales,
        this_month_sales,
        weekly,
        monthly,
        top_products,
    }
}

/// Rank sellers by revenue across the given rows.
pub fn top_sellers(rows: &[SaleRow]) -> Vec<SellerStat> {
    let mut stats: HashMap<String, (SellerStat, HashSet<String>)> = HashMap::new();

    for row in rows {
        let (stat, orders) = stats
            .entry(row.seller_id.clone())
            .or_insert_with(|| {
                (
                    SellerStat {
                        seller_id: row.seller_id.clone(),
                        name: row.seller_name.clone(),
                        orders: 0,
                        units_sold: 0,
                        revenue: 0,
                    },
                    HashSet::new(),
                )
            });
        orders.insert(row.order_id.clone());
        stat.units_sold += row.quantity;
        stat.revenue += row.price * row.quantity;
    }

    let mut sellers: Vec<SellerStat> = stats
        .into_values()
        .map(|(mut stat, orders)| {
            stat.orders = orders.len() as i64;
            stat
        })
        .collect();
    sellers.sort_by(|a, b| {
        b.revenue
            .cmp(&a.revenue)
            .then_with(|| a.seller_id.cmp(&b.seller_id))
    });
    sellers.truncate(TOP_N);
    sellers
}

const SALE_ROWS_BASE: &str = r#"
    SELECT o.id AS order_id, o.created_at, oi.jersey_id, j.title,
           j.seller_id, u.full_name AS seller_name, oi.quantity, oi.price
    FROM orders o
    JOIN order_items oi ON oi.order_id = o.id
    JOIN jerseys j ON j.id = oi.jersey_id
    JOIN users u ON u.id = j.seller_id
"#;

/// Seller dashboard: figures over the seller's own items only. Items from
/// other sellers inside the same order never count here.
pub async fn seller_analytics(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<SalesReport>, ApiError> {
    let sql = format!("{} WHERE j.seller_id = ?", SALE_ROWS_BASE);
    let rows = sqlx::query_as::<_, SaleRow>(&sql)
        .bind(&user.id)
        .fetch_all(&state.db)
        .await?;

    Ok(Json(aggregate_sales(&rows, Utc::now())))
}

#[derive(Debug, Serialize)]
pub struct AdminAnalyticsResponse {
    #[serde(flatten)]
    pub sales: SalesReport,
    pub total_sellers: i64,
    /// Sellers who listed a jersey in the last 30 days.
    pub active_sellers: i64,
    pub top_sellers: Vec<SellerStat>,
}

/// Platform-wide analytics for the admin dashboard.
pub async fn admin_analytics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AdminAnalyticsResponse>, ApiError> {
    let rows = sqlx::query_as::<_, SaleRow>(SALE_ROWS_BASE)
        .fetch_all(&state.db)
        .await?;

    let total_sellers: (i64,) =
        sqlx::query_as("SELECT COUNT(DISTINCT seller_id) FROM jerseys")
            .fetch_one(&state.db)
            .await?;
    let month_ago = (Utc::now() - Duration::days(30)).to_rfc3339();
    let active_sellers: (i64,) = sqlx::query_as(
        "SELECT COUNT(DISTINCT seller_id) FROM jerseys WHERE created_at >= ?",
    )
    .bind(&month_ago)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(AdminAnalyticsResponse {
        sales: aggregate_sales(&rows, Utc::now()),
        total_sellers: total_sellers.0,
        active_sellers: active_sellers.0,
        top_sellers: top_sellers(&rows),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 5, 12, 0, 0).unwrap()
    }

    fn row(
        order_id: &str,
        days_ago: i64,
        jersey_id: &str,
        seller_id: &str,
        quantity: i64,
        price: i64,
    ) -> SaleRow {
        SaleRow {
            order_id: order_id.to_string(),
            created_at: (fixed_now() - Duration::days(days_ago)).to_rfc3339(),
            jersey_id: jersey_id.to_string(),
            title: format!("Jersey {}", jersey_id),
            seller_id: seller_id.to_string(),
            seller_name: format!("Seller {}", seller_id),
            quantity,
            price,
        }
    }

    #[test]
    fn test_totals_and_order_count() {
        let rows = vec![
            row("o1", 1, "ja", "s1", 2, 500),
            row("o1", 1, "jb", "s1", 1, 300),
            row("o2", 2, "ja", "s1", 1, 500),
        ];
        let report = aggregate_sales(&rows, fixed_now());
        assert_eq!(report.total_sales, 1800);
        assert_eq!(report.total_orders, 2);
    }

    #[test]
    fn test_trailing_windows() {
        let rows = vec![
            row("o1", 2, "ja", "s1", 1, 100),  // inside both windows
            row("o2", 10, "ja", "s1", 1, 100), // only in the 30-day window
            row("o3", 40, "ja", "s1", 1, 100), // outside both
        ];
        let report = aggregate_sales(&rows, fixed_now());
        assert_eq!(report.this_week_sales, 100);
        assert_eq!(report.this_month_sales, 200);
        assert_eq!(report.total_sales, 300);
    }

    #[test]
    fn test_weekly_buckets_oldest_first() {
        let rows = vec![
            row("o1", 2, "ja", "s1", 1, 100),  // most recent week
            row("o2", 10, "ja", "s1", 1, 40),  // two weeks back
            row("o3", 26, "ja", "s1", 1, 7),   // oldest bucket
            row("o4", 35, "ja", "s1", 1, 999), // past the 4-week horizon
        ];
        let report = aggregate_sales(&rows, fixed_now());
        let sales: Vec<i64> = report.weekly.iter().map(|w| w.sales).collect();
        assert_eq!(sales, vec![7, 40, 0, 100]);
        assert_eq!(report.weekly[0].week, "Week 1");
        assert_eq!(report.weekly[3].week, "Week 4");
    }

    #[test]
    fn test_monthly_buckets_use_calendar_months() {
        let rows = vec![
            row("o1", 1, "ja", "s1", 1, 100), // Aug 4 -> current month
            row("o2", 20, "ja", "s1", 1, 50), // Jul 16
            row("o3", 70, "ja", "s1", 1, 25), // May 27
        ];
        let report = aggregate_sales(&rows, fixed_now());
        assert_eq!(report.monthly.len(), 6);
        assert_eq!(report.monthly[0].month, "Mar 25");
        assert_eq!(report.monthly[5].month, "Aug 25");
        let by_label: HashMap<&str, i64> = report
            .monthly
            .iter()
            .map(|m| (m.month.as_str(), m.sales))
            .collect();
        assert_eq!(by_label["Aug 25"], 100);
        assert_eq!(by_label["Jul 25"], 50);
        assert_eq!(by_label["May 25"], 25);
        assert_eq!(by_label["Jun 25"], 0);
    }

    #[test]
    fn test_top_products_rank_and_tie_break() {
        let rows = vec![
            row("o1", 1, "jb", "s1", 1, 200),
            row("o2", 1, "ja", "s1", 1, 200),
            row("o3", 1, "jc", "s1", 3, 300),
        ];
        let report = aggregate_sales(&rows, fixed_now());
        let ids: Vec<&str> = report
            .top_products
            .iter()
            .map(|p| p.jersey_id.as_str())
            .collect();
        // jc leads on revenue; ja and jb tie and fall back to id order
        assert_eq!(ids, vec!["jc", "ja", "jb"]);
    }

    #[test]
    fn test_top_products_caps_at_five() {
        let rows: Vec<SaleRow> = (0..8)
            .map(|i| row("o1", 1, &format!("j{}", i), "s1", 1, 100 + i))
            .collect();
        let report = aggregate_sales(&rows, fixed_now());
        assert_eq!(report.top_products.len(), 5);
    }

    #[test]
    fn test_top_sellers_counts_distinct_orders() {
        let rows = vec![
            row("o1", 1, "ja", "s1", 2, 500),
            row("o1", 1, "jb", "s1", 1, 300),
            row("o2", 1, "jc", "s2", 1, 5000),
        ];
        let sellers = top_sellers(&rows);
        assert_eq!(sellers[0].seller_id, "s2");
        assert_eq!(sellers[1].seller_id, "s1");
        assert_eq!(sellers[1].orders, 1);
        assert_eq!(sellers[1].units_sold, 3);
        assert_eq!(sellers[1].revenue, 1300);
    }

    #[test]
    fn test_empty_rows_yield_zeroed_report() {
        let report = aggregate_sales(&[], fixed_now());
        assert_eq!(report.total_sales, 0);
        assert_eq!(report.total_orders, 0);
        assert_eq!(report.weekly.len(), 4);
        assert_eq!(report.monthly.len(), 6);
        assert!(report.top_products.is_empty());
    }

    #[tokio::test]
    async fn test_seller_analytics_excludes_other_sellers_items() {
        use crate::config::Config;
        use crate::db::connect_in_memory;
        use uuid::Uuid;

        let db = connect_in_memory().await;
        let state = Arc::new(crate::AppState::new(Config::default(), db, None));
        let now = Utc::now().to_rfc3339();

        let mut users = Vec::new();
        for email in ["s1@example.com", "s2@example.com", "b@example.com"] {
            let id = Uuid::new_v4().to_string();
            sqlx::query(
                "INSERT INTO users (id, email, password_hash, full_name, role, email_verified, created_at, updated_at) VALUES (?, ?, '', ?, 'seller', 1, ?, ?)",
            )
            .bind(&id)
            .bind(email)
            .bind(email)
            .bind(&now)
            .bind(&now)
            .execute(&state.db)
            .await
            .unwrap();
            users.push(id);
        }
        let (s1, s2, buyer) = (&users[0], &users[1], &users[2]);

        let mut jerseys = Vec::new();
        for seller in [s1, s2] {
            let id = Uuid::new_v4().to_string();
            sqlx::query(
                "INSERT INTO jerseys (id, seller_id, title, club, season, quality, price, image_url, created_at, updated_at) VALUES (?, ?, 'Kit', 'FC', NULL, 'fan', 100, '[]', ?, ?)",
            )
            .bind(&id)
            .bind(seller)
            .bind(&now)
            .bind(&now)
            .execute(&state.db)
            .await
            .unwrap();
            jerseys.push(id);
        }

        // One order mixing both sellers' items
        let order_id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO orders (id, user_id, request_id, total_amount, status, payment_status, shipping_address, created_at, updated_at) VALUES (?, ?, ?, 1300, 'pending', 'pending', '{}', ?, ?)",
        )
        .bind(&order_id)
        .bind(buyer)
        .bind(Uuid::new_v4().to_string())
        .bind(&now)
        .bind(&now)
        .execute(&state.db)
        .await
        .unwrap();
        for (jersey, qty, price) in [(&jerseys[0], 2i64, 500i64), (&jerseys[1], 1, 300)] {
            sqlx::query(
                "INSERT INTO order_items (id, order_id, jersey_id, size, quantity, price) VALUES (?, ?, ?, 'M', ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&order_id)
            .bind(jersey)
            .bind(qty)
            .bind(price)
            .execute(&state.db)
            .await
            .unwrap();
        }

        let s1_user = User {
            id: s1.clone(),
            email: "s1@example.com".to_string(),
            password_hash: String::new(),
            full_name: "s1".to_string(),
            role: "seller".to_string(),
            email_verified: true,
            created_at: now.clone(),
            updated_at: now.clone(),
        };
        let Json(report) = seller_analytics(State(state.clone()), s1_user)
            .await
            .unwrap();

        // Only the 2 x 500 item belongs to s1; s2's 300 is excluded
        assert_eq!(report.total_sales, 1000);
        assert_eq!(report.total_orders, 1);
    }
}
