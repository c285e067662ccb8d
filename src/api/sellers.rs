//! Seller onboarding: buyers apply, admins review, approval flips the role.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{
    ApprovalStatus, CreateSellerRequestRequest, ListSellerRequestsParams, ReviewAction,
    ReviewSellerRequestRequest, Role, SellerRequest, User,
};
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{validate_email, validate_phone, validate_required_text, validate_uuid};

fn validate_request(req: &CreateSellerRequestRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Err(e) = validate_required_text(&req.full_name, "Full name", 100) {
        errors.add("full_name", e);
    }
    if let Err(e) = validate_phone(&req.phone_number) {
        errors.add("phone_number", e);
    }
    if let Err(e) = validate_email(&req.email) {
        errors.add("email", e);
    }
    if let Err(e) = validate_required_text(&req.store_name, "Store name", 100) {
        errors.add("store_name", e);
    }
    if let Err(e) = validate_required_text(&req.address, "Address", 500) {
        errors.add("address", e);
    }
    if let Some(years) = req.years_in_business {
        if !(0..=100).contains(&years) {
            errors.add("years_in_business", "Years in business must be between 0 and 100");
        }
    }

    errors.finish()
}

/// Submit a seller application. One pending application per account.
pub async fn create_seller_request(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(req): Json<CreateSellerRequestRequest>,
) -> Result<(StatusCode, Json<SellerRequest>), ApiError> {
    validate_request(&req)?;

    let pending: Option<(String,)> = sqlx::query_as(
        "SELECT id FROM seller_requests WHERE user_id = ? AND approval_status = 'pending'",
    )
    .bind(&user.id)
    .fetch_optional(&state.db)
    .await?;
    if pending.is_some() {
        return Err(ApiError::conflict(
            "You already have a pending seller application",
        ));
    }

    let id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO seller_requests
            (id, user_id, full_name, phone_number, email, instagram_link, whatsapp_number,
             store_name, years_in_business, address, approval_status, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'pending', ?)
        "#,
    )
    .bind(&id)
    .bind(&user.id)
    .bind(req.full_name.trim())
    .bind(&req.phone_number)
    .bind(&req.email)
    .bind(&req.instagram_link)
    .bind(&req.whatsapp_number)
    .bind(req.store_name.trim())
    .bind(req.years_in_business)
    .bind(req.address.trim())
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(&state.db)
    .await?;

    let request = sqlx::query_as::<_, SellerRequest>("SELECT * FROM seller_requests WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;

    tracing::info!("Seller application from {} ({})", user.email, req.store_name);

    Ok((StatusCode::CREATED, Json(request)))
}

/// Admin list of applications, pending first.
pub async fn admin_list_seller_requests(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListSellerRequestsParams>,
) -> Result<Json<Vec<SellerRequest>>, ApiError> {
    let requests = match &params.status {
        Some(raw) => {
            let status: ApprovalStatus = raw
                .parse()
                .map_err(|e: String| ApiError::validation_field("status", e))?;
            sqlx::query_as::<_, SellerRequest>(
                "SELECT * FROM seller_requests WHERE approval_status = ? ORDER BY created_at DESC",
            )
            .bind(status.to_string())
            .fetch_all(&state.db)
            .await?
        }
        None => {
            sqlx::query_as::<_, SellerRequest>(
                r#"
                SELECT * FROM seller_requests
                ORDER BY CASE WHEN approval_status = 'pending' THEN 0 ELSE 1 END, created_at DESC
                "#,
            )
            .fetch_all(&state.db)
            .await?
        }
    };

    Ok(Json(requests))
}

/// Decide an application. Approval makes the applicant a seller; rejection
/// drops them back to buyer. Decision and role change land together.
pub async fn review_seller_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ReviewSellerRequestRequest>,
) -> Result<Json<SellerRequest>, ApiError> {
    if let Err(e) = validate_uuid(&id, "request_id") {
        return Err(ApiError::validation_field("request_id", e));
    }

    let (new_status, new_role) = match req.action {
        ReviewAction::Approve => (ApprovalStatus::Approved, Role::Seller),
        ReviewAction::Reject => (ApprovalStatus::Rejected, Role::Buyer),
    };

    let mut tx = state.db.begin().await?;

    let request: SellerRequest =
        sqlx::query_as("SELECT * FROM seller_requests WHERE id = ?")
            .bind(&id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ApiError::not_found("Seller request not found"))?;

    sqlx::query("UPDATE seller_requests SET approval_status = ? WHERE id = ?")
        .bind(new_status.to_string())
        .bind(&id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE id = ?")
        .bind(new_role.to_string())
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(&request.user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    let request = sqlx::query_as::<_, SellerRequest>("SELECT * FROM seller_requests WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;

    tracing::info!(
        "Seller request {} {} (user {} is now {})",
        id,
        new_status,
        request.user_id,
        new_role
    );

    Ok(Json(request))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::connect_in_memory;

    async fn test_state() -> Arc<AppState> {
        let db = connect_in_memory().await;
        Arc::new(AppState::new(Config::default(), db, None))
    }

    async fn seed_buyer(state: &AppState, email: &str) -> User {
        let now = chrono::Utc::now().to_rfc3339();
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            password_hash: String::new(),
            full_name: "Applicant".to_string(),
            role: "buyer".to_string(),
            email_verified: true,
            created_at: now.clone(),
            updated_at: now,
        };
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, full_name, role, email_verified, created_at, updated_at) VALUES (?, ?, '', ?, 'buyer', 1, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.created_at)
        .bind(&user.updated_at)
        .execute(&state.db)
        .await
        .unwrap();
        user
    }

    fn application() -> CreateSellerRequestRequest {
        CreateSellerRequestRequest {
            full_name: "Asha Rao".to_string(),
            phone_number: "+919812345678".to_string(),
            email: "asha@example.com".to_string(),
            instagram_link: None,
            whatsapp_number: None,
            store_name: "Asha Kits".to_string(),
            years_in_business: Some(3),
            address: "4 Brigade Road, Bengaluru".to_string(),
        }
    }

    async fn role_of(state: &AppState, user_id: &str) -> String {
        let row: (String,) = sqlx::query_as("SELECT role FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_one(&state.db)
            .await
            .unwrap();
        row.0
    }

    #[tokio::test]
    async fn test_approve_flips_role_to_seller() {
        let state = test_state().await;
        let buyer = seed_buyer(&state, "asha@example.com").await;

        let (_, Json(request)) =
            create_seller_request(State(state.clone()), buyer.clone(), Json(application()))
                .await
                .unwrap();
        assert_eq!(request.approval_status, "pending");

        let Json(reviewed) = review_seller_request(
            State(state.clone()),
            Path(request.id.clone()),
            Json(ReviewSellerRequestRequest {
                action: ReviewAction::Approve,
            }),
        )
        .await
        .unwrap();

        assert_eq!(reviewed.approval_status, "approved");
        assert_eq!(role_of(&state, &buyer.id).await, "seller");
    }

    #[tokio::test]
    async fn test_reject_sets_role_back_to_buyer() {
        let state = test_state().await;
        let buyer = seed_buyer(&state, "asha@example.com").await;

        let (_, Json(request)) =
            create_seller_request(State(state.clone()), buyer.clone(), Json(application()))
                .await
                .unwrap();

        review_seller_request(
            State(state.clone()),
            Path(request.id.clone()),
            Json(ReviewSellerRequestRequest {
                action: ReviewAction::Reject,
            }),
        )
        .await
        .unwrap();

        assert_eq!(role_of(&state, &buyer.id).await, "buyer");
    }

    #[tokio::test]
    async fn test_second_pending_application_conflicts() {
        let state = test_state().await;
        let buyer = seed_buyer(&state, "asha@example.com").await;

        create_seller_request(State(state.clone()), buyer.clone(), Json(application()))
            .await
            .unwrap();
        let err = create_seller_request(State(state.clone()), buyer, Json(application()))
            .await
            .unwrap_err();
        assert!(format!("{}", err).contains("conflict"));
    }
}
