use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};

use crate::{
    db::models::{Role, User},
    error::{AppError, Result},
    middleware::auth::AuthUser,
    AppState,
};

/// Admin only; `auth_middleware` and `require_admin` are layered on by the caller.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/:id/role", put(update_role))
        .route("/:id/ban", put(update_ban))
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    #[serde(default)]
    pub role: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBanRequest {
    pub is_banned: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ActivityCount {
    pub reports: i64,
    pub comments: i64,
    pub upvotes: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserWithCounts {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub is_banned: bool,
    pub created_at: String,
    #[serde(rename = "_count")]
    pub count: ActivityCount,
}

#[derive(sqlx::FromRow)]
struct UserCountRow {
    id: String,
    email: String,
    role: Role,
    is_banned: bool,
    created_at: String,
    report_count: i64,
    comment_count: i64,
    upvote_count: i64,
}

async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserWithCounts>>> {
    let rows = sqlx::query_as::<_, UserCountRow>(
        r#"
        SELECT u.id, u.email, u.role, u.is_banned, u.created_at,
               (SELECT COUNT(*) FROM reports r WHERE r.user_id = u.id) AS report_count,
               (SELECT COUNT(*) FROM comments c WHERE c.user_id = u.id) AS comment_count,
               (SELECT COUNT(*) FROM upvotes v WHERE v.user_id = u.id) AS upvote_count
        FROM users u
        ORDER BY u.created_at DESC
        "#,
    )
    .fetch_all(&state.db.pool)
    .await?;

    let users = rows
        .into_iter()
        .map(|row| UserWithCounts {
            id: row.id,
            email: row.email,
            role: row.role,
            is_banned: row.is_banned,
            created_at: row.created_at,
            count: ActivityCount {
                reports: row.report_count,
                comments: row.comment_count,
                upvotes: row.upvote_count,
            },
        })
        .collect();

    Ok(Json(users))
}

async fn fetch_user(pool: &sqlx::SqlitePool, id: &str) -> Result<User> {
    sqlx::query_as::<_, User>(
        "SELECT id, email, password_hash, role, is_banned, created_at FROM users WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

async fn update_role(
    State(state): State<AppState>,
    admin: AuthUser,
    Path(id): Path<String>,
    WithRejection(Json(body), _): WithRejection<Json<UpdateRoleRequest>, AppError>,
) -> Result<Json<User>> {
    let role: Role = body
        .role
        .parse()
        .map_err(|_| AppError::Validation("Invalid role".to_string()))?;

    if id == admin.id {
        return Err(AppError::Validation(
            "Cannot change your own role".to_string(),
        ));
    }

    let result = sqlx::query("UPDATE users SET role = ? WHERE id = ?")
        .bind(role)
        .bind(&id)
        .execute(&state.db.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    tracing::info!(user_id = %id, role = %role, admin_id = %admin.id, "user role changed");

    Ok(Json(fetch_user(&state.db.pool, &id).await?))
}

async fn update_ban(
    State(state): State<AppState>,
    admin: AuthUser,
    Path(id): Path<String>,
    WithRejection(Json(body), _): WithRejection<Json<UpdateBanRequest>, AppError>,
) -> Result<Json<User>> {
    let is_banned = body
        .is_banned
        .ok_or_else(|| AppError::Validation("Invalid ban status".to_string()))?;

    if id == admin.id {
        return Err(AppError::Validation("Cannot ban yourself".to_string()));
    }

    let result = sqlx::query("UPDATE users SET is_banned = ? WHERE id = ?")
        .bind(is_banned)
        .bind(&id)
        .execute(&state.db.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    tracing::info!(user_id = %id, is_banned, admin_id = %admin.id, "user ban state changed");

    Ok(Json(fetch_user(&state.db.pool, &id).await?))
}
