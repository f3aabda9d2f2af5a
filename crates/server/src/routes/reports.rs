use std::collections::{HashMap, HashSet};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::{
    db::{
        self,
        models::{
            Category, CommentRow, ReportRow, Status, UserSummary, COMMENT_COLUMNS, REPORT_COLUMNS,
        },
    },
    error::{AppError, Result},
    middleware::auth::{AdminUser, AuthUser, MaybeAuthUser},
    services::geo::{self, Point},
    AppState,
};

/// Ids bound per `IN (...)` list, well under SQLite's host parameter limit.
const BIND_CHUNK: usize = 500;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_reports))
        .route("/create", post(create_report))
        .route("/bulk-action", post(bulk_action))
        .route(
            "/:id",
            get(get_report).put(update_report).delete(delete_report),
        )
        .route("/:id/upvote", post(toggle_upvote))
        .route("/:id/comment", post(add_comment))
        .route("/:id/status", put(update_status))
        .route("/:id/archive", put(set_archived))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    #[serde(default)]
    pub address: String,
    pub image_data: Option<String>,
    pub audio_data: Option<String>,
    #[serde(default)]
    pub anonymous: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportFilters {
    pub category: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub include_archived: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateReportRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveRequest {
    pub is_archived: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkActionRequest {
    #[serde(default)]
    pub report_ids: Vec<String>,
    #[serde(default)]
    pub action: String,
}

#[derive(Debug, Serialize)]
pub struct BulkActionResponse {
    pub action: String,
    pub affected: u64,
}

#[derive(Debug, Serialize)]
pub struct UpvoteResponse {
    pub upvoted: bool,
    pub upvotes: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: String,
    pub text: String,
    pub created_at: String,
    pub report_id: String,
    pub user_id: String,
    pub user: UserSummary,
}

impl From<CommentRow> for CommentResponse {
    fn from(row: CommentRow) -> Self {
        let user = row.author();
        Self {
            id: row.id,
            text: row.text,
            created_at: row.created_at,
            report_id: row.report_id,
            user_id: row.user_id,
            user,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub status: Status,
    pub lat: f64,
    pub lng: f64,
    pub address: String,
    pub image_data: Option<String>,
    pub audio_data: Option<String>,
    pub upvotes: i64,
    pub anonymous: bool,
    pub is_archived: bool,
    pub created_at: String,
    pub updated_at: String,
    pub user_id: Option<String>,
    pub user: Option<UserSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<CommentResponse>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_upvoted: Option<bool>,
}

impl From<ReportRow> for ReportResponse {
    fn from(row: ReportRow) -> Self {
        let user = row.author();
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            category: row.category,
            status: row.status,
            lat: row.lat,
            lng: row.lng,
            address: row.address,
            image_data: row.image_data,
            audio_data: row.audio_data,
            upvotes: row.upvotes,
            anonymous: row.anonymous,
            is_archived: row.is_archived,
            created_at: row.created_at,
            updated_at: row.updated_at,
            user_id: row.user_id,
            user,
            comments: None,
            has_upvoted: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SortBy {
    Newest,
    Upvotes,
    Nearest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BulkAction {
    Delete,
    Archive,
    Unarchive,
}

impl BulkAction {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "delete" => Some(Self::Delete),
            "archive" => Some(Self::Archive),
            "unarchive" => Some(Self::Unarchive),
            _ => None,
        }
    }
}

fn parse_category(s: &str) -> Result<Category> {
    s.parse()
        .map_err(|_| AppError::Validation("Invalid category".to_string()))
}

fn parse_status(s: &str) -> Result<Status> {
    s.parse()
        .map_err(|_| AppError::Validation("Invalid status".to_string()))
}

/// Treats absent and blank query values alike.
fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// `needle` must already be lowercased.
fn matches_search(row: &ReportRow, needle: &str) -> bool {
    row.title.to_lowercase().contains(needle) || row.description.to_lowercase().contains(needle)
}

async fn fetch_report(pool: &SqlitePool, id: &str) -> Result<ReportRow> {
    let sql = format!(
        "SELECT {REPORT_COLUMNS} FROM reports r LEFT JOIN users u ON r.user_id = u.id WHERE r.id = ?"
    );
    sqlx::query_as::<_, ReportRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Report not found".to_string()))
}

async fn ensure_report_exists(pool: &SqlitePool, id: &str) -> Result<()> {
    let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reports WHERE id = ?")
        .bind(id)
        .fetch_one(pool)
        .await?;

    if exists == 0 {
        return Err(AppError::NotFound("Report not found".to_string()));
    }
    Ok(())
}

/// Comments for each report, newest first.
async fn comments_by_report(
    pool: &SqlitePool,
    report_ids: &[String],
) -> Result<HashMap<String, Vec<CommentResponse>>> {
    let mut grouped: HashMap<String, Vec<CommentResponse>> = HashMap::new();

    for chunk in report_ids.chunks(BIND_CHUNK) {
        let mut query = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {COMMENT_COLUMNS} FROM comments c JOIN users u ON c.user_id = u.id WHERE c.report_id IN ("
        ));
        let mut ids = query.separated(", ");
        for id in chunk {
            ids.push_bind(id);
        }
        ids.push_unseparated(") ORDER BY c.created_at DESC");

        let rows = query
            .build_query_as::<CommentRow>()
            .fetch_all(pool)
            .await?;

        for row in rows {
            grouped
                .entry(row.report_id.clone())
                .or_default()
                .push(CommentResponse::from(row));
        }
    }
    Ok(grouped)
}

async fn upvoted_by(
    pool: &SqlitePool,
    user_id: &str,
    report_ids: &[String],
) -> Result<HashSet<String>> {
    let mut upvoted = HashSet::new();

    for chunk in report_ids.chunks(BIND_CHUNK) {
        let mut query =
            QueryBuilder::<Sqlite>::new("SELECT report_id FROM upvotes WHERE user_id = ");
        query.push_bind(user_id);
        query.push(" AND report_id IN (");
        let mut ids = query.separated(", ");
        for id in chunk {
            ids.push_bind(id);
        }
        ids.push_unseparated(")");

        let rows = query
            .build_query_scalar::<String>()
            .fetch_all(pool)
            .await?;
        upvoted.extend(rows);
    }
    Ok(upvoted)
}

/// Attaches comments and the viewer's upvote state.
async fn with_details(
    pool: &SqlitePool,
    rows: Vec<ReportRow>,
    viewer: Option<&AuthUser>,
) -> Result<Vec<ReportResponse>> {
    let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
    let mut comments = comments_by_report(pool, &ids).await?;
    let upvoted = match viewer {
        Some(user) => upvoted_by(pool, &user.id, &ids).await?,
        None => HashSet::new(),
    };

    Ok(rows
        .into_iter()
        .map(|row| {
            let mut report = ReportResponse::from(row);
            report.comments = Some(comments.remove(&report.id).unwrap_or_default());
            report.has_upvoted = Some(upvoted.contains(&report.id));
            report
        })
        .collect())
}

async fn create_report(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    WithRejection(Json(body), _): WithRejection<Json<CreateReportRequest>, AppError>,
) -> Result<(StatusCode, Json<ReportResponse>)> {
    let title = body.title.trim();
    let description = body.description.trim();
    let (Some(lat), Some(lng)) = (body.lat, body.lng) else {
        return Err(AppError::Validation("Missing required fields".to_string()));
    };
    if title.is_empty() || description.is_empty() || body.category.is_empty() {
        return Err(AppError::Validation("Missing required fields".to_string()));
    }
    let category = parse_category(&body.category)?;
    if !Point::new(lat, lng).is_valid() {
        return Err(AppError::Validation("Invalid coordinates".to_string()));
    }

    // Anonymous reports are never linked to an account
    let user_id = if body.anonymous {
        None
    } else {
        user.map(|u| u.id)
    };
    let image_data = body.image_data.filter(|d| !d.is_empty());
    let audio_data = body.audio_data.filter(|d| !d.is_empty());

    let report_id = Uuid::new_v4().to_string();
    let now = db::now();

    sqlx::query(
        r#"
        INSERT INTO reports (id, title, description, category, status, lat, lng, address,
                             image_data, audio_data, upvotes, anonymous, is_archived,
                             created_at, updated_at, user_id)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, 0, ?, ?, ?)
        "#,
    )
    .bind(&report_id)
    .bind(title)
    .bind(description)
    .bind(category)
    .bind(Status::New)
    .bind(lat)
    .bind(lng)
    .bind(body.address.trim())
    .bind(image_data)
    .bind(audio_data)
    .bind(body.anonymous)
    .bind(&now)
    .bind(&now)
    .bind(&user_id)
    .execute(&state.db.pool)
    .await?;

    tracing::info!(report_id = %report_id, category = %category, anonymous = body.anonymous, "report created");

    let report = fetch_report(&state.db.pool, &report_id).await?;
    Ok((StatusCode::CREATED, Json(report.into())))
}

async fn list_reports(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    WithRejection(Query(filters), _): WithRejection<Query<ReportFilters>, AppError>,
) -> Result<Json<Vec<ReportResponse>>> {
    let category = non_blank(&filters.category).map(parse_category).transpose()?;
    let status = non_blank(&filters.status).map(parse_status).transpose()?;
    let sort_by = match non_blank(&filters.sort_by) {
        None | Some("newest") => SortBy::Newest,
        Some("upvotes") => SortBy::Upvotes,
        Some("nearest") => SortBy::Nearest,
        Some(_) => return Err(AppError::Validation("Invalid sort order".to_string())),
    };
    let is_admin = viewer.as_ref().is_some_and(AuthUser::is_admin);
    let include_archived = is_admin && filters.include_archived.unwrap_or(false);

    let mut query = QueryBuilder::<Sqlite>::new(format!(
        "SELECT {REPORT_COLUMNS} FROM reports r LEFT JOIN users u ON r.user_id = u.id WHERE 1 = 1"
    ));
    if !include_archived {
        query.push(" AND r.is_archived = 0");
    }
    if let Some(category) = category {
        query.push(" AND r.category = ").push_bind(category);
    }
    if let Some(status) = status {
        query.push(" AND r.status = ").push_bind(status);
    }
    match sort_by {
        SortBy::Upvotes => query.push(" ORDER BY r.upvotes DESC, r.created_at DESC"),
        SortBy::Newest | SortBy::Nearest => query.push(" ORDER BY r.created_at DESC"),
    };

    let mut rows = query
        .build_query_as::<ReportRow>()
        .fetch_all(&state.db.pool)
        .await?;

    // SQLite's LIKE and lower() only fold ASCII, so search is matched here
    if let Some(search) = non_blank(&filters.search) {
        let needle = search.to_lowercase();
        rows.retain(|r| matches_search(r, &needle));
    }

    if sort_by == SortBy::Nearest {
        if let (Some(lat), Some(lng)) = (filters.lat, filters.lng) {
            let origin = Point::new(lat, lng);
            if !origin.is_valid() {
                return Err(AppError::Validation("Invalid coordinates".to_string()));
            }
            geo::sort_by_distance(&mut rows, origin, |r| Point::new(r.lat, r.lng));
        }
    }

    let reports = with_details(&state.db.pool, rows, viewer.as_ref()).await?;
    Ok(Json(reports))
}

async fn get_report(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Path(id): Path<String>,
) -> Result<Json<ReportResponse>> {
    let row = fetch_report(&state.db.pool, &id).await?;
    let report = with_details(&state.db.pool, vec![row], viewer.as_ref())
        .await?
        .pop()
        .ok_or_else(|| AppError::NotFound("Report not found".to_string()))?;
    Ok(Json(report))
}

async fn toggle_upvote(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<UpvoteResponse>> {
    ensure_report_exists(&state.db.pool, &id).await?;

    // Row and counter change together or not at all. Write first: a deferred
    // transaction that starts with a read cannot upgrade its lock under contention.
    let mut tx = state.db.pool.begin().await?;

    let removed = sqlx::query("DELETE FROM upvotes WHERE report_id = ? AND user_id = ?")
        .bind(&id)
        .bind(&user.id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let upvoted = if removed > 0 {
        sqlx::query("UPDATE reports SET upvotes = upvotes - 1 WHERE id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await?;
        false
    } else {
        sqlx::query("INSERT INTO upvotes (id, created_at, report_id, user_id) VALUES (?, ?, ?, ?)")
            .bind(Uuid::new_v4().to_string())
            .bind(db::now())
            .bind(&id)
            .bind(&user.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE reports SET upvotes = upvotes + 1 WHERE id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await?;
        true
    };

    let upvotes = sqlx::query_scalar::<_, i64>("SELECT upvotes FROM reports WHERE id = ?")
        .bind(&id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(Json(UpvoteResponse { upvoted, upvotes }))
}

async fn add_comment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    WithRejection(Json(body), _): WithRejection<Json<CreateCommentRequest>, AppError>,
) -> Result<(StatusCode, Json<CommentResponse>)> {
    let text = body.text.trim();
    if text.is_empty() {
        return Err(AppError::Validation("Comment text required".to_string()));
    }

    ensure_report_exists(&state.db.pool, &id).await?;

    let comment_id = Uuid::new_v4().to_string();
    sqlx::query("INSERT INTO comments (id, text, created_at, report_id, user_id) VALUES (?, ?, ?, ?, ?)")
        .bind(&comment_id)
        .bind(text)
        .bind(db::now())
        .bind(&id)
        .bind(&user.id)
        .execute(&state.db.pool)
        .await?;

    let sql = format!(
        "SELECT {COMMENT_COLUMNS} FROM comments c JOIN users u ON c.user_id = u.id WHERE c.id = ?"
    );
    let comment = sqlx::query_as::<_, CommentRow>(&sql)
        .bind(&comment_id)
        .fetch_one(&state.db.pool)
        .await?;

    Ok((StatusCode::CREATED, Json(comment.into())))
}

async fn update_status(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    WithRejection(Json(body), _): WithRejection<Json<UpdateStatusRequest>, AppError>,
) -> Result<Json<ReportResponse>> {
    let status = parse_status(&body.status)?;

    let result = sqlx::query("UPDATE reports SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status)
        .bind(db::now())
        .bind(&id)
        .execute(&state.db.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Report not found".to_string()));
    }

    tracing::info!(report_id = %id, status = %status, admin_id = %admin.id, "report status changed");

    Ok(Json(fetch_report(&state.db.pool, &id).await?.into()))
}

async fn update_report(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    WithRejection(Json(body), _): WithRejection<Json<UpdateReportRequest>, AppError>,
) -> Result<Json<ReportResponse>> {
    let title = body.title.as_deref().map(str::trim);
    let description = body.description.as_deref().map(str::trim);
    if title.is_some_and(str::is_empty) || description.is_some_and(str::is_empty) {
        return Err(AppError::Validation(
            "Title and description cannot be empty".to_string(),
        ));
    }
    let category = body.category.as_deref().map(parse_category).transpose()?;
    let status = body.status.as_deref().map(parse_status).transpose()?;

    let result = sqlx::query(
        r#"
        UPDATE reports SET
            title = COALESCE(?, title),
            description = COALESCE(?, description),
            category = COALESCE(?, category),
            status = COALESCE(?, status),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(title)
    .bind(description)
    .bind(category)
    .bind(status)
    .bind(db::now())
    .bind(&id)
    .execute(&state.db.pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Report not found".to_string()));
    }

    tracing::info!(report_id = %id, admin_id = %admin.id, "report updated");

    Ok(Json(fetch_report(&state.db.pool, &id).await?.into()))
}

async fn delete_report(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    // Comments and upvotes cascade
    let result = sqlx::query("DELETE FROM reports WHERE id = ?")
        .bind(&id)
        .execute(&state.db.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Report not found".to_string()));
    }

    tracing::info!(report_id = %id, admin_id = %admin.id, "report deleted");

    Ok(StatusCode::NO_CONTENT)
}

async fn set_archived(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    WithRejection(Json(body), _): WithRejection<Json<ArchiveRequest>, AppError>,
) -> Result<Json<ReportResponse>> {
    let is_archived = body
        .is_archived
        .ok_or_else(|| AppError::Validation("Invalid archive state".to_string()))?;

    let result = sqlx::query("UPDATE reports SET is_archived = ?, updated_at = ? WHERE id = ?")
        .bind(is_archived)
        .bind(db::now())
        .bind(&id)
        .execute(&state.db.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Report not found".to_string()));
    }

    tracing::info!(report_id = %id, is_archived, admin_id = %admin.id, "report archive state changed");

    Ok(Json(fetch_report(&state.db.pool, &id).await?.into()))
}

async fn bulk_action(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    WithRejection(Json(body), _): WithRejection<Json<BulkActionRequest>, AppError>,
) -> Result<Json<BulkActionResponse>> {
    if body.report_ids.is_empty() {
        return Err(AppError::Validation("No reports selected".to_string()));
    }
    let action = BulkAction::parse(&body.action)
        .ok_or_else(|| AppError::Validation("Invalid action".to_string()))?;

    let updated_at = db::now();
    let mut affected = 0;
    let mut tx = state.db.pool.begin().await?;

    for chunk in body.report_ids.chunks(BIND_CHUNK) {
        let mut query = match action {
            BulkAction::Delete => QueryBuilder::<Sqlite>::new("DELETE FROM reports WHERE id IN ("),
            BulkAction::Archive | BulkAction::Unarchive => {
                let mut q = QueryBuilder::<Sqlite>::new("UPDATE reports SET is_archived = ");
                q.push_bind(action == BulkAction::Archive);
                q.push(", updated_at = ");
                q.push_bind(&updated_at);
                q.push(" WHERE id IN (");
                q
            }
        };
        let mut ids = query.separated(", ");
        for id in chunk {
            ids.push_bind(id);
        }
        ids.push_unseparated(")");

        affected += query.build().execute(&mut *tx).await?.rows_affected();
    }

    tx.commit().await?;

    tracing::info!(action = %body.action, affected, admin_id = %admin.id, "bulk report action");

    Ok(Json(BulkActionResponse {
        action: body.action,
        affected,
    }))
}
