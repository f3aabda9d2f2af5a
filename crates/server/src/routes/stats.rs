use std::collections::BTreeMap;

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::{
    db::{
        self,
        models::{Category, ReportRow, Status, REPORT_COLUMNS},
    },
    error::Result,
    routes::reports::ReportResponse,
    services::stats::{average_resolution_hours, start_of_day},
    AppState,
};

const RESOLUTION_SAMPLE: i64 = 100;
const RECENT_ACTIVITY: i64 = 10;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_stats))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_reports: i64,
    pub resolved_today: i64,
    pub active_issues: i64,
    /// Hours
    pub avg_resolution_time: i64,
    pub by_category: BTreeMap<&'static str, i64>,
    pub recent_activity: Vec<ReportResponse>,
}

async fn get_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let pool = &state.db.pool;

    let total_reports = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reports")
        .fetch_one(pool)
        .await?;

    let today = db::timestamp(start_of_day(Utc::now()));
    let resolved_today = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM reports WHERE status = ? AND updated_at >= ?",
    )
    .bind(Status::Resolved)
    .bind(&today)
    .fetch_one(pool)
    .await?;

    let active_issues = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM reports WHERE status IN (?, ?)",
    )
    .bind(Status::New)
    .bind(Status::InProgress)
    .fetch_one(pool)
    .await?;

    let resolved = sqlx::query_as::<_, (String, String)>(
        "SELECT created_at, updated_at FROM reports WHERE status = ? ORDER BY updated_at DESC LIMIT ?",
    )
    .bind(Status::Resolved)
    .bind(RESOLUTION_SAMPLE)
    .fetch_all(pool)
    .await?;
    let avg_resolution_time =
        average_resolution_hours(resolved.iter().map(|(c, u)| (c.as_str(), u.as_str())));

    let mut by_category: BTreeMap<&'static str, i64> =
        Category::ALL.iter().map(|c| (c.as_str(), 0)).collect();
    let groups = sqlx::query_as::<_, (Category, i64)>(
        "SELECT category, COUNT(*) FROM reports GROUP BY category",
    )
    .fetch_all(pool)
    .await?;
    for (category, count) in groups {
        by_category.insert(category.as_str(), count);
    }

    let sql = format!(
        "SELECT {REPORT_COLUMNS} FROM reports r LEFT JOIN users u ON r.user_id = u.id ORDER BY r.created_at DESC LIMIT ?"
    );
    let recent_activity = sqlx::query_as::<_, ReportRow>(&sql)
        .bind(RECENT_ACTIVITY)
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(ReportResponse::from)
        .collect();

    Ok(Json(StatsResponse {
        total_reports,
        resolved_today,
        active_issues,
        avg_resolution_time,
        by_category,
        recent_activity,
    }))
}
