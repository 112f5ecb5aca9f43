use std::sync::Arc;

use axum::{
    extract::{Query, Request, State},
    http::{
        header::{AUTHORIZATION, CONTENT_DISPOSITION, CONTENT_TYPE},
        StatusCode,
    },
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tokio::task;

use crate::committee::Committee;
use crate::error::AppError;
use crate::service::{PreparedReport, ReportService};

pub struct AppState {
    pub reports: ReportService,
    pub api_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CommitteeReportQuery {
    #[serde(rename = "committeeType")]
    committee_type: Option<String>,
}

pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/reports/committee-monthly", get(committee_monthly))
        .route("/reports/admin-monthly", get(admin_monthly))
        .route("/committees", get(list_committees))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token));

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn require_token(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = state.api_token.as_deref() else {
        return Ok(next.run(request).await);
    };

    let presented = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim);

    if presented == Some(expected) {
        Ok(next.run(request).await)
    } else {
        Err(AppError::Unauthorized)
    }
}

async fn committee_monthly(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CommitteeReportQuery>,
) -> Result<Response, AppError> {
    let label = query
        .committee_type
        .filter(|value| !value.trim().is_empty())
        .ok_or(AppError::MissingCommitteeType)?;

    match state.reports.committee_report(&label).await? {
        Some(report) => pdf_response(report).await,
        None => Ok((
            StatusCode::OK,
            Json(json!({ "message": "Invalid committee type" })),
        )
            .into_response()),
    }
}

async fn admin_monthly(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let report = state.reports.admin_report().await?;
    pdf_response(report).await
}

async fn list_committees(State(state): State<Arc<AppState>>) -> Json<Vec<Committee>> {
    Json(state.reports.committees().committees().to_vec())
}

async fn pdf_response(report: PreparedReport) -> Result<Response, AppError> {
    let filename = report.filename;
    let bytes = task::spawn_blocking(move || report.to_pdf()).await??;

    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, "application/pdf".to_string()),
            (CONTENT_DISPOSITION, format!("attachment; filename={filename}")),
        ],
        bytes,
    )
        .into_response())
}
