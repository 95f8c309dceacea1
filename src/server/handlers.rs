use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::core::{DiffResult, DiffStats, EmailRequest, GenerateSummaryRequest, TranscriptKind};
use crate::store::{EmailRecord, EmailStatus, SummaryVersionRecord};
use super::response::{ApiError, ApiResult};
use super::AppState;

const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub id: String,
    pub original_name: String,
    pub size: i64,
    pub word_count: i64,
    pub file_type: String,
    pub sha256: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub file_id: String,
    pub message: String,
    pub file_info: FileInfo,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileView {
    pub id: String,
    pub original_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedSummary {
    pub id: String,
    pub content: String,
    pub prompt: String,
    pub created_at: DateTime<Utc>,
    pub version: i64,
    pub tokens_used: Option<i64>,
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionView {
    pub id: String,
    pub content: String,
    pub prompt: String,
    pub created_at: DateTime<Utc>,
    pub version: i64,
}

impl From<SummaryVersionRecord> for VersionView {
    fn from(record: SummaryVersionRecord) -> Self {
        Self {
            id: record.id,
            content: record.content,
            prompt: record.prompt,
            created_at: record.created_at,
            version: record.version,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryDetail {
    pub id: String,
    pub file_id: String,
    pub content: String,
    pub prompt: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i64,
    pub tokens_used: Option<i64>,
    pub model: Option<String>,
    pub versions: Vec<VersionView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedSummary {
    pub id: String,
    pub content: String,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSummaryBody {
    #[serde(default)]
    pub content: String,

    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VersionRange {
    pub from: Option<i64>,
    pub to: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct DiffBody {
    #[serde(default)]
    pub previous: String,

    #[serde(default)]
    pub current: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResponse {
    pub success: bool,
    pub diff: DiffResult,
    pub stats: DiffStats,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionDiffResponse {
    pub success: bool,
    pub summary_id: String,
    pub from: i64,
    pub to: i64,
    pub diff: DiffResult,
    pub stats: DiffStats,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareView {
    pub id: String,
    pub summary_id: String,
    pub recipient_email: String,
    pub subject: String,
    pub message: String,
    pub sent_at: Option<DateTime<Utc>>,
    pub status: EmailStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<EmailRecord> for ShareView {
    fn from(record: EmailRecord) -> Self {
        Self {
            id: record.id,
            summary_id: record.summary_id,
            recipient_email: record.recipient_email,
            subject: record.subject,
            message: record.message,
            sent_at: record.sent_at,
            status: record.status,
            error: record.error,
        }
    }
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "OK",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

pub async fn db_health(State(state): State<AppState>) -> Response {
    match state.engine.db_health().await {
        Ok(()) => Json(json!({
            "success": true,
            "status": "OK",
            "database": "Connected",
            "timestamp": Utc::now().to_rfc3339(),
        }))
        .into_response(),
        Err(e) => {
            error!("Database health check failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "status": "ERROR",
                    "database": "Connection failed",
                    "error": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}

/// Content type to process an upload as, falling back to the file extension
fn resolve_mime(content_type: Option<&str>, file_name: &str) -> String {
    match content_type {
        Some(ct) if TranscriptKind::from_mime(ct).is_some() => ct.to_string(),
        other => TranscriptKind::from_file_name(file_name)
            .map(|kind| kind.mime_type().to_string())
            .unwrap_or_else(|| other.unwrap_or("application/octet-stream").to_string()),
    }
}

pub async fn upload_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<(StatusCode, Json<UploadResponse>)> {
    let mut multipart = multipart?;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("transcript").to_string();
        let mime_type = resolve_mime(field.content_type(), &file_name);
        let bytes = field.bytes().await?;
        debug!("Received upload {} ({}, {} bytes)", file_name, mime_type, bytes.len());

        let uploaded = state.engine.upload_file(&file_name, &mime_type, &bytes).await?;
        let file = uploaded.file;

        return Ok((
            StatusCode::CREATED,
            Json(UploadResponse {
                success: true,
                file_id: file.id.clone(),
                message: "File uploaded successfully".to_string(),
                file_info: FileInfo {
                    id: file.id,
                    original_name: file.original_name,
                    size: file.file_size,
                    word_count: file.word_count,
                    file_type: uploaded.kind.as_str().to_string(),
                    sha256: file.content_sha256,
                },
            }),
        ));
    }

    Err(ApiError::bad_request("No file uploaded"))
}

pub async fn get_file(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let file = state.engine.get_file(&file_id).await?;
    Ok(Json(json!({
        "success": true,
        "file": FileView {
            id: file.id,
            original_name: file.original_name,
            content: file.content,
            created_at: file.created_at,
        },
    })))
}

pub async fn generate_summary(
    State(state): State<AppState>,
    payload: Result<Json<GenerateSummaryRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(request) = payload?;
    let summary = state.engine.generate_summary(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "summary": GeneratedSummary {
                id: summary.id,
                content: summary.content,
                prompt: summary.original_prompt,
                created_at: summary.created_at,
                version: summary.version,
                tokens_used: summary.tokens_used,
                model: summary.model,
            },
        })),
    ))
}

pub async fn get_summary(
    State(state): State<AppState>,
    Path(summary_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let found = state.engine.get_summary(&summary_id).await?;
    let summary = found.summary;

    Ok(Json(json!({
        "success": true,
        "summary": SummaryDetail {
            id: summary.id,
            file_id: summary.file_id,
            content: summary.content,
            prompt: summary.original_prompt,
            created_at: summary.created_at,
            updated_at: summary.updated_at,
            version: summary.version,
            tokens_used: summary.tokens_used,
            model: summary.model,
            versions: found.versions.into_iter().map(VersionView::from).collect(),
        },
    })))
}

pub async fn update_summary(
    State(state): State<AppState>,
    Path(summary_id): Path<String>,
    payload: Result<Json<UpdateSummaryBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = payload?;
    let summary = state
        .engine
        .update_summary(&summary_id, &body.content, body.prompt)
        .await?;

    Ok(Json(json!({
        "success": true,
        "summary": UpdatedSummary {
            id: summary.id,
            content: summary.content,
            version: summary.version,
            updated_at: summary.updated_at,
        },
    })))
}

pub async fn list_versions(
    State(state): State<AppState>,
    Path(summary_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let versions: Vec<VersionView> = state
        .engine
        .list_versions(&summary_id)
        .await?
        .into_iter()
        .map(VersionView::from)
        .collect();

    Ok(Json(json!({ "success": true, "versions": versions })))
}

pub async fn summary_diff(
    State(state): State<AppState>,
    Path(summary_id): Path<String>,
    range: Result<Query<VersionRange>, QueryRejection>,
) -> ApiResult<Json<VersionDiffResponse>> {
    let Query(range) = range?;
    let comparison = state
        .engine
        .compare_versions(&summary_id, range.from, range.to)
        .await?;

    Ok(Json(VersionDiffResponse {
        success: true,
        summary_id: comparison.summary_id,
        from: comparison.from,
        to: comparison.to,
        stats: comparison.diff.stats(),
        diff: comparison.diff,
    }))
}

pub async fn diff_texts(
    State(state): State<AppState>,
    payload: Result<Json<DiffBody>, JsonRejection>,
) -> ApiResult<Json<DiffResponse>> {
    let Json(body) = payload?;
    let diff = state.engine.diff_texts(&body.previous, &body.current);

    Ok(Json(DiffResponse {
        success: true,
        stats: diff.stats(),
        diff,
    }))
}

pub async fn send_email(
    State(state): State<AppState>,
    payload: Result<Json<EmailRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = payload?;
    let record = state.engine.send_email(request).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Email sent successfully",
        "emailRequest": ShareView::from(record),
    })))
}

pub async fn email_history(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let shares: Vec<ShareView> = state
        .engine
        .email_history()
        .await?
        .into_iter()
        .map(ShareView::from)
        .collect();

    Ok(Json(json!({ "success": true, "shares": shares })))
}

pub async fn get_email_share(
    State(state): State<AppState>,
    Path(share_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let record = state.engine.get_email_record(&share_id).await?;
    Ok(Json(json!({ "success": true, "share": ShareView::from(record) })))
}

pub async fn not_found() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "Route not found")
}
