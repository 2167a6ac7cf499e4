//! Route handler functions for all API endpoints.
//!
//! Each handler extracts query/path/body input via axum extractors, calls
//! the shared `RecordService`, and wraps the result in an `Envelope`.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vault_core::report::Statistics;
use vault_core::types::{parse_date, NewRecord, Record, RecordId, RecordUpdate};
use vault_storage::Committed;

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub sort: Option<String>,
    pub order: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub keyword: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRecordRequest {
    pub id: Option<RecordId>,
    #[serde(default)]
    pub name: String,
    /// `YYYY-MM-DD`; today when omitted.
    pub created: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRecordRequest {
    #[serde(default)]
    pub name: String,
    pub created: Option<String>,
}

// =============================================================================
// Response types
// =============================================================================

/// Success envelope shared by every endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    /// Snapshot written by a mutating request, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<String>,
    pub data: T,
}

impl<T> Envelope<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            count: None,
            message: None,
            warning: None,
            backup: None,
            data,
        }
    }

    fn with_message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }

    fn committed(committed: Committed<T>, message: &str) -> Self {
        let mut envelope = Self::ok(committed.value).with_message(message);
        envelope.backup = committed.backup.map(|p| p.display().to_string());
        envelope
    }
}

impl Envelope<Vec<Record>> {
    fn list(records: Vec<Record>) -> Self {
        let mut envelope = Self::ok(records);
        envelope.count = Some(envelope.data.len());
        envelope
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub uptime_secs: u64,
    pub features: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExportInfo {
    pub file: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// GET / - liveness and feature descriptor.
pub async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    Json(RootResponse {
        message: "Secure Data Vault API is running".to_string(),
        status: "OK".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        features: ["CRUD", "Search", "Sort", "Export", "Backup", "Statistics"]
            .into_iter()
            .map(String::from)
            .collect(),
    })
}

/// GET /records - all records, optionally sorted with `?sort=&order=`.
pub async fn list_records(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Envelope<Vec<Record>>>, ApiError> {
    if params.sort.is_none() && params.order.is_none() {
        let records = state.service.list()?;
        return Ok(Json(Envelope::list(records)));
    }

    let sorted = state.service.sorted(
        params.sort.as_deref().unwrap_or("name"),
        params.order.as_deref().unwrap_or("asc"),
    )?;
    let mut envelope = Envelope::list(sorted.records);
    envelope.warning = sorted.warning;
    Ok(Json(envelope))
}

/// GET /records/{id} - one record.
pub async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Record>>, ApiError> {
    let id = parse_id(&id)?;
    let record = state.service.get(id)?;
    Ok(Json(Envelope::ok(record)))
}

/// POST /records - insert a record and snapshot.
pub async fn create_record(
    State(state): State<AppState>,
    body: Result<Json<CreateRecordRequest>, JsonRejection>,
) -> Result<Json<Envelope<Record>>, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let input = NewRecord {
        id: req.id,
        name: req.name,
        created: req.created.as_deref().map(parse_date).transpose()?,
    };
    let committed = state.service.add(&input)?;
    Ok(Json(Envelope::committed(
        committed,
        "Record added successfully",
    )))
}

/// PUT /records/{id} - rename and optionally re-date a record.
pub async fn update_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<UpdateRecordRequest>, JsonRejection>,
) -> Result<Json<Envelope<Record>>, ApiError> {
    let id = parse_id(&id)?;
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let update = RecordUpdate {
        name: req.name,
        created: req.created.as_deref().map(parse_date).transpose()?,
    };
    let committed = state.service.update(id, &update)?;
    Ok(Json(Envelope::committed(
        committed,
        "Record updated successfully",
    )))
}

/// DELETE /records/{token} - delete by id, or by name when not numeric.
pub async fn delete_record(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<Envelope<Record>>, ApiError> {
    let committed = state.service.delete_by_token(&token)?;
    Ok(Json(Envelope::committed(
        committed,
        "Record deleted successfully",
    )))
}

/// GET /search?keyword= - matches on name substring or exact id.
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Envelope<Vec<Record>>>, ApiError> {
    let keyword = params.keyword.unwrap_or_default();
    let records = state.service.search(&keyword)?;
    Ok(Json(Envelope::list(records)))
}

/// GET /stats - aggregate statistics.
pub async fn stats(State(state): State<AppState>) -> Result<Json<Envelope<Statistics>>, ApiError> {
    let stats = state.service.statistics()?;
    Ok(Json(Envelope::ok(stats)))
}

/// GET /export - write the export file and report its name.
pub async fn export(State(state): State<AppState>) -> Result<Json<Envelope<ExportInfo>>, ApiError> {
    let path = state.service.export()?;
    let file = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    let message = format!("Data exported successfully to {}", file);
    Ok(Json(Envelope::ok(ExportInfo { file }).with_message(&message)))
}

fn parse_id(raw: &str) -> Result<RecordId, ApiError> {
    raw.trim()
        .parse::<RecordId>()
        .map_err(|_| ApiError::BadRequest(format!("Invalid record id '{}'", raw)))
}
