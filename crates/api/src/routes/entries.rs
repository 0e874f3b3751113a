//! Journal entry lifecycle routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use saldo_core::ledger::{CreateEntryInput, EntryStatus, LineInput, SourceType};
use saldo_db::entities::{journal_entries, journal_lines};
use saldo_db::repositories::{
    AuditRepository, EntryFilter, EntryWithLines, LedgerRepository, UpdateEntryInput,
};
use saldo_shared::types::{EntryId, LineId, PageRequest};

use crate::{AppState, error::ApiError};

/// Creates the journal entry routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/entries", get(list_entries))
        .route("/entries", post(create_entry))
        .route("/entries/post", post(create_and_post))
        .route("/entries/{entry_id}", get(get_entry))
        .route("/entries/{entry_id}", put(update_entry))
        .route("/entries/{entry_id}", delete(delete_entry))
        .route("/entries/{entry_id}/post", post(post_entry))
        .route("/entries/{entry_id}/cancel", post(cancel_entry))
        .route("/entries/{entry_id}/reverse", post(reverse_entry))
        .route("/entries/{entry_id}/audit", get(entry_audit))
}

/// A journal line in a request.
#[derive(Debug, Deserialize)]
pub struct LineRequest {
    /// The account to post against.
    pub account_id: Uuid,
    /// Debit amount.
    #[serde(default)]
    pub debit: rust_decimal::Decimal,
    /// Credit amount.
    #[serde(default)]
    pub credit: rust_decimal::Decimal,
    /// Optional per-line description.
    pub description: Option<String>,
}

/// Request body for creating an entry.
#[derive(Debug, Deserialize)]
pub struct CreateEntryRequest {
    /// Source document type (defaults to manual).
    pub source_type: Option<String>,
    /// Source document ID.
    pub source_id: Option<Uuid>,
    /// Source document code.
    pub source_code: Option<String>,
    /// Entry date.
    pub entry_date: NaiveDate,
    /// Description.
    pub description: String,
    /// Free-text reference.
    pub reference: Option<String>,
    /// Free-text notes.
    pub notes: Option<String>,
    /// Journal lines.
    #[serde(default)]
    pub lines: Vec<LineRequest>,
}

impl CreateEntryRequest {
    fn into_input(self) -> Result<CreateEntryInput, ApiError> {
        let source_type = match self.source_type.as_deref() {
            None => SourceType::Manual,
            Some(s) => s.parse::<SourceType>().map_err(ApiError::bad_request)?,
        };
        Ok(CreateEntryInput {
            source_type,
            source_id: self.source_id,
            source_code: self.source_code,
            entry_date: self.entry_date,
            description: self.description,
            reference: self.reference,
            notes: self.notes,
            lines: self
                .lines
                .into_iter()
                .map(|l| LineInput {
                    account_id: l.account_id,
                    debit: l.debit,
                    credit: l.credit,
                    description: l.description,
                })
                .collect(),
        })
    }
}

/// Request body for updating a draft.
#[derive(Debug, Deserialize)]
pub struct UpdateEntryRequest {
    /// New description.
    pub description: Option<String>,
    /// New reference (null clears).
    #[serde(default, with = "double_option")]
    pub reference: Option<Option<String>>,
    /// New notes (null clears).
    #[serde(default, with = "double_option")]
    pub notes: Option<Option<String>>,
}

mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

/// Request body for reversing an entry.
#[derive(Debug, Deserialize)]
pub struct ReverseRequest {
    /// The reason for the reversal.
    pub reason: String,
}

/// Query parameters for listing entries.
#[derive(Debug, Deserialize)]
pub struct ListEntriesQuery {
    /// Filter by status.
    pub status: Option<String>,
    /// Filter by source type.
    pub source_type: Option<String>,
    /// Start date (inclusive).
    pub from: Option<NaiveDate>,
    /// End date (inclusive).
    pub to: Option<NaiveDate>,
    /// Page number (1-indexed).
    pub page: Option<u64>,
    /// Page size.
    pub limit: Option<u64>,
}

/// Response body for a journal line.
#[derive(Debug, Serialize)]
pub struct LineResponse {
    /// Line ID.
    pub id: LineId,
    /// Account posted against.
    pub account_id: Uuid,
    /// Line number (presentation order).
    pub line_number: i32,
    /// Line description.
    pub description: Option<String>,
    /// Debit amount.
    pub debit: String,
    /// Credit amount.
    pub credit: String,
}

impl From<journal_lines::Model> for LineResponse {
    fn from(model: journal_lines::Model) -> Self {
        Self {
            id: LineId::from_uuid(model.id),
            account_id: model.account_id,
            line_number: model.line_number,
            description: model.description,
            debit: model.debit_amount.to_string(),
            credit: model.credit_amount.to_string(),
        }
    }
}

/// Response body for an entry header.
#[derive(Debug, Serialize)]
pub struct EntryResponse {
    /// Entry ID.
    pub id: EntryId,
    /// Human-readable entry number.
    pub entry_number: String,
    /// Source document type.
    pub source_type: String,
    /// Source document ID.
    pub source_id: Option<Uuid>,
    /// Source document code.
    pub source_code: Option<String>,
    /// Entry date.
    pub entry_date: NaiveDate,
    /// Description.
    pub description: String,
    /// Reference.
    pub reference: Option<String>,
    /// Notes.
    pub notes: Option<String>,
    /// Total debit.
    pub total_debit: String,
    /// Total credit.
    pub total_credit: String,
    /// Status.
    pub status: String,
    /// Posting timestamp.
    pub posted_at: Option<String>,
    /// Entry that reversed this one.
    pub reversed_by_id: Option<Uuid>,
    /// Entry this one reverses.
    pub reverses_id: Option<Uuid>,
    /// Reversal reason.
    pub reversal_reason: Option<String>,
    /// Lines, when loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines: Option<Vec<LineResponse>>,
}

impl EntryResponse {
    fn from_model(model: journal_entries::Model, lines: Option<Vec<journal_lines::Model>>) -> Self {
        let status: EntryStatus = model.status.into();
        let source_type: SourceType = model.source_type.into();
        Self {
            id: EntryId::from_uuid(model.id),
            entry_number: model.entry_number,
            source_type: source_type.to_string(),
            source_id: model.source_id,
            source_code: model.source_code,
            entry_date: model.entry_date,
            description: model.description,
            reference: model.reference,
            notes: model.notes,
            total_debit: model.total_debit.to_string(),
            total_credit: model.total_credit.to_string(),
            status: status.to_string(),
            posted_at: model.posted_at.map(|t| t.to_rfc3339()),
            reversed_by_id: model.reversed_by_id,
            reverses_id: model.reverses_id,
            reversal_reason: model.reversal_reason,
            lines: lines.map(|l| l.into_iter().map(Into::into).collect()),
        }
    }
}

impl From<EntryWithLines> for EntryResponse {
    fn from(value: EntryWithLines) -> Self {
        Self::from_model(value.entry, Some(value.lines))
    }
}

/// GET `/entries` - List entries with filters and pagination.
async fn list_entries(
    State(state): State<AppState>,
    Query(query): Query<ListEntriesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let status = match query.status.as_deref() {
        None => None,
        Some("draft") => Some(EntryStatus::Draft),
        Some("posted") => Some(EntryStatus::Posted),
        Some("reversed") => Some(EntryStatus::Reversed),
        Some("cancelled") => Some(EntryStatus::Cancelled),
        Some(other) => return Err(ApiError::bad_request(format!("Unknown status: {other}"))),
    };
    let source_type = query
        .source_type
        .as_deref()
        .map(|s| s.parse::<SourceType>().map_err(ApiError::bad_request))
        .transpose()?;

    let repo = LedgerRepository::new(state.db.clone())
        .with_retries(state.ledger.contention_retries);
    let page = repo
        .list_entries(
            EntryFilter {
                status,
                source_type,
                date_from: query.from,
                date_to: query.to,
            },
            PageRequest {
                page: query.page,
                limit: query.limit,
            },
        )
        .await?;

    let entries: Vec<EntryResponse> = page
        .items
        .into_iter()
        .map(|m| EntryResponse::from_model(m, None))
        .collect();

    Ok(Json(json!({
        "entries": entries,
        "total": page.total,
        "page": page.page,
        "limit": page.limit,
        "total_pages": page.total_pages,
    })))
}

/// POST `/entries` - Create a draft entry.
async fn create_entry(
    State(state): State<AppState>,
    Json(payload): Json<CreateEntryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = LedgerRepository::new(state.db.clone())
        .with_retries(state.ledger.contention_retries);
    let created = repo.create_entry(payload.into_input()?).await?;
    Ok((StatusCode::CREATED, Json(EntryResponse::from(created))))
}

/// POST `/entries/post` - Create and immediately post an entry.
///
/// The common path for business modules; returns the assigned number.
async fn create_and_post(
    State(state): State<AppState>,
    Json(payload): Json<CreateEntryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = LedgerRepository::new(state.db.clone())
        .with_retries(state.ledger.contention_retries);
    let posted = repo.create_and_post(payload.into_input()?).await?;
    Ok((StatusCode::CREATED, Json(EntryResponse::from(posted))))
}

/// GET `/entries/{entry_id}` - Get an entry with its lines.
async fn get_entry(
    State(state): State<AppState>,
    Path(entry_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = LedgerRepository::new(state.db.clone())
        .with_retries(state.ledger.contention_retries);
    let entry = repo.get_entry(entry_id).await?;
    Ok(Json(EntryResponse::from(entry)))
}

/// PUT `/entries/{entry_id}` - Update draft metadata.
async fn update_entry(
    State(state): State<AppState>,
    Path(entry_id): Path<Uuid>,
    Json(payload): Json<UpdateEntryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = LedgerRepository::new(state.db.clone())
        .with_retries(state.ledger.contention_retries);
    let updated = repo
        .update_entry(
            entry_id,
            UpdateEntryInput {
                description: payload.description,
                reference: payload.reference,
                notes: payload.notes,
            },
        )
        .await?;
    Ok(Json(EntryResponse::from_model(updated, None)))
}

/// DELETE `/entries/{entry_id}` - Tombstone a draft entry.
async fn delete_entry(
    State(state): State<AppState>,
    Path(entry_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = LedgerRepository::new(state.db.clone())
        .with_retries(state.ledger.contention_retries);
    repo.delete_entry(entry_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST `/entries/{entry_id}/post` - Post a draft entry.
async fn post_entry(
    State(state): State<AppState>,
    Path(entry_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = LedgerRepository::new(state.db.clone())
        .with_retries(state.ledger.contention_retries);
    let posted = repo.post_entry(entry_id).await?;
    Ok(Json(EntryResponse::from(posted)))
}

/// POST `/entries/{entry_id}/cancel` - Cancel a draft entry.
async fn cancel_entry(
    State(state): State<AppState>,
    Path(entry_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = LedgerRepository::new(state.db.clone())
        .with_retries(state.ledger.contention_retries);
    let cancelled = repo.cancel_entry(entry_id).await?;
    Ok(Json(EntryResponse::from_model(cancelled, None)))
}

/// POST `/entries/{entry_id}/reverse` - Reverse a posted entry.
async fn reverse_entry(
    State(state): State<AppState>,
    Path(entry_id): Path<Uuid>,
    Json(payload): Json<ReverseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.reason.trim().is_empty() {
        return Err(ApiError::bad_request("Reversal reason is required"));
    }
    let repo = LedgerRepository::new(state.db.clone())
        .with_retries(state.ledger.contention_retries);
    let reversal = repo.reverse_entry(entry_id, payload.reason.trim()).await?;
    Ok((StatusCode::CREATED, Json(EntryResponse::from(reversal))))
}

/// GET `/entries/{entry_id}/audit` - Audit trail for one entry.
async fn entry_audit(
    State(state): State<AppState>,
    Path(entry_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    // 404 for unknown entries rather than an empty trail.
    let ledger = LedgerRepository::new(state.db.clone());
    ledger.get_entry(entry_id).await?;

    let audit = AuditRepository::new(state.db.clone());
    let events = audit.list_for_entry(entry_id).await?;

    let events: Vec<_> = events
        .into_iter()
        .map(|e| {
            json!({
                "id": e.id,
                "kind": e.kind,
                "payload": e.payload,
                "correlation_id": e.correlation_id,
                "recorded_at": e.recorded_at.to_rfc3339(),
            })
        })
        .collect();

    Ok(Json(json!({ "entry_id": entry_id, "events": events })))
}
