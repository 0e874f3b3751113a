//! Document number routes.
//!
//! `next` consumes a value; `preview` shows what would be allocated next
//! without consuming it (and can be overtaken by a concurrent `next`).

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{Datelike, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;

use saldo_core::sequence::{SequenceScope, format_document_number};
use saldo_db::repositories::SequenceRepository;

use crate::{AppState, error::ApiError};

/// Creates the sequence routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sequences/{scope}/next", post(next_number))
        .route("/sequences/{scope}/preview", get(preview_number))
}

/// Query parameters for number allocation.
#[derive(Debug, Deserialize)]
pub struct SequenceQuery {
    /// Document date deciding the period (defaults to today).
    pub date: Option<NaiveDate>,
}

fn resolve(scope: &str, query: &SequenceQuery) -> Result<(SequenceScope, NaiveDate), ApiError> {
    let scope = SequenceScope::parse(scope)?;
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    Ok((scope, date))
}

/// POST `/sequences/{scope}/next` - Allocate the next document number.
async fn next_number(
    State(state): State<AppState>,
    Path(scope): Path<String>,
    Query(query): Query<SequenceQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (scope, date) = resolve(&scope, &query)?;
    let repo = SequenceRepository::new(state.db.clone())
        .with_retries(state.ledger.contention_retries);
    let sequence = repo.next(scope, date.year()).await?;

    Ok(Json(json!({
        "scope": scope.as_str(),
        "year": date.year(),
        "sequence": sequence,
        "number": format_document_number(scope, date, sequence),
    })))
}

/// GET `/sequences/{scope}/preview` - Preview without consuming.
async fn preview_number(
    State(state): State<AppState>,
    Path(scope): Path<String>,
    Query(query): Query<SequenceQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (scope, date) = resolve(&scope, &query)?;
    let repo = SequenceRepository::new(state.db.clone())
        .with_retries(state.ledger.contention_retries);
    let sequence = repo.preview(scope, date.year()).await?;

    Ok(Json(json!({
        "scope": scope.as_str(),
        "year": date.year(),
        "sequence": sequence,
        "number": format_document_number(scope, date, sequence),
        "preview": true,
    })))
}
