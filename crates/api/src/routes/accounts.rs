//! Chart of accounts routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use saldo_core::account::{AccountChanges, AccountClass};
use saldo_db::entities::accounts;
use saldo_db::repositories::{AccountFilter, AccountRepository, CreateAccountInput};
use saldo_shared::types::AccountId;

use crate::{AppState, error::ApiError};

/// Creates the account routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/accounts", get(list_accounts))
        .route("/accounts", post(create_account))
        .route("/accounts/{account_id}", get(get_account))
        .route("/accounts/{account_id}", put(update_account))
        .route("/accounts/{account_id}", delete(delete_account))
        .route("/accounts/{account_id}/balance", get(get_balance))
        .route("/accounts/{account_id}/reconcile", post(reconcile_account))
}

/// Query parameters for listing accounts.
#[derive(Debug, Deserialize)]
pub struct ListAccountsQuery {
    /// Filter by account class.
    pub class: Option<String>,
    /// Filter by active status.
    pub active: Option<bool>,
}

/// Request body for creating an account.
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    /// Account code (unique among non-deleted accounts).
    pub code: String,
    /// Account name.
    pub name: String,
    /// Account description.
    pub description: Option<String>,
    /// Account class: asset, liability, equity, revenue, expense.
    pub class: String,
    /// Free subtype token.
    pub category: Option<String>,
    /// Parent account ID (must be a summary account).
    pub parent_id: Option<Uuid>,
    /// Whether the balance is derived from children (default: false).
    pub is_summary: Option<bool>,
    /// Whether identity fields are frozen (default: false).
    pub is_critical: Option<bool>,
    /// Whether the account is active (default: true).
    pub is_active: Option<bool>,
}

/// Request body for updating an account.
#[derive(Debug, Deserialize)]
pub struct UpdateAccountRequest {
    /// New account code.
    pub code: Option<String>,
    /// New account name.
    pub name: Option<String>,
    /// New description (null clears).
    #[serde(default, with = "double_option")]
    pub description: Option<Option<String>>,
    /// New account class.
    pub class: Option<String>,
    /// New category (null clears).
    #[serde(default, with = "double_option")]
    pub category: Option<Option<String>>,
    /// New parent (null detaches).
    #[serde(default, with = "double_option")]
    pub parent_id: Option<Option<Uuid>>,
    /// New summary flag.
    pub is_summary: Option<bool>,
    /// New active flag.
    pub is_active: Option<bool>,
}

/// Distinguishes an absent field from an explicit null.
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

/// Response body for an account.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    /// Account ID.
    pub id: AccountId,
    /// Account code.
    pub code: String,
    /// Account name.
    pub name: String,
    /// Account description.
    pub description: Option<String>,
    /// Account class.
    pub class: String,
    /// Category token.
    pub category: Option<String>,
    /// Parent account ID.
    pub parent_id: Option<Uuid>,
    /// Whether the balance is derived from children.
    pub is_summary: bool,
    /// Whether identity fields are frozen.
    pub is_critical: bool,
    /// Whether the account is active.
    pub is_active: bool,
    /// Current balance, normal-balance signed.
    pub balance: String,
}

impl From<accounts::Model> for AccountResponse {
    fn from(model: accounts::Model) -> Self {
        let class: AccountClass = model.class.into();
        Self {
            id: AccountId::from_uuid(model.id),
            code: model.code,
            name: model.name,
            description: model.description,
            class: class.to_string(),
            category: model.category,
            parent_id: model.parent_id,
            is_summary: model.is_summary,
            is_critical: model.is_critical,
            is_active: model.is_active,
            balance: model.balance.to_string(),
        }
    }
}

fn parse_class(value: &str) -> Result<AccountClass, ApiError> {
    value.parse::<AccountClass>().map_err(ApiError::bad_request)
}

/// GET `/accounts` - List accounts with balances.
async fn list_accounts(
    State(state): State<AppState>,
    Query(query): Query<ListAccountsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let class = query.class.as_deref().map(parse_class).transpose()?;
    let repo = AccountRepository::new(state.db.clone());
    let accounts = repo
        .list_accounts(AccountFilter {
            class,
            is_active: query.active,
            parent_id: None,
        })
        .await?;

    let response: Vec<AccountResponse> = accounts.into_iter().map(Into::into).collect();
    Ok(Json(json!({ "accounts": response })))
}

/// POST `/accounts` - Create an account.
async fn create_account(
    State(state): State<AppState>,
    Json(payload): Json<CreateAccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let class = parse_class(&payload.class)?;
    let repo = AccountRepository::new(state.db.clone());
    let account = repo
        .create_account(CreateAccountInput {
            code: payload.code,
            name: payload.name,
            description: payload.description,
            class,
            category: payload.category,
            parent_id: payload.parent_id,
            is_summary: payload.is_summary.unwrap_or(false),
            is_critical: payload.is_critical.unwrap_or(false),
            is_active: payload.is_active.unwrap_or(true),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(AccountResponse::from(account))))
}

/// GET `/accounts/{account_id}` - Get one account.
async fn get_account(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = AccountRepository::new(state.db.clone());
    let account = repo
        .find_account(account_id)
        .await?
        .ok_or(saldo_core::ledger::LedgerError::AccountNotFound(account_id))?;

    Ok(Json(AccountResponse::from(account)))
}

/// PUT `/accounts/{account_id}` - Update an account.
async fn update_account(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
    Json(payload): Json<UpdateAccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let class = payload.class.as_deref().map(parse_class).transpose()?;
    let repo = AccountRepository::new(state.db.clone());
    let account = repo
        .update_account(
            account_id,
            AccountChanges {
                code: payload.code,
                name: payload.name,
                description: payload.description,
                class,
                category: payload.category,
                parent_id: payload.parent_id,
                is_summary: payload.is_summary,
                is_active: payload.is_active,
            },
        )
        .await?;

    Ok(Json(AccountResponse::from(account)))
}

/// DELETE `/accounts/{account_id}` - Tombstone an account.
async fn delete_account(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = AccountRepository::new(state.db.clone());
    repo.delete_account(account_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET `/accounts/{account_id}/balance` - Current signed balance.
async fn get_balance(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = AccountRepository::new(state.db.clone());
    let balance = repo.balance(account_id).await?;
    Ok(Json(json!({
        "account_id": account_id,
        "balance": balance.to_string(),
    })))
}

/// POST `/accounts/{account_id}/reconcile` - Re-derive and repair the
/// subtree's balances from posted lines.
async fn reconcile_account(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = AccountRepository::new(state.db.clone());
    let report = repo.reconcile(account_id).await?;

    let drifts: Vec<_> = report
        .drifts
        .iter()
        .map(|d| {
            json!({
                "account_id": d.account_id,
                "stored": d.stored.to_string(),
                "computed": d.computed.to_string(),
            })
        })
        .collect();

    Ok(Json(json!({
        "account_id": report.account_id,
        "accounts_checked": report.accounts_checked,
        "drifts": drifts,
    })))
}
