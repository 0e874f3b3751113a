//! Audit repository: append-only event log.
//!
//! Events are written inside the same transaction as the transition they
//! record, so a rolled-back posting leaves no trace. No update or delete
//! path exists.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

use saldo_core::audit::{AuditKind, AuditPayload};
use saldo_core::ledger::LedgerError;

use crate::entities::audit_events;

use super::sequence::map_db_err;

/// Audit repository for recording and querying lifecycle events.
#[derive(Debug, Clone)]
pub struct AuditRepository {
    db: DatabaseConnection,
}

impl AuditRepository {
    /// Creates a new audit repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Appends one event within the caller's transaction.
    ///
    /// # Errors
    ///
    /// Returns `Database` on insert failure.
    pub async fn record<C: ConnectionTrait>(
        conn: &C,
        entry_id: Option<Uuid>,
        kind: AuditKind,
        payload: AuditPayload,
        correlation_id: Uuid,
    ) -> Result<audit_events::Model, LedgerError> {
        let event = audit_events::ActiveModel {
            id: Set(Uuid::now_v7()),
            entry_id: Set(entry_id),
            kind: Set(kind.into()),
            payload: Set(payload.into_value()),
            correlation_id: Set(correlation_id),
            recorded_at: Set(Utc::now().into()),
        };

        event.insert(conn).await.map_err(map_db_err)
    }

    /// Lists all events for one entry, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `Database` on query failure.
    pub async fn list_for_entry(
        &self,
        entry_id: Uuid,
    ) -> Result<Vec<audit_events::Model>, LedgerError> {
        audit_events::Entity::find()
            .filter(audit_events::Column::EntryId.eq(entry_id))
            .order_by_asc(audit_events::Column::RecordedAt)
            .all(&self.db)
            .await
            .map_err(map_db_err)
    }

    /// Lists all events sharing one correlation identifier, oldest first.
    ///
    /// Ties together the original and mirror entry of a reversal, or the
    /// drift events of one reconciliation run.
    ///
    /// # Errors
    ///
    /// Returns `Database` on query failure.
    pub async fn list_by_correlation(
        &self,
        correlation_id: Uuid,
    ) -> Result<Vec<audit_events::Model>, LedgerError> {
        audit_events::Entity::find()
            .filter(audit_events::Column::CorrelationId.eq(correlation_id))
            .order_by_asc(audit_events::Column::RecordedAt)
            .all(&self.db)
            .await
            .map_err(map_db_err)
    }
}
