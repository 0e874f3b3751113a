//! Sequence repository: gapless per-scope, per-year document counters.
//!
//! Allocation is a single atomic upsert-increment; the counter row is
//! created lazily on first use and the value never decreases or repeats,
//! even when the numbered document is later voided.

use sea_orm::{
    ConnectionTrait, DatabaseConnection, DbBackend, DbErr, EntityTrait, Statement,
};
use tracing::warn;

use saldo_core::ledger::LedgerError;
use saldo_core::sequence::SequenceScope;

use crate::entities::sequence_counters;

const ALLOCATE_SQL: &str = "INSERT INTO sequence_counters (scope, year, value, updated_at) \
     VALUES ($1, $2, 1, now()) \
     ON CONFLICT (scope, year) \
     DO UPDATE SET value = sequence_counters.value + 1, updated_at = now() \
     RETURNING value";

/// Sequence repository for counter allocation.
#[derive(Debug, Clone)]
pub struct SequenceRepository {
    db: DatabaseConnection,
    retries: u32,
}

impl SequenceRepository {
    /// Creates a new sequence repository with default retry bounds.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db, retries: 3 }
    }

    /// Overrides the bounded retry count for contended counters.
    #[must_use]
    pub const fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Allocates the next value for `(scope, year)` in its own
    /// transaction, retrying transparently on transient contention.
    ///
    /// # Errors
    ///
    /// Returns `ConcurrentModification` once retries are exhausted, or
    /// `Database` for non-transient failures.
    pub async fn next(&self, scope: SequenceScope, year: i32) -> Result<i64, LedgerError> {
        let mut attempt = 0;
        loop {
            match Self::next_in(&self.db, scope, year).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.retries => {
                    attempt += 1;
                    warn!(scope = %scope, year, attempt, "sequence allocation contended, retrying");
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Allocates the next value inside an existing connection or
    /// transaction, so entry creation and numbering commit together.
    ///
    /// # Errors
    ///
    /// Returns `ConcurrentModification` on transient conflicts (caller
    /// owns the retry; an aborted transaction cannot be resumed) or
    /// `Database` otherwise.
    pub async fn next_in<C: ConnectionTrait>(
        conn: &C,
        scope: SequenceScope,
        year: i32,
    ) -> Result<i64, LedgerError> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            ALLOCATE_SQL,
            [scope.as_str().into(), year.into()],
        );

        let row = conn
            .query_one(stmt)
            .await
            .map_err(map_db_err)?
            .ok_or_else(|| LedgerError::Internal("counter upsert returned no row".to_string()))?;

        row.try_get::<i64>("", "value").map_err(map_db_err)
    }

    /// Returns the value the next allocation would produce, without
    /// consuming it.
    ///
    /// Used for UI previews only. A concurrent allocation between the
    /// preview and the real `next()` can overtake the previewed value;
    /// that race is accepted for preview-only calls.
    ///
    /// # Errors
    ///
    /// Returns `Database` on query failure.
    pub async fn preview(&self, scope: SequenceScope, year: i32) -> Result<i64, LedgerError> {
        let counter = sequence_counters::Entity::find_by_id((scope.as_str().to_string(), year))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(counter.map_or(1, |c| c.value + 1))
    }
}

/// Maps a database error, classifying transient conflicts as retryable.
pub(crate) fn map_db_err(err: DbErr) -> LedgerError {
    if is_transient(&err) {
        LedgerError::ConcurrentModification
    } else {
        LedgerError::from_db(err)
    }
}

/// Serialization failures and deadlocks are transient under concurrent
/// row-locked writes; everything else is not.
fn is_transient(err: &DbErr) -> bool {
    let message = err.to_string();
    message.contains("40001")
        || message.contains("40P01")
        || message.contains("could not serialize")
        || message.contains("deadlock detected")
}
