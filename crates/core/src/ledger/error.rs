//! Ledger error types for validation, state, and integrity errors.
//!
//! This module defines all errors that can occur during ledger operations:
//! validation errors, transition errors, account integrity errors, and
//! transient contention errors.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use super::types::EntryStatus;
use crate::account::ProtectedField;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Entry must have at least 2 lines to post.
    #[error("Entry must have at least 2 lines to post")]
    InsufficientLines,

    /// Entry is not balanced (debits != credits).
    #[error("Entry is not balanced. Debit: {debit}, Credit: {credit}")]
    Unbalanced {
        /// Total debit amount.
        debit: Decimal,
        /// Total credit amount.
        credit: Decimal,
    },

    /// Entry totals are zero.
    #[error("Entry totals must be positive")]
    ZeroAmount,

    /// Line amount cannot be negative.
    #[error("Line {line_number} has a negative amount")]
    NegativeAmount {
        /// The offending line number.
        line_number: u32,
    },

    /// A line must be either a debit or a credit, never both.
    #[error("Line {line_number} has both debit and credit set")]
    BothSidesSet {
        /// The offending line number.
        line_number: u32,
    },

    /// A line with neither debit nor credit is meaningless.
    #[error("Line {line_number} has neither debit nor credit set")]
    EmptyLine {
        /// The offending line number.
        line_number: u32,
    },

    // ========== State Errors ==========
    /// Illegal entry status transition.
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition {
        /// The current status.
        from: EntryStatus,
        /// The requested status.
        to: EntryStatus,
    },

    /// Entry has already been reversed.
    #[error("Entry {0} has already been reversed")]
    AlreadyReversed(Uuid),

    /// Only posted entries can be reversed.
    #[error("Entry {0} is not posted and cannot be reversed")]
    NotPosted(Uuid),

    /// A reversal entry cannot itself be reversed.
    #[error("Entry {0} is a reversal and cannot be reversed")]
    ReversalOfReversal(Uuid),

    /// An entry cannot reverse itself.
    #[error("Entry {0} cannot reverse itself")]
    SelfReversal(Uuid),

    /// Entry content is immutable after leaving DRAFT.
    #[error("Entry {0} can no longer be modified")]
    Immutable(Uuid),

    /// Entry not found.
    #[error("Entry not found: {0}")]
    EntryNotFound(Uuid),

    // ========== Integrity Errors ==========
    /// Protected field of a critical account may not change.
    #[error("Account {account} is critical; field '{field}' is protected")]
    CriticalFieldProtected {
        /// The account ID.
        account: Uuid,
        /// The protected field.
        field: ProtectedField,
    },

    /// Summary accounts derive their balance and reject direct postings.
    #[error("Account {0} is a summary account and cannot be posted to")]
    SummaryPosting(Uuid),

    /// A parent account must be a summary node.
    #[error("Parent account {0} is not a summary account")]
    ParentNotSummary(Uuid),

    /// The account hierarchy contains a cycle.
    #[error("Account hierarchy cycle detected at account {0}")]
    HierarchyCycle(Uuid),

    /// Account code already in use by a non-deleted account.
    #[error("Account code '{0}' already exists")]
    DuplicateCode(String),

    /// Account is inactive and cannot be posted to.
    #[error("Account {0} is inactive")]
    AccountInactive(Uuid),

    /// Account not found (or tombstoned).
    #[error("Account not found: {0}")]
    AccountNotFound(Uuid),

    /// Account still has posted lines and cannot be deleted.
    #[error("Account {0} has posted lines and cannot be deleted")]
    HasPostedLines(Uuid),

    /// Account still has children and cannot be deleted.
    #[error("Account {0} has child accounts and cannot be deleted")]
    HasChildren(Uuid),

    /// Unknown sequence scope.
    #[error("Unknown sequence scope: {0}")]
    UnknownScope(String),

    // ========== Concurrency Errors ==========
    /// Concurrent modification detected; safe to retry.
    #[error("Concurrent modification detected, please retry")]
    ConcurrentModification,

    // ========== Reconciliation ==========
    /// Stored balance disagrees with the balance derived from posted lines.
    #[error("Reconciliation drift on account {account}: stored {stored}, computed {computed}")]
    ReconciliationDrift {
        /// The drifted account.
        account: Uuid,
        /// The stored incremental balance.
        stored: Decimal,
        /// The balance recomputed from posted lines.
        computed: Decimal,
    },

    // ========== Infrastructure ==========
    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Wraps a database-layer failure.
    pub fn from_db(err: impl std::fmt::Display) -> Self {
        Self::Database(err.to_string())
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InsufficientLines => "INSUFFICIENT_LINES",
            Self::Unbalanced { .. } => "UNBALANCED_ENTRY",
            Self::ZeroAmount => "ZERO_AMOUNT",
            Self::NegativeAmount { .. } => "NEGATIVE_AMOUNT",
            Self::BothSidesSet { .. } => "BOTH_SIDES_SET",
            Self::EmptyLine { .. } => "EMPTY_LINE",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::AlreadyReversed(_) => "ALREADY_REVERSED",
            Self::NotPosted(_) => "NOT_POSTED",
            Self::ReversalOfReversal(_) => "REVERSAL_OF_REVERSAL",
            Self::SelfReversal(_) => "SELF_REVERSAL",
            Self::Immutable(_) => "ENTRY_IMMUTABLE",
            Self::EntryNotFound(_) => "ENTRY_NOT_FOUND",
            Self::CriticalFieldProtected { .. } => "CRITICAL_FIELD_PROTECTED",
            Self::SummaryPosting(_) => "SUMMARY_POSTING",
            Self::ParentNotSummary(_) => "PARENT_NOT_SUMMARY",
            Self::HierarchyCycle(_) => "HIERARCHY_CYCLE",
            Self::DuplicateCode(_) => "DUPLICATE_CODE",
            Self::AccountInactive(_) => "ACCOUNT_INACTIVE",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::HasPostedLines(_) => "HAS_POSTED_LINES",
            Self::HasChildren(_) => "HAS_CHILDREN",
            Self::UnknownScope(_) => "UNKNOWN_SCOPE",
            Self::ConcurrentModification => "CONCURRENT_MODIFICATION",
            Self::ReconciliationDrift { .. } => "RECONCILIATION_DRIFT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::InsufficientLines
            | Self::Unbalanced { .. }
            | Self::ZeroAmount
            | Self::NegativeAmount { .. }
            | Self::BothSidesSet { .. }
            | Self::EmptyLine { .. }
            | Self::UnknownScope(_) => 400,

            // 404 Not Found
            Self::EntryNotFound(_) | Self::AccountNotFound(_) => 404,

            // 409 Conflict - concurrency and uniqueness
            Self::ConcurrentModification | Self::DuplicateCode(_) => 409,

            // 422 Unprocessable - state and integrity violations
            Self::InvalidTransition { .. }
            | Self::AlreadyReversed(_)
            | Self::NotPosted(_)
            | Self::ReversalOfReversal(_)
            | Self::SelfReversal(_)
            | Self::Immutable(_)
            | Self::CriticalFieldProtected { .. }
            | Self::SummaryPosting(_)
            | Self::ParentNotSummary(_)
            | Self::HierarchyCycle(_)
            | Self::AccountInactive(_)
            | Self::HasPostedLines(_)
            | Self::HasChildren(_) => 422,

            // 500 Internal Server Error
            Self::ReconciliationDrift { .. } | Self::Database(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns true if this error is transient and safe to retry.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_codes() {
        assert_eq!(LedgerError::InsufficientLines.error_code(), "INSUFFICIENT_LINES");
        assert_eq!(
            LedgerError::Unbalanced {
                debit: dec!(100.00),
                credit: dec!(50.00),
            }
            .error_code(),
            "UNBALANCED_ENTRY"
        );
        assert_eq!(
            LedgerError::SummaryPosting(Uuid::nil()).error_code(),
            "SUMMARY_POSTING"
        );
        assert_eq!(
            LedgerError::ConcurrentModification.error_code(),
            "CONCURRENT_MODIFICATION"
        );
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(LedgerError::InsufficientLines.http_status_code(), 400);
        assert_eq!(LedgerError::EntryNotFound(Uuid::nil()).http_status_code(), 404);
        assert_eq!(LedgerError::ConcurrentModification.http_status_code(), 409);
        assert_eq!(
            LedgerError::InvalidTransition {
                from: EntryStatus::Posted,
                to: EntryStatus::Draft,
            }
            .http_status_code(),
            422
        );
        assert_eq!(
            LedgerError::Database("boom".to_string()).http_status_code(),
            500
        );
    }

    #[test]
    fn test_retryable_errors() {
        assert!(LedgerError::ConcurrentModification.is_retryable());
        assert!(!LedgerError::InsufficientLines.is_retryable());
        assert!(!LedgerError::ZeroAmount.is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = LedgerError::Unbalanced {
            debit: dec!(100.00),
            credit: dec!(50.00),
        };
        assert_eq!(
            err.to_string(),
            "Entry is not balanced. Debit: 100.00, Credit: 50.00"
        );
    }
}
