//! String-backed database enums with conversions to the domain types.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Account class stored in `accounts.class`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum AccountClass {
    /// Asset account.
    #[sea_orm(string_value = "asset")]
    Asset,
    /// Liability account.
    #[sea_orm(string_value = "liability")]
    Liability,
    /// Equity account.
    #[sea_orm(string_value = "equity")]
    Equity,
    /// Revenue account.
    #[sea_orm(string_value = "revenue")]
    Revenue,
    /// Expense account.
    #[sea_orm(string_value = "expense")]
    Expense,
}

impl From<AccountClass> for saldo_core::account::AccountClass {
    fn from(value: AccountClass) -> Self {
        match value {
            AccountClass::Asset => Self::Asset,
            AccountClass::Liability => Self::Liability,
            AccountClass::Equity => Self::Equity,
            AccountClass::Revenue => Self::Revenue,
            AccountClass::Expense => Self::Expense,
        }
    }
}

impl From<saldo_core::account::AccountClass> for AccountClass {
    fn from(value: saldo_core::account::AccountClass) -> Self {
        use saldo_core::account::AccountClass as Core;
        match value {
            Core::Asset => Self::Asset,
            Core::Liability => Self::Liability,
            Core::Equity => Self::Equity,
            Core::Revenue => Self::Revenue,
            Core::Expense => Self::Expense,
        }
    }
}

/// Entry status stored in `journal_entries.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// Draft entry.
    #[sea_orm(string_value = "draft")]
    Draft,
    /// Posted entry.
    #[sea_orm(string_value = "posted")]
    Posted,
    /// Reversed entry.
    #[sea_orm(string_value = "reversed")]
    Reversed,
    /// Cancelled entry.
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl From<EntryStatus> for saldo_core::ledger::EntryStatus {
    fn from(value: EntryStatus) -> Self {
        match value {
            EntryStatus::Draft => Self::Draft,
            EntryStatus::Posted => Self::Posted,
            EntryStatus::Reversed => Self::Reversed,
            EntryStatus::Cancelled => Self::Cancelled,
        }
    }
}

impl From<saldo_core::ledger::EntryStatus> for EntryStatus {
    fn from(value: saldo_core::ledger::EntryStatus) -> Self {
        use saldo_core::ledger::EntryStatus as Core;
        match value {
            Core::Draft => Self::Draft,
            Core::Posted => Self::Posted,
            Core::Reversed => Self::Reversed,
            Core::Cancelled => Self::Cancelled,
        }
    }
}

/// Source document type stored in `journal_entries.source_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Sales invoice.
    #[sea_orm(string_value = "sale")]
    Sale,
    /// Purchase/vendor bill.
    #[sea_orm(string_value = "purchase")]
    Purchase,
    /// Payment.
    #[sea_orm(string_value = "payment")]
    Payment,
    /// Cash/bank movement.
    #[sea_orm(string_value = "cash_bank")]
    CashBank,
    /// Adjustment.
    #[sea_orm(string_value = "adjustment")]
    Adjustment,
    /// Manual journal entry.
    #[sea_orm(string_value = "manual")]
    Manual,
    /// Generated reversal.
    #[sea_orm(string_value = "reversal")]
    Reversal,
}

impl From<SourceType> for saldo_core::ledger::SourceType {
    fn from(value: SourceType) -> Self {
        match value {
            SourceType::Sale => Self::Sale,
            SourceType::Purchase => Self::Purchase,
            SourceType::Payment => Self::Payment,
            SourceType::CashBank => Self::CashBank,
            SourceType::Adjustment => Self::Adjustment,
            SourceType::Manual => Self::Manual,
            SourceType::Reversal => Self::Reversal,
        }
    }
}

impl From<saldo_core::ledger::SourceType> for SourceType {
    fn from(value: saldo_core::ledger::SourceType) -> Self {
        use saldo_core::ledger::SourceType as Core;
        match value {
            Core::Sale => Self::Sale,
            Core::Purchase => Self::Purchase,
            Core::Payment => Self::Payment,
            Core::CashBank => Self::CashBank,
            Core::Adjustment => Self::Adjustment,
            Core::Manual => Self::Manual,
            Core::Reversal => Self::Reversal,
        }
    }
}

/// Audit event kind stored in `audit_events.kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    /// Entry created.
    #[sea_orm(string_value = "created")]
    Created,
    /// Entry posted.
    #[sea_orm(string_value = "posted")]
    Posted,
    /// Entry reversed.
    #[sea_orm(string_value = "reversed")]
    Reversed,
    /// Draft cancelled.
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    /// Draft metadata updated.
    #[sea_orm(string_value = "updated")]
    Updated,
    /// Draft tombstoned.
    #[sea_orm(string_value = "deleted")]
    Deleted,
    /// Reconciliation drift detected.
    #[sea_orm(string_value = "drift_detected")]
    DriftDetected,
}

impl From<saldo_core::audit::AuditKind> for AuditKind {
    fn from(value: saldo_core::audit::AuditKind) -> Self {
        use saldo_core::audit::AuditKind as Core;
        match value {
            Core::Created => Self::Created,
            Core::Posted => Self::Posted,
            Core::Reversed => Self::Reversed,
            Core::Cancelled => Self::Cancelled,
            Core::Updated => Self::Updated,
            Core::Deleted => Self::Deleted,
            Core::DriftDetected => Self::DriftDetected,
        }
    }
}
