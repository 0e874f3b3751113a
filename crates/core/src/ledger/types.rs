//! Ledger domain types for journal entries and lines.
//!
//! This module defines the core types used for creating and posting
//! journal entries in the double-entry bookkeeping system.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Journal entry status.
///
/// Entries progress DRAFT -> POSTED -> REVERSED, or DRAFT -> CANCELLED.
/// No transition ever re-enters DRAFT; POSTED content is immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// Entry is being drafted and can be modified.
    Draft,
    /// Entry has been posted to the ledger (immutable).
    Posted,
    /// Entry has been reversed by a mirror entry (immutable).
    Reversed,
    /// Entry was cancelled while still a draft (immutable).
    Cancelled,
}

impl EntryStatus {
    /// Returns true if the entry content can still be modified.
    #[must_use]
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Draft)
    }

    /// Returns true if this status accepts no further transitions.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Reversed | Self::Cancelled)
    }

    /// Returns true if the entry can be posted.
    #[must_use]
    pub fn can_post(&self) -> bool {
        matches!(self, Self::Draft)
    }

    /// Returns true if the entry can be cancelled.
    #[must_use]
    pub fn can_cancel(&self) -> bool {
        matches!(self, Self::Draft)
    }

    /// Returns true if the entry can be reversed.
    #[must_use]
    pub fn can_reverse(&self) -> bool {
        matches!(self, Self::Posted)
    }

    /// Returns the lowercase storage token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Posted => "posted",
            Self::Reversed => "reversed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The business document an entry originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Sales invoice posting.
    Sale,
    /// Purchase/vendor bill posting.
    Purchase,
    /// Incoming or outgoing payment.
    Payment,
    /// Cash/bank account movement.
    CashBank,
    /// Period-end or correction adjustment.
    Adjustment,
    /// Pure manual journal entry.
    Manual,
    /// Mirror entry generated by the reversal engine.
    Reversal,
}

impl SourceType {
    /// Returns the sequence scope prefix for entry numbers of this source.
    #[must_use]
    pub const fn scope_prefix(self) -> &'static str {
        match self {
            Self::Sale => "SAL",
            Self::Purchase => "PUR",
            Self::Payment => "PAY",
            Self::CashBank => "CSH",
            Self::Adjustment => "ADJ",
            Self::Manual => "JRN",
            Self::Reversal => "REV",
        }
    }

    /// Returns the snake_case storage token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sale => "sale",
            Self::Purchase => "purchase",
            Self::Payment => "payment",
            Self::CashBank => "cash_bank",
            Self::Adjustment => "adjustment",
            Self::Manual => "manual",
            Self::Reversal => "reversal",
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sale" => Ok(Self::Sale),
            "purchase" => Ok(Self::Purchase),
            "payment" => Ok(Self::Payment),
            "cash_bank" => Ok(Self::CashBank),
            "adjustment" => Ok(Self::Adjustment),
            "manual" => Ok(Self::Manual),
            "reversal" => Ok(Self::Reversal),
            _ => Err(format!("Unknown source type: {s}")),
        }
    }
}

/// Input for a single journal line.
///
/// Exactly one of `debit`/`credit` must be positive; line numbers are
/// assigned by the engine from input order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineInput {
    /// The account to post against.
    pub account_id: Uuid,
    /// Debit amount (non-negative).
    #[serde(default)]
    pub debit: Decimal,
    /// Credit amount (non-negative).
    #[serde(default)]
    pub credit: Decimal,
    /// Optional per-line description.
    pub description: Option<String>,
}

impl LineInput {
    /// Creates a debit line.
    #[must_use]
    pub fn debit(account_id: Uuid, amount: Decimal) -> Self {
        Self {
            account_id,
            debit: amount,
            credit: Decimal::ZERO,
            description: None,
        }
    }

    /// Creates a credit line.
    #[must_use]
    pub fn credit(account_id: Uuid, amount: Decimal) -> Self {
        Self {
            account_id,
            debit: Decimal::ZERO,
            credit: amount,
            description: None,
        }
    }
}

/// Input for creating a journal entry.
#[derive(Debug, Clone)]
pub struct CreateEntryInput {
    /// Originating document type.
    pub source_type: SourceType,
    /// Originating document ID, if any.
    pub source_id: Option<Uuid>,
    /// Originating document's own code, if any.
    pub source_code: Option<String>,
    /// The entry date.
    pub entry_date: NaiveDate,
    /// Description of the entry.
    pub description: String,
    /// Free-text reference.
    pub reference: Option<String>,
    /// Free-text notes.
    pub notes: Option<String>,
    /// The journal lines (may be empty at creation; posting needs >= 2).
    pub lines: Vec<LineInput>,
}

/// Totals computed over an entry's lines.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EntryTotals {
    /// Sum of debit amounts.
    pub debit: Decimal,
    /// Sum of credit amounts.
    pub credit: Decimal,
}

impl EntryTotals {
    /// Computes totals over lines.
    #[must_use]
    pub fn of(lines: &[LineInput]) -> Self {
        Self {
            debit: lines.iter().map(|l| l.debit).sum(),
            credit: lines.iter().map(|l| l.credit).sum(),
        }
    }

    /// Returns true if debits equal credits exactly.
    ///
    /// The comparison tolerance is zero: fractional-cent drift is the
    /// caller's problem to resolve before posting, never rounded away
    /// here.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.debit == self.credit
    }
}

/// A posted journal entry header as seen by core logic.
///
/// Mirrors the durable record; used for transition and reversal checks
/// without dragging persistence types into this crate.
#[derive(Debug, Clone)]
pub struct EntryHeader {
    /// Opaque immutable transaction identifier.
    pub id: Uuid,
    /// Human-readable entry number.
    pub entry_number: String,
    /// Originating document type.
    pub source_type: SourceType,
    /// Current status.
    pub status: EntryStatus,
    /// Entry that reversed this one, if any.
    pub reversed_by_id: Option<Uuid>,
    /// Entry this one reverses, if any.
    pub reverses_id: Option<Uuid>,
    /// Posting timestamp, set exactly once.
    pub posted_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::str::FromStr;

    #[test]
    fn test_status_editable() {
        assert!(EntryStatus::Draft.is_editable());
        assert!(!EntryStatus::Posted.is_editable());
        assert!(!EntryStatus::Reversed.is_editable());
        assert!(!EntryStatus::Cancelled.is_editable());
    }

    #[test]
    fn test_status_transitions() {
        assert!(EntryStatus::Draft.can_post());
        assert!(EntryStatus::Draft.can_cancel());
        assert!(!EntryStatus::Draft.can_reverse());

        assert!(!EntryStatus::Posted.can_post());
        assert!(!EntryStatus::Posted.can_cancel());
        assert!(EntryStatus::Posted.can_reverse());

        for terminal in [EntryStatus::Reversed, EntryStatus::Cancelled] {
            assert!(terminal.is_terminal());
            assert!(!terminal.can_post());
            assert!(!terminal.can_cancel());
            assert!(!terminal.can_reverse());
        }
    }

    #[test]
    fn test_source_type_roundtrip() {
        for st in [
            SourceType::Sale,
            SourceType::Purchase,
            SourceType::Payment,
            SourceType::CashBank,
            SourceType::Adjustment,
            SourceType::Manual,
            SourceType::Reversal,
        ] {
            assert_eq!(SourceType::from_str(st.as_str()).unwrap(), st);
        }
    }

    #[test]
    fn test_scope_prefixes_are_distinct() {
        let prefixes = [
            SourceType::Sale,
            SourceType::Purchase,
            SourceType::Payment,
            SourceType::CashBank,
            SourceType::Adjustment,
            SourceType::Manual,
            SourceType::Reversal,
        ]
        .map(SourceType::scope_prefix);
        let unique: std::collections::HashSet<_> = prefixes.iter().collect();
        assert_eq!(unique.len(), prefixes.len());
    }

    #[test]
    fn test_totals() {
        let lines = vec![
            LineInput::debit(Uuid::new_v4(), dec!(60)),
            LineInput::debit(Uuid::new_v4(), dec!(40)),
            LineInput::credit(Uuid::new_v4(), dec!(100)),
        ];
        let totals = EntryTotals::of(&lines);
        assert_eq!(totals.debit, dec!(100));
        assert_eq!(totals.credit, dec!(100));
        assert!(totals.is_balanced());
    }

    #[test]
    fn test_totals_exact_equality_no_rounding() {
        let lines = vec![
            LineInput::debit(Uuid::new_v4(), dec!(100.00)),
            LineInput::credit(Uuid::new_v4(), dec!(99.999)),
        ];
        assert!(!EntryTotals::of(&lines).is_balanced());
    }
}
