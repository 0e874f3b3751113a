//! Mirror-line construction and reversal legality checks.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::ledger::{EntryHeader, LedgerError, LineInput};

/// A line of the original entry, as stored.
#[derive(Debug, Clone)]
pub struct OriginalLine {
    /// The account the original line posted to.
    pub account_id: Uuid,
    /// Original debit amount.
    pub debit: Decimal,
    /// Original credit amount.
    pub credit: Decimal,
    /// Original line description.
    pub description: Option<String>,
}

/// Stateless service for building reversing entries.
pub struct ReversalService;

impl ReversalService {
    /// Checks that an entry may be reversed.
    ///
    /// Legal only when the entry is POSTED, is not itself a reversal,
    /// has not been reversed already, and does not reference itself.
    ///
    /// # Errors
    ///
    /// Returns `NotPosted`, `ReversalOfReversal`, `AlreadyReversed`, or
    /// `SelfReversal`.
    pub fn validate_reversible(header: &EntryHeader) -> Result<(), LedgerError> {
        if header.reverses_id == Some(header.id) {
            return Err(LedgerError::SelfReversal(header.id));
        }
        if header.reverses_id.is_some() {
            return Err(LedgerError::ReversalOfReversal(header.id));
        }
        if header.reversed_by_id.is_some() {
            return Err(LedgerError::AlreadyReversed(header.id));
        }
        if !header.status.can_reverse() {
            return Err(LedgerError::NotPosted(header.id));
        }
        Ok(())
    }

    /// Builds the mirror lines: each line's debit and credit swapped,
    /// accounts and amounts preserved, original line order kept.
    #[must_use]
    pub fn mirror_lines(original: &[OriginalLine]) -> Vec<LineInput> {
        original
            .iter()
            .map(|line| LineInput {
                account_id: line.account_id,
                debit: line.credit,
                credit: line.debit,
                description: Some(match &line.description {
                    Some(d) => format!("Reversal - {d}"),
                    None => "Reversal".to_string(),
                }),
            })
            .collect()
    }

    /// Builds the description for the reversing entry.
    #[must_use]
    pub fn reversal_description(original_number: &str, reason: &str) -> String {
        format!("Reversal of {original_number}. Reason: {reason}")
    }
}
