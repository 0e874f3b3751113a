//! Business rule validation for journal entries.
//!
//! Validation here is pure: it looks only at the lines themselves.
//! Account-level checks (existence, active, summary flag) happen where
//! the accounts are loaded, in the persistence layer.

use rust_decimal::Decimal;

use super::error::LedgerError;
use super::types::{EntryStatus, EntryTotals, LineInput};

/// Validates a single line's amounts.
///
/// # Errors
///
/// Returns `NegativeAmount`, `BothSidesSet`, or `EmptyLine`.
pub fn validate_line(line: &LineInput, line_number: u32) -> Result<(), LedgerError> {
    if line.debit < Decimal::ZERO || line.credit < Decimal::ZERO {
        return Err(LedgerError::NegativeAmount { line_number });
    }
    if line.debit > Decimal::ZERO && line.credit > Decimal::ZERO {
        return Err(LedgerError::BothSidesSet { line_number });
    }
    if line.debit == Decimal::ZERO && line.credit == Decimal::ZERO {
        return Err(LedgerError::EmptyLine { line_number });
    }
    Ok(())
}

/// Validates lines at creation time.
///
/// Drafts may be created with any number of lines (including zero), but
/// every supplied line must already be well-formed.
///
/// # Errors
///
/// Returns the first per-line violation found.
pub fn validate_lines_for_create(lines: &[LineInput]) -> Result<(), LedgerError> {
    for (i, line) in lines.iter().enumerate() {
        validate_line(line, line_number(i))?;
    }
    Ok(())
}

/// Validates lines for posting and returns the computed totals.
///
/// Posting requires at least two lines, every line well-formed, totals
/// strictly positive, and debits exactly equal to credits.
///
/// # Errors
///
/// Returns `InsufficientLines`, a per-line violation, `ZeroAmount`, or
/// `Unbalanced`.
pub fn validate_for_posting(lines: &[LineInput]) -> Result<EntryTotals, LedgerError> {
    if lines.len() < 2 {
        return Err(LedgerError::InsufficientLines);
    }

    for (i, line) in lines.iter().enumerate() {
        validate_line(line, line_number(i))?;
    }

    let totals = EntryTotals::of(lines);
    if !totals.is_balanced() {
        return Err(LedgerError::Unbalanced {
            debit: totals.debit,
            credit: totals.credit,
        });
    }
    if totals.debit == Decimal::ZERO {
        return Err(LedgerError::ZeroAmount);
    }

    Ok(totals)
}

/// Validates a status transition.
///
/// # Errors
///
/// Returns `InvalidTransition` for any edge outside the state machine
/// (DRAFT -> POSTED, DRAFT -> CANCELLED, POSTED -> REVERSED).
pub fn validate_transition(from: EntryStatus, to: EntryStatus) -> Result<(), LedgerError> {
    let legal = matches!(
        (from, to),
        (EntryStatus::Draft, EntryStatus::Posted)
            | (EntryStatus::Draft, EntryStatus::Cancelled)
            | (EntryStatus::Posted, EntryStatus::Reversed)
    );
    if legal {
        Ok(())
    } else {
        Err(LedgerError::InvalidTransition { from, to })
    }
}

fn line_number(index: usize) -> u32 {
    u32::try_from(index).unwrap_or(u32::MAX).saturating_add(1)
}
