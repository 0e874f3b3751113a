//! Double-entry journal logic.
//!
//! This module implements the core ledger functionality:
//! - Journal entry and line domain types
//! - The entry status state machine
//! - Business rule validation for creation and posting
//! - Error types for all ledger operations

pub mod error;
pub mod types;
pub mod validation;

#[cfg(test)]
mod validation_props;

pub use error::LedgerError;
pub use types::{
    CreateEntryInput, EntryHeader, EntryStatus, EntryTotals, LineInput, SourceType,
};
pub use validation::{
    validate_for_posting, validate_line, validate_lines_for_create, validate_transition,
};
