//! Reversal engine: mirror-entry construction for posted entries.
//!
//! A reversal is a new, fully independent entry whose lines are the exact
//! debit/credit mirror of the original. The original is never mutated
//! beyond its status and the link field.

pub mod mirror;

pub use mirror::{OriginalLine, ReversalService};
