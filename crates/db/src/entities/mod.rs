//! `SeaORM` entity definitions for the durable relations.

pub mod accounts;
pub mod audit_events;
pub mod enums;
pub mod journal_entries;
pub mod journal_lines;
pub mod sequence_counters;

pub use enums::{AccountClass, AuditKind, EntryStatus, SourceType};
