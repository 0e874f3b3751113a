//! Audit event kinds and payloads.
//!
//! Every ledger lifecycle transition emits exactly one event; events
//! stemming from one causal action share a correlation identifier. The
//! log is append-only and is used for forensic reconstruction, never for
//! enforcing invariants.

pub mod types;

pub use types::{AuditKind, AuditPayload};
