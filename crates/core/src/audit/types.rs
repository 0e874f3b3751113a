//! Audit event domain types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle transition kinds recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    /// Entry created (draft or created-and-posted).
    Created,
    /// Entry posted to the ledger.
    Posted,
    /// Entry reversed by a mirror entry.
    Reversed,
    /// Draft entry cancelled.
    Cancelled,
    /// Draft metadata updated.
    Updated,
    /// Draft entry tombstoned.
    Deleted,
    /// Reconciliation found a stored balance out of line with posted lines.
    DriftDetected,
}

impl AuditKind {
    /// Returns the snake_case storage token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Posted => "posted",
            Self::Reversed => "reversed",
            Self::Cancelled => "cancelled",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::DriftDetected => "drift_detected",
        }
    }
}

impl std::fmt::Display for AuditKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured before/after payload for an audit event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditPayload {
    /// State before the transition, where meaningful.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<Value>,
    /// State after the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<Value>,
    /// Free-form note (e.g. a reversal reason).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl AuditPayload {
    /// A payload capturing only the post-transition state.
    #[must_use]
    pub fn after(value: Value) -> Self {
        Self {
            before: None,
            after: Some(value),
            note: None,
        }
    }

    /// A payload capturing both sides of the transition.
    #[must_use]
    pub fn transition(before: Value, after: Value) -> Self {
        Self {
            before: Some(before),
            after: Some(after),
            note: None,
        }
    }

    /// Attaches a note.
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Serializes into the JSON value stored in the event row.
    #[must_use]
    pub fn into_value(self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_tokens() {
        assert_eq!(AuditKind::Created.as_str(), "created");
        assert_eq!(AuditKind::DriftDetected.as_str(), "drift_detected");
    }

    #[test]
    fn test_payload_shape() {
        let value = AuditPayload::transition(json!({"status": "draft"}), json!({"status": "posted"}))
            .with_note("posted by api")
            .into_value();

        assert_eq!(value["before"]["status"], "draft");
        assert_eq!(value["after"]["status"], "posted");
        assert_eq!(value["note"], "posted by api");
    }

    #[test]
    fn test_empty_fields_omitted() {
        let value = AuditPayload::after(json!({"x": 1})).into_value();
        assert!(value.get("before").is_none());
        assert!(value.get("note").is_none());
    }
}
