//! Critical-account protection policy.
//!
//! Accounts flagged critical anchor posted history; their identity and
//! classification are frozen once transactions reference them. The policy
//! is evaluated once per mutation attempt against an explicit set of
//! protected fields.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ledger::LedgerError;

use super::types::AccountClass;

/// Fields of a critical account that may not be mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtectedField {
    /// The numeric account code.
    Code,
    /// The account class (asset/liability/equity/revenue/expense).
    Class,
    /// The parent reference in the hierarchy.
    Parent,
    /// The summary-node flag.
    IsSummary,
}

impl std::fmt::Display for ProtectedField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Code => "code",
            Self::Class => "class",
            Self::Parent => "parent",
            Self::IsSummary => "is_summary",
        };
        f.write_str(s)
    }
}

/// A proposed change set against an existing account.
///
/// `None` means "leave unchanged". `parent` is doubly optional so that
/// clearing the parent is distinguishable from not touching it.
#[derive(Debug, Clone, Default)]
pub struct AccountChanges {
    /// New account code.
    pub code: Option<String>,
    /// New display name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<Option<String>>,
    /// New account class.
    pub class: Option<AccountClass>,
    /// New category token.
    pub category: Option<Option<String>>,
    /// New parent (outer `Some` = change, inner `None` = detach).
    pub parent_id: Option<Option<Uuid>>,
    /// New summary flag.
    pub is_summary: Option<bool>,
    /// New active flag.
    pub is_active: Option<bool>,
}

/// Current values of the protected fields, read from the stored account.
#[derive(Debug, Clone, Copy)]
pub struct ProtectedState {
    /// Whether the account is flagged critical.
    pub is_critical: bool,
    /// Stored class.
    pub class: AccountClass,
    /// Stored parent.
    pub parent_id: Option<Uuid>,
    /// Stored summary flag.
    pub is_summary: bool,
}

/// Checks a change set against the critical-account policy.
///
/// Display-level fields (name, description, category, active flag) always
/// pass; balance updates driven by posting are outside this policy
/// entirely. Only identity fields of a critical account are rejected, and
/// only when they would actually change value.
///
/// # Errors
///
/// Returns `CriticalFieldProtected` naming the first protected field the
/// change set touches.
pub fn check_critical_account(
    account_id: Uuid,
    state: ProtectedState,
    changes: &AccountChanges,
    current_code: &str,
) -> Result<(), LedgerError> {
    if !state.is_critical {
        return Ok(());
    }

    let violation = if changes.code.as_deref().is_some_and(|c| c != current_code) {
        Some(ProtectedField::Code)
    } else if changes.class.is_some_and(|c| c != state.class) {
        Some(ProtectedField::Class)
    } else if changes.parent_id.is_some_and(|p| p != state.parent_id) {
        Some(ProtectedField::Parent)
    } else if changes.is_summary.is_some_and(|s| s != state.is_summary) {
        Some(ProtectedField::IsSummary)
    } else {
        None
    };

    match violation {
        Some(field) => Err(LedgerError::CriticalFieldProtected {
            account: account_id,
            field,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(is_critical: bool) -> ProtectedState {
        ProtectedState {
            is_critical,
            class: AccountClass::Asset,
            parent_id: None,
            is_summary: false,
        }
    }

    #[test]
    fn test_non_critical_allows_everything() {
        let changes = AccountChanges {
            code: Some("9999".to_string()),
            class: Some(AccountClass::Revenue),
            ..Default::default()
        };
        assert!(check_critical_account(Uuid::nil(), state(false), &changes, "1000").is_ok());
    }

    #[test]
    fn test_critical_rejects_code_change() {
        let changes = AccountChanges {
            code: Some("9999".to_string()),
            ..Default::default()
        };
        let err = check_critical_account(Uuid::nil(), state(true), &changes, "1000").unwrap_err();
        assert!(matches!(
            err,
            LedgerError::CriticalFieldProtected {
                field: ProtectedField::Code,
                ..
            }
        ));
    }

    #[test]
    fn test_critical_rejects_class_change() {
        let changes = AccountChanges {
            class: Some(AccountClass::Expense),
            ..Default::default()
        };
        let err = check_critical_account(Uuid::nil(), state(true), &changes, "1000").unwrap_err();
        assert!(matches!(
            err,
            LedgerError::CriticalFieldProtected {
                field: ProtectedField::Class,
                ..
            }
        ));
    }

    #[test]
    fn test_critical_rejects_reparenting() {
        let changes = AccountChanges {
            parent_id: Some(Some(Uuid::new_v4())),
            ..Default::default()
        };
        let err = check_critical_account(Uuid::nil(), state(true), &changes, "1000").unwrap_err();
        assert!(matches!(
            err,
            LedgerError::CriticalFieldProtected {
                field: ProtectedField::Parent,
                ..
            }
        ));
    }

    #[test]
    fn test_critical_allows_rename() {
        let changes = AccountChanges {
            name: Some("Petty Cash".to_string()),
            description: Some(Some("Drawer cash".to_string())),
            is_active: Some(false),
            ..Default::default()
        };
        assert!(check_critical_account(Uuid::nil(), state(true), &changes, "1000").is_ok());
    }

    #[test]
    fn test_critical_allows_same_value_writes() {
        // Writing the identical value is not a change.
        let changes = AccountChanges {
            code: Some("1000".to_string()),
            class: Some(AccountClass::Asset),
            parent_id: Some(None),
            is_summary: Some(false),
            ..Default::default()
        };
        assert!(check_critical_account(Uuid::nil(), state(true), &changes, "1000").is_ok());
    }
}
