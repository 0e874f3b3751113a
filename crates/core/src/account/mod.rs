//! Chart of accounts: classification, balance arithmetic, and rollup.
//!
//! This module defines:
//! - Account classes and their normal balance sides
//! - The critical-account protection policy
//! - The in-memory account hierarchy used for balance propagation and
//!   reconciliation

pub mod policy;
pub mod tree;
pub mod types;

#[cfg(test)]
mod tree_props;

pub use policy::{AccountChanges, ProtectedField, ProtectedState, check_critical_account};
pub use tree::{AccountTree, Drift, LineAmount, MAX_HIERARCHY_DEPTH, TreeNode};
pub use types::{AccountClass, NormalBalance};
