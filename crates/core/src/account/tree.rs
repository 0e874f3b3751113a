//! In-memory account hierarchy with balance rollup.
//!
//! The tree is the single implementation of balance arithmetic over the
//! chart of accounts: incremental propagation after a posting, and full
//! recomputation from posted-line sums. The persistence layer loads the
//! affected subtree into this model so both paths share one definition of
//! "correct balance".
//!
//! Parents are always summary nodes; a summary node's balance is the sum
//! of its direct children and is never posted to directly. Ancestor
//! updates re-sum children rather than patching deltas, so they stay
//! correct even if siblings changed out of order.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::ledger::LedgerError;

use super::types::AccountClass;

/// Hard ceiling on hierarchy depth during ancestor walks.
///
/// Real charts of accounts are a handful of levels deep; anything beyond
/// this is treated as a configuration error rather than walked.
pub const MAX_HIERARCHY_DEPTH: usize = 64;

/// A node in the account hierarchy.
#[derive(Debug, Clone)]
pub struct TreeNode {
    /// Account ID.
    pub id: Uuid,
    /// Parent account, if any.
    pub parent_id: Option<Uuid>,
    /// Account class (decides the normal balance side).
    pub class: AccountClass,
    /// Whether this node's balance is derived from its children.
    pub is_summary: bool,
    /// Current stored balance, normal-balance signed.
    pub balance: Decimal,
}

/// A posting amount against one account.
#[derive(Debug, Clone, Copy)]
pub struct LineAmount {
    /// The account posted to.
    pub account_id: Uuid,
    /// Debit amount (non-negative).
    pub debit: Decimal,
    /// Credit amount (non-negative).
    pub credit: Decimal,
}

/// Drift between a stored balance and the recomputed balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drift {
    /// The drifted account.
    pub account_id: Uuid,
    /// The stored balance.
    pub stored: Decimal,
    /// The balance recomputed from posted lines and child sums.
    pub computed: Decimal,
}

/// An account hierarchy with stored balances.
#[derive(Debug, Clone, Default)]
pub struct AccountTree {
    nodes: HashMap<Uuid, TreeNode>,
    children: HashMap<Uuid, Vec<Uuid>>,
}

impl AccountTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a node, validating its parent link.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the parent does not exist and
    /// `ParentNotSummary` if the parent is not a summary node.
    pub fn insert(&mut self, node: TreeNode) -> Result<(), LedgerError> {
        if let Some(parent_id) = node.parent_id {
            let parent = self
                .nodes
                .get(&parent_id)
                .ok_or(LedgerError::AccountNotFound(parent_id))?;
            if !parent.is_summary {
                return Err(LedgerError::ParentNotSummary(parent_id));
            }
            self.children.entry(parent_id).or_default().push(node.id);
        }
        self.nodes.insert(node.id, node);
        Ok(())
    }

    /// Returns a node by ID.
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<&TreeNode> {
        self.nodes.get(&id)
    }

    /// Returns the stored balance of an account.
    #[must_use]
    pub fn balance(&self, id: Uuid) -> Option<Decimal> {
        self.nodes.get(&id).map(|n| n.balance)
    }

    /// Returns the direct children of an account.
    #[must_use]
    pub fn children_of(&self, id: Uuid) -> &[Uuid] {
        self.children.get(&id).map_or(&[], Vec::as_slice)
    }

    /// Number of nodes in the tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the tree has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Aggregates an entry's lines into one signed delta per distinct
    /// account, in first-seen order.
    ///
    /// Propagation must run exactly once per posted entry per affected
    /// account; aggregating first keeps that guarantee trivially.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` for unknown accounts and
    /// `SummaryPosting` when a line targets a summary node.
    pub fn entry_deltas(&self, lines: &[LineAmount]) -> Result<Vec<(Uuid, Decimal)>, LedgerError> {
        let mut order: Vec<Uuid> = Vec::new();
        let mut deltas: HashMap<Uuid, Decimal> = HashMap::new();

        for line in lines {
            let node = self
                .nodes
                .get(&line.account_id)
                .ok_or(LedgerError::AccountNotFound(line.account_id))?;
            if node.is_summary {
                return Err(LedgerError::SummaryPosting(line.account_id));
            }
            let delta = node
                .class
                .normal_balance()
                .balance_delta(line.debit, line.credit);
            match deltas.entry(line.account_id) {
                std::collections::hash_map::Entry::Occupied(mut e) => {
                    *e.get_mut() += delta;
                }
                std::collections::hash_map::Entry::Vacant(e) => {
                    e.insert(delta);
                    order.push(line.account_id);
                }
            }
        }

        Ok(order
            .into_iter()
            .map(|id| {
                let delta = deltas[&id];
                (id, delta)
            })
            .collect())
    }

    /// Applies one posted entry's aggregated deltas and rolls the effect
    /// up each affected ancestor chain.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound`, `SummaryPosting`, or `HierarchyCycle`
    /// (fail closed; no partial walk is kept by callers on error).
    pub fn apply_posting(&mut self, lines: &[LineAmount]) -> Result<(), LedgerError> {
        let deltas = self.entry_deltas(lines)?;

        for (account_id, delta) in deltas {
            let node = self
                .nodes
                .get_mut(&account_id)
                .ok_or(LedgerError::AccountNotFound(account_id))?;
            node.balance += delta;
            self.resum_ancestors(account_id)?;
        }
        Ok(())
    }

    /// Re-sums every ancestor of `start`, nearest first.
    ///
    /// Each parent's balance becomes the sum of its direct children. A
    /// visited set plus a depth ceiling guarantees termination even if
    /// the stored hierarchy contains a cycle.
    fn resum_ancestors(&mut self, start: Uuid) -> Result<(), LedgerError> {
        let mut visited: HashSet<Uuid> = HashSet::new();
        visited.insert(start);

        let mut current = start;
        for _ in 0..MAX_HIERARCHY_DEPTH {
            let Some(parent_id) = self.nodes.get(&current).and_then(|n| n.parent_id) else {
                return Ok(());
            };
            if !visited.insert(parent_id) {
                return Err(LedgerError::HierarchyCycle(parent_id));
            }
            let sum: Decimal = self
                .children_of(parent_id)
                .iter()
                .filter_map(|id| self.nodes.get(id).map(|n| n.balance))
                .sum();
            if let Some(parent) = self.nodes.get_mut(&parent_id) {
                parent.balance = sum;
            }
            current = parent_id;
        }
        Err(LedgerError::HierarchyCycle(current))
    }

    /// Recomputes every balance from scratch.
    ///
    /// Leaves take their value from `leaf_sums` (the signed sum of all
    /// posted lines per account, zero when absent); summary nodes take
    /// the sum of their children, bottom-up.
    ///
    /// # Errors
    ///
    /// Returns `HierarchyCycle` if any node is unreachable from the roots
    /// (only a parent cycle can cause that).
    pub fn recompute(
        &self,
        leaf_sums: &HashMap<Uuid, Decimal>,
    ) -> Result<HashMap<Uuid, Decimal>, LedgerError> {
        let mut computed: HashMap<Uuid, Decimal> = HashMap::new();

        // Post-order traversal from the roots.
        let roots: Vec<Uuid> = self
            .nodes
            .values()
            .filter(|n| n.parent_id.is_none())
            .map(|n| n.id)
            .collect();

        let mut stack: Vec<(Uuid, bool)> = roots.into_iter().map(|r| (r, false)).collect();
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                let node = &self.nodes[&id];
                let balance = if node.is_summary {
                    self.children_of(id)
                        .iter()
                        .filter_map(|c| computed.get(c).copied())
                        .sum()
                } else {
                    leaf_sums.get(&id).copied().unwrap_or(Decimal::ZERO)
                };
                computed.insert(id, balance);
            } else {
                stack.push((id, true));
                for child in self.children_of(id) {
                    stack.push((*child, false));
                }
            }
        }

        if computed.len() != self.nodes.len() {
            let orphan = self
                .nodes
                .keys()
                .find(|id| !computed.contains_key(id))
                .copied()
                .unwrap_or(Uuid::nil());
            return Err(LedgerError::HierarchyCycle(orphan));
        }
        Ok(computed)
    }

    /// Compares stored balances against a full recompute.
    ///
    /// # Errors
    ///
    /// Propagates `HierarchyCycle` from the recompute.
    pub fn reconcile(
        &self,
        leaf_sums: &HashMap<Uuid, Decimal>,
    ) -> Result<Vec<Drift>, LedgerError> {
        let computed = self.recompute(leaf_sums)?;
        let mut drifts: Vec<Drift> = self
            .nodes
            .values()
            .filter_map(|node| {
                let expected = computed.get(&node.id).copied().unwrap_or(Decimal::ZERO);
                (expected != node.balance).then_some(Drift {
                    account_id: node.id,
                    stored: node.balance,
                    computed: expected,
                })
            })
            .collect();
        drifts.sort_by_key(|d| d.account_id);
        Ok(drifts)
    }

    /// Overwrites stored balances with recomputed values.
    ///
    /// # Errors
    ///
    /// Propagates `HierarchyCycle` from the recompute.
    pub fn repair(&mut self, leaf_sums: &HashMap<Uuid, Decimal>) -> Result<(), LedgerError> {
        let computed = self.recompute(leaf_sums)?;
        for (id, balance) in computed {
            if let Some(node) = self.nodes.get_mut(&id) {
                node.balance = balance;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn node(id: Uuid, parent: Option<Uuid>, class: AccountClass, is_summary: bool) -> TreeNode {
        TreeNode {
            id,
            parent_id: parent,
            class,
            is_summary,
            balance: Decimal::ZERO,
        }
    }

    fn line(account_id: Uuid, debit: Decimal, credit: Decimal) -> LineAmount {
        LineAmount {
            account_id,
            debit,
            credit,
        }
    }

    /// assets (summary) -> cash, bank; revenue leaf standalone.
    fn small_tree() -> (AccountTree, Uuid, Uuid, Uuid, Uuid) {
        let assets = Uuid::new_v4();
        let cash = Uuid::new_v4();
        let bank = Uuid::new_v4();
        let revenue = Uuid::new_v4();

        let mut tree = AccountTree::new();
        tree.insert(node(assets, None, AccountClass::Asset, true)).unwrap();
        tree.insert(node(cash, Some(assets), AccountClass::Asset, false))
            .unwrap();
        tree.insert(node(bank, Some(assets), AccountClass::Asset, false))
            .unwrap();
        tree.insert(node(revenue, None, AccountClass::Revenue, false))
            .unwrap();
        (tree, assets, cash, bank, revenue)
    }

    #[test]
    fn test_posting_rolls_up_to_parent() {
        let (mut tree, assets, cash, bank, revenue) = small_tree();

        tree.apply_posting(&[
            line(cash, dec!(1000.00), dec!(0)),
            line(revenue, dec!(0), dec!(1000.00)),
        ])
        .unwrap();

        assert_eq!(tree.balance(cash).unwrap(), dec!(1000.00));
        assert_eq!(tree.balance(bank).unwrap(), dec!(0));
        assert_eq!(tree.balance(assets).unwrap(), dec!(1000.00));
        assert_eq!(tree.balance(revenue).unwrap(), dec!(1000.00));
    }

    #[test]
    fn test_parent_resums_not_delta_patches() {
        let (mut tree, assets, cash, bank, revenue) = small_tree();

        tree.apply_posting(&[
            line(cash, dec!(100), dec!(0)),
            line(revenue, dec!(0), dec!(100)),
        ])
        .unwrap();
        tree.apply_posting(&[
            line(bank, dec!(250), dec!(0)),
            line(revenue, dec!(0), dec!(250)),
        ])
        .unwrap();

        assert_eq!(tree.balance(assets).unwrap(), dec!(350));
    }

    #[test]
    fn test_summary_posting_rejected() {
        let (mut tree, assets, _, _, revenue) = small_tree();
        let err = tree
            .apply_posting(&[
                line(assets, dec!(100), dec!(0)),
                line(revenue, dec!(0), dec!(100)),
            ])
            .unwrap_err();
        assert!(matches!(err, LedgerError::SummaryPosting(id) if id == assets));
    }

    #[test]
    fn test_parent_must_be_summary() {
        let (mut tree, _, cash, _, _) = small_tree();
        let child = Uuid::new_v4();
        let err = tree
            .insert(node(child, Some(cash), AccountClass::Asset, false))
            .unwrap_err();
        assert!(matches!(err, LedgerError::ParentNotSummary(id) if id == cash));
    }

    #[test]
    fn test_entry_deltas_aggregate_per_account() {
        let (tree, _, cash, _, revenue) = small_tree();
        let deltas = tree
            .entry_deltas(&[
                line(cash, dec!(60), dec!(0)),
                line(cash, dec!(40), dec!(0)),
                line(revenue, dec!(0), dec!(100)),
            ])
            .unwrap();
        assert_eq!(deltas.len(), 2);
        assert_eq!(deltas[0], (cash, dec!(100)));
        assert_eq!(deltas[1], (revenue, dec!(100)));
    }

    #[test]
    fn test_cycle_fails_closed() {
        // Hand-build a corrupt parent loop: a -> b -> a.
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut tree = AccountTree::new();
        tree.nodes.insert(a, node(a, Some(b), AccountClass::Asset, false));
        tree.nodes.insert(b, {
            let mut n = node(b, Some(a), AccountClass::Asset, true);
            n.balance = Decimal::ZERO;
            n
        });
        tree.children.entry(b).or_default().push(a);
        tree.children.entry(a).or_default().push(b);

        let err = tree.resum_ancestors(a).unwrap_err();
        assert!(matches!(err, LedgerError::HierarchyCycle(_)));

        let err = tree.recompute(&HashMap::new()).unwrap_err();
        assert!(matches!(err, LedgerError::HierarchyCycle(_)));
    }

    #[test]
    fn test_reconcile_detects_and_repairs_drift() {
        let (mut tree, assets, cash, _, revenue) = small_tree();
        tree.apply_posting(&[
            line(cash, dec!(500), dec!(0)),
            line(revenue, dec!(0), dec!(500)),
        ])
        .unwrap();

        // Corrupt the stored parent balance.
        tree.nodes.get_mut(&assets).unwrap().balance = dec!(9999);

        let leaf_sums: HashMap<Uuid, Decimal> =
            [(cash, dec!(500)), (revenue, dec!(500))].into_iter().collect();

        let drifts = tree.reconcile(&leaf_sums).unwrap();
        assert_eq!(drifts.len(), 1);
        assert_eq!(drifts[0].account_id, assets);
        assert_eq!(drifts[0].stored, dec!(9999));
        assert_eq!(drifts[0].computed, dec!(500));

        tree.repair(&leaf_sums).unwrap();
        assert!(tree.reconcile(&leaf_sums).unwrap().is_empty());
    }
}
