//! Property tests for balance rollup and reconciliation.

use std::collections::HashMap;

use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::tree::{AccountTree, LineAmount, TreeNode};
use super::types::AccountClass;

/// A generated chart: summary nodes form a forest, leaves hang off them.
#[derive(Debug, Clone)]
struct TreeSpec {
    /// For each summary node, the index of its summary parent (if any).
    summary_parents: Vec<Option<prop::sample::Index>>,
    /// For each leaf, the index of its summary parent and its class.
    leaves: Vec<(prop::sample::Index, AccountClass)>,
}

/// A generated history: balanced two-leg entries between leaf indices.
type PostingSpec = Vec<(prop::sample::Index, prop::sample::Index, i64)>;

fn class_strategy() -> impl Strategy<Value = AccountClass> {
    prop_oneof![
        Just(AccountClass::Asset),
        Just(AccountClass::Liability),
        Just(AccountClass::Equity),
        Just(AccountClass::Revenue),
        Just(AccountClass::Expense),
    ]
}

fn tree_spec_strategy() -> impl Strategy<Value = TreeSpec> {
    let summaries = prop::collection::vec(prop::option::of(any::<prop::sample::Index>()), 1..5);
    let leaves = prop::collection::vec((any::<prop::sample::Index>(), class_strategy()), 1..8);
    (summaries, leaves).prop_map(|(summary_parents, leaves)| TreeSpec {
        summary_parents,
        leaves,
    })
}

fn posting_spec_strategy() -> impl Strategy<Value = PostingSpec> {
    prop::collection::vec(
        (any::<prop::sample::Index>(), any::<prop::sample::Index>(), 1i64..1_000_000),
        1..20,
    )
}

/// Materializes a spec into a tree plus the list of leaf account IDs.
fn build_tree(spec: &TreeSpec) -> (AccountTree, Vec<Uuid>) {
    let mut tree = AccountTree::new();

    let mut summary_ids: Vec<Uuid> = Vec::with_capacity(spec.summary_parents.len());
    for parent in &spec.summary_parents {
        let id = Uuid::new_v4();
        // Only already-inserted summaries are eligible parents (keeps the
        // generated hierarchy acyclic by construction).
        let parent_id = if summary_ids.is_empty() {
            None
        } else {
            parent.as_ref().map(|ix| summary_ids[ix.index(summary_ids.len())])
        };
        tree.insert(TreeNode {
            id,
            parent_id,
            class: AccountClass::Asset,
            is_summary: true,
            balance: Decimal::ZERO,
        })
        .unwrap();
        summary_ids.push(id);
    }

    let mut leaf_ids = Vec::with_capacity(spec.leaves.len());
    for (parent_ix, class) in &spec.leaves {
        let id = Uuid::new_v4();
        let parent_id = summary_ids[parent_ix.index(summary_ids.len())];
        tree.insert(TreeNode {
            id,
            parent_id: Some(parent_id),
            class: *class,
            is_summary: false,
            balance: Decimal::ZERO,
        })
        .unwrap();
        leaf_ids.push(id);
    }

    (tree, leaf_ids)
}

/// Turns a posting spec into concrete balanced entries over the leaves.
fn build_entries(postings: &PostingSpec, leaves: &[Uuid]) -> Vec<Vec<LineAmount>> {
    postings
        .iter()
        .map(|(debit_ix, credit_ix, cents)| {
            let amount = Decimal::new(*cents, 2);
            vec![
                LineAmount {
                    account_id: leaves[debit_ix.index(leaves.len())],
                    debit: amount,
                    credit: Decimal::ZERO,
                },
                LineAmount {
                    account_id: leaves[credit_ix.index(leaves.len())],
                    debit: Decimal::ZERO,
                    credit: amount,
                },
            ]
        })
        .collect()
}

/// Accumulates the signed per-leaf sums an entry history implies.
fn leaf_sums_for(tree: &AccountTree, entries: &[Vec<LineAmount>]) -> HashMap<Uuid, Decimal> {
    let mut sums: HashMap<Uuid, Decimal> = HashMap::new();
    for entry in entries {
        for line in entry {
            let class = tree.get(line.account_id).unwrap().class;
            let delta = class.normal_balance().balance_delta(line.debit, line.credit);
            *sums.entry(line.account_id).or_default() += delta;
        }
    }
    sums
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// **Rollup correctness**
    ///
    /// After any sequence of postings against any generated tree, every
    /// summary node's balance equals the sum of its direct children.
    #[test]
    fn prop_summary_equals_child_sum(
        spec in tree_spec_strategy(),
        postings in posting_spec_strategy(),
    ) {
        let (mut tree, leaves) = build_tree(&spec);
        for entry in build_entries(&postings, &leaves) {
            tree.apply_posting(&entry).unwrap();
        }

        // Walk every ancestor of every leaf and check the child sum.
        for id in leaves {
            let mut current = id;
            while let Some(parent_id) = tree.get(current).and_then(|n| n.parent_id) {
                let child_sum: Decimal = tree
                    .children_of(parent_id)
                    .iter()
                    .map(|c| tree.balance(*c).unwrap())
                    .sum();
                prop_assert_eq!(tree.balance(parent_id).unwrap(), child_sum);
                current = parent_id;
            }
        }
    }

    /// **Reconciliation equivalence**
    ///
    /// A full recompute from posted-line sums is bit-for-bit identical to
    /// the balances produced by incremental propagation over the same
    /// history.
    #[test]
    fn prop_recompute_equals_incremental(
        spec in tree_spec_strategy(),
        postings in posting_spec_strategy(),
    ) {
        let (mut tree, leaves) = build_tree(&spec);
        let entries = build_entries(&postings, &leaves);
        for entry in &entries {
            tree.apply_posting(entry).unwrap();
        }

        let leaf_sums = leaf_sums_for(&tree, &entries);
        let recomputed = tree.recompute(&leaf_sums).unwrap();

        for (id, computed) in recomputed {
            prop_assert_eq!(tree.balance(id).unwrap(), computed);
        }
        prop_assert!(tree.reconcile(&leaf_sums).unwrap().is_empty());
    }

    /// **Reversal symmetry**
    ///
    /// Applying an entry and then its debit/credit mirror returns every
    /// account to its prior balance.
    #[test]
    fn prop_mirror_restores_balances(
        spec in tree_spec_strategy(),
        postings in posting_spec_strategy(),
        target in any::<prop::sample::Index>(),
    ) {
        let (mut tree, leaves) = build_tree(&spec);
        let entries = build_entries(&postings, &leaves);
        for entry in &entries {
            tree.apply_posting(entry).unwrap();
        }

        let before: HashMap<Uuid, Decimal> = leaves
            .iter()
            .map(|id| (*id, tree.balance(*id).unwrap()))
            .collect();

        let entry = &entries[target.index(entries.len())];
        tree.apply_posting(entry).unwrap();

        let mirror: Vec<LineAmount> = entry
            .iter()
            .map(|l| LineAmount {
                account_id: l.account_id,
                debit: l.credit,
                credit: l.debit,
            })
            .collect();
        tree.apply_posting(&mirror).unwrap();

        for (id, balance) in before {
            prop_assert_eq!(tree.balance(id).unwrap(), balance);
        }
    }

    /// **Propagation preserves the zero-sum of balanced entries**
    ///
    /// In a tree where all leaves share one class, root balances total
    /// zero after any balanced history (every debit has a matching
    /// credit on the same normal side).
    #[test]
    fn prop_same_class_tree_nets_to_zero(
        postings in posting_spec_strategy(),
        n_leaves in 2usize..6,
    ) {
        let root = Uuid::new_v4();
        let mut tree = AccountTree::new();
        tree.insert(TreeNode {
            id: root,
            parent_id: None,
            class: AccountClass::Asset,
            is_summary: true,
            balance: Decimal::ZERO,
        })
        .unwrap();

        let leaves: Vec<Uuid> = (0..n_leaves)
            .map(|_| {
                let id = Uuid::new_v4();
                tree.insert(TreeNode {
                    id,
                    parent_id: Some(root),
                    class: AccountClass::Asset,
                    is_summary: false,
                    balance: Decimal::ZERO,
                })
                .unwrap();
                id
            })
            .collect();

        for entry in build_entries(&postings, &leaves) {
            tree.apply_posting(&entry).unwrap();
        }

        prop_assert_eq!(tree.balance(root).unwrap(), Decimal::ZERO);
    }
}
