//! Balance propagation and reconciliation.
//!
//! Account balances are derived exclusively from posted journal lines;
//! this module is the only code path that writes `accounts.balance`.
//! Incremental propagation runs inline with the posting transaction, and
//! `reconcile_subtree` re-derives the same numbers from scratch to detect
//! and repair drift.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbBackend, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set, Statement, TransactionTrait,
};
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use saldo_core::account::{
    AccountTree, Drift, LineAmount, MAX_HIERARCHY_DEPTH, TreeNode,
};
use saldo_core::audit::{AuditKind, AuditPayload};
use saldo_core::ledger::LedgerError;

use crate::entities::accounts;

use super::audit::AuditRepository;
use super::sequence::map_db_err;

const CHILD_SUM_SQL: &str = "SELECT COALESCE(SUM(balance), 0) AS total \
     FROM accounts WHERE parent_id = $1 AND deleted_at IS NULL";

const POSTED_LINE_SUMS_SQL: &str = "SELECT COALESCE(SUM(l.debit_amount), 0) AS debit_total, \
            COALESCE(SUM(l.credit_amount), 0) AS credit_total \
     FROM journal_lines l \
     JOIN journal_entries e ON e.id = l.entry_id \
     WHERE l.account_id = $1 \
       AND e.posted_at IS NOT NULL \
       AND e.deleted_at IS NULL";

/// Result of reconciling one account subtree.
#[derive(Debug, Clone)]
pub struct ReconcileReport {
    /// The subtree root that was reconciled.
    pub account_id: Uuid,
    /// How many accounts were checked.
    pub accounts_checked: usize,
    /// The drifted accounts, already repaired.
    pub drifts: Vec<Drift>,
}

/// Applies one posted entry's lines to every affected account and rolls
/// the effect up each ancestor chain.
///
/// All affected rows (posting targets plus their ancestors) are locked in
/// ascending id order before any write, so concurrent posts touching an
/// overlapping account serialize instead of losing updates; posts over
/// disjoint account sets proceed in parallel.
///
/// # Errors
///
/// Returns `SummaryPosting`, `AccountInactive`, `AccountNotFound`,
/// `HierarchyCycle`, or `ConcurrentModification` when the hierarchy moved
/// between discovery and locking.
pub(crate) async fn propagate_entry(
    txn: &DatabaseTransaction,
    lines: &[LineAmount],
) -> Result<(), LedgerError> {
    let mut leaf_ids: Vec<Uuid> = lines.iter().map(|l| l.account_id).collect();
    leaf_ids.sort_unstable();
    leaf_ids.dedup();

    let affected = discover_affected(txn, &leaf_ids).await?;
    let locked = lock_accounts(txn, &affected).await?;

    // The hierarchy may have been edited between the unlocked walk and
    // the locks; fail closed and let the caller retry.
    if locked.len() != affected.len() {
        return Err(LedgerError::ConcurrentModification);
    }
    for model in locked.values() {
        if let Some(parent_id) = model.parent_id {
            if !locked.contains_key(&parent_id) {
                return Err(LedgerError::ConcurrentModification);
            }
        }
    }

    // One aggregated delta per account, computed through the shared tree
    // model so posting and reconciliation use identical arithmetic.
    let tree = build_tree(locked.values());
    if tree.len() != locked.len() {
        // Leftover nodes sit on a parent cycle.
        let orphan = locked
            .keys()
            .find(|id| tree.get(**id).is_none())
            .copied()
            .unwrap_or(Uuid::nil());
        return Err(LedgerError::HierarchyCycle(orphan));
    }
    let deltas = tree.entry_deltas(lines)?;

    for (account_id, delta) in &deltas {
        let model = locked
            .get(account_id)
            .ok_or(LedgerError::AccountNotFound(*account_id))?;
        if !model.is_active {
            return Err(LedgerError::AccountInactive(*account_id));
        }
        write_balance(txn, model.clone(), model.balance + *delta).await?;
    }

    // Re-sum every ancestor, nearest first. Re-summing (rather than
    // delta-patching) keeps parents correct even when siblings changed
    // in another order.
    for (account_id, _) in &deltas {
        resum_ancestor_chain(txn, &locked, *account_id).await?;
    }

    Ok(())
}

/// Walks parent pointers (unlocked) to find every account the posting
/// will touch.
async fn discover_affected(
    txn: &DatabaseTransaction,
    leaf_ids: &[Uuid],
) -> Result<Vec<Uuid>, LedgerError> {
    let mut affected: HashSet<Uuid> = leaf_ids.iter().copied().collect();
    let mut frontier: Vec<Uuid> = leaf_ids.to_vec();

    for _ in 0..MAX_HIERARCHY_DEPTH {
        if frontier.is_empty() {
            let mut result: Vec<Uuid> = affected.into_iter().collect();
            result.sort_unstable();
            return Ok(result);
        }

        let rows = accounts::Entity::find()
            .filter(accounts::Column::Id.is_in(frontier.clone()))
            .filter(accounts::Column::DeletedAt.is_null())
            .all(txn)
            .await
            .map_err(map_db_err)?;

        if rows.len() != frontier.len() {
            let missing = frontier
                .iter()
                .find(|id| !rows.iter().any(|r| r.id == **id))
                .copied()
                .unwrap_or(Uuid::nil());
            return Err(LedgerError::AccountNotFound(missing));
        }

        frontier = rows
            .iter()
            .filter_map(|r| r.parent_id)
            .filter(|p| affected.insert(*p))
            .collect();
    }

    Err(LedgerError::HierarchyCycle(
        frontier.first().copied().unwrap_or(Uuid::nil()),
    ))
}

/// Locks the given account rows `FOR UPDATE`, in ascending id order.
async fn lock_accounts(
    txn: &DatabaseTransaction,
    ids: &[Uuid],
) -> Result<HashMap<Uuid, accounts::Model>, LedgerError> {
    let rows = accounts::Entity::find()
        .filter(accounts::Column::Id.is_in(ids.to_vec()))
        .filter(accounts::Column::DeletedAt.is_null())
        .order_by_asc(accounts::Column::Id)
        .lock_exclusive()
        .all(txn)
        .await
        .map_err(map_db_err)?;

    Ok(rows.into_iter().map(|m| (m.id, m)).collect())
}

/// Builds the in-memory tree over a set of locked account rows.
///
/// Parents outside the set are treated as roots here; ancestor re-summing
/// walks the stored parent pointers directly.
fn build_tree<'a>(models: impl Iterator<Item = &'a accounts::Model>) -> AccountTree {
    let mut remaining: Vec<&accounts::Model> = models.collect();
    let ids: HashSet<Uuid> = remaining.iter().map(|m| m.id).collect();

    // Insert parents before children; the map iterates in arbitrary
    // order, so sweep until a pass makes no progress. Nodes left over
    // after a stalled pass sit on a parent cycle and stay out of the
    // tree; the walk guards fail closed on them.
    let mut tree = AccountTree::new();
    loop {
        let before = remaining.len();
        let mut deferred = Vec::new();
        for model in remaining {
            let parent_id = model.parent_id.filter(|p| ids.contains(p));
            if parent_id.is_some_and(|p| tree.get(p).is_none()) {
                deferred.push(model);
                continue;
            }
            // The stored hierarchy already guarantees summary parents; a
            // violated guarantee surfaces later as drift, not a panic.
            let _ = tree.insert(TreeNode {
                id: model.id,
                parent_id,
                class: model.class.into(),
                is_summary: model.is_summary,
                balance: model.balance,
            });
        }
        if deferred.is_empty() || deferred.len() == before {
            break;
        }
        remaining = deferred;
    }
    tree
}

/// Re-sums each ancestor of `start` from its live children.
async fn resum_ancestor_chain(
    txn: &DatabaseTransaction,
    locked: &HashMap<Uuid, accounts::Model>,
    start: Uuid,
) -> Result<(), LedgerError> {
    let mut visited: HashSet<Uuid> = HashSet::new();
    visited.insert(start);

    let mut current = start;
    for _ in 0..MAX_HIERARCHY_DEPTH {
        let Some(parent_id) = locked.get(&current).and_then(|m| m.parent_id) else {
            return Ok(());
        };
        if !visited.insert(parent_id) {
            return Err(LedgerError::HierarchyCycle(parent_id));
        }

        let parent = locked
            .get(&parent_id)
            .ok_or(LedgerError::ConcurrentModification)?;
        let total = child_balance_sum(txn, parent_id).await?;
        write_balance(txn, parent.clone(), total).await?;

        current = parent_id;
    }
    Err(LedgerError::HierarchyCycle(current))
}

/// Sums the live children balances of one parent, inside the transaction.
async fn child_balance_sum(
    txn: &DatabaseTransaction,
    parent_id: Uuid,
) -> Result<Decimal, LedgerError> {
    let stmt = Statement::from_sql_and_values(
        DbBackend::Postgres,
        CHILD_SUM_SQL,
        [parent_id.into()],
    );
    let row = txn
        .query_one(stmt)
        .await
        .map_err(map_db_err)?
        .ok_or_else(|| LedgerError::Internal("child sum returned no row".to_string()))?;
    row.try_get::<Decimal>("", "total").map_err(map_db_err)
}

/// Writes a new balance for one account row.
async fn write_balance(
    txn: &DatabaseTransaction,
    model: accounts::Model,
    balance: Decimal,
) -> Result<(), LedgerError> {
    let mut active: accounts::ActiveModel = model.into();
    active.balance = Set(balance);
    active.updated_at = Set(Utc::now().into());
    active.update(txn).await.map_err(map_db_err)?;
    Ok(())
}

/// Signed sum of all posted lines against one account.
///
/// Lines of REVERSED entries still count: the entry was posted, and its
/// mirror nets the effect out. Only drafts, cancellations, and tombstoned
/// entries are excluded.
async fn posted_line_sum(
    txn: &DatabaseTransaction,
    account: &accounts::Model,
) -> Result<Decimal, LedgerError> {
    let stmt = Statement::from_sql_and_values(
        DbBackend::Postgres,
        POSTED_LINE_SUMS_SQL,
        [account.id.into()],
    );
    let row = txn
        .query_one(stmt)
        .await
        .map_err(map_db_err)?
        .ok_or_else(|| LedgerError::Internal("line sum returned no row".to_string()))?;

    let debit: Decimal = row.try_get("", "debit_total").map_err(map_db_err)?;
    let credit: Decimal = row.try_get("", "credit_total").map_err(map_db_err)?;

    let class: saldo_core::account::AccountClass = account.class.into();
    Ok(class.normal_balance().balance_delta(debit, credit))
}

/// Re-derives every balance in the subtree rooted at `account_id` from
/// posted lines, compares against stored values, repairs drift, and rolls
/// repaired totals up the root's own ancestors.
///
/// Drift is logged at error severity and recorded as `drift_detected`
/// audit events sharing one correlation id; it never blocks new postings.
///
/// # Errors
///
/// Returns `AccountNotFound` for an unknown root, `HierarchyCycle` for a
/// corrupt hierarchy, or `Database`/`ConcurrentModification` from the
/// storage layer.
pub async fn reconcile_subtree(
    db: &DatabaseConnection,
    account_id: Uuid,
) -> Result<ReconcileReport, LedgerError> {
    let txn = db.begin().await.map_err(map_db_err)?;

    // Collect the subtree breadth-first, then take the locks id-ordered.
    let subtree_ids = collect_subtree(&txn, account_id).await?;
    let locked = lock_accounts(&txn, &subtree_ids).await?;
    if locked.len() != subtree_ids.len() {
        return Err(LedgerError::ConcurrentModification);
    }

    // Scope rollup to the subtree: the root acts as a local root even if
    // it has a parent; ancestors are re-summed after repair.
    let mut tree = AccountTree::new();
    for id in &subtree_ids {
        let model = &locked[id];
        let parent_id = if *id == account_id { None } else { model.parent_id };
        tree.insert(TreeNode {
            id: model.id,
            parent_id,
            class: model.class.into(),
            is_summary: model.is_summary,
            balance: model.balance,
        })?;
    }

    let mut leaf_sums: HashMap<Uuid, Decimal> = HashMap::new();
    for id in &subtree_ids {
        let model = &locked[id];
        if !model.is_summary {
            leaf_sums.insert(*id, posted_line_sum(&txn, model).await?);
        }
    }

    let drifts = tree.reconcile(&leaf_sums)?;
    if !drifts.is_empty() {
        let correlation_id = Uuid::now_v7();
        for drift in &drifts {
            error!(
                account_id = %drift.account_id,
                stored = %drift.stored,
                computed = %drift.computed,
                "reconciliation drift detected"
            );
            AuditRepository::record(
                &txn,
                None,
                AuditKind::DriftDetected,
                AuditPayload::transition(
                    json!({ "account_id": drift.account_id, "balance": drift.stored }),
                    json!({ "account_id": drift.account_id, "balance": drift.computed }),
                ),
                correlation_id,
            )
            .await?;

            let model = locked[&drift.account_id].clone();
            write_balance(&txn, model, drift.computed).await?;
        }

        // Repaired totals must flow up to ancestors outside the subtree.
        if locked[&account_id].parent_id.is_some() {
            let chain = lock_ancestors(&txn, account_id).await?;
            resum_ancestor_chain(&txn, &chain, account_id).await?;
        }
    }

    txn.commit().await.map_err(map_db_err)?;

    Ok(ReconcileReport {
        account_id,
        accounts_checked: subtree_ids.len(),
        drifts,
    })
}

/// Collects the subtree rooted at `root` (live rows), breadth-first.
async fn collect_subtree(
    txn: &DatabaseTransaction,
    root: Uuid,
) -> Result<Vec<Uuid>, LedgerError> {
    let root_row = accounts::Entity::find_by_id(root)
        .filter(accounts::Column::DeletedAt.is_null())
        .one(txn)
        .await
        .map_err(map_db_err)?
        .ok_or(LedgerError::AccountNotFound(root))?;

    let mut seen: HashSet<Uuid> = HashSet::new();
    seen.insert(root_row.id);
    let mut order = vec![root_row.id];
    let mut frontier = vec![root_row.id];

    for _ in 0..MAX_HIERARCHY_DEPTH {
        if frontier.is_empty() {
            return Ok(order);
        }
        let children = accounts::Entity::find()
            .filter(accounts::Column::ParentId.is_in(frontier.clone()))
            .filter(accounts::Column::DeletedAt.is_null())
            .order_by_asc(accounts::Column::Id)
            .all(txn)
            .await
            .map_err(map_db_err)?;

        frontier = Vec::new();
        for child in children {
            if seen.insert(child.id) {
                order.push(child.id);
                frontier.push(child.id);
            } else {
                return Err(LedgerError::HierarchyCycle(child.id));
            }
        }
    }
    Err(LedgerError::HierarchyCycle(root))
}

/// Locks the ancestor chain of `start` (including `start` itself).
async fn lock_ancestors(
    txn: &DatabaseTransaction,
    start: Uuid,
) -> Result<HashMap<Uuid, accounts::Model>, LedgerError> {
    let affected = discover_affected(txn, &[start]).await?;
    lock_accounts(txn, &affected).await
}
