//! Account repository for chart of accounts operations.
//!
//! Accounts are soft-deleted only; every query applies the tombstone
//! filter. Balances are never written here: the propagation engine is
//! the single writer of `accounts.balance`.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use saldo_core::account::{
    AccountChanges, AccountClass, MAX_HIERARCHY_DEPTH, ProtectedState, check_critical_account,
};
use saldo_core::ledger::LedgerError;

use crate::entities::{accounts, journal_entries, journal_lines};

use super::balance::{ReconcileReport, reconcile_subtree};
use super::sequence::map_db_err;

/// Input for creating an account.
#[derive(Debug, Clone)]
pub struct CreateAccountInput {
    /// Account code (unique among non-deleted accounts).
    pub code: String,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Account class.
    pub class: AccountClass,
    /// Free subtype token (e.g. `CURRENT_ASSET`).
    pub category: Option<String>,
    /// Parent account (must be a summary account).
    pub parent_id: Option<Uuid>,
    /// Whether the balance is derived from children.
    pub is_summary: bool,
    /// Whether identity fields are frozen.
    pub is_critical: bool,
    /// Whether the account accepts postings.
    pub is_active: bool,
}

/// Filter options for listing accounts.
#[derive(Debug, Clone, Default)]
pub struct AccountFilter {
    /// Filter by class.
    pub class: Option<AccountClass>,
    /// Filter by active flag.
    pub is_active: Option<bool>,
    /// Filter by parent (outer `Some` + inner `None` = roots only).
    pub parent_id: Option<Option<Uuid>>,
}

/// Account repository for chart-of-accounts CRUD.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates an account with code and parent validation.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateCode`, `AccountNotFound` (parent), or
    /// `ParentNotSummary`.
    pub async fn create_account(
        &self,
        input: CreateAccountInput,
    ) -> Result<accounts::Model, LedgerError> {
        let existing = accounts::Entity::find()
            .filter(accounts::Column::Code.eq(&input.code))
            .filter(accounts::Column::DeletedAt.is_null())
            .one(&self.db)
            .await
            .map_err(map_db_err)?;
        if existing.is_some() {
            return Err(LedgerError::DuplicateCode(input.code));
        }

        if let Some(parent_id) = input.parent_id {
            let parent = self.require_account(parent_id).await?;
            if !parent.is_summary {
                return Err(LedgerError::ParentNotSummary(parent_id));
            }
        }

        let now = Utc::now().into();
        let account = accounts::ActiveModel {
            id: Set(Uuid::now_v7()),
            code: Set(input.code),
            name: Set(input.name),
            description: Set(input.description),
            class: Set(input.class.into()),
            category: Set(input.category),
            parent_id: Set(input.parent_id),
            is_summary: Set(input.is_summary),
            is_critical: Set(input.is_critical),
            is_active: Set(input.is_active),
            balance: Set(Decimal::ZERO),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        };

        account.insert(&self.db).await.map_err(map_db_err)
    }

    /// Updates an account, enforcing the critical-account policy and the
    /// hierarchy rules.
    ///
    /// # Errors
    ///
    /// Returns `CriticalFieldProtected`, `DuplicateCode`,
    /// `ParentNotSummary`, or `HierarchyCycle`.
    pub async fn update_account(
        &self,
        account_id: Uuid,
        changes: AccountChanges,
    ) -> Result<accounts::Model, LedgerError> {
        let account = self.require_account(account_id).await?;

        check_critical_account(
            account_id,
            ProtectedState {
                is_critical: account.is_critical,
                class: account.class.into(),
                parent_id: account.parent_id,
                is_summary: account.is_summary,
            },
            &changes,
            &account.code,
        )?;

        if let Some(code) = &changes.code {
            if *code != account.code {
                let clash = accounts::Entity::find()
                    .filter(accounts::Column::Code.eq(code))
                    .filter(accounts::Column::DeletedAt.is_null())
                    .filter(accounts::Column::Id.ne(account_id))
                    .one(&self.db)
                    .await
                    .map_err(map_db_err)?;
                if clash.is_some() {
                    return Err(LedgerError::DuplicateCode(code.clone()));
                }
            }
        }

        if let Some(Some(new_parent)) = changes.parent_id {
            let parent = self.require_account(new_parent).await?;
            if !parent.is_summary {
                return Err(LedgerError::ParentNotSummary(new_parent));
            }
            self.check_no_cycle(account_id, new_parent).await?;
        }

        if let Some(is_summary) = changes.is_summary {
            if is_summary != account.is_summary {
                self.check_summary_flip(account_id, is_summary).await?;
            }
        }

        let mut active: accounts::ActiveModel = account.into();
        if let Some(code) = changes.code {
            active.code = Set(code);
        }
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(description) = changes.description {
            active.description = Set(description);
        }
        if let Some(class) = changes.class {
            active.class = Set(class.into());
        }
        if let Some(category) = changes.category {
            active.category = Set(category);
        }
        if let Some(parent_id) = changes.parent_id {
            active.parent_id = Set(parent_id);
        }
        if let Some(is_summary) = changes.is_summary {
            active.is_summary = Set(is_summary);
        }
        if let Some(is_active) = changes.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Utc::now().into());

        active.update(&self.db).await.map_err(map_db_err)
    }

    /// Soft-deletes an account.
    ///
    /// Legal only when no non-deleted posted lines reference the account
    /// and it has no live children.
    ///
    /// # Errors
    ///
    /// Returns `HasPostedLines` or `HasChildren`.
    pub async fn delete_account(&self, account_id: Uuid) -> Result<(), LedgerError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        let account = accounts::Entity::find_by_id(account_id)
            .filter(accounts::Column::DeletedAt.is_null())
            .one(&txn)
            .await
            .map_err(map_db_err)?
            .ok_or(LedgerError::AccountNotFound(account_id))?;

        let children = accounts::Entity::find()
            .filter(accounts::Column::ParentId.eq(account_id))
            .filter(accounts::Column::DeletedAt.is_null())
            .count(&txn)
            .await
            .map_err(map_db_err)?;
        if children > 0 {
            return Err(LedgerError::HasChildren(account_id));
        }

        let posted_lines = journal_lines::Entity::find()
            .filter(journal_lines::Column::AccountId.eq(account_id))
            .inner_join(journal_entries::Entity)
            .filter(journal_entries::Column::PostedAt.is_not_null())
            .filter(journal_entries::Column::DeletedAt.is_null())
            .count(&txn)
            .await
            .map_err(map_db_err)?;
        if posted_lines > 0 {
            return Err(LedgerError::HasPostedLines(account_id));
        }

        let mut active: accounts::ActiveModel = account.into();
        active.deleted_at = Set(Some(Utc::now().into()));
        active.updated_at = Set(Utc::now().into());
        active.update(&txn).await.map_err(map_db_err)?;

        txn.commit().await.map_err(map_db_err)?;
        Ok(())
    }

    /// Finds a live account by ID.
    ///
    /// # Errors
    ///
    /// Returns `Database` on query failure.
    pub async fn find_account(&self, account_id: Uuid) -> Result<Option<accounts::Model>, LedgerError> {
        accounts::Entity::find_by_id(account_id)
            .filter(accounts::Column::DeletedAt.is_null())
            .one(&self.db)
            .await
            .map_err(map_db_err)
    }

    /// Lists live accounts ordered by code.
    ///
    /// # Errors
    ///
    /// Returns `Database` on query failure.
    pub async fn list_accounts(&self, filter: AccountFilter) -> Result<Vec<accounts::Model>, LedgerError> {
        let mut query = accounts::Entity::find()
            .filter(accounts::Column::DeletedAt.is_null())
            .order_by_asc(accounts::Column::Code);

        if let Some(class) = filter.class {
            let class: crate::entities::AccountClass = class.into();
            query = query.filter(accounts::Column::Class.eq(class));
        }
        if let Some(is_active) = filter.is_active {
            query = query.filter(accounts::Column::IsActive.eq(is_active));
        }
        if let Some(parent_id) = filter.parent_id {
            query = match parent_id {
                Some(pid) => query.filter(accounts::Column::ParentId.eq(pid)),
                None => query.filter(accounts::Column::ParentId.is_null()),
            };
        }

        query.all(&self.db).await.map_err(map_db_err)
    }

    /// Returns the stored balance of an account.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` for unknown or tombstoned accounts.
    pub async fn balance(&self, account_id: Uuid) -> Result<Decimal, LedgerError> {
        self.require_account(account_id).await.map(|a| a.balance)
    }

    /// Re-derives and repairs the balances of the subtree rooted at
    /// `account_id` from posted lines.
    ///
    /// # Errors
    ///
    /// See [`reconcile_subtree`].
    pub async fn reconcile(&self, account_id: Uuid) -> Result<ReconcileReport, LedgerError> {
        reconcile_subtree(&self.db, account_id).await
    }

    /// Loads a live account or fails with `AccountNotFound`.
    async fn require_account(&self, account_id: Uuid) -> Result<accounts::Model, LedgerError> {
        self.find_account(account_id)
            .await?
            .ok_or(LedgerError::AccountNotFound(account_id))
    }

    /// Rejects a summary-flag flip that would strand existing state: a
    /// leaf with posted lines cannot become derived, and a summary node
    /// with children cannot start taking direct postings.
    async fn check_summary_flip(
        &self,
        account_id: Uuid,
        becoming_summary: bool,
    ) -> Result<(), LedgerError> {
        if becoming_summary {
            let posted_lines = journal_lines::Entity::find()
                .filter(journal_lines::Column::AccountId.eq(account_id))
                .inner_join(journal_entries::Entity)
                .filter(journal_entries::Column::PostedAt.is_not_null())
                .filter(journal_entries::Column::DeletedAt.is_null())
                .count(&self.db)
                .await
                .map_err(map_db_err)?;
            if posted_lines > 0 {
                return Err(LedgerError::HasPostedLines(account_id));
            }
        } else {
            let children = accounts::Entity::find()
                .filter(accounts::Column::ParentId.eq(account_id))
                .filter(accounts::Column::DeletedAt.is_null())
                .count(&self.db)
                .await
                .map_err(map_db_err)?;
            if children > 0 {
                return Err(LedgerError::HasChildren(account_id));
            }
        }
        Ok(())
    }

    /// Rejects a reparenting that would make `account_id` its own
    /// ancestor.
    async fn check_no_cycle(&self, account_id: Uuid, new_parent: Uuid) -> Result<(), LedgerError> {
        let mut current = new_parent;
        for _ in 0..MAX_HIERARCHY_DEPTH {
            if current == account_id {
                return Err(LedgerError::HierarchyCycle(account_id));
            }
            let Some(parent) = self
                .find_account(current)
                .await?
                .and_then(|a| a.parent_id)
            else {
                return Ok(());
            };
            current = parent;
        }
        Err(LedgerError::HierarchyCycle(new_parent))
    }
}
