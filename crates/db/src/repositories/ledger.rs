//! Ledger repository: the journal store, posting, and reversal engine.
//!
//! Posting is the single entry point that mutates account balances. Every
//! mutation here runs inside one database transaction: entry status,
//! lines, every touched balance, and the audit event commit together or
//! not at all.

use chrono::{Datelike, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use saldo_core::account::LineAmount;
use saldo_core::audit::{AuditKind, AuditPayload};
use saldo_core::ledger::{
    CreateEntryInput, EntryHeader, EntryStatus, LedgerError, LineInput, SourceType,
    validate_for_posting, validate_lines_for_create, validate_transition,
};
use saldo_core::reversal::{OriginalLine, ReversalService};
use saldo_core::sequence::{SequenceScope, format_entry_number};

use saldo_shared::types::{PageRequest, PageResponse};

use crate::entities::{accounts, journal_entries, journal_lines};

use super::audit::AuditRepository;
use super::balance::propagate_entry;
use super::sequence::{SequenceRepository, map_db_err};

/// A journal entry header with its lines.
#[derive(Debug, Clone)]
pub struct EntryWithLines {
    /// The entry header.
    pub entry: journal_entries::Model,
    /// The lines, ordered by line number.
    pub lines: Vec<journal_lines::Model>,
}

/// Filter options for listing entries.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    /// Filter by status.
    pub status: Option<EntryStatus>,
    /// Filter by source document type.
    pub source_type: Option<SourceType>,
    /// Filter by date range start (inclusive).
    pub date_from: Option<chrono::NaiveDate>,
    /// Filter by date range end (inclusive).
    pub date_to: Option<chrono::NaiveDate>,
}

/// Metadata patch for a draft entry.
#[derive(Debug, Clone, Default)]
pub struct UpdateEntryInput {
    /// New description.
    pub description: Option<String>,
    /// New reference (outer `Some` = change, inner `None` = clear).
    pub reference: Option<Option<String>>,
    /// New notes.
    pub notes: Option<Option<String>>,
}

/// Ledger repository for journal entry lifecycle operations.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    db: DatabaseConnection,
    retries: u32,
}

impl LedgerRepository {
    /// Creates a new ledger repository with default retry bounds.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db, retries: 3 }
    }

    /// Overrides the bounded retry count for contended postings.
    #[must_use]
    pub const fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Creates a draft entry, assigning its entry number exactly once.
    ///
    /// # Errors
    ///
    /// Returns a validation error for malformed lines, an integrity error
    /// for bad accounts, or `Database` on storage failure.
    pub async fn create_entry(&self, input: CreateEntryInput) -> Result<EntryWithLines, LedgerError> {
        validate_lines_for_create(&input.lines)?;

        let txn = self.db.begin().await.map_err(map_db_err)?;
        let created = Self::insert_entry(&txn, &input).await?;

        AuditRepository::record(
            &txn,
            Some(created.entry.id),
            AuditKind::Created,
            AuditPayload::after(json!({
                "entry_number": created.entry.entry_number,
                "status": "draft",
                "line_count": created.lines.len(),
            })),
            Uuid::now_v7(),
        )
        .await?;

        txn.commit().await.map_err(map_db_err)?;
        info!(entry_id = %created.entry.id, entry_number = %created.entry.entry_number, "entry created");
        Ok(created)
    }

    /// Posts a draft entry, locking the balance invariant.
    ///
    /// Retries transparently on transient contention.
    ///
    /// # Errors
    ///
    /// Returns `Unbalanced`, `InsufficientLines`, `ZeroAmount`,
    /// `InvalidTransition`, account integrity errors, or
    /// `ConcurrentModification` once retries are exhausted.
    pub async fn post_entry(&self, entry_id: Uuid) -> Result<EntryWithLines, LedgerError> {
        let mut attempt = 0;
        loop {
            match self.post_entry_once(entry_id).await {
                Err(err) if err.is_retryable() && attempt < self.retries => attempt += 1,
                other => return other,
            }
        }
    }

    async fn post_entry_once(&self, entry_id: Uuid) -> Result<EntryWithLines, LedgerError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        let entry = Self::lock_entry(&txn, entry_id).await?;
        validate_transition(entry.status.into(), EntryStatus::Posted)?;

        let lines = Self::load_lines(&txn, entry_id).await?;
        let posted = Self::post_loaded(&txn, entry, lines, Uuid::now_v7()).await?;

        txn.commit().await.map_err(map_db_err)?;
        info!(entry_id = %posted.entry.id, entry_number = %posted.entry.entry_number, "entry posted");
        Ok(posted)
    }

    /// Creates and immediately posts an entry in one transaction.
    ///
    /// This is the common path for upstream business modules, which never
    /// manipulate draft state directly.
    ///
    /// # Errors
    ///
    /// As for `create_entry` plus the posting errors.
    pub async fn create_and_post(&self, input: CreateEntryInput) -> Result<EntryWithLines, LedgerError> {
        validate_lines_for_create(&input.lines)?;
        // Catch unbalanced input before touching the database at all.
        validate_for_posting(&input.lines)?;

        let mut attempt = 0;
        loop {
            match self.create_and_post_once(&input).await {
                Err(err) if err.is_retryable() && attempt < self.retries => attempt += 1,
                other => return other,
            }
        }
    }

    async fn create_and_post_once(&self, input: &CreateEntryInput) -> Result<EntryWithLines, LedgerError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;
        let correlation_id = Uuid::now_v7();

        let created = Self::insert_entry(&txn, input).await?;
        AuditRepository::record(
            &txn,
            Some(created.entry.id),
            AuditKind::Created,
            AuditPayload::after(json!({
                "entry_number": created.entry.entry_number,
                "status": "draft",
                "line_count": created.lines.len(),
            })),
            correlation_id,
        )
        .await?;

        let posted = Self::post_loaded(&txn, created.entry, created.lines, correlation_id).await?;

        txn.commit().await.map_err(map_db_err)?;
        info!(entry_id = %posted.entry.id, entry_number = %posted.entry.entry_number, "entry created and posted");
        Ok(posted)
    }

    /// Cancels a draft entry.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless the entry is a draft.
    pub async fn cancel_entry(&self, entry_id: Uuid) -> Result<journal_entries::Model, LedgerError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        let entry = Self::lock_entry(&txn, entry_id).await?;
        validate_transition(entry.status.into(), EntryStatus::Cancelled)?;

        let mut active: journal_entries::ActiveModel = entry.into();
        active.status = Set(EntryStatus::Cancelled.into());
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(&txn).await.map_err(map_db_err)?;

        AuditRepository::record(
            &txn,
            Some(updated.id),
            AuditKind::Cancelled,
            AuditPayload::transition(json!({ "status": "draft" }), json!({ "status": "cancelled" })),
            Uuid::now_v7(),
        )
        .await?;

        txn.commit().await.map_err(map_db_err)?;
        Ok(updated)
    }

    /// Updates draft metadata (description, reference, notes).
    ///
    /// The entry number is never reassigned; posted content is immutable.
    ///
    /// # Errors
    ///
    /// Returns `Immutable` unless the entry is a draft.
    pub async fn update_entry(
        &self,
        entry_id: Uuid,
        patch: UpdateEntryInput,
    ) -> Result<journal_entries::Model, LedgerError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        let entry = Self::lock_entry(&txn, entry_id).await?;
        let status: EntryStatus = entry.status.into();
        if !status.is_editable() {
            return Err(LedgerError::Immutable(entry_id));
        }

        let before = json!({
            "description": entry.description,
            "reference": entry.reference,
            "notes": entry.notes,
        });

        let mut active: journal_entries::ActiveModel = entry.into();
        if let Some(description) = patch.description {
            active.description = Set(description);
        }
        if let Some(reference) = patch.reference {
            active.reference = Set(reference);
        }
        if let Some(notes) = patch.notes {
            active.notes = Set(notes);
        }
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(&txn).await.map_err(map_db_err)?;

        let after = json!({
            "description": updated.description,
            "reference": updated.reference,
            "notes": updated.notes,
        });
        AuditRepository::record(
            &txn,
            Some(updated.id),
            AuditKind::Updated,
            AuditPayload::transition(before, after),
            Uuid::now_v7(),
        )
        .await?;

        txn.commit().await.map_err(map_db_err)?;
        Ok(updated)
    }

    /// Tombstones a draft entry. Nothing is ever physically deleted.
    ///
    /// # Errors
    ///
    /// Returns `Immutable` unless the entry is a draft.
    pub async fn delete_entry(&self, entry_id: Uuid) -> Result<(), LedgerError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        let entry = Self::lock_entry(&txn, entry_id).await?;
        let status: EntryStatus = entry.status.into();
        if !status.is_editable() {
            return Err(LedgerError::Immutable(entry_id));
        }

        let entry_number = entry.entry_number.clone();
        let mut active: journal_entries::ActiveModel = entry.into();
        active.deleted_at = Set(Some(Utc::now().into()));
        active.updated_at = Set(Utc::now().into());
        active.update(&txn).await.map_err(map_db_err)?;

        AuditRepository::record(
            &txn,
            Some(entry_id),
            AuditKind::Deleted,
            AuditPayload::after(json!({ "entry_number": entry_number, "deleted": true })),
            Uuid::now_v7(),
        )
        .await?;

        txn.commit().await.map_err(map_db_err)?;
        Ok(())
    }

    /// Reverses a posted entry with a mirror entry, atomically.
    ///
    /// The mirror is dated at reversal time, posted in the same
    /// transaction, and linked bidirectionally. The original's lines and
    /// amounts are never touched; only its status and link change.
    ///
    /// # Errors
    ///
    /// Returns `NotPosted`, `AlreadyReversed`, `ReversalOfReversal`, or
    /// the posting errors of the mirror entry.
    pub async fn reverse_entry(
        &self,
        entry_id: Uuid,
        reason: &str,
    ) -> Result<EntryWithLines, LedgerError> {
        let mut attempt = 0;
        loop {
            match self.reverse_entry_once(entry_id, reason).await {
                Err(err) if err.is_retryable() && attempt < self.retries => attempt += 1,
                other => return other,
            }
        }
    }

    async fn reverse_entry_once(
        &self,
        entry_id: Uuid,
        reason: &str,
    ) -> Result<EntryWithLines, LedgerError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;
        let correlation_id = Uuid::now_v7();

        let original = Self::lock_entry(&txn, entry_id).await?;
        ReversalService::validate_reversible(&Self::header_of(&original))?;

        let original_lines = Self::load_lines(&txn, entry_id).await?;
        let mirrored = ReversalService::mirror_lines(
            &original_lines
                .iter()
                .map(|l| OriginalLine {
                    account_id: l.account_id,
                    debit: l.debit_amount,
                    credit: l.credit_amount,
                    description: l.description.clone(),
                })
                .collect::<Vec<_>>(),
        );

        let input = CreateEntryInput {
            source_type: SourceType::Reversal,
            source_id: Some(original.id),
            source_code: Some(original.entry_number.clone()),
            entry_date: Utc::now().date_naive(),
            description: ReversalService::reversal_description(&original.entry_number, reason),
            reference: Some(original.entry_number.clone()),
            notes: None,
            lines: mirrored,
        };

        let created = Self::insert_entry(&txn, &input).await?;
        AuditRepository::record(
            &txn,
            Some(created.entry.id),
            AuditKind::Created,
            AuditPayload::after(json!({
                "entry_number": created.entry.entry_number,
                "reverses": original.entry_number,
            })),
            correlation_id,
        )
        .await?;

        let posted = Self::post_loaded(&txn, created.entry, created.lines, correlation_id).await?;

        // Link both directions; the original's content stays untouched.
        let mut reversal_active: journal_entries::ActiveModel = posted.entry.clone().into();
        reversal_active.reverses_id = Set(Some(original.id));
        let reversal_entry = reversal_active.update(&txn).await.map_err(map_db_err)?;

        let original_number = original.entry_number.clone();
        let mut original_active: journal_entries::ActiveModel = original.into();
        original_active.status = Set(EntryStatus::Reversed.into());
        original_active.reversed_by_id = Set(Some(reversal_entry.id));
        original_active.reversal_reason = Set(Some(reason.to_string()));
        original_active.updated_at = Set(Utc::now().into());
        original_active.update(&txn).await.map_err(map_db_err)?;

        AuditRepository::record(
            &txn,
            Some(entry_id),
            AuditKind::Reversed,
            AuditPayload::transition(
                json!({ "status": "posted" }),
                json!({ "status": "reversed", "reversed_by": reversal_entry.entry_number }),
            )
            .with_note(reason),
            correlation_id,
        )
        .await?;

        txn.commit().await.map_err(map_db_err)?;
        info!(
            original = %original_number,
            reversal = %reversal_entry.entry_number,
            "entry reversed"
        );
        Ok(EntryWithLines {
            entry: reversal_entry,
            lines: posted.lines,
        })
    }

    /// Gets an entry with its lines.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotFound` for unknown or tombstoned entries.
    pub async fn get_entry(&self, entry_id: Uuid) -> Result<EntryWithLines, LedgerError> {
        let entry = journal_entries::Entity::find_by_id(entry_id)
            .filter(journal_entries::Column::DeletedAt.is_null())
            .one(&self.db)
            .await
            .map_err(map_db_err)?
            .ok_or(LedgerError::EntryNotFound(entry_id))?;

        let lines = journal_lines::Entity::find()
            .filter(journal_lines::Column::EntryId.eq(entry_id))
            .order_by_asc(journal_lines::Column::LineNumber)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(EntryWithLines { entry, lines })
    }

    /// Lists entries with filters and pagination, newest first.
    ///
    /// # Errors
    ///
    /// Returns `Database` on query failure.
    pub async fn list_entries(
        &self,
        filter: EntryFilter,
        page: PageRequest,
    ) -> Result<PageResponse<journal_entries::Model>, LedgerError> {
        let mut query = journal_entries::Entity::find()
            .filter(journal_entries::Column::DeletedAt.is_null());

        if let Some(status) = filter.status {
            let status: crate::entities::EntryStatus = status.into();
            query = query.filter(journal_entries::Column::Status.eq(status));
        }
        if let Some(source_type) = filter.source_type {
            let source_type: crate::entities::SourceType = source_type.into();
            query = query.filter(journal_entries::Column::SourceType.eq(source_type));
        }
        if let Some(from) = filter.date_from {
            query = query.filter(journal_entries::Column::EntryDate.gte(from));
        }
        if let Some(to) = filter.date_to {
            query = query.filter(journal_entries::Column::EntryDate.lte(to));
        }

        let paginator = query
            .order_by_desc(journal_entries::Column::EntryDate)
            .order_by_desc(journal_entries::Column::CreatedAt)
            .paginate(&self.db, page.limit());

        let total = paginator.num_items().await.map_err(map_db_err)?;
        let items = paginator
            .fetch_page(page.page() - 1)
            .await
            .map_err(map_db_err)?;

        Ok(PageResponse::new(items, total, page))
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Loads and row-locks one live entry.
    async fn lock_entry(
        txn: &DatabaseTransaction,
        entry_id: Uuid,
    ) -> Result<journal_entries::Model, LedgerError> {
        journal_entries::Entity::find_by_id(entry_id)
            .filter(journal_entries::Column::DeletedAt.is_null())
            .lock_exclusive()
            .one(txn)
            .await
            .map_err(map_db_err)?
            .ok_or(LedgerError::EntryNotFound(entry_id))
    }

    /// Loads an entry's lines ordered by line number.
    async fn load_lines(
        txn: &DatabaseTransaction,
        entry_id: Uuid,
    ) -> Result<Vec<journal_lines::Model>, LedgerError> {
        journal_lines::Entity::find()
            .filter(journal_lines::Column::EntryId.eq(entry_id))
            .order_by_asc(journal_lines::Column::LineNumber)
            .all(txn)
            .await
            .map_err(map_db_err)
    }

    /// Inserts a draft entry with its lines, allocating the entry number
    /// from the sequence generator exactly once.
    async fn insert_entry(
        txn: &DatabaseTransaction,
        input: &CreateEntryInput,
    ) -> Result<EntryWithLines, LedgerError> {
        Self::check_line_accounts(txn, &input.lines).await?;

        let scope = SequenceScope::for_source(input.source_type);
        let year = input.entry_date.year();
        let sequence = SequenceRepository::next_in(txn, scope, year).await?;
        let entry_number = format_entry_number(scope, year, sequence);

        let totals = saldo_core::ledger::EntryTotals::of(&input.lines);
        let now = Utc::now();
        let entry_id = Uuid::now_v7();

        let entry = journal_entries::ActiveModel {
            id: Set(entry_id),
            entry_number: Set(entry_number),
            source_type: Set(input.source_type.into()),
            source_id: Set(input.source_id),
            source_code: Set(input.source_code.clone()),
            entry_date: Set(input.entry_date),
            description: Set(input.description.clone()),
            reference: Set(input.reference.clone()),
            notes: Set(input.notes.clone()),
            total_debit: Set(totals.debit),
            total_credit: Set(totals.credit),
            status: Set(EntryStatus::Draft.into()),
            posted_at: Set(None),
            reversed_by_id: Set(None),
            reverses_id: Set(None),
            reversal_reason: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            deleted_at: Set(None),
        };
        let entry = entry.insert(txn).await.map_err(map_db_err)?;

        let mut lines = Vec::with_capacity(input.lines.len());
        for (i, line) in input.lines.iter().enumerate() {
            let line_number = i32::try_from(i + 1)
                .map_err(|_| LedgerError::Internal("line number overflow".to_string()))?;
            let model = journal_lines::ActiveModel {
                id: Set(Uuid::now_v7()),
                entry_id: Set(entry_id),
                account_id: Set(line.account_id),
                line_number: Set(line_number),
                description: Set(line.description.clone()),
                debit_amount: Set(line.debit),
                credit_amount: Set(line.credit),
                created_at: Set(now.into()),
            };
            lines.push(model.insert(txn).await.map_err(map_db_err)?);
        }

        Ok(EntryWithLines { entry, lines })
    }

    /// Validates that every line account exists, is live, and is postable.
    async fn check_line_accounts(
        txn: &DatabaseTransaction,
        lines: &[LineInput],
    ) -> Result<(), LedgerError> {
        let mut ids: Vec<Uuid> = lines.iter().map(|l| l.account_id).collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return Ok(());
        }

        let rows = accounts::Entity::find()
            .filter(accounts::Column::Id.is_in(ids.clone()))
            .filter(accounts::Column::DeletedAt.is_null())
            .all(txn)
            .await
            .map_err(map_db_err)?;

        for id in &ids {
            let account = rows
                .iter()
                .find(|a| a.id == *id)
                .ok_or(LedgerError::AccountNotFound(*id))?;
            if account.is_summary {
                return Err(LedgerError::SummaryPosting(*id));
            }
        }
        Ok(())
    }

    /// Posts an already-loaded draft: validates lines, stamps status and
    /// totals, propagates balances, and records the audit event.
    async fn post_loaded(
        txn: &DatabaseTransaction,
        entry: journal_entries::Model,
        lines: Vec<journal_lines::Model>,
        correlation_id: Uuid,
    ) -> Result<EntryWithLines, LedgerError> {
        let line_inputs: Vec<LineInput> = lines
            .iter()
            .map(|l| LineInput {
                account_id: l.account_id,
                debit: l.debit_amount,
                credit: l.credit_amount,
                description: l.description.clone(),
            })
            .collect();
        let totals = validate_for_posting(&line_inputs)?;

        let now = Utc::now();
        let mut active: journal_entries::ActiveModel = entry.into();
        active.status = Set(EntryStatus::Posted.into());
        active.posted_at = Set(Some(now.into()));
        active.total_debit = Set(totals.debit);
        active.total_credit = Set(totals.credit);
        active.updated_at = Set(now.into());
        let entry = active.update(txn).await.map_err(map_db_err)?;

        let amounts: Vec<LineAmount> = lines
            .iter()
            .map(|l| LineAmount {
                account_id: l.account_id,
                debit: l.debit_amount,
                credit: l.credit_amount,
            })
            .collect();
        propagate_entry(txn, &amounts).await?;

        AuditRepository::record(
            txn,
            Some(entry.id),
            AuditKind::Posted,
            AuditPayload::transition(
                json!({ "status": "draft" }),
                json!({
                    "status": "posted",
                    "total_debit": totals.debit,
                    "total_credit": totals.credit,
                }),
            ),
            correlation_id,
        )
        .await?;

        Ok(EntryWithLines { entry, lines })
    }

    /// Projects a stored entry into the core header type.
    fn header_of(entry: &journal_entries::Model) -> EntryHeader {
        EntryHeader {
            id: entry.id,
            entry_number: entry.entry_number.clone(),
            source_type: entry.source_type.into(),
            status: entry.status.into(),
            reversed_by_id: entry.reversed_by_id,
            reverses_id: entry.reverses_id,
            posted_at: entry.posted_at.map(Into::into),
        }
    }
}
