//! Initial schema: chart of accounts, journal, sequence counters, audit log.
//!
//! Creates the five durable relations of the ledger engine. Constraints
//! enforce at the storage layer what the engine enforces in code: one-sided
//! lines, unique entry numbers, and unique account codes among live rows.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(INITIAL_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(
            "DROP TABLE IF EXISTS audit_events, journal_lines, journal_entries, \
             sequence_counters, accounts CASCADE;",
        )
        .await?;
        Ok(())
    }
}

const INITIAL_SQL: &str = r"
-- Chart of accounts
CREATE TABLE accounts (
    id UUID PRIMARY KEY,
    code VARCHAR(20) NOT NULL,
    name VARCHAR(100) NOT NULL,
    description TEXT,
    class VARCHAR(20) NOT NULL,
    category VARCHAR(50),
    parent_id UUID REFERENCES accounts(id),
    is_summary BOOLEAN NOT NULL DEFAULT FALSE,
    is_critical BOOLEAN NOT NULL DEFAULT FALSE,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    balance DECIMAL(20,2) NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    deleted_at TIMESTAMPTZ,
    CONSTRAINT chk_accounts_class
        CHECK (class IN ('asset', 'liability', 'equity', 'revenue', 'expense'))
);

-- Code is unique among live accounts; tombstoned codes may be reused
CREATE UNIQUE INDEX idx_accounts_code_active
    ON accounts(code) WHERE deleted_at IS NULL;

CREATE INDEX idx_accounts_parent ON accounts(parent_id) WHERE parent_id IS NOT NULL;

-- Journal entry headers
CREATE TABLE journal_entries (
    id UUID PRIMARY KEY,
    entry_number VARCHAR(50) NOT NULL,
    source_type VARCHAR(20) NOT NULL,
    source_id UUID,
    source_code VARCHAR(100),
    entry_date DATE NOT NULL,
    description TEXT NOT NULL,
    reference VARCHAR(200),
    notes TEXT,
    total_debit DECIMAL(20,2) NOT NULL DEFAULT 0,
    total_credit DECIMAL(20,2) NOT NULL DEFAULT 0,
    status VARCHAR(20) NOT NULL DEFAULT 'draft',
    posted_at TIMESTAMPTZ,
    reversed_by_id UUID REFERENCES journal_entries(id),
    reverses_id UUID REFERENCES journal_entries(id),
    reversal_reason TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    deleted_at TIMESTAMPTZ,
    CONSTRAINT chk_entries_status
        CHECK (status IN ('draft', 'posted', 'reversed', 'cancelled')),
    -- An entry is a reversal or is reversed, never both, never itself
    CONSTRAINT chk_entries_reversal_links
        CHECK (reversed_by_id IS NULL OR reverses_id IS NULL),
    CONSTRAINT chk_entries_no_self_reversal
        CHECK (reverses_id IS DISTINCT FROM id AND reversed_by_id IS DISTINCT FROM id)
);

CREATE UNIQUE INDEX idx_entries_number ON journal_entries(entry_number);
CREATE INDEX idx_entries_source ON journal_entries(source_type, source_id);
CREATE INDEX idx_entries_date_status ON journal_entries(entry_date, status);

-- Journal lines
CREATE TABLE journal_lines (
    id UUID PRIMARY KEY,
    entry_id UUID NOT NULL REFERENCES journal_entries(id) ON DELETE CASCADE,
    account_id UUID NOT NULL REFERENCES accounts(id),
    line_number INT NOT NULL,
    description TEXT,
    debit_amount DECIMAL(20,2) NOT NULL DEFAULT 0,
    credit_amount DECIMAL(20,2) NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_lines_entry_line UNIQUE (entry_id, line_number),
    CONSTRAINT chk_lines_positive_line_number CHECK (line_number > 0),
    CONSTRAINT chk_lines_non_negative
        CHECK (debit_amount >= 0 AND credit_amount >= 0),
    -- Exactly one side of a line carries an amount
    CONSTRAINT chk_lines_one_sided
        CHECK ((debit_amount > 0) <> (credit_amount > 0))
);

CREATE INDEX idx_lines_entry ON journal_lines(entry_id);
CREATE INDEX idx_lines_account ON journal_lines(account_id, entry_id);

-- Per-scope, per-year document number counters
CREATE TABLE sequence_counters (
    scope VARCHAR(20) NOT NULL,
    year INT NOT NULL,
    value BIGINT NOT NULL DEFAULT 0,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (scope, year),
    CONSTRAINT chk_counters_non_negative CHECK (value >= 0)
);

-- Append-only audit log
CREATE TABLE audit_events (
    id UUID PRIMARY KEY,
    entry_id UUID REFERENCES journal_entries(id),
    kind VARCHAR(20) NOT NULL,
    payload JSONB NOT NULL,
    correlation_id UUID NOT NULL,
    recorded_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_events_kind CHECK (kind IN (
        'created', 'posted', 'reversed', 'cancelled',
        'updated', 'deleted', 'drift_detected'
    ))
);

CREATE INDEX idx_events_entry ON audit_events(entry_id, recorded_at);
CREATE INDEX idx_events_correlation ON audit_events(correlation_id);
";
