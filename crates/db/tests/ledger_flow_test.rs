//! End-to-end ledger flow tests against a real database.
//!
//! Covers the worked example: post cash 1000.00 against revenue 1000.00,
//! check balances and rollup, reverse, and check balances return.

#![allow(clippy::uninlined_format_args)]

mod common;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use saldo_core::account::{AccountChanges, AccountClass};
use saldo_core::ledger::{CreateEntryInput, EntryStatus, LedgerError, LineInput, SourceType};
use saldo_db::repositories::{AccountRepository, AuditRepository, LedgerRepository};

use common::{connect, dec, make_leaf, make_summary};

fn manual_entry(lines: Vec<LineInput>) -> CreateEntryInput {
    CreateEntryInput {
        source_type: SourceType::Manual,
        source_id: None,
        source_code: None,
        entry_date: NaiveDate::from_ymd_opt(2026, 8, 7).unwrap(),
        description: "Integration test entry".to_string(),
        reference: None,
        notes: None,
        lines,
    }
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database with migrations applied"]
async fn test_post_and_reverse_round_trip() {
    let db = connect().await;
    let accounts = AccountRepository::new(db.clone());
    let ledger = LedgerRepository::new(db.clone());
    let audit = AuditRepository::new(db.clone());

    let assets = make_summary(&accounts, AccountClass::Asset).await;
    let cash = make_leaf(&accounts, AccountClass::Asset, Some(assets.id)).await;
    let revenue = make_leaf(&accounts, AccountClass::Revenue, None).await;

    // Create and post: cash 1000.00 / revenue 1000.00.
    let posted = ledger
        .create_and_post(manual_entry(vec![
            LineInput::debit(cash.id, dec(100_000)),
            LineInput::credit(revenue.id, dec(100_000)),
        ]))
        .await
        .unwrap();

    assert_eq!(posted.entry.status, saldo_db::entities::EntryStatus::Posted);
    assert!(posted.entry.entry_number.starts_with("JRN-2026-"));
    assert_eq!(posted.entry.total_debit, dec(100_000));
    assert_eq!(posted.entry.total_credit, dec(100_000));
    assert!(posted.entry.posted_at.is_some());

    // Both balances rise on their normal side; the parent rolls up.
    assert_eq!(accounts.balance(cash.id).await.unwrap(), dec(100_000));
    assert_eq!(accounts.balance(revenue.id).await.unwrap(), dec(100_000));
    assert_eq!(accounts.balance(assets.id).await.unwrap(), dec(100_000));

    // Reverse: balances return, links point both ways.
    let reversal = ledger
        .reverse_entry(posted.entry.id, "integration test reversal")
        .await
        .unwrap();

    assert_eq!(reversal.entry.reverses_id, Some(posted.entry.id));
    assert!(reversal.entry.entry_number.starts_with("REV-"));
    assert_eq!(reversal.lines.len(), 2);
    assert_eq!(reversal.lines[0].credit_amount, dec(100_000));
    assert_eq!(reversal.lines[1].debit_amount, dec(100_000));

    let original = ledger.get_entry(posted.entry.id).await.unwrap();
    assert_eq!(original.entry.status, saldo_db::entities::EntryStatus::Reversed);
    assert_eq!(original.entry.reversed_by_id, Some(reversal.entry.id));
    assert_eq!(original.entry.total_debit, dec(100_000));

    assert_eq!(accounts.balance(cash.id).await.unwrap(), Decimal::ZERO);
    assert_eq!(accounts.balance(revenue.id).await.unwrap(), Decimal::ZERO);
    assert_eq!(accounts.balance(assets.id).await.unwrap(), Decimal::ZERO);

    // One audit trail ties the mirror to the original.
    let events = audit.list_for_entry(posted.entry.id).await.unwrap();
    assert!(events.iter().any(|e| e.kind == saldo_db::entities::AuditKind::Posted));
    let reversed_event = events
        .iter()
        .find(|e| e.kind == saldo_db::entities::AuditKind::Reversed)
        .expect("missing reversed event");
    let correlated = audit
        .list_by_correlation(reversed_event.correlation_id)
        .await
        .unwrap();
    assert!(correlated.len() >= 3);
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database with migrations applied"]
async fn test_unbalanced_entry_rejected_and_nothing_mutates() {
    let db = connect().await;
    let accounts = AccountRepository::new(db.clone());
    let ledger = LedgerRepository::new(db.clone());

    let cash = make_leaf(&accounts, AccountClass::Asset, None).await;
    let revenue = make_leaf(&accounts, AccountClass::Revenue, None).await;

    let err = ledger
        .create_and_post(manual_entry(vec![
            LineInput::debit(cash.id, dec(10_000)),
            LineInput::credit(revenue.id, dec(9_999)),
        ]))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Unbalanced { .. }));

    assert_eq!(accounts.balance(cash.id).await.unwrap(), Decimal::ZERO);
    assert_eq!(accounts.balance(revenue.id).await.unwrap(), Decimal::ZERO);
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database with migrations applied"]
async fn test_draft_lifecycle_and_single_line_rejection() {
    let db = connect().await;
    let accounts = AccountRepository::new(db.clone());
    let ledger = LedgerRepository::new(db.clone());

    let cash = make_leaf(&accounts, AccountClass::Asset, None).await;

    // A one-line draft can exist but can never post.
    let draft = ledger
        .create_entry(manual_entry(vec![LineInput::debit(cash.id, dec(5_000))]))
        .await
        .unwrap();
    assert_eq!(draft.entry.status, saldo_db::entities::EntryStatus::Draft);

    let err = ledger.post_entry(draft.entry.id).await.unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientLines));
    assert_eq!(accounts.balance(cash.id).await.unwrap(), Decimal::ZERO);

    // Cancel is legal from draft; posting a cancelled entry is not.
    let cancelled = ledger.cancel_entry(draft.entry.id).await.unwrap();
    assert_eq!(cancelled.status, saldo_db::entities::EntryStatus::Cancelled);

    let err = ledger.post_entry(draft.entry.id).await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidTransition { .. }));
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database with migrations applied"]
async fn test_double_reversal_rejected() {
    let db = connect().await;
    let accounts = AccountRepository::new(db.clone());
    let ledger = LedgerRepository::new(db.clone());

    let cash = make_leaf(&accounts, AccountClass::Asset, None).await;
    let revenue = make_leaf(&accounts, AccountClass::Revenue, None).await;

    let posted = ledger
        .create_and_post(manual_entry(vec![
            LineInput::debit(cash.id, dec(7_500)),
            LineInput::credit(revenue.id, dec(7_500)),
        ]))
        .await
        .unwrap();

    let reversal = ledger.reverse_entry(posted.entry.id, "first").await.unwrap();

    let err = ledger.reverse_entry(posted.entry.id, "second").await.unwrap_err();
    assert!(matches!(err, LedgerError::AlreadyReversed(_)));

    let err = ledger.reverse_entry(reversal.entry.id, "of mirror").await.unwrap_err();
    assert!(matches!(err, LedgerError::ReversalOfReversal(_)));
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database with migrations applied"]
async fn test_summary_account_rejects_postings() {
    let db = connect().await;
    let accounts = AccountRepository::new(db.clone());
    let ledger = LedgerRepository::new(db.clone());

    let assets = make_summary(&accounts, AccountClass::Asset).await;
    let revenue = make_leaf(&accounts, AccountClass::Revenue, None).await;

    let err = ledger
        .create_and_post(manual_entry(vec![
            LineInput::debit(assets.id, dec(1_000)),
            LineInput::credit(revenue.id, dec(1_000)),
        ]))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::SummaryPosting(_)));
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database with migrations applied"]
async fn test_critical_account_protection() {
    let db = connect().await;
    let accounts = AccountRepository::new(db.clone());

    let critical = accounts
        .create_account(saldo_db::repositories::CreateAccountInput {
            code: common::short_code(),
            name: "Cash on hand".to_string(),
            description: None,
            class: AccountClass::Asset,
            category: None,
            parent_id: None,
            is_summary: false,
            is_critical: true,
            is_active: true,
        })
        .await
        .unwrap();

    // Reclassification is frozen.
    let err = accounts
        .update_account(
            critical.id,
            AccountChanges {
                class: Some(AccountClass::Expense),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::CriticalFieldProtected { .. }));

    // Renames still pass.
    let renamed = accounts
        .update_account(
            critical.id,
            AccountChanges {
                name: Some("Petty cash".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "Petty cash");
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database with migrations applied"]
async fn test_reconcile_agrees_with_incremental_propagation() {
    let db = connect().await;
    let accounts = AccountRepository::new(db.clone());
    let ledger = LedgerRepository::new(db.clone());

    let assets = make_summary(&accounts, AccountClass::Asset).await;
    let cash = make_leaf(&accounts, AccountClass::Asset, Some(assets.id)).await;
    let bank = make_leaf(&accounts, AccountClass::Asset, Some(assets.id)).await;
    let revenue = make_leaf(&accounts, AccountClass::Revenue, None).await;

    for (debit_account, cents) in [(cash.id, 12_345), (bank.id, 67_890), (cash.id, 11_111)] {
        ledger
            .create_and_post(manual_entry(vec![
                LineInput::debit(debit_account, dec(cents)),
                LineInput::credit(revenue.id, dec(cents)),
            ]))
            .await
            .unwrap();
    }

    let before = accounts.balance(assets.id).await.unwrap();
    let report = accounts.reconcile(assets.id).await.unwrap();

    // Incremental propagation left nothing to repair.
    assert!(report.drifts.is_empty(), "unexpected drift: {:?}", report.drifts);
    assert_eq!(report.accounts_checked, 3);
    assert_eq!(accounts.balance(assets.id).await.unwrap(), before);
    assert_eq!(before, dec(12_345 + 67_890 + 11_111));
}
