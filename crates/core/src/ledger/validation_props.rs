//! Property tests for journal entry validation.

use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::error::LedgerError;
use super::types::{EntryStatus, LineInput};
use super::validation::{validate_for_posting, validate_line, validate_transition};

/// Strategy for positive amounts with 2 decimal places.
fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000_000).prop_map(|n| Decimal::new(n, 2))
}

/// Strategy for a balanced entry: N debit legs matched by one credit leg.
fn balanced_lines_strategy() -> impl Strategy<Value = Vec<LineInput>> {
    prop::collection::vec(amount_strategy(), 1..8).prop_map(|amounts| {
        let total: Decimal = amounts.iter().copied().sum();
        let mut lines: Vec<LineInput> = amounts
            .into_iter()
            .map(|a| LineInput::debit(Uuid::new_v4(), a))
            .collect();
        lines.push(LineInput::credit(Uuid::new_v4(), total));
        lines
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// **Balanced entries always post**
    ///
    /// Any set of positive debit legs plus a matching credit leg
    /// validates, and the computed totals are equal and positive.
    #[test]
    fn prop_balanced_entries_validate(lines in balanced_lines_strategy()) {
        let totals = validate_for_posting(&lines).unwrap();
        prop_assert_eq!(totals.debit, totals.credit);
        prop_assert!(totals.debit > Decimal::ZERO);
    }

    /// **Perturbed entries never post**
    ///
    /// Adding any positive amount to one side of a balanced entry makes
    /// validation fail with an unbalanced error carrying both totals.
    #[test]
    fn prop_perturbed_entries_rejected(
        lines in balanced_lines_strategy(),
        extra in amount_strategy(),
    ) {
        let mut lines = lines;
        lines.push(LineInput::debit(Uuid::new_v4(), extra));

        match validate_for_posting(&lines) {
            Err(LedgerError::Unbalanced { debit, credit }) => {
                prop_assert_eq!(debit - credit, extra);
            }
            other => prop_assert!(false, "expected Unbalanced, got {:?}", other.err()),
        }
    }

    /// **Single lines never post**
    #[test]
    fn prop_single_line_rejected(amount in amount_strategy()) {
        let lines = vec![LineInput::debit(Uuid::new_v4(), amount)];
        prop_assert!(matches!(
            validate_for_posting(&lines),
            Err(LedgerError::InsufficientLines)
        ));
    }

    /// **A line is one-sided**
    ///
    /// For any pair of positive amounts, a line carrying both is
    /// rejected; carrying either alone is accepted.
    #[test]
    fn prop_line_sidedness(debit in amount_strategy(), credit in amount_strategy()) {
        let both = LineInput {
            account_id: Uuid::new_v4(),
            debit,
            credit,
            description: None,
        };
        let both_sides_rejected = matches!(
            validate_line(&both, 1),
            Err(LedgerError::BothSidesSet { .. })
        );
        prop_assert!(both_sides_rejected);

        prop_assert!(validate_line(&LineInput::debit(Uuid::new_v4(), debit), 1).is_ok());
        prop_assert!(validate_line(&LineInput::credit(Uuid::new_v4(), credit), 1).is_ok());
    }

    /// **The state machine has exactly three edges**
    #[test]
    fn prop_transition_matrix(
        from_ix in 0usize..4,
        to_ix in 0usize..4,
    ) {
        const STATUSES: [EntryStatus; 4] = [
            EntryStatus::Draft,
            EntryStatus::Posted,
            EntryStatus::Reversed,
            EntryStatus::Cancelled,
        ];
        let from = STATUSES[from_ix];
        let to = STATUSES[to_ix];

        let expected_legal = matches!(
            (from, to),
            (EntryStatus::Draft, EntryStatus::Posted)
                | (EntryStatus::Draft, EntryStatus::Cancelled)
                | (EntryStatus::Posted, EntryStatus::Reversed)
        );
        prop_assert_eq!(validate_transition(from, to).is_ok(), expected_legal);
    }
}
