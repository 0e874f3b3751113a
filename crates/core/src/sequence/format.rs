//! Human-readable number formatting.

use chrono::{Datelike, NaiveDate};

use super::SequenceScope;

/// Formats a journal entry number: `{SCOPE}-{YYYY}-{NNNNN}`.
///
/// Example: `JRN-2026-00042`.
#[must_use]
pub fn format_entry_number(scope: SequenceScope, year: i32, sequence: i64) -> String {
    format!("{}-{year:04}-{sequence:05}", scope.as_str())
}

/// Formats a business document number: `{SCOPE}/{YYYY}/{MM}/{NNNN}`.
///
/// Example: `PAY/2026/08/0007`. The month token comes from the document
/// date; the counter is still per (scope, year).
#[must_use]
pub fn format_document_number(scope: SequenceScope, date: NaiveDate, sequence: i64) -> String {
    format!(
        "{}/{:04}/{:02}/{sequence:04}",
        scope.as_str(),
        date.year(),
        date.month()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn jrn() -> SequenceScope {
        SequenceScope::parse("JRN").unwrap()
    }

    fn pay() -> SequenceScope {
        SequenceScope::parse("PAY").unwrap()
    }

    #[test]
    fn test_entry_number_format() {
        assert_eq!(format_entry_number(jrn(), 2026, 42), "JRN-2026-00042");
        assert_eq!(format_entry_number(jrn(), 2026, 123_456), "JRN-2026-123456");
    }

    #[test]
    fn test_document_number_format() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 7).unwrap();
        assert_eq!(format_document_number(pay(), date, 7), "PAY/2026/08/0007");
    }

    proptest! {
        /// Formatting is injective per scope/year: distinct sequences
        /// always yield distinct strings.
        #[test]
        fn prop_format_injective(a in 1i64..100_000, b in 1i64..100_000) {
            prop_assume!(a != b);
            prop_assert_ne!(
                format_entry_number(jrn(), 2026, a),
                format_entry_number(jrn(), 2026, b)
            );
        }
    }
}
