//! Chart of accounts domain types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Account class in the chart of accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountClass {
    /// Asset accounts (cash, receivables, inventory, fixed assets).
    Asset,
    /// Liability accounts (payables, loans).
    Liability,
    /// Equity accounts (capital, retained earnings).
    Equity,
    /// Revenue accounts (sales, service income).
    Revenue,
    /// Expense accounts (COGS, operating expenses).
    Expense,
}

impl AccountClass {
    /// Returns the normal balance side for this class.
    ///
    /// Assets and expenses are debit-normal; liabilities, equity, and
    /// revenue are credit-normal.
    #[must_use]
    pub const fn normal_balance(self) -> NormalBalance {
        match self {
            Self::Asset | Self::Expense => NormalBalance::Debit,
            Self::Liability | Self::Equity | Self::Revenue => NormalBalance::Credit,
        }
    }

    /// Returns the lowercase string token used in storage and APIs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asset => "asset",
            Self::Liability => "liability",
            Self::Equity => "equity",
            Self::Revenue => "revenue",
            Self::Expense => "expense",
        }
    }
}

impl std::fmt::Display for AccountClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccountClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asset" => Ok(Self::Asset),
            "liability" => Ok(Self::Liability),
            "equity" => Ok(Self::Equity),
            "revenue" => Ok(Self::Revenue),
            "expense" => Ok(Self::Expense),
            _ => Err(format!("Unknown account class: {s}")),
        }
    }
}

/// The side on which an account's balance is conventionally positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalBalance {
    /// Debit-normal (asset, expense).
    Debit,
    /// Credit-normal (liability, equity, revenue).
    Credit,
}

impl NormalBalance {
    /// Calculates the signed balance change for a line.
    ///
    /// Debit-normal: `balance += debit - credit`.
    /// Credit-normal: `balance += credit - debit`.
    #[must_use]
    pub fn balance_delta(self, debit: Decimal, credit: Decimal) -> Decimal {
        match self {
            Self::Debit => debit - credit,
            Self::Credit => credit - debit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::str::FromStr;

    #[test]
    fn test_normal_balance_by_class() {
        assert_eq!(AccountClass::Asset.normal_balance(), NormalBalance::Debit);
        assert_eq!(AccountClass::Expense.normal_balance(), NormalBalance::Debit);
        assert_eq!(AccountClass::Liability.normal_balance(), NormalBalance::Credit);
        assert_eq!(AccountClass::Equity.normal_balance(), NormalBalance::Credit);
        assert_eq!(AccountClass::Revenue.normal_balance(), NormalBalance::Credit);
    }

    #[test]
    fn test_debit_normal_delta() {
        let nb = NormalBalance::Debit;
        assert_eq!(nb.balance_delta(dec!(100), dec!(0)), dec!(100));
        assert_eq!(nb.balance_delta(dec!(0), dec!(50)), dec!(-50));
        assert_eq!(nb.balance_delta(dec!(100), dec!(30)), dec!(70));
    }

    #[test]
    fn test_credit_normal_delta() {
        let nb = NormalBalance::Credit;
        assert_eq!(nb.balance_delta(dec!(0), dec!(100)), dec!(100));
        assert_eq!(nb.balance_delta(dec!(50), dec!(0)), dec!(-50));
        assert_eq!(nb.balance_delta(dec!(30), dec!(100)), dec!(70));
    }

    #[test]
    fn test_class_roundtrip() {
        for class in [
            AccountClass::Asset,
            AccountClass::Liability,
            AccountClass::Equity,
            AccountClass::Revenue,
            AccountClass::Expense,
        ] {
            assert_eq!(AccountClass::from_str(class.as_str()).unwrap(), class);
        }
        assert!(AccountClass::from_str("contra").is_err());
    }
}
