use crate::error::TransferError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// Number of fractional digits accepted for monetary amounts (currency minor
/// units). Amounts with finer precision are rejected as invalid.
pub const MINOR_UNIT_SCALE: u32 = 2;

/// Opaque account identifier.
///
/// `Ord` matters: the ledger locks account pairs in ascending id order, which
/// gives every transfer the same global acquisition order and rules out
/// lock-ordering deadlocks.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

/// A validated transfer amount: strictly positive, at most
/// [`MINOR_UNIT_SCALE`] fractional digits.
///
/// Construction is the only validation point; a held `Amount` is always safe
/// to debit and credit with.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, TransferError> {
        if value <= Decimal::ZERO {
            return Err(TransferError::InvalidAmount {
                amount: value,
                reason: "amount must be positive",
            });
        }
        if value.normalize().scale() > MINOR_UNIT_SCALE {
            return Err(TransferError::InvalidAmount {
                amount: value,
                reason: "amount exceeds minor-unit precision",
            });
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = TransferError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An account's balance. Non-negative at rest between transfers; the engine
/// checks sufficiency before ever subtracting.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Balance(pub Decimal);

impl Balance {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Whether this balance can cover a debit of `amount`.
    pub fn covers(&self, amount: Amount) -> bool {
        self.0 >= amount.value()
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Add<Amount> for Balance {
    type Output = Self;
    fn add(self, rhs: Amount) -> Self::Output {
        Self(self.0 + rhs.value())
    }
}

impl Sub<Amount> for Balance {
    type Output = Self;
    fn sub(self, rhs: Amount) -> Self::Output {
        Self(self.0 - rhs.value())
    }
}

impl AddAssign<Amount> for Balance {
    fn add_assign(&mut self, rhs: Amount) {
        self.0 += rhs.value();
    }
}

impl SubAssign<Amount> for Balance {
    fn sub_assign(&mut self, rhs: Amount) {
        self.0 -= rhs.value();
    }
}

/// A ledger account.
///
/// `version` increments on every committed mutation and backs the ledger's
/// optimistic-concurrency check: a commit carrying a stale version fails with
/// `ConcurrencyConflict` instead of overwriting a concurrent update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub balance: Balance,
    pub version: u64,
}

impl Account {
    /// Creates an account with an opening balance. Used by onboarding and
    /// seeding; balances are mutated afterwards only through the ledger's
    /// commit path.
    pub fn new(id: AccountId, balance: Balance) -> Self {
        Self {
            id,
            balance,
            version: 0,
        }
    }
}

/// A version-stamped balance write, produced by the engine from a committed
/// read and applied atomically by [`crate::domain::ports::Ledger::commit_transfer`].
#[derive(Debug, Clone, PartialEq)]
pub struct AccountUpdate {
    pub id: AccountId,
    pub expected_version: u64,
    pub new_balance: Balance,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_balance_arithmetic() {
        let balance = Balance::new(dec!(10.00));
        let amount = Amount::new(dec!(3.50)).unwrap();
        assert_eq!(balance + amount, Balance::new(dec!(13.50)));
        assert_eq!(balance - amount, Balance::new(dec!(6.50)));
    }

    #[test]
    fn test_amount_rejects_non_positive() {
        assert!(Amount::new(dec!(1.00)).is_ok());
        assert!(matches!(
            Amount::new(dec!(0.00)),
            Err(TransferError::InvalidAmount { .. })
        ));
        assert!(matches!(
            Amount::new(dec!(-1.00)),
            Err(TransferError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn test_amount_rejects_excess_precision() {
        assert!(matches!(
            Amount::new(dec!(1.001)),
            Err(TransferError::InvalidAmount { .. })
        ));
        // Trailing zeros beyond the minor unit are still the same value.
        assert!(Amount::new(dec!(1.1000)).is_ok());
    }

    #[test]
    fn test_balance_covers() {
        let balance = Balance::new(dec!(10.00));
        assert!(balance.covers(Amount::new(dec!(10.00)).unwrap()));
        assert!(!balance.covers(Amount::new(dec!(10.01)).unwrap()));
    }

    #[test]
    fn test_account_id_ordering_is_lexicographic() {
        assert!(AccountId::from("ACCT_A") < AccountId::from("ACCT_B"));
        assert!(AccountId::from("A") < AccountId::from("AB"));
    }
}
