use std::{borrow::Borrow, fmt, time::Duration};

use parking_lot::{Mutex, MutexGuard};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, warn};

/// Ten digit account identifier, always starting with `1`.
///
/// Numbers have a fixed width, so lexicographic order matches numeric order.
/// That order is the global lock order for operations touching two accounts.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccountNumber(String);

impl AccountNumber {
    pub const LEN: usize = 10;
    pub const PREFIX: char = '1';

    /// Caller guarantees the format; only the issuer creates numbers.
    pub(crate) fn new_unchecked(value: String) -> Self {
        debug_assert_eq!(value.len(), Self::LEN);
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Checks the shape of an externally supplied number.
    pub fn is_well_formed(value: &str) -> bool {
        value.len() == Self::LEN
            && value.starts_with(Self::PREFIX)
            && value.bytes().all(|b| b.is_ascii_digit())
    }
}

impl Borrow<str> for AccountNumber {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountEventKind {
    Deposited,
    Withdrawn,
}

/// Validated balance change, produced by `handle_*` and consumed by [`AccountState::apply`].
/// Carries the resulting balance, so applying it cannot fail.
#[derive(Debug)]
pub struct AccountEvent {
    amount: Decimal,
    kind: AccountEventKind,
    balance: Decimal,
}

impl AccountEvent {
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn kind(&self) -> AccountEventKind {
        self.kind
    }

    /// Balance once the event is applied.
    pub fn balance(&self) -> Decimal {
        self.balance
    }
}

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Amount must not be negative, got {amount}")]
    InvalidAmount { amount: Decimal },
    #[error("Insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds {
        requested: Decimal,
        available: Decimal,
    },
    #[error("Deposit of {amount} would overflow balance {balance}")]
    BalanceOverflow { amount: Decimal, balance: Decimal },
    #[error("Account {account} is busy, lock not acquired within {timeout:?}")]
    Busy {
        account: AccountNumber,
        timeout: Duration,
    },
}

/// Balance held behind an account lock.
///
/// Requests are validated first and turned into an [`AccountEvent`], the event is then
/// applied. A rejected request never touches the balance.
#[derive(Debug, Default)]
pub struct AccountState {
    balance: Decimal,
}

impl AccountState {
    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn apply(&mut self, event: &AccountEvent) {
        self.balance = event.balance;
    }

    pub fn handle_deposit(&self, amount: Decimal) -> Result<AccountEvent, AccountError> {
        if amount < Decimal::ZERO {
            return Err(AccountError::InvalidAmount { amount });
        }
        let balance = self
            .balance
            .checked_add(amount)
            .ok_or(AccountError::BalanceOverflow {
                amount,
                balance: self.balance,
            })?;
        Ok(AccountEvent {
            amount,
            kind: AccountEventKind::Deposited,
            balance,
        })
    }

    pub fn handle_withdraw(&self, amount: Decimal) -> Result<AccountEvent, AccountError> {
        if amount < Decimal::ZERO {
            return Err(AccountError::InvalidAmount { amount });
        }
        if amount > self.balance {
            return Err(AccountError::InsufficientFunds {
                requested: amount,
                available: self.balance,
            });
        }
        Ok(AccountEvent {
            amount,
            kind: AccountEventKind::Withdrawn,
            balance: self.balance - amount,
        })
    }

    /// Returns the balance after the deposit.
    pub fn deposit(&mut self, amount: Decimal) -> Result<Decimal, AccountError> {
        let event = self.handle_deposit(amount)?;
        self.apply(&event);
        Ok(self.balance)
    }

    /// Returns the balance after the withdrawal.
    pub fn withdraw(&mut self, amount: Decimal) -> Result<Decimal, AccountError> {
        let event = self.handle_withdraw(amount)?;
        self.apply(&event);
        Ok(self.balance)
    }
}

pub type AccountGuard<'a> = MutexGuard<'a, AccountState>;

/// A balance holder owned by the [`crate::ledger::Ledger`].
///
/// Every read-modify-write runs under the account's own lock. Callers needing several
/// operations to be observed as one (e.g. balance change plus audit append) hold the
/// guard returned by [`Account::lock`].
#[derive(Debug)]
pub struct Account {
    number: AccountNumber,
    state: Mutex<AccountState>,
    lock_timeout: Duration,
}

impl Account {
    pub(crate) fn new(
        number: AccountNumber,
        initial_balance: Decimal,
        lock_timeout: Duration,
    ) -> Self {
        Self {
            number,
            state: Mutex::new(AccountState {
                balance: initial_balance,
            }),
            lock_timeout,
        }
    }

    pub fn number(&self) -> &AccountNumber {
        &self.number
    }

    pub fn lock(&self) -> Result<AccountGuard<'_>, AccountError> {
        self.state.try_lock_for(self.lock_timeout).ok_or_else(|| {
            warn!(account = %self.number, timeout = ?self.lock_timeout, "account lock timed out");
            AccountError::Busy {
                account: self.number.clone(),
                timeout: self.lock_timeout,
            }
        })
    }

    pub fn deposit(&self, amount: Decimal) -> Result<Decimal, AccountError> {
        let balance = self.lock()?.deposit(amount)?;
        debug!(account = %self.number, %amount, %balance, "deposited");
        Ok(balance)
    }

    pub fn withdraw(&self, amount: Decimal) -> Result<Decimal, AccountError> {
        let balance = self.lock()?.withdraw(amount)?;
        debug!(account = %self.number, %amount, %balance, "withdrawn");
        Ok(balance)
    }

    pub fn balance(&self) -> Result<Decimal, AccountError> {
        Ok(self.lock()?.balance())
    }
}
