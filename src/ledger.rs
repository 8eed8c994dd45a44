use std::{
    collections::{HashMap, hash_map::Entry},
    sync::Arc,
    time::Duration,
};

use parking_lot::RwLock;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::info;

use crate::{
    account::{Account, AccountNumber},
    issuer::{AccountNumberIssuer, IssueError},
};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Account {0} not found")]
    NotFound(String),
    #[error("Account number {0} is already registered")]
    DuplicateIdentifier(AccountNumber),
    #[error("Initial balance must not be negative, got {0}")]
    InvalidAmount(Decimal),
    #[error(transparent)]
    Issue(#[from] IssueError),
}

/// Directory of every live account, keyed by account number.
///
/// The only place accounts are created or enumerated. Accounts are never removed.
#[derive(Debug)]
pub struct Ledger {
    accounts: RwLock<HashMap<AccountNumber, Arc<Account>>>,
    issuer: AccountNumberIssuer,
    lock_timeout: Duration,
}

impl Ledger {
    pub fn new(issuer: AccountNumberIssuer, lock_timeout: Duration) -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            issuer,
            lock_timeout,
        }
    }

    pub fn create(&self, initial_balance: Decimal) -> Result<Arc<Account>, LedgerError> {
        if initial_balance < Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(initial_balance));
        }
        let number = self.issuer.issue()?;
        let account = Arc::new(Account::new(
            number.clone(),
            initial_balance,
            self.lock_timeout,
        ));
        match self.accounts.write().entry(number) {
            Entry::Occupied(entry) => Err(LedgerError::DuplicateIdentifier(entry.key().clone())),
            Entry::Vacant(entry) => {
                info!(account = %entry.key(), %initial_balance, "account created");
                entry.insert(account.clone());
                Ok(account)
            }
        }
    }

    pub fn lookup(&self, number: &str) -> Result<Arc<Account>, LedgerError> {
        self.accounts
            .read()
            .get(number)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(number.to_string()))
    }

    /// All accounts, ordered by account number.
    pub fn accounts(&self) -> Vec<Arc<Account>> {
        let mut accounts: Vec<_> = self.accounts.read().values().cloned().collect();
        accounts.sort_by(|a, b| a.number().cmp(b.number()));
        accounts
    }

    pub fn len(&self) -> usize {
        self.accounts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn test_ledger() -> Ledger {
        Ledger::new(AccountNumberIssuer::new(100), Duration::from_secs(1))
    }

    #[test]
    fn create_and_lookup() {
        let ledger = test_ledger();
        assert!(ledger.is_empty());
        let a = ledger.create(Decimal::ZERO).unwrap();
        let b = ledger.create(dec!(200)).unwrap();
        assert_ne!(a.number(), b.number());
        assert_eq!(ledger.len(), 2);

        let found = ledger.lookup(b.number().as_str()).unwrap();
        assert!(Arc::ptr_eq(&found, &b));
        assert_eq!(found.balance().unwrap(), dec!(200));

        // mutations through a looked-up handle are visible through the ledger
        ledger.lookup(a.number().as_str()).unwrap().deposit(dec!(7)).unwrap();
        assert_eq!(a.balance().unwrap(), dec!(7));
    }

    #[test]
    fn unknown_number_is_not_found() {
        let ledger = test_ledger();
        ledger.create(Decimal::ZERO).unwrap();
        let err = ledger.lookup("9999999999").unwrap_err();
        assert_eq!(err.to_string(), "Account 9999999999 not found");
    }

    #[test]
    fn negative_initial_balance_is_rejected() {
        let ledger = test_ledger();
        assert!(matches!(
            ledger.create(dec!(-1)),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(ledger.is_empty());
    }

    #[test]
    fn accounts_are_ordered_by_number() {
        let ledger = test_ledger();
        for _ in 0..20 {
            ledger.create(Decimal::ZERO).unwrap();
        }
        let numbers: Vec<_> = ledger
            .accounts()
            .iter()
            .map(|acc| acc.number().clone())
            .collect();
        assert_eq!(numbers.len(), 20);
        assert!(numbers.windows(2).all(|w| w[0] < w[1]));
    }
}
