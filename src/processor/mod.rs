use rust_decimal::Decimal;
use thiserror::Error;

use crate::{
    account::{AccountError, AccountNumber},
    audit::RecordKind,
    cipher::{CipherError, Ciphertext},
    command::{Command, CommandError},
    directory::DirectoryError,
    ledger::LedgerError,
    transfer::{TransferError, TransferResult},
};

pub mod in_memory_processor;

#[derive(Debug, Error)]
pub enum TransactionProcessError {
    #[error(transparent)]
    CommandErr(#[from] CommandError),
    #[error(transparent)]
    AccountErr(#[from] AccountError),
    #[error(transparent)]
    LedgerErr(#[from] LedgerError),
    #[error(transparent)]
    TransferErr(#[from] TransferError),
    #[error(transparent)]
    DirectoryErr(#[from] DirectoryError),
    #[error(transparent)]
    CipherErr(#[from] CipherError),
    #[error("Amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),
}

impl TransactionProcessError {
    /// Business refusals (overdraft, duplicate user, ...) as opposed to malformed requests
    /// or broken infrastructure.
    pub fn is_refusal(&self) -> bool {
        match self {
            Self::AccountErr(err) => !matches!(err, AccountError::Busy { .. }),
            Self::TransferErr(err) => !matches!(
                err,
                TransferError::Cipher(_) | TransferError::Account(AccountError::Busy { .. })
            ),
            Self::DirectoryErr(err) => matches!(
                err,
                DirectoryError::DuplicateEmail
                    | DirectoryError::InvalidEmail(_)
                    | DirectoryError::DuplicateUsername(_)
                    | DirectoryError::IncorrectPassword
            ),
            Self::NonPositiveAmount(_) => true,
            Self::CommandErr(_) | Self::LedgerErr(_) | Self::CipherErr(_) => false,
        }
    }
}

/// Outcome of a deposit or withdrawal.
#[derive(Debug, Clone)]
pub struct Receipt {
    pub balance: Decimal,
    pub encrypted_amount: Ciphertext,
}

/// An audit record with its amount decrypted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementLine {
    pub sequence: u64,
    pub kind: RecordKind,
    pub amount: Decimal,
    pub encrypted_amount: Ciphertext,
    pub counterparty: Option<AccountNumber>,
}

#[derive(Debug, Clone)]
pub struct UserReport {
    pub username: String,
    pub email: String,
    pub account_number: AccountNumber,
    pub balance: Decimal,
    pub statement: Vec<StatementLine>,
}

/// Entry points of the ledger core, addressed by account number.
///
/// The caller has already authenticated the user; `process_command` resolves usernames
/// through the user directory for callers that only know usernames.
pub trait TransactionProcessor {
    fn sign_up(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AccountNumber, TransactionProcessError>;

    fn sign_in(&self, username: &str, password: &str) -> Result<(), TransactionProcessError>;

    fn account_number(&self, username: &str) -> Result<AccountNumber, TransactionProcessError>;

    fn deposit(&self, account: &str, amount: Decimal) -> Result<Receipt, TransactionProcessError>;

    fn withdraw(&self, account: &str, amount: Decimal)
    -> Result<Receipt, TransactionProcessError>;

    fn transfer(
        &self,
        sender: &str,
        recipient: &str,
        amount: Decimal,
    ) -> Result<TransferResult, TransactionProcessError>;

    fn balance(&self, account: &str) -> Result<Decimal, TransactionProcessError>;

    fn statement(&self, account: &str) -> Result<Vec<StatementLine>, TransactionProcessError>;

    fn process_command(&self, command: Command) -> Result<(), TransactionProcessError> {
        match command {
            Command::Signup {
                username,
                email,
                password,
            } => {
                self.sign_up(&username, &email, &password)?;
            }
            Command::Deposit { username, amount } => {
                let account = self.account_number(&username)?;
                self.deposit(account.as_str(), amount)?;
            }
            Command::Withdraw { username, amount } => {
                let account = self.account_number(&username)?;
                self.withdraw(account.as_str(), amount)?;
            }
            Command::Transfer {
                username,
                recipient,
                amount,
            } => {
                let sender = self.account_number(&username)?;
                // recipients may be named by username or by account number
                let recipient = match self.account_number(&recipient) {
                    Ok(number) => number.to_string(),
                    Err(_) => recipient,
                };
                self.transfer(sender.as_str(), &recipient, amount)?;
            }
        }
        Ok(())
    }
}
