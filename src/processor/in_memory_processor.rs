use rust_decimal::Decimal;
use tracing::debug;

use crate::{
    account::AccountNumber,
    audit::{AuditTrail, NewRecord},
    cipher::CipherService,
    config::LedgerConfig,
    directory::UserDirectory,
    issuer::AccountNumberIssuer,
    ledger::Ledger,
    transfer::{TransferCoordinator, TransferResult},
};

use super::{Receipt, StatementLine, TransactionProcessError, TransactionProcessor, UserReport};

/// Process-lifetime service state: ledger, audit trail, the single cipher key and the
/// user directory. Everything lives in memory and is lost on drop.
#[derive(Debug)]
pub struct InMemoryProcessor {
    ledger: Ledger,
    audit: AuditTrail,
    cipher: CipherService,
    directory: UserDirectory,
    mirror_transfers: bool,
}

impl Default for InMemoryProcessor {
    fn default() -> Self {
        Self::new(&LedgerConfig::default())
    }
}

impl InMemoryProcessor {
    pub fn new(config: &LedgerConfig) -> Self {
        Self {
            ledger: Ledger::new(
                AccountNumberIssuer::new(config.issuer.max_attempts),
                config.ledger.lock_timeout(),
            ),
            audit: AuditTrail::new(),
            cipher: CipherService::generate(),
            directory: UserDirectory::new(),
            mirror_transfers: config.audit.mirror_transfers,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn audit(&self) -> &AuditTrail {
        &self.audit
    }

    pub fn cipher(&self) -> &CipherService {
        &self.cipher
    }

    pub fn directory(&self) -> &UserDirectory {
        &self.directory
    }

    pub fn transfer_coordinator(&self) -> TransferCoordinator<'_> {
        TransferCoordinator::new(&self.ledger, &self.audit, &self.cipher)
            .mirror_transfers(self.mirror_transfers)
    }

    /// Decrypted view of every user, ordered by username.
    pub fn report(&self) -> Result<Vec<UserReport>, TransactionProcessError> {
        self.directory
            .usernames()
            .into_iter()
            .map(|username| -> Result<UserReport, TransactionProcessError> {
                let account_number = self.directory.account_number(&username)?;
                Ok(UserReport {
                    email: self.directory.email(&self.cipher, &username)?,
                    balance: self.balance(account_number.as_str())?,
                    statement: self.statement(account_number.as_str())?,
                    username,
                    account_number,
                })
            })
            .collect()
    }
}

impl TransactionProcessor for InMemoryProcessor {
    fn sign_up(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AccountNumber, TransactionProcessError> {
        Ok(self
            .directory
            .sign_up(&self.cipher, &self.ledger, username, email, password)?)
    }

    fn sign_in(&self, username: &str, password: &str) -> Result<(), TransactionProcessError> {
        Ok(self.directory.sign_in(&self.cipher, username, password)?)
    }

    fn account_number(&self, username: &str) -> Result<AccountNumber, TransactionProcessError> {
        Ok(self.directory.account_number(username)?)
    }

    fn deposit(&self, account: &str, amount: Decimal) -> Result<Receipt, TransactionProcessError> {
        let account = self.ledger.lookup(account)?;
        let encrypted_amount = self.cipher.encrypt_amount(amount)?;

        let mut state = account.lock()?;
        let balance = state.deposit(amount)?;
        // appended under the account lock so the trail follows the balance order
        self.audit.append(
            account.number(),
            NewRecord::deposit(encrypted_amount.clone()),
        );
        drop(state);

        debug!(account = %account.number(), %balance, "deposit recorded");
        Ok(Receipt {
            balance,
            encrypted_amount,
        })
    }

    fn withdraw(
        &self,
        account: &str,
        amount: Decimal,
    ) -> Result<Receipt, TransactionProcessError> {
        if amount <= Decimal::ZERO {
            return Err(TransactionProcessError::NonPositiveAmount(amount));
        }
        let account = self.ledger.lookup(account)?;
        let encrypted_amount = self.cipher.encrypt_amount(amount)?;

        let mut state = account.lock()?;
        let balance = state.withdraw(amount)?;
        self.audit.append(
            account.number(),
            NewRecord::withdrawal(encrypted_amount.clone()),
        );
        drop(state);

        debug!(account = %account.number(), %balance, "withdrawal recorded");
        Ok(Receipt {
            balance,
            encrypted_amount,
        })
    }

    fn transfer(
        &self,
        sender: &str,
        recipient: &str,
        amount: Decimal,
    ) -> Result<TransferResult, TransactionProcessError> {
        let sender = self.ledger.lookup(sender)?;
        Ok(self
            .transfer_coordinator()
            .transfer(&sender, recipient, amount)?)
    }

    fn balance(&self, account: &str) -> Result<Decimal, TransactionProcessError> {
        Ok(self.ledger.lookup(account)?.balance()?)
    }

    fn statement(&self, account: &str) -> Result<Vec<StatementLine>, TransactionProcessError> {
        let account = self.ledger.lookup(account)?;
        self.audit
            .all_records(account.number().as_str())
            .into_iter()
            .map(|record| -> Result<StatementLine, TransactionProcessError> {
                Ok(StatementLine {
                    sequence: record.sequence(),
                    kind: record.kind(),
                    amount: self.cipher.decrypt_amount(record.encrypted_amount())?,
                    encrypted_amount: record.encrypted_amount().clone(),
                    counterparty: record.counterparty().cloned(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use crate::{
        account::AccountError,
        audit::RecordKind,
        command::{Command, CommandError, TransactionKind},
        config::AuditConfig,
        ledger::LedgerError,
        transfer::TransferError,
    };

    use super::*;

    fn signed_up(processor: &InMemoryProcessor, username: &str) -> AccountNumber {
        processor
            .sign_up(username, &format!("{username}@example.com"), "securepassword")
            .unwrap()
    }

    #[test]
    fn process_some_transactions() {
        let processor = InMemoryProcessor::default();
        let a = signed_up(&processor, "alice");
        let b = signed_up(&processor, "bob");

        let receipt = processor.deposit(a.as_str(), dec!(100)).unwrap();
        assert_eq!(receipt.balance, dec!(100));
        let err = processor.withdraw(a.as_str(), dec!(150)).unwrap_err();
        assert!(matches!(
            err,
            TransactionProcessError::AccountErr(AccountError::InsufficientFunds { .. })
        ));
        assert!(err.is_refusal());
        assert_eq!(processor.balance(a.as_str()).unwrap(), dec!(100));

        let receipt = processor.withdraw(a.as_str(), dec!(25)).unwrap();
        assert_eq!(receipt.balance, dec!(75));
        assert_eq!(
            processor.cipher().decrypt_amount(&receipt.encrypted_amount).unwrap(),
            dec!(25)
        );

        let result = processor.transfer(a.as_str(), b.as_str(), dec!(50)).unwrap();
        assert_eq!(result.sender_balance, dec!(25));
        assert_eq!(result.recipient_balance, dec!(50));

        let statement = processor.statement(a.as_str()).unwrap();
        let kinds: Vec<_> = statement.iter().map(|line| line.kind).collect();
        assert_eq!(
            kinds,
            vec![
                RecordKind::Deposit,
                RecordKind::Withdrawal,
                RecordKind::TransferOut
            ]
        );
        let amounts: Vec<_> = statement.iter().map(|line| line.amount).collect();
        assert_eq!(amounts, vec![dec!(100), dec!(25), dec!(50)]);
        assert_eq!(statement[2].counterparty.as_ref(), Some(&b));
        assert!(processor.statement(b.as_str()).unwrap().is_empty());
    }

    #[test]
    fn failed_operations_leave_no_record() {
        let processor = InMemoryProcessor::default();
        let a = signed_up(&processor, "alice");
        processor.deposit(a.as_str(), dec!(10)).unwrap();

        for amount in [Decimal::ZERO, dec!(-1)] {
            let err = processor.withdraw(a.as_str(), amount).unwrap_err();
            assert!(matches!(err, TransactionProcessError::NonPositiveAmount(_)));
        }
        assert!(matches!(
            processor.deposit(a.as_str(), dec!(-1)).unwrap_err(),
            TransactionProcessError::AccountErr(AccountError::InvalidAmount { .. })
        ));
        assert!(matches!(
            processor.transfer(a.as_str(), "9999999999", dec!(5)).unwrap_err(),
            TransactionProcessError::TransferErr(TransferError::RecipientNotFound(_))
        ));
        assert!(matches!(
            processor.deposit("1000000000", dec!(1)).unwrap_err(),
            TransactionProcessError::LedgerErr(LedgerError::NotFound(_))
        ));

        assert_eq!(processor.audit().all_records(a.as_str()).len(), 1);
        assert_eq!(processor.balance(a.as_str()).unwrap(), dec!(10));
    }

    #[test]
    fn zero_deposit_is_recorded() {
        let processor = InMemoryProcessor::default();
        let a = signed_up(&processor, "alice");
        let receipt = processor.deposit(a.as_str(), Decimal::ZERO).unwrap();
        assert_eq!(receipt.balance, Decimal::ZERO);
        assert_eq!(processor.statement(a.as_str()).unwrap().len(), 1);
    }

    #[test]
    fn process_commands_by_username() {
        let processor = InMemoryProcessor::default();
        let signup = |name: &str| Command::Signup {
            username: name.to_string(),
            email: format!("{name}@example.com"),
            password: "pw".to_string(),
        };
        processor.process_command(signup("alice")).unwrap();
        processor.process_command(signup("bob")).unwrap();
        processor
            .process_command(Command::Deposit {
                username: "alice".to_string(),
                amount: dec!(20),
            })
            .unwrap();
        processor
            .process_command(Command::Transfer {
                username: "alice".to_string(),
                recipient: "bob".to_string(),
                amount: dec!(5),
            })
            .unwrap();

        // recipients can also be given as an account number
        let bob = processor.account_number("bob").unwrap();
        processor
            .process_command(Command::Transfer {
                username: "alice".to_string(),
                recipient: bob.to_string(),
                amount: dec!(5),
            })
            .unwrap();
        assert_eq!(processor.balance(bob.as_str()).unwrap(), dec!(10));

        let err = processor
            .process_command(Command::Transfer {
                username: "alice".to_string(),
                recipient: "carol".to_string(),
                amount: dec!(5),
            })
            .unwrap_err();
        assert_eq!(err.to_string(), "Recipient account carol not found");

        let err = processor
            .process_command(Command::Deposit {
                username: "carol".to_string(),
                amount: dec!(5),
            })
            .unwrap_err();
        assert!(!err.is_refusal());

        assert!(!TransactionProcessError::from(CommandError::AmountRequired {
            kind: TransactionKind::Deposit
        })
        .is_refusal());
    }

    #[test]
    fn report_decrypts_everything() {
        let processor = InMemoryProcessor::new(&LedgerConfig {
            audit: AuditConfig {
                mirror_transfers: true,
            },
            ..Default::default()
        });
        let a = signed_up(&processor, "alice");
        let b = signed_up(&processor, "bob");
        processor.deposit(a.as_str(), dec!(12.50)).unwrap();
        processor.transfer(a.as_str(), b.as_str(), dec!(2.5)).unwrap();

        let report = processor.report().unwrap();
        assert_eq!(report.len(), 2);
        assert_eq!(report[0].username, "alice");
        assert_eq!(report[0].email, "alice@example.com");
        assert_eq!(report[0].account_number, a);
        assert_eq!(report[0].balance, dec!(10));
        assert_eq!(report[0].statement.len(), 2);
        assert_eq!(report[1].username, "bob");
        assert_eq!(report[1].balance, dec!(2.5));
        assert_eq!(report[1].statement[0].kind, RecordKind::TransferIn);
        assert_eq!(report[1].statement[0].counterparty.as_ref(), Some(&a));
    }
}
