use rust_decimal::Decimal;
use thiserror::Error;
use tracing::info;

use crate::{
    account::{Account, AccountError, AccountGuard, AccountNumber},
    audit::{AuditTrail, NewRecord},
    cipher::{CipherError, Ciphertext, CipherService},
    ledger::Ledger,
};

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Transfer amount must be positive, got {0}")]
    InvalidAmount(Decimal),
    #[error("Recipient account {0} not found")]
    RecipientNotFound(String),
    #[error("Cannot transfer from account {0} to itself")]
    SameAccount(AccountNumber),
    #[error(transparent)]
    Account(#[from] AccountError),
    #[error(transparent)]
    Cipher(#[from] CipherError),
}

#[derive(Debug, Clone)]
pub struct TransferResult {
    pub sender_balance: Decimal,
    pub recipient_balance: Decimal,
    pub encrypted_amount: Ciphertext,
}

/// Moves funds between two ledger accounts as one unit and audits the move.
pub struct TransferCoordinator<'a> {
    ledger: &'a Ledger,
    audit: &'a AuditTrail,
    cipher: &'a CipherService,
    mirror_transfers: bool,
}

impl<'a> TransferCoordinator<'a> {
    pub fn new(ledger: &'a Ledger, audit: &'a AuditTrail, cipher: &'a CipherService) -> Self {
        Self {
            ledger,
            audit,
            cipher,
            mirror_transfers: false,
        }
    }

    /// Also record a `transfer_in` entry on the recipient's trail.
    pub fn mirror_transfers(mut self, enabled: bool) -> Self {
        self.mirror_transfers = enabled;
        self
    }

    /// Every check runs before any balance is touched: amount, recipient existence, then
    /// sender funds and recipient headroom. Both account locks are held, in account
    /// number order, from the debit until the audit entry is written.
    pub fn transfer(
        &self,
        sender: &Account,
        recipient_number: &str,
        amount: Decimal,
    ) -> Result<TransferResult, TransferError> {
        if amount <= Decimal::ZERO {
            return Err(TransferError::InvalidAmount(amount));
        }
        let recipient = self
            .ledger
            .lookup(recipient_number)
            .map_err(|_| TransferError::RecipientNotFound(recipient_number.to_string()))?;
        if recipient.number() == sender.number() {
            return Err(TransferError::SameAccount(sender.number().clone()));
        }
        let encrypted_amount = self.cipher.encrypt_amount(amount)?;

        let (mut sender_state, mut recipient_state) = lock_in_order(sender, &recipient)?;
        let debit = sender_state.handle_withdraw(amount)?;
        let credit = recipient_state.handle_deposit(amount)?;
        sender_state.apply(&debit);
        recipient_state.apply(&credit);

        self.audit.append(
            sender.number(),
            NewRecord::transfer_out(encrypted_amount.clone(), recipient.number().clone()),
        );
        if self.mirror_transfers {
            self.audit.append(
                recipient.number(),
                NewRecord::transfer_in(encrypted_amount.clone(), sender.number().clone()),
            );
        }

        let result = TransferResult {
            sender_balance: sender_state.balance(),
            recipient_balance: recipient_state.balance(),
            encrypted_amount,
        };
        drop(recipient_state);
        drop(sender_state);

        info!(
            sender = %sender.number(),
            recipient = %recipient.number(),
            "transfer completed"
        );
        Ok(result)
    }
}

/// Returns `(sender, recipient)` guards, acquired in ascending account number order.
fn lock_in_order<'s>(
    sender: &'s Account,
    recipient: &'s Account,
) -> Result<(AccountGuard<'s>, AccountGuard<'s>), AccountError> {
    if sender.number() < recipient.number() {
        let sender_state = sender.lock()?;
        let recipient_state = recipient.lock()?;
        Ok((sender_state, recipient_state))
    } else {
        let recipient_state = recipient.lock()?;
        let sender_state = sender.lock()?;
        Ok((sender_state, recipient_state))
    }
}
