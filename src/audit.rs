use std::collections::HashMap;

use parking_lot::Mutex;
use serde::Serialize;

use crate::{account::AccountNumber, cipher::Ciphertext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Deposit,
    Withdrawal,
    TransferOut,
    TransferIn,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Deposit => "deposit",
            RecordKind::Withdrawal => "withdrawal",
            RecordKind::TransferOut => "transfer_out",
            RecordKind::TransferIn => "transfer_in",
        }
    }
}

/// One audited balance change. The amount is only ever held as ciphertext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    sequence: u64,
    kind: RecordKind,
    encrypted_amount: Ciphertext,
    counterparty: Option<AccountNumber>,
}

impl TransactionRecord {
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn encrypted_amount(&self) -> &Ciphertext {
        &self.encrypted_amount
    }

    pub fn counterparty(&self) -> Option<&AccountNumber> {
        self.counterparty.as_ref()
    }
}

/// What callers hand to [`AuditTrail::append`]; the trail assigns the sequence number.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub kind: RecordKind,
    pub encrypted_amount: Ciphertext,
    pub counterparty: Option<AccountNumber>,
}

impl NewRecord {
    pub fn deposit(encrypted_amount: Ciphertext) -> Self {
        Self {
            kind: RecordKind::Deposit,
            encrypted_amount,
            counterparty: None,
        }
    }

    pub fn withdrawal(encrypted_amount: Ciphertext) -> Self {
        Self {
            kind: RecordKind::Withdrawal,
            encrypted_amount,
            counterparty: None,
        }
    }

    pub fn transfer_out(encrypted_amount: Ciphertext, recipient: AccountNumber) -> Self {
        Self {
            kind: RecordKind::TransferOut,
            encrypted_amount,
            counterparty: Some(recipient),
        }
    }

    pub fn transfer_in(encrypted_amount: Ciphertext, sender: AccountNumber) -> Self {
        Self {
            kind: RecordKind::TransferIn,
            encrypted_amount,
            counterparty: Some(sender),
        }
    }
}

#[derive(Debug, Default)]
struct TrailState {
    next_sequence: u64,
    records: HashMap<AccountNumber, Vec<TransactionRecord>>,
}

/// Append-only, per-account history of transactions.
///
/// Lock order: callers may hold account locks while appending, never the reverse.
#[derive(Debug, Default)]
pub struct AuditTrail {
    inner: Mutex<TrailState>,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, owner: &AccountNumber, record: NewRecord) -> u64 {
        let mut state = self.inner.lock();
        state.next_sequence += 1;
        let sequence = state.next_sequence;
        state
            .records
            .entry(owner.clone())
            .or_default()
            .push(TransactionRecord {
                sequence,
                kind: record.kind,
                encrypted_amount: record.encrypted_amount,
                counterparty: record.counterparty,
            });
        sequence
    }

    /// Snapshot of the owner's records in append order. Empty for unknown owners.
    pub fn all_records(&self, owner: &str) -> Vec<TransactionRecord> {
        self.inner
            .lock()
            .records
            .get(owner)
            .cloned()
            .unwrap_or_default()
    }

    /// Accounts with at least one record, ordered by account number.
    pub fn owners(&self) -> Vec<AccountNumber> {
        let mut owners: Vec<_> = self.inner.lock().records.keys().cloned().collect();
        owners.sort();
        owners
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number(n: &str) -> AccountNumber {
        AccountNumber::new_unchecked(n.to_string())
    }

    fn token(t: &str) -> Ciphertext {
        Ciphertext::from(t.to_string())
    }

    #[test]
    fn records_keep_append_order() {
        let trail = AuditTrail::new();
        let a = number("1000000001");
        let b = number("1000000002");
        trail.append(&a, NewRecord::deposit(token("t1")));
        trail.append(&b, NewRecord::deposit(token("t2")));
        trail.append(&a, NewRecord::transfer_out(token("t3"), b.clone()));

        let records = trail.all_records(a.as_str());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].kind(), RecordKind::Deposit);
        assert_eq!(records[0].counterparty(), None);
        assert_eq!(records[1].kind(), RecordKind::TransferOut);
        assert_eq!(records[1].counterparty(), Some(&b));
        assert_eq!(records[1].encrypted_amount(), &token("t3"));
        assert!(records[0].sequence() < records[1].sequence());

        assert_eq!(trail.owners(), vec![a, b]);
    }

    #[test]
    fn snapshots_are_restartable() {
        let trail = AuditTrail::new();
        let a = number("1000000001");
        trail.append(&a, NewRecord::withdrawal(token("t1")));
        let first = trail.all_records(a.as_str());
        let second = trail.all_records(a.as_str());
        assert_eq!(first, second);
        assert!(trail.all_records("1999999999").is_empty());
    }

    #[test]
    fn kind_names() {
        assert_eq!(RecordKind::TransferOut.as_str(), "transfer_out");
        assert_eq!(RecordKind::Withdrawal.as_str(), "withdrawal");
    }
}
