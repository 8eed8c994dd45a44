use std::collections::HashSet;

use parking_lot::Mutex;
use rand::Rng;
use thiserror::Error;
use tracing::{error, trace};

use crate::account::AccountNumber;

#[derive(Debug, Error)]
pub enum IssueError {
    #[error("Account number space exhausted after {attempts} attempts")]
    CapacityExhausted { attempts: u32 },
}

/// Hands out account numbers that were never issued before in this process.
#[derive(Debug)]
pub struct AccountNumberIssuer {
    issued: Mutex<HashSet<AccountNumber>>,
    max_attempts: u32,
}

impl AccountNumberIssuer {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            issued: Mutex::new(HashSet::new()),
            max_attempts: max_attempts.max(1),
        }
    }

    /// Draws random candidates until one is absent from the issued set, then registers it
    /// under the same lock.
    pub fn issue(&self) -> Result<AccountNumber, IssueError> {
        self.issue_with(&mut rand::thread_rng())
    }

    pub(crate) fn issue_with(&self, rng: &mut impl Rng) -> Result<AccountNumber, IssueError> {
        for attempt in 1..=self.max_attempts {
            let candidate = Self::candidate(rng);
            let mut issued = self.issued.lock();
            if !issued.contains(&candidate) {
                issued.insert(candidate.clone());
                return Ok(candidate);
            }
            trace!(%candidate, attempt, "account number collision");
        }
        error!(
            attempts = self.max_attempts,
            issued = self.issued_count(),
            "account number space exhausted"
        );
        Err(IssueError::CapacityExhausted {
            attempts: self.max_attempts,
        })
    }

    pub fn issued_count(&self) -> usize {
        self.issued.lock().len()
    }

    fn candidate(rng: &mut impl Rng) -> AccountNumber {
        let mut number = String::with_capacity(AccountNumber::LEN);
        number.push(AccountNumber::PREFIX);
        for _ in 1..AccountNumber::LEN {
            number.push(char::from(b'0' + rng.gen_range(0..10u8)));
        }
        AccountNumber::new_unchecked(number)
    }
}
