use std::{collections::HashMap, sync::LazyLock};

use parking_lot::RwLock;
use regex::Regex;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::info;

use crate::{
    account::AccountNumber,
    cipher::{CipherError, Ciphertext, CipherService},
    ledger::{Ledger, LedgerError},
};

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email pattern")
});

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Email already exists")]
    DuplicateEmail,
    #[error("Invalid email format: {0}")]
    InvalidEmail(String),
    #[error("Username {0} already exists")]
    DuplicateUsername(String),
    #[error("Username {0} does not exist")]
    UnknownUser(String),
    #[error("Incorrect password")]
    IncorrectPassword,
    #[error(transparent)]
    Cipher(#[from] CipherError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Credentials of one user, stored encrypted.
#[derive(Debug, Clone)]
struct UserRecord {
    email: Ciphertext,
    password: Ciphertext,
    account_number: AccountNumber,
}

/// Maps usernames to their single account and keeps their credentials.
#[derive(Debug, Default)]
pub struct UserDirectory {
    users: RwLock<HashMap<String, UserRecord>>,
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user and opens their account with a zero balance.
    ///
    /// Checks run in order: email uniqueness, email format, username uniqueness. The
    /// directory stays write-locked for the whole call, so concurrent sign-ups cannot
    /// both claim the same username or email.
    pub fn sign_up(
        &self,
        cipher: &CipherService,
        ledger: &Ledger,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AccountNumber, DirectoryError> {
        let mut users = self.users.write();
        for user in users.values() {
            if cipher.decrypt_string(&user.email)? == email {
                return Err(DirectoryError::DuplicateEmail);
            }
        }
        if !is_valid_email(email) {
            return Err(DirectoryError::InvalidEmail(email.to_string()));
        }
        if users.contains_key(username) {
            return Err(DirectoryError::DuplicateUsername(username.to_string()));
        }

        let record = UserRecord {
            email: cipher.encrypt_str(email)?,
            password: cipher.encrypt_str(password)?,
            account_number: ledger.create(Decimal::ZERO)?.number().clone(),
        };
        let account_number = record.account_number.clone();
        users.insert(username.to_string(), record);
        info!(username, account = %account_number, "user signed up");
        Ok(account_number)
    }

    pub fn sign_in(
        &self,
        cipher: &CipherService,
        username: &str,
        password: &str,
    ) -> Result<(), DirectoryError> {
        let stored = self.record(username)?.password;
        if cipher.decrypt_string(&stored)? == password {
            Ok(())
        } else {
            Err(DirectoryError::IncorrectPassword)
        }
    }

    pub fn account_number(&self, username: &str) -> Result<AccountNumber, DirectoryError> {
        Ok(self.record(username)?.account_number)
    }

    pub fn email(&self, cipher: &CipherService, username: &str) -> Result<String, DirectoryError> {
        Ok(cipher.decrypt_string(&self.record(username)?.email)?)
    }

    /// Registered usernames in ascending order.
    pub fn usernames(&self) -> Vec<String> {
        let mut names: Vec<_> = self.users.read().keys().cloned().collect();
        names.sort();
        names
    }

    fn record(&self, username: &str) -> Result<UserRecord, DirectoryError> {
        self.users
            .read()
            .get(username)
            .cloned()
            .ok_or_else(|| DirectoryError::UnknownUser(username.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::issuer::AccountNumberIssuer;

    use super::*;

    struct Fixture {
        directory: UserDirectory,
        cipher: CipherService,
        ledger: Ledger,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                directory: UserDirectory::new(),
                cipher: CipherService::generate(),
                ledger: Ledger::new(AccountNumberIssuer::new(100), Duration::from_secs(1)),
            }
        }

        fn sign_up(&self, username: &str, email: &str) -> Result<AccountNumber, DirectoryError> {
            self.directory
                .sign_up(&self.cipher, &self.ledger, username, email, "securepassword")
        }
    }

    #[test]
    fn email_format() {
        assert!(is_valid_email("uniqueuser@example.com"));
        assert!(is_valid_email("first.last-1@mail.example.co"));
        assert!(!is_valid_email("no-at-sign.example.com"));
        assert!(!is_valid_email("user@nodot"));
        assert!(!is_valid_email("user@example.c"));
        assert!(!is_valid_email("us er@example.com"));
    }

    #[test]
    fn sign_up_opens_an_account() {
        let fx = Fixture::new();
        let number = fx.sign_up("alice", "alice@example.com").unwrap();
        assert_eq!(fx.directory.account_number("alice").unwrap(), number);
        let account = fx.ledger.lookup(number.as_str()).unwrap();
        assert_eq!(account.balance().unwrap(), Decimal::ZERO);
        assert_eq!(
            fx.directory.email(&fx.cipher, "alice").unwrap(),
            "alice@example.com"
        );
    }

    #[test]
    fn duplicates_are_rejected() {
        let fx = Fixture::new();
        fx.sign_up("testuser", "test@example.com").unwrap();

        let err = fx.sign_up("testuser2", "test@example.com").unwrap_err();
        assert!(matches!(err, DirectoryError::DuplicateEmail));

        let err = fx.sign_up("testuser", "other@example.com").unwrap_err();
        assert_eq!(err.to_string(), "Username testuser already exists");

        let err = fx.sign_up("newuser", "broken-email").unwrap_err();
        assert!(matches!(err, DirectoryError::InvalidEmail(_)));

        assert_eq!(fx.ledger.len(), 1);
        assert_eq!(fx.directory.usernames(), vec!["testuser".to_string()]);
    }

    #[test]
    fn sign_in_checks_password() {
        let fx = Fixture::new();
        fx.sign_up("signinuser", "signin@example.com").unwrap();
        fx.directory
            .sign_in(&fx.cipher, "signinuser", "securepassword")
            .unwrap();
        assert!(matches!(
            fx.directory.sign_in(&fx.cipher, "signinuser", "wrongpassword"),
            Err(DirectoryError::IncorrectPassword)
        ));
        assert!(matches!(
            fx.directory.sign_in(&fx.cipher, "invaliduser", "somepassword"),
            Err(DirectoryError::UnknownUser(_))
        ));
    }
}
