//! Symmetric protection of amounts and credential fields at rest.
//!
//! XChaCha20-Poly1305 with a random 24-byte nonce per message.
//! Token format: URL-safe base64 of `[ nonce (24 bytes) | ciphertext + tag ]`.

use std::{fmt, str::FromStr};

use base64::{Engine as _, engine::general_purpose::URL_SAFE};
use chacha20poly1305::{
    Key, XChaCha20Poly1305, XNonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use rust_decimal::Decimal;
use thiserror::Error;
use zeroize::Zeroizing;

const NONCE_LEN: usize = 24;
const KEY_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum CipherError {
    #[error("Encryption failed")]
    EncryptionFailed,
    #[error("Decryption failed (tampered, truncated or foreign ciphertext)")]
    DecryptionFailed,
    #[error("Decrypted payload is not a decimal amount: {0}")]
    MalformedAmount(String),
}

/// Encoded ciphertext, safe to store and print.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ciphertext(String);

impl Ciphertext {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ciphertext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Ciphertext {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Holds the single process-wide key. The key never leaves this struct and is wiped on drop.
pub struct CipherService {
    key: Zeroizing<[u8; KEY_LEN]>,
}

impl fmt::Debug for CipherService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CipherService").finish_non_exhaustive()
    }
}

impl CipherService {
    /// Generates a fresh random key.
    pub fn generate() -> Self {
        let key = XChaCha20Poly1305::generate_key(&mut OsRng);
        let mut bytes = Zeroizing::new([0u8; KEY_LEN]);
        bytes.copy_from_slice(key.as_slice());
        Self { key: bytes }
    }

    fn cipher(&self) -> XChaCha20Poly1305 {
        XChaCha20Poly1305::new(Key::from_slice(self.key.as_slice()))
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Ciphertext, CipherError> {
        let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);
        let sealed = self
            .cipher()
            .encrypt(&nonce, plaintext)
            .map_err(|_| CipherError::EncryptionFailed)?;

        let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(Ciphertext(URL_SAFE.encode(out)))
    }

    pub fn decrypt(&self, ciphertext: &Ciphertext) -> Result<Vec<u8>, CipherError> {
        let data = URL_SAFE
            .decode(ciphertext.as_str())
            .map_err(|_| CipherError::DecryptionFailed)?;
        if data.len() < NONCE_LEN {
            return Err(CipherError::DecryptionFailed);
        }
        let (nonce, sealed) = data.split_at(NONCE_LEN);
        self.cipher()
            .decrypt(XNonce::from_slice(nonce), sealed)
            .map_err(|_| CipherError::DecryptionFailed)
    }

    pub fn encrypt_str(&self, plaintext: &str) -> Result<Ciphertext, CipherError> {
        self.encrypt(plaintext.as_bytes())
    }

    pub fn decrypt_string(&self, ciphertext: &Ciphertext) -> Result<String, CipherError> {
        String::from_utf8(self.decrypt(ciphertext)?).map_err(|_| CipherError::DecryptionFailed)
    }

    /// Encrypts the canonical (normalized) decimal string of `amount`.
    pub fn encrypt_amount(&self, amount: Decimal) -> Result<Ciphertext, CipherError> {
        self.encrypt_str(&canonical_amount(amount))
    }

    pub fn decrypt_amount(&self, ciphertext: &Ciphertext) -> Result<Decimal, CipherError> {
        let plaintext = self.decrypt_string(ciphertext)?;
        Decimal::from_str(&plaintext).map_err(|_| CipherError::MalformedAmount(plaintext))
    }
}

pub fn canonical_amount(amount: Decimal) -> String {
    amount.normalize().to_string()
}
