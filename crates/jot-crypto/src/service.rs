//! The encryption service: one cached key handle per installation.

use std::path::Path;

use aes_gcm::Aes256Gcm;

use crate::cipher::{self, KEY_LEN};
use crate::error::{CryptoError, CryptoResult};
use crate::keystore;
use crate::token;

/// A decrypted binary payload together with the content type the caller
/// declared. The content type is not embedded in the ciphertext, so it
/// rides along at decrypt time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedBlob {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Symmetric encryption for all user content.
///
/// Holds the single cipher handle built from the installation key. The
/// composition root constructs one service and passes it to every consumer
/// that produces plaintext; the key is never imported twice in a process.
pub struct EncryptionService {
    cipher: Aes256Gcm,
}

impl EncryptionService {
    /// Open the service against a data directory, loading the persisted
    /// installation key or generating and persisting one on first use.
    pub fn open(data_dir: &Path) -> CryptoResult<Self> {
        let key = keystore::load_or_create(data_dir)?;
        Ok(Self {
            cipher: cipher::build_cipher(&key)?,
        })
    }

    /// Build the service from raw key material. Used by tests and by hosts
    /// that manage key storage themselves.
    pub fn from_key(key: &[u8; KEY_LEN]) -> CryptoResult<Self> {
        Ok(Self {
            cipher: cipher::build_cipher(key)?,
        })
    }

    /// Encrypt UTF-8 text into a transportable base64 token of
    /// `IV || ciphertext`. A fresh random IV is generated per call, so
    /// identical inputs never produce identical tokens.
    pub fn encrypt_text(&self, plain: &str) -> CryptoResult<String> {
        let framed = self.seal(plain.as_bytes())?;
        Ok(token::encode_token(&framed))
    }

    /// Decrypt a token produced by [`Self::encrypt_text`]. Tampered,
    /// truncated, or wrong-key tokens fail the integrity check.
    pub fn decrypt_text(&self, ciphertext_token: &str) -> CryptoResult<String> {
        let framed = token::decode_token(ciphertext_token)?;
        let plain = self.unseal(&framed)?;
        String::from_utf8(plain).map_err(|_| CryptoError::Integrity)
    }

    /// Encrypt a binary payload, returning raw `IV || ciphertext` bytes.
    pub fn encrypt_blob(&self, bytes: &[u8]) -> CryptoResult<Vec<u8>> {
        self.seal(bytes)
    }

    /// Decrypt an IV-prefixed binary payload. The declared content type is
    /// supplied by the caller and carried on the result.
    pub fn decrypt_blob(&self, data: &[u8], content_type: &str) -> CryptoResult<DecryptedBlob> {
        let bytes = self.unseal(data)?;
        Ok(DecryptedBlob {
            content_type: content_type.to_string(),
            bytes,
        })
    }

    fn seal(&self, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        let iv = cipher::generate_iv()?;
        let ciphertext = cipher::aes_gcm_encrypt(&self.cipher, &iv, plaintext)?;
        Ok(token::frame(&iv, ciphertext))
    }

    fn unseal(&self, framed: &[u8]) -> CryptoResult<Vec<u8>> {
        let (iv, ciphertext) = token::unframe(framed)?;
        cipher::aes_gcm_decrypt(&self.cipher, &iv, ciphertext)
    }
}
