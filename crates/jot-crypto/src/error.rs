//! Error types for cryptographic operations.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// The execution environment exposes no secure random source or
    /// authenticated-encryption primitive. Fatal for any encrypt/decrypt
    /// call; not recoverable at runtime.
    #[error("Crypto capability unavailable: {0}")]
    Capability(String),

    /// Encryption failed.
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// Authenticated decryption rejected the payload - ciphertext tampered,
    /// truncated, or encrypted under a different key. The partial plaintext
    /// must never be used.
    #[error("Decryption failed: ciphertext integrity check rejected the payload")]
    Integrity,

    /// Ciphertext token framing is malformed.
    #[error("Invalid ciphertext token: {0}")]
    Token(String),

    /// The persisted installation key is unreadable or malformed.
    #[error("Invalid keystore: {0}")]
    Keystore(String),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_display() {
        let err = CryptoError::Capability("no OS randomness".to_string());
        assert!(err.to_string().contains("no OS randomness"));
    }

    #[test]
    fn test_integrity_display() {
        let err = CryptoError::Integrity;
        assert!(err.to_string().contains("integrity"));
    }

    #[test]
    fn test_token_display() {
        let err = CryptoError::Token("too short".to_string());
        assert!(err.to_string().contains("too short"));
    }

    #[test]
    fn test_keystore_display() {
        let err = CryptoError::Keystore("not base64".to_string());
        assert!(err.to_string().contains("not base64"));
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let crypto_err: CryptoError = io_err.into();
        assert!(matches!(crypto_err, CryptoError::Io(_)));
    }
}
