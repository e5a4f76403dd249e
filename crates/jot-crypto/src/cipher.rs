//! AES-256-GCM cipher operations.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{CryptoError, CryptoResult};

/// Byte length of the AES-256 key.
pub const KEY_LEN: usize = 32;

/// Byte length of the GCM initialization vector.
pub const IV_LEN: usize = 12;

/// Byte length of the GCM authentication tag appended to the ciphertext.
pub const TAG_LEN: usize = 16;

/// Generate cryptographically secure random bytes from the OS source.
///
/// Fails with a capability error when the platform exposes no secure
/// randomness rather than degrading to a weaker source.
pub fn generate_random<const N: usize>() -> CryptoResult<[u8; N]> {
    let mut bytes = [0u8; N];
    OsRng.try_fill_bytes(&mut bytes).map_err(|e| {
        CryptoError::Capability(format!("secure random source unavailable: {}", e))
    })?;
    Ok(bytes)
}

/// Generate a random 256-bit key.
pub fn generate_key() -> CryptoResult<[u8; KEY_LEN]> {
    generate_random()
}

/// Generate a random initialization vector (12 bytes).
///
/// A fresh IV is required for every encryption call; reusing one under the
/// same key breaks GCM confidentiality.
pub fn generate_iv() -> CryptoResult<[u8; IV_LEN]> {
    generate_random()
}

/// Build a cipher handle from raw key material.
///
/// Callers cache the handle and reuse it for every call instead of
/// re-importing the key.
pub fn build_cipher(key: &[u8; KEY_LEN]) -> CryptoResult<Aes256Gcm> {
    Aes256Gcm::new_from_slice(key)
        .map_err(|e| CryptoError::Capability(format!("cipher init failed: {}", e)))
}

/// Encrypt plaintext with AES-256-GCM.
///
/// Returns ciphertext with appended authentication tag (16 bytes).
pub fn aes_gcm_encrypt(
    cipher: &Aes256Gcm,
    iv: &[u8; IV_LEN],
    plaintext: &[u8],
) -> CryptoResult<Vec<u8>> {
    cipher
        .encrypt(Nonce::from_slice(iv), plaintext)
        .map_err(|_| CryptoError::Encryption("AES-GCM encryption failed".into()))
}

/// Decrypt ciphertext with AES-256-GCM.
///
/// The ciphertext must include the authentication tag (16 bytes) at the end;
/// any tampering, truncation, or key mismatch fails the tag check.
pub fn aes_gcm_decrypt(
    cipher: &Aes256Gcm,
    iv: &[u8; IV_LEN],
    ciphertext: &[u8],
) -> CryptoResult<Vec<u8>> {
    cipher
        .decrypt(Nonce::from_slice(iv), ciphertext)
        .map_err(|_| CryptoError::Integrity)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> Aes256Gcm {
        build_cipher(&[42u8; KEY_LEN]).unwrap()
    }

    #[test]
    fn test_generate_key() {
        let key1 = generate_key().unwrap();
        let key2 = generate_key().unwrap();

        assert_eq!(key1.len(), KEY_LEN);
        assert_eq!(key2.len(), KEY_LEN);
        assert_ne!(key1, key2); // Should be random
    }

    #[test]
    fn test_generate_iv() {
        let iv1 = generate_iv().unwrap();
        let iv2 = generate_iv().unwrap();

        assert_eq!(iv1.len(), IV_LEN);
        assert_eq!(iv2.len(), IV_LEN);
        assert_ne!(iv1, iv2); // Should be random
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let cipher = cipher();
        let iv = [1u8; IV_LEN];
        let plaintext = b"Hello, World!";

        let ciphertext = aes_gcm_encrypt(&cipher, &iv, plaintext).unwrap();
        let decrypted = aes_gcm_decrypt(&cipher, &iv, &ciphertext).unwrap();

        assert_eq!(plaintext.as_slice(), decrypted.as_slice());
    }

    #[test]
    fn test_ciphertext_longer_than_plaintext() {
        let cipher = cipher();
        let iv = [1u8; IV_LEN];
        let plaintext = b"Hello, World!";

        let ciphertext = aes_gcm_encrypt(&cipher, &iv, plaintext).unwrap();

        // Ciphertext should be plaintext + 16 byte auth tag
        assert_eq!(ciphertext.len(), plaintext.len() + TAG_LEN);
    }

    #[test]
    fn test_decrypt_wrong_key() {
        let cipher1 = build_cipher(&[42u8; KEY_LEN]).unwrap();
        let cipher2 = build_cipher(&[99u8; KEY_LEN]).unwrap();
        let iv = [1u8; IV_LEN];
        let plaintext = b"Secret data";

        let ciphertext = aes_gcm_encrypt(&cipher1, &iv, plaintext).unwrap();
        let result = aes_gcm_decrypt(&cipher2, &iv, &ciphertext);

        assert!(matches!(result, Err(CryptoError::Integrity)));
    }

    #[test]
    fn test_decrypt_wrong_iv() {
        let cipher = cipher();
        let iv1 = [1u8; IV_LEN];
        let iv2 = [2u8; IV_LEN];
        let plaintext = b"Secret data";

        let ciphertext = aes_gcm_encrypt(&cipher, &iv1, plaintext).unwrap();
        let result = aes_gcm_decrypt(&cipher, &iv2, &ciphertext);

        assert!(matches!(result, Err(CryptoError::Integrity)));
    }

    #[test]
    fn test_decrypt_tampered_ciphertext() {
        let cipher = cipher();
        let iv = [1u8; IV_LEN];
        let plaintext = b"Secret data";

        let mut ciphertext = aes_gcm_encrypt(&cipher, &iv, plaintext).unwrap();

        // Tamper with the ciphertext
        ciphertext[0] ^= 0xFF;

        let result = aes_gcm_decrypt(&cipher, &iv, &ciphertext);
        assert!(matches!(result, Err(CryptoError::Integrity)));
    }

    #[test]
    fn test_encrypt_empty_plaintext() {
        let cipher = cipher();
        let iv = [1u8; IV_LEN];
        let plaintext = b"";

        let ciphertext = aes_gcm_encrypt(&cipher, &iv, plaintext).unwrap();
        let decrypted = aes_gcm_decrypt(&cipher, &iv, &ciphertext).unwrap();

        assert_eq!(plaintext.as_slice(), decrypted.as_slice());
    }

    #[test]
    fn test_encrypt_large_plaintext() {
        let cipher = cipher();
        let iv = [1u8; IV_LEN];
        let plaintext = vec![0u8; 1024 * 1024]; // 1 MiB

        let ciphertext = aes_gcm_encrypt(&cipher, &iv, &plaintext).unwrap();
        let decrypted = aes_gcm_decrypt(&cipher, &iv, &ciphertext).unwrap();

        assert_eq!(plaintext, decrypted);
    }

    #[test]
    fn test_different_ivs_different_ciphertext() {
        let cipher = cipher();
        let iv1 = [1u8; IV_LEN];
        let iv2 = [2u8; IV_LEN];
        let plaintext = b"Same message";

        let ciphertext1 = aes_gcm_encrypt(&cipher, &iv1, plaintext).unwrap();
        let ciphertext2 = aes_gcm_encrypt(&cipher, &iv2, plaintext).unwrap();

        assert_ne!(ciphertext1, ciphertext2);
    }
}
