//! # jot-crypto
//!
//! Symmetric encryption for the jot notes core.
//!
//! Every piece of user content (note titles and bodies, folder names,
//! attachment bytes) is encrypted under a single per-installation key before
//! it ever reaches the local store or the network. Outside of transient
//! in-memory use, payloads are opaque.
//!
//! ## Cryptographic Primitives
//!
//! - **Symmetric cipher**: AES-256-GCM (AEAD)
//! - **Random generation**: OS CSPRNG, failing fast when unavailable
//! - **Key storage**: raw 256-bit key material, base64, fixed-name file
//! - **Token encoding**: base64 over IV-prefixed ciphertext
//!
//! ## Payload Format
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │ IV (12 bytes, random per call)                  │
//! ├─────────────────────────────────────────────────┤
//! │ Ciphertext + GCM auth tag (16 bytes)            │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! Text payloads travel as the base64 of the framed bytes; binary payloads
//! stay raw framed bytes.
//!
//! ## Examples
//!
//! ### Encrypt and Decrypt Text
//!
//! ```rust
//! use jot_crypto::EncryptionService;
//!
//! # let temp = tempfile::tempdir().unwrap();
//! // Loads the installation key, creating and persisting it on first use.
//! let service = EncryptionService::open(temp.path()).unwrap();
//!
//! let token = service.encrypt_text("milk, eggs").unwrap();
//! assert_eq!(service.decrypt_text(&token).unwrap(), "milk, eggs");
//! ```
//!
//! ### Attachment Bytes
//!
//! ```rust
//! use jot_crypto::EncryptionService;
//!
//! let service = EncryptionService::from_key(&[7u8; 32]).unwrap();
//!
//! let encrypted = service.encrypt_blob(&[0xFF, 0xD8, 0xFF]).unwrap();
//! let blob = service.decrypt_blob(&encrypted, "image/jpeg").unwrap();
//! assert_eq!(blob.bytes, vec![0xFF, 0xD8, 0xFF]);
//! assert_eq!(blob.content_type, "image/jpeg");
//! ```

pub mod cipher;
pub mod error;
pub mod keystore;
pub mod service;
pub mod token;

// Re-export commonly used types
pub use cipher::{IV_LEN, KEY_LEN, TAG_LEN};
pub use error::{CryptoError, CryptoResult};
pub use keystore::KEY_FILE_NAME;
pub use service::{DecryptedBlob, EncryptionService};
