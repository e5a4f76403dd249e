//! Installation key persistence.
//!
//! The 256-bit installation key is generated once on first use, persisted as
//! base64 text in a fixed-name file inside the client data directory, and
//! reused for the lifetime of the installation. It never leaves the machine.

use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use zeroize::Zeroizing;

use crate::cipher::{self, KEY_LEN};
use crate::error::{CryptoError, CryptoResult};

/// File name of the persisted key inside the data directory.
pub const KEY_FILE_NAME: &str = "installation.key";

/// Path of the key file under `data_dir`.
pub fn key_path(data_dir: &Path) -> PathBuf {
    data_dir.join(KEY_FILE_NAME)
}

/// Load the installation key, generating and persisting a fresh one on
/// first use. The write completes before the key is handed out, so a key
/// that has encrypted anything is always on disk.
pub fn load_or_create(data_dir: &Path) -> CryptoResult<Zeroizing<[u8; KEY_LEN]>> {
    let path = key_path(data_dir);
    if path.exists() {
        return load(&path);
    }

    let key = Zeroizing::new(cipher::generate_key()?);
    fs::create_dir_all(data_dir)?;
    fs::write(&path, STANDARD.encode(&key[..]))?;
    Ok(key)
}

/// Load and validate a persisted key file.
pub fn load(path: &Path) -> CryptoResult<Zeroizing<[u8; KEY_LEN]>> {
    let encoded = fs::read_to_string(path)?;
    let raw = Zeroizing::new(
        STANDARD
            .decode(encoded.trim())
            .map_err(|e| CryptoError::Keystore(format!("key file is not base64: {}", e)))?,
    );
    if raw.len() != KEY_LEN {
        return Err(CryptoError::Keystore(format!(
            "key file holds {} bytes, expected {}",
            raw.len(),
            KEY_LEN
        )));
    }

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    key.copy_from_slice(&raw);
    Ok(key)
}
