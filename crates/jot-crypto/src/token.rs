//! IV-prefixed ciphertext framing and base64 token encoding.
//!
//! Every encrypted payload is framed as `IV(12) || ciphertext || tag(16)`.
//! Text payloads additionally travel as a single base64 token; binary
//! payloads stay raw framed bytes.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::cipher::{IV_LEN, TAG_LEN};
use crate::error::{CryptoError, CryptoResult};

/// Prepend the IV to a ciphertext, producing the framed payload.
pub fn frame(iv: &[u8; IV_LEN], ciphertext: Vec<u8>) -> Vec<u8> {
    let mut framed = Vec::with_capacity(IV_LEN + ciphertext.len());
    framed.extend_from_slice(iv);
    framed.extend_from_slice(&ciphertext);
    framed
}

/// Split a framed payload into its IV prefix and ciphertext, validating
/// lengths before slicing.
pub fn unframe(data: &[u8]) -> CryptoResult<([u8; IV_LEN], &[u8])> {
    if data.len() < IV_LEN + TAG_LEN {
        return Err(CryptoError::Token(format!(
            "framed payload is {} bytes, need at least {}",
            data.len(),
            IV_LEN + TAG_LEN
        )));
    }
    let (iv, ciphertext) = data.split_at(IV_LEN);
    let mut iv_bytes = [0u8; IV_LEN];
    iv_bytes.copy_from_slice(iv);
    Ok((iv_bytes, ciphertext))
}

/// Encode a framed payload as a transportable base64 token.
pub fn encode_token(framed: &[u8]) -> String {
    STANDARD.encode(framed)
}

/// Decode a base64 token back into its framed payload bytes.
pub fn decode_token(token: &str) -> CryptoResult<Vec<u8>> {
    STANDARD
        .decode(token)
        .map_err(|e| CryptoError::Token(format!("not valid base64: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_unframe_roundtrip() {
        let iv = [7u8; IV_LEN];
        let ciphertext = vec![9u8; 40];

        let framed = frame(&iv, ciphertext.clone());
        assert_eq!(framed.len(), IV_LEN + 40);

        let (iv_back, ct_back) = unframe(&framed).unwrap();
        assert_eq!(iv_back, iv);
        assert_eq!(ct_back, ciphertext.as_slice());
    }

    #[test]
    fn test_unframe_rejects_short_payload() {
        // One byte short of the IV + tag minimum
        let data = vec![0u8; IV_LEN + TAG_LEN - 1];
        let result = unframe(&data);
        assert!(matches!(result, Err(CryptoError::Token(_))));
    }

    #[test]
    fn test_unframe_accepts_minimum_payload() {
        // Empty plaintext still carries the full IV and tag
        let data = vec![0u8; IV_LEN + TAG_LEN];
        assert!(unframe(&data).is_ok());
    }

    #[test]
    fn test_token_roundtrip() {
        let framed = vec![1u8, 2, 3, 4, 5];
        let token = encode_token(&framed);
        let decoded = decode_token(&token).unwrap();
        assert_eq!(decoded, framed);
    }

    #[test]
    fn test_decode_token_rejects_garbage() {
        let result = decode_token("!!! definitely not base64 !!!");
        assert!(matches!(result, Err(CryptoError::Token(_))));
    }
}
