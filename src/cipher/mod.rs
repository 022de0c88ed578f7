//! Token cipher: per-resource, time-bound obfuscation of spec bytes
//!
//! The keystream is an HMAC-SHA256 digest over the resource identifier and
//! its freshness value (modification time), keyed by the service secret and
//! cyclically repeated to the payload length. The stream transform is a
//! byte-wise XOR, so encoding and decoding are the same operation. A token
//! decoded with the wrong freshness yields garbage bytes that fail the spec
//! checksum downstream — resource expiration needs no error path of its own.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Token text that cannot be decoded at all
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Not valid unpadded base64url
    InvalidEncoding,
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::InvalidEncoding => write!(f, "token text is not valid base64url"),
        }
    }
}

impl std::error::Error for TokenError {}

/// Derive a keystream of exactly `len` bytes for one resource version
///
/// The digest covers `resource_id || decimal(freshness)`; changing either
/// value (in particular, touching the resource) produces an unrelated stream.
pub fn derive_keystream(secret: &[u8], resource_id: &str, freshness: u64, len: usize) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(resource_id.as_bytes());
    mac.update(freshness.to_string().as_bytes());
    let digest = mac.finalize().into_bytes();
    digest.iter().copied().cycle().take(len).collect()
}

/// Byte-wise XOR of `data` against a cyclically repeated keystream
///
/// Self-inverse: applying it twice with the same keystream yields the input.
pub fn xor_stream(data: &[u8], keystream: &[u8]) -> Vec<u8> {
    data.iter()
        .zip(keystream.iter().cycle())
        .map(|(byte, key)| byte ^ key)
        .collect()
}

/// Produce the URL-safe token text for spec bytes bound to one resource version
pub fn encode_token(spec_bytes: &[u8], resource_id: &str, freshness: u64, secret: &[u8]) -> String {
    let keystream = derive_keystream(secret, resource_id, freshness, spec_bytes.len());
    URL_SAFE_NO_PAD.encode(xor_stream(spec_bytes, &keystream))
}

/// Recover spec bytes from token text
///
/// Succeeds for any well-formed base64url input — a wrong key, resource, or
/// freshness value surfaces later as a checksum failure, not here.
pub fn decode_token(
    token: &str,
    resource_id: &str,
    freshness: u64,
    secret: &[u8],
) -> Result<Vec<u8>, TokenError> {
    let ciphertext = URL_SAFE_NO_PAD
        .decode(token)
        .map_err(|_| TokenError::InvalidEncoding)?;
    let keystream = derive_keystream(secret, resource_id, freshness, ciphertext.len());
    Ok(xor_stream(&ciphertext, &keystream))
}
