//! Keyed reversible transform for the backing file and export payloads.
//!
//! Plaintext bytes are combined with the key cycled to the plaintext's
//! length (repeating-key XOR), then base64-encoded so the result is safe in
//! text-oriented transports. XOR is self-inverse, so decryption repeats the
//! combine after transport-decoding. A wrong key yields garbage bytes, not
//! an error; downstream parsing is what fails.

use base64::{engine::general_purpose, Engine as _};

pub fn encrypt(plaintext: &[u8], key: &[u8]) -> Vec<u8> {
    let combined = xor_with_key(plaintext, key);
    general_purpose::STANDARD.encode(combined).into_bytes()
}

pub fn decrypt(encoded: &[u8], key: &[u8]) -> Result<Vec<u8>, base64::DecodeError> {
    let raw = general_purpose::STANDARD.decode(encoded)?;
    Ok(xor_with_key(&raw, key))
}

fn xor_with_key(data: &[u8], key: &[u8]) -> Vec<u8> {
    data.iter()
        .enumerate()
        .map(|(i, b)| b ^ key[i % key.len()])
        .collect()
}
