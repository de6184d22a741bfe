//! Expected-digest computation.

/// MD5 of the payload's UTF-8 bytes as 32 lowercase hex characters.
pub fn md5_hex(payload: &str) -> String {
    format!("{:x}", md5::compute(payload.as_bytes()))
}
