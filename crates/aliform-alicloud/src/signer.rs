//! ACS3-HMAC-SHA256 request signing
//!
//! Alibaba Cloud's V3 signature: a canonical request is hashed, the hash is
//! wrapped into a string-to-sign, and the string-to-sign is signed with the
//! access key secret.

use crate::error::{AlicloudError, Result};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt::Write;

pub const ALGORITHM: &str = "ACS3-HMAC-SHA256";

type HmacSha256 = Hmac<Sha256>;

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{:02x}", b);
        out
    })
}

/// RFC 3986 percent-encoding: unreserved characters stay, the rest become `%XX`
pub fn percent_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => {
                let _ = write!(out, "%{:02X}", byte);
            }
        }
    }
    out
}

/// Sorted, encoded `k=v&k=v` query string
pub fn canonical_query(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

pub fn hex_sha256(data: &[u8]) -> String {
    to_hex(&Sha256::digest(data))
}

pub fn hmac_sha256_hex(key: &[u8], data: &[u8]) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| AlicloudError::InvalidConfig(format!("invalid signing key: {}", e)))?;
    mac.update(data);
    Ok(to_hex(&mac.finalize().into_bytes()))
}

/// Build the `Authorization` header value
///
/// `headers` holds every header to sign with lowercase names; the map order
/// is the canonical order.
pub fn authorization(
    access_key_id: &str,
    access_key_secret: &str,
    method: &str,
    query: &str,
    headers: &BTreeMap<String, String>,
    body: &[u8],
) -> Result<String> {
    let canonical_headers: String = headers
        .iter()
        .map(|(k, v)| format!("{}:{}\n", k, v.trim()))
        .collect();
    let signed_headers = headers.keys().cloned().collect::<Vec<_>>().join(";");

    let canonical_request = format!(
        "{}\n/\n{}\n{}\n{}\n{}",
        method,
        query,
        canonical_headers,
        signed_headers,
        hex_sha256(body)
    );
    let string_to_sign = format!("{}\n{}", ALGORITHM, hex_sha256(canonical_request.as_bytes()));
    let signature = hmac_sha256_hex(access_key_secret.as_bytes(), string_to_sign.as_bytes())?;

    Ok(format!(
        "{} Credential={},SignedHeaders={},Signature={}",
        ALGORITHM, access_key_id, signed_headers, signature
    ))
}
