//! MAC request signing for XiaoMI open APIs
//!
//! When a XiaoMI access token is issued with `token_type=mac`, every API call
//! must carry an `Authorization: MAC ...` header. The signature is an HMAC
//! over a canonical string built from the request:
//!
//! ```text
//! nonce \n METHOD \n host \n path \n query \n
//! ```
//!
//! where `nonce` is `<random>:<minutes since the Unix epoch>` and `query` is
//! the raw query string without the leading `?`. The HMAC key is the
//! `mac_key` of the token response and the digest is base64 encoded.

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rand::Rng;
use reqwest::{Method, Url};
use sha1::Sha1;
use sha2::Sha256;

use super::types::OAuthError;

type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;

/// Algorithm name XiaoMI uses when the token response omits one
pub const DEFAULT_MAC_ALGORITHM: &str = "HmacSHA1";

/// Supported MAC algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacAlgorithm {
    /// HMAC-SHA1 (the only one XiaoMI issues today)
    HmacSha1,
    /// HMAC-SHA256
    HmacSha256,
}

impl MacAlgorithm {
    /// Parse an algorithm name
    ///
    /// Accepts the Java names XiaoMI sends (`HmacSHA1`) as well as the
    /// draft names (`hmac-sha-1`, `hmac-sha-256`): dashes are dropped and
    /// case is ignored.
    ///
    /// # Errors
    ///
    /// Returns `OAuthError::UnsupportedAlgorithm` for any other name
    pub fn parse(name: &str) -> Result<Self, OAuthError> {
        match name.replace('-', "").to_lowercase().as_str() {
            "hmacsha1" => Ok(Self::HmacSha1),
            "hmacsha256" => Ok(Self::HmacSha256),
            _ => Err(OAuthError::UnsupportedAlgorithm(name.to_string())),
        }
    }
}

/// Generate a fresh nonce
#[must_use]
pub fn nonce() -> String {
    let random = rand::thread_rng().gen_range(0..i32::MAX);
    nonce_at(random, Utc::now())
}

/// Build the nonce for a given random prefix and time
///
/// The time part is the number of whole minutes since the Unix epoch,
/// rounded to the nearest minute.
#[must_use]
pub fn nonce_at(random: i32, now: DateTime<Utc>) -> String {
    let minutes = (now.timestamp_millis() + 30_000).div_euclid(60_000);
    format!("{random}:{minutes}")
}

/// Build the string that gets signed
///
/// # Errors
///
/// Returns `OAuthError::Generic` if the URL has no host
pub fn canonical_string(nonce: &str, method: &Method, url: &Url) -> Result<String, OAuthError> {
    let host = url
        .host_str()
        .ok_or_else(|| OAuthError::Generic(format!("URL has no host: {url}")))?;

    Ok([
        nonce,
        method.as_str(),
        host,
        url.path(),
        url.query().unwrap_or_default(),
    ]
    .join("\n")
        + "\n")
}

/// Sign `input` with `key`, returning the base64 digest
#[must_use]
pub fn sign(input: &str, key: &str, algorithm: MacAlgorithm) -> String {
    let digest = match algorithm {
        MacAlgorithm::HmacSha1 => {
            let mut mac = <HmacSha1 as Mac>::new_from_slice(key.as_bytes())
                .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
            mac.update(input.as_bytes());
            mac.finalize().into_bytes().to_vec()
        }
        MacAlgorithm::HmacSha256 => {
            let mut mac = <HmacSha256 as Mac>::new_from_slice(key.as_bytes())
                .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
            mac.update(input.as_bytes());
            mac.finalize().into_bytes().to_vec()
        }
    };
    STANDARD.encode(digest)
}

/// Compute the `Authorization` header value (without the `MAC ` scheme)
///
/// # Errors
///
/// Returns error if the algorithm is unsupported or the URL has no host
pub fn authorization_header(
    access_token: &str,
    mac_key: &str,
    algorithm: &str,
    method: &Method,
    url: &Url,
) -> Result<String, OAuthError> {
    authorization_header_with_nonce(access_token, mac_key, algorithm, method, url, &nonce())
}

/// Compute the `Authorization` header value with a caller-supplied nonce
///
/// # Errors
///
/// Returns error if the algorithm is unsupported or the URL has no host
pub fn authorization_header_with_nonce(
    access_token: &str,
    mac_key: &str,
    algorithm: &str,
    method: &Method,
    url: &Url,
    nonce: &str,
) -> Result<String, OAuthError> {
    let algorithm = MacAlgorithm::parse(algorithm)?;
    let input = canonical_string(nonce, method, url)?;
    let mac = sign(&input, mac_key, algorithm);

    // XiaoMI expects no space before `mac=`
    Ok(format!(
        "access_token=\"{}\", nonce=\"{}\",mac=\"{}\"",
        urlencoding::encode(access_token),
        urlencoding::encode(nonce),
        urlencoding::encode(&mac),
    ))
}
