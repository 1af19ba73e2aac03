use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Duration, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::{Choice, ConstantTimeEq};

use crate::config::ValidatorConfig;
use crate::types::{Credential, SignatureEncoding};

type HmacSha256 = Hmac<Sha256>;

/// Length of an HMAC-SHA256 tag in bytes.
pub const MAC_LEN: usize = 32;

/// Header values a sender attaches to a signed webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeaders {
    pub signature_header: (String, String),
    pub timestamp_header: Option<(String, String)>,
}

impl SignatureHeaders {
    /// Header pairs in the order they should be sent.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        std::iter::once(&self.signature_header)
            .chain(self.timestamp_header.as_ref())
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

/// Sign `payload` the way a sender would, using the header names and
/// encoding from `config`.
///
/// The MAC covers the payload bytes only. The timestamp header is attached
/// unsigned when `timestamp` is given.
pub fn build_signature_headers(
    config: &ValidatorConfig,
    secret: &Credential,
    payload: &[u8],
    timestamp: Option<DateTime<Utc>>,
) -> SignatureHeaders {
    let signature = compute_signature(secret, payload, config.signature_encoding);

    SignatureHeaders {
        signature_header: (config.signature_header_name.clone(), signature),
        timestamp_header: timestamp
            .map(|ts| (config.timestamp_header_name.clone(), format_timestamp(ts))),
    }
}

/// Reference MAC function: `HMAC-SHA256(secret, payload)` in the given encoding.
pub fn compute_signature(
    secret: &Credential,
    payload: &[u8],
    encoding: SignatureEncoding,
) -> String {
    encode_mac(&compute_mac(secret, payload), encoding)
}

pub(crate) fn compute_mac(secret: &Credential, payload: &[u8]) -> [u8; MAC_LEN] {
    let mut mac = HmacSha256::new_from_slice(secret.expose())
        .expect("HMAC-SHA256 accepts keys of any length");
    mac.update(payload);
    mac.finalize().into_bytes().into()
}

pub(crate) fn encode_mac(mac: &[u8], encoding: SignatureEncoding) -> String {
    match encoding {
        SignatureEncoding::Base64 => BASE64.encode(mac),
        SignatureEncoding::Hex => hex::encode(mac),
    }
}

fn decode_signature(value: &str, encoding: SignatureEncoding) -> Option<Vec<u8>> {
    let value = value.trim();
    match encoding {
        SignatureEncoding::Base64 => BASE64.decode(value).ok(),
        SignatureEncoding::Hex => hex::decode(value).ok(),
    }
}

/// Compare a computed MAC with a received signature header value.
///
/// Undecodable values still go through the full 32-byte comparison.
pub fn signature_matches(expected: &[u8; MAC_LEN], received: &str, encoding: SignatureEncoding) -> bool {
    let (decoded, well_formed) = match decode_signature(received, encoding) {
        Some(bytes) => (bytes, Choice::from(1)),
        None => (Vec::new(), Choice::from(0)),
    };

    (ct_eq_mac(expected, &decoded) & well_formed).into()
}

/// Constant-time equality between a MAC and arbitrary received bytes.
///
/// The received bytes are copied into a fixed-size buffer so a length
/// mismatch costs the same as a full comparison.
pub fn constant_time_eq(expected: &[u8; MAC_LEN], received: &[u8]) -> bool {
    ct_eq_mac(expected, received).into()
}

fn ct_eq_mac(expected: &[u8; MAC_LEN], received: &[u8]) -> Choice {
    let mut candidate = [0u8; MAC_LEN];
    let n = received.len().min(MAC_LEN);
    candidate[..n].copy_from_slice(&received[..n]);

    let length_ok = Choice::from(u8::from(received.len() == MAC_LEN));
    expected[..].ct_eq(&candidate[..]) & length_ok
}

/// Signature and timestamp header values found in a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSignature {
    pub signature: Option<String>,
    pub timestamp: Option<String>,
}

/// Find the signature and timestamp headers, ignoring case.
///
/// The first occurrence of each header wins and blank values count as absent.
pub fn parse_signature_headers<'a, I>(
    headers: I,
    signature_header: &str,
    timestamp_header: &str,
) -> ParsedSignature
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut signature = None;
    let mut timestamp = None;

    for (name, value) in headers {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }

        if signature.is_none() && name.eq_ignore_ascii_case(signature_header) {
            signature = Some(value.to_string());
        } else if timestamp.is_none() && name.eq_ignore_ascii_case(timestamp_header) {
            timestamp = Some(value.to_string());
        }
    }

    ParsedSignature { signature, timestamp }
}

/// Parse an ISO-8601 instant.
///
/// Accepts RFC 3339 with an offset, or a bare `YYYY-MM-DDTHH:MM:SS[.fff]`
/// which is read as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Format an instant the way [`build_signature_headers`] sends it.
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Largest window `chrono::Duration` can represent, in whole seconds.
const MAX_WINDOW_SECS: u64 = (i64::MAX / 1000) as u64;

/// Signed age at full precision; negative when `timestamp` is in the future.
pub fn timestamp_age(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    now.signed_duration_since(timestamp)
}

/// Age as fractional seconds, keeping sub-millisecond digits.
pub fn age_seconds(age: Duration) -> f64 {
    age.num_seconds() as f64 + f64::from(age.subsec_nanos()) / 1e9
}

/// Freshness check that treats future timestamps like past ones.
///
/// Compares the exact difference, so 300.0009 s is outside a 300 s window.
pub fn is_timestamp_fresh(timestamp: DateTime<Utc>, now: DateTime<Utc>, max_age_secs: u64) -> bool {
    let limit = Duration::seconds(max_age_secs.min(MAX_WINDOW_SECS) as i64);
    let age = timestamp_age(timestamp, now);
    age <= limit && age >= -limit
}
