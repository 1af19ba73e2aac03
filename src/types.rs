use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use secrecy::{ExposeSecret, SecretVec};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConfigError;

/// Inbound webhook as seen by the validator.
///
/// `body` holds the bytes exactly as they arrived on the wire. The signature
/// is checked against these bytes, so callers must capture them before any
/// framework-level JSON parsing.
#[derive(Debug, Clone, Default)]
pub struct IncomingRequest {
    /// Raw request body.
    pub body: Vec<u8>,

    /// Header name/value pairs in arrival order.
    pub headers: Vec<(String, String)>,
}

impl IncomingRequest {
    /// Create a request with the given raw body and no headers.
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            headers: Vec::new(),
        }
    }

    /// Append a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Append several headers, e.g. from a `HashMap`.
    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Case-insensitive header lookup. The first occurrence wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Borrowed view of the headers suitable for [`crate::validate`].
    pub fn header_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Shared HMAC secret.
///
/// The bytes are zeroized on drop and never appear in `Debug` output.
pub struct Credential(SecretVec<u8>);

impl Credential {
    /// Wrap secret bytes. Empty secrets are refused.
    pub fn new(secret: impl Into<Vec<u8>>) -> Result<Self, ConfigError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(ConfigError::EmptySecret);
        }
        Ok(Self(SecretVec::new(secret)))
    }

    /// Read the secret from an environment variable.
    pub fn from_env(name: &str) -> Result<Self, ConfigError> {
        let value = std::env::var(name).map_err(|_| ConfigError::MissingEnv {
            name: name.to_string(),
        })?;
        Self::new(value.into_bytes())
    }

    pub(crate) fn expose(&self) -> &[u8] {
        self.0.expose_secret()
    }
}

impl Clone for Credential {
    fn clone(&self) -> Self {
        Self(SecretVec::new(self.expose().to_vec()))
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

/// Text encoding of the MAC carried in the signature header.
///
/// Signer and receiver must agree on it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureEncoding {
    #[default]
    Base64,
    Hex,
}

impl SignatureEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureEncoding::Base64 => "base64",
            SignatureEncoding::Hex => "hex",
        }
    }
}

impl FromStr for SignatureEncoding {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "base64" => Ok(SignatureEncoding::Base64),
            "hex" => Ok(SignatureEncoding::Hex),
            _ => Err(()),
        }
    }
}

/// An authenticated, fresh webhook.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Accepted {
    /// Body parsed as JSON after authentication succeeded.
    pub payload: Value,

    /// Instant the validator ran, taken from the injected clock.
    pub received_at: DateTime<Utc>,

    /// Signed age of the request in seconds, positive when the timestamp
    /// lies in the past. `None` when no timestamp header was sent and
    /// timestamps are optional.
    pub age_seconds: Option<f64>,

    /// Parsed timestamp header, if one was sent.
    pub timestamp: Option<DateTime<Utc>>,
}

impl Accepted {
    /// Payload with validation metadata merged in.
    ///
    /// Adds `validatedAt`, `webhookAge` and `hmacValidated` to object
    /// payloads. Any other JSON value is wrapped as `{"payload": value}`
    /// first.
    pub fn into_enriched(self) -> Value {
        let mut object = match self.payload {
            Value::Object(map) => map,
            other => {
                let mut map = serde_json::Map::new();
                map.insert("payload".to_string(), other);
                map
            }
        };

        object.insert(
            "validatedAt".to_string(),
            Value::String(self.received_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        object.insert(
            "webhookAge".to_string(),
            self.age_seconds
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::Null),
        );
        object.insert("hmacValidated".to_string(), Value::Bool(true));

        Value::Object(object)
    }
}
