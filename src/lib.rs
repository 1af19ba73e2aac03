//! Authenticity and freshness checks for inbound webhooks.
//!
//! This crate decides whether a webhook request carrying a JSON body,
//! an HMAC-SHA256 signature header and an ISO-8601 timestamp header is
//! **genuine and fresh**. It sits between the HTTP transport and whatever
//! consumes the payload.
//!
//! ## Guarantees
//! - The MAC is computed over the raw body bytes as received
//! - Signatures are compared in constant time
//! - Timestamps outside the window are rejected, future ones included
//! - The body is parsed only after it has been authenticated
//! - Every call returns a typed outcome; nothing panics
//!
//! ## Non-Guarantees
//! - Replay detection within the freshness window
//! - Transport concerns (reading the body, mapping rejections to responses)
//! - Secret provisioning or rotation
//!
//! ```
//! use webhook_validator::{Credential, IncomingRequest, SignatureValidator, ValidatorConfig};
//!
//! let validator = SignatureValidator::new(
//!     ValidatorConfig::default(),
//!     Credential::new("s3cr3t").unwrap(),
//! )
//! .unwrap();
//!
//! let body = br#"{"a":1}"#;
//! let signed = validator.sign(body);
//! let request = IncomingRequest::new(body.to_vec()).with_headers(
//!     signed.pairs().map(|(k, v)| (k.to_string(), v.to_string())).collect::<Vec<_>>(),
//! );
//!
//! let accepted = validator.validate(&request).unwrap();
//! assert_eq!(accepted.payload["a"], 1);
//! ```

mod clock;
mod config;
mod error;
mod signing;
mod types;
mod validator;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ValidatorConfig, DEFAULT_MAX_AGE_SECS, DEFAULT_MAX_BODY_BYTES};
pub use error::{ConfigError, RejectReason};
pub use signing::{
    age_seconds,
    build_signature_headers,
    compute_signature,
    constant_time_eq,
    format_timestamp,
    is_timestamp_fresh,
    parse_signature_headers,
    parse_timestamp,
    signature_matches,
    timestamp_age,
    ParsedSignature,
    SignatureHeaders,
    MAC_LEN,
};
pub use types::{Accepted, Credential, IncomingRequest, SignatureEncoding};
pub use validator::{validate, SignatureValidator, ValidationResult};
