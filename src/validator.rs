use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::clock::{Clock, SystemClock};
use crate::config::ValidatorConfig;
use crate::error::{ConfigError, RejectReason};
use crate::signing::{
    age_seconds, build_signature_headers, compute_mac, is_timestamp_fresh,
    parse_signature_headers, parse_timestamp, signature_matches, timestamp_age, SignatureHeaders,
    MAC_LEN,
};
use crate::types::{Accepted, Credential, IncomingRequest, SignatureEncoding};

/// Outcome of validating one request.
pub type ValidationResult = Result<Accepted, RejectReason>;

const ACCEPTED_TOTAL: &str = "webhook_validation_accepted_total";
const REJECTED_TOTAL: &str = "webhook_validation_rejected_total";

/// Bytes of the body shown in diagnostic logs.
#[cfg(feature = "tracing")]
const PREVIEW_LEN: usize = 200;

#[cfg(feature = "metrics")]
fn metric_inc(name: &'static str) {
    metrics::increment_counter!(name);
}

#[cfg(not(feature = "metrics"))]
fn metric_inc(_name: &'static str) {}

#[cfg(feature = "metrics")]
fn metric_inc_reason(name: &'static str, reason: &RejectReason) {
    metrics::increment_counter!(name, "reason" => reason.as_str());
}

#[cfg(not(feature = "metrics"))]
fn metric_inc_reason(_name: &'static str, _reason: &RejectReason) {}

#[cfg(feature = "tracing")]
fn trace_accepted(body_len: usize, age_seconds: Option<f64>) {
    tracing::debug!(body_len, ?age_seconds, "webhook accepted");
}

#[cfg(not(feature = "tracing"))]
fn trace_accepted(_body_len: usize, _age_seconds: Option<f64>) {}

#[cfg(feature = "tracing")]
fn trace_rejection(reason: &RejectReason) {
    tracing::warn!(reason = reason.as_str(), "webhook rejected");
}

#[cfg(not(feature = "tracing"))]
fn trace_rejection(_reason: &RejectReason) {}

/// Signature material logged only when `debug_logging` is on.
#[cfg(feature = "tracing")]
fn trace_diagnostics(
    body: &[u8],
    expected: &[u8; MAC_LEN],
    received: &str,
    encoding: SignatureEncoding,
    matched: bool,
) {
    let preview = String::from_utf8_lossy(&body[..body.len().min(PREVIEW_LEN)]);
    tracing::debug!(
        body_len = body.len(),
        %preview,
        expected = %crate::signing::encode_mac(expected, encoding),
        received,
        matched,
        "webhook signature diagnostics"
    );
}

#[cfg(not(feature = "tracing"))]
fn trace_diagnostics(
    _body: &[u8],
    _expected: &[u8; MAC_LEN],
    _received: &str,
    _encoding: SignatureEncoding,
    _matched: bool,
) {
}

/// Validates inbound webhooks against one shared secret and policy.
///
/// Holds no per-request state, so a single instance can be shared across
/// threads behind an `Arc` or cloned freely.
#[derive(Clone)]
pub struct SignatureValidator {
    config: ValidatorConfig,
    credential: Credential,
    clock: Arc<dyn Clock>,
}

impl SignatureValidator {
    /// Create a validator that reads the wall clock.
    pub fn new(config: ValidatorConfig, credential: Credential) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            credential,
            clock: Arc::new(SystemClock),
        })
    }

    /// Build from `WEBHOOK_*` variables, reading the secret from `secret_var`.
    pub fn from_env(secret_var: &str) -> Result<Self, ConfigError> {
        let config = ValidatorConfig::from_env()?;
        let credential = Credential::from_env(secret_var)?;
        Self::new(config, credential)
    }

    /// Replace the clock, e.g. with a [`crate::FixedClock`] in tests.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validate a captured request.
    pub fn validate(&self, request: &IncomingRequest) -> ValidationResult {
        self.validate_parts(&request.body, request.header_pairs())
    }

    /// Validate from a raw body and borrowed header pairs.
    pub fn validate_parts<'a, I>(&self, raw_body: &[u8], headers: I) -> ValidationResult
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        validate(raw_body, headers, &self.credential, self.clock.now(), &self.config)
    }

    /// Produce the headers a sender would attach to `body`, stamped with the
    /// validator's clock.
    pub fn sign(&self, body: &[u8]) -> SignatureHeaders {
        build_signature_headers(&self.config, &self.credential, body, Some(self.clock.now()))
    }
}

impl std::fmt::Debug for SignatureValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureValidator")
            .field("config", &self.config)
            .field("credential", &self.credential)
            .finish_non_exhaustive()
    }
}

/// Verify an incoming webhook in one call.
///
/// `raw_body` must be the bytes as received. The body is parsed as JSON only
/// after the signature checks out. Never panics; every input yields either
/// an [`Accepted`] or a [`RejectReason`].
///
/// `config` is used as given. Run [`ValidatorConfig::validate`] once on any
/// config loaded through serde before passing it here; with duplicate header
/// names every stamped request would be rejected as `MissingTimestamp`.
/// [`SignatureValidator::new`] performs that check itself.
pub fn validate<'a, I>(
    raw_body: &[u8],
    headers: I,
    secret: &Credential,
    now: DateTime<Utc>,
    config: &ValidatorConfig,
) -> ValidationResult
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let result = run_pipeline(raw_body, headers, secret, now, config);

    match &result {
        Ok(accepted) => {
            metric_inc(ACCEPTED_TOTAL);
            trace_accepted(raw_body.len(), accepted.age_seconds);
        }
        Err(reason) => {
            metric_inc_reason(REJECTED_TOTAL, reason);
            trace_rejection(reason);
        }
    }

    result
}

fn run_pipeline<'a, I>(
    raw_body: &[u8],
    headers: I,
    secret: &Credential,
    now: DateTime<Utc>,
    config: &ValidatorConfig,
) -> ValidationResult
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let parsed = parse_signature_headers(
        headers,
        &config.signature_header_name,
        &config.timestamp_header_name,
    );
    let signature = parsed.signature.ok_or(RejectReason::MissingSignature)?;

    let (timestamp, age_seconds) = match parsed.timestamp {
        Some(raw) => {
            let timestamp = parse_timestamp(&raw).ok_or(RejectReason::InvalidTimestamp)?;
            let age = age_seconds(timestamp_age(timestamp, now));

            if !is_timestamp_fresh(timestamp, now, config.max_age_secs) {
                return Err(RejectReason::StaleOrFutureTimestamp { age_seconds: age });
            }
            (Some(timestamp), Some(age))
        }
        None if config.require_timestamp => return Err(RejectReason::MissingTimestamp),
        None => (None, None),
    };

    if let Some(limit) = config.max_body_bytes {
        if raw_body.len() > limit {
            return Err(RejectReason::PayloadTooLarge {
                size: raw_body.len(),
                limit,
            });
        }
    }

    let expected = compute_mac(secret, raw_body);
    let matched = signature_matches(&expected, &signature, config.signature_encoding);

    if config.debug_logging {
        trace_diagnostics(raw_body, &expected, &signature, config.signature_encoding, matched);
    }

    if !matched {
        return Err(RejectReason::SignatureMismatch);
    }

    let payload = serde_json::from_slice(raw_body).map_err(|e| RejectReason::MalformedPayload {
        detail: e.to_string(),
    })?;

    Ok(Accepted {
        payload,
        received_at: now,
        age_seconds,
        timestamp,
    })
}
