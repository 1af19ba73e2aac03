use std::fmt;

use serde::Serialize;

/// Reasons an inbound webhook was not accepted.
///
/// Every call to the validator yields either an accepted payload or one of
/// these. None of them is fatal; the transport decides how to answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    /// Signature header absent or blank.
    MissingSignature,

    /// Timestamp header absent or blank while timestamps are required.
    MissingTimestamp,

    /// Timestamp header is not an ISO-8601 instant.
    InvalidTimestamp,

    /// Timestamp lies outside the freshness window, in either direction.
    /// Positive ages are in the past, negative ages in the future.
    StaleOrFutureTimestamp {
        age_seconds: f64,
    },

    /// Body exceeds the configured size limit. Nothing was hashed.
    PayloadTooLarge {
        size: usize,
        limit: usize,
    },

    /// Computed MAC does not match the received signature.
    SignatureMismatch,

    /// Body authenticated but is not well-formed JSON.
    MalformedPayload {
        detail: String,
    },
}

impl RejectReason {
    /// Stable label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::MissingSignature => "missing_signature",
            RejectReason::MissingTimestamp => "missing_timestamp",
            RejectReason::InvalidTimestamp => "invalid_timestamp",
            RejectReason::StaleOrFutureTimestamp { .. } => "stale_or_future_timestamp",
            RejectReason::PayloadTooLarge { .. } => "payload_too_large",
            RejectReason::SignatureMismatch => "signature_mismatch",
            RejectReason::MalformedPayload { .. } => "malformed_payload",
        }
    }

    /// HTTP status a receiver would typically answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            RejectReason::MissingSignature
            | RejectReason::MissingTimestamp
            | RejectReason::InvalidTimestamp
            | RejectReason::StaleOrFutureTimestamp { .. }
            | RejectReason::SignatureMismatch => 401,
            RejectReason::PayloadTooLarge { .. } => 413,
            RejectReason::MalformedPayload { .. } => 400,
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::MissingSignature =>
                write!(f, "signature header missing"),
            RejectReason::MissingTimestamp =>
                write!(f, "timestamp header missing"),
            RejectReason::InvalidTimestamp =>
                write!(f, "timestamp header is not an ISO-8601 instant"),
            RejectReason::StaleOrFutureTimestamp { age_seconds } =>
                write!(f, "timestamp outside freshness window (age {:.2}s)", age_seconds),
            RejectReason::PayloadTooLarge { size, limit } =>
                write!(f, "payload of {} bytes exceeds limit of {} bytes", size, limit),
            RejectReason::SignatureMismatch =>
                write!(f, "signature mismatch"),
            RejectReason::MalformedPayload { detail } =>
                write!(f, "authenticated payload is not valid JSON: {}", detail),
        }
    }
}

impl std::error::Error for RejectReason {}

/// Errors raised while building a validator or loading its configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Shared secret has zero length.
    EmptySecret,

    /// Required environment variable is not set.
    MissingEnv {
        name: String,
    },

    /// Environment variable is set but cannot be parsed.
    InvalidEnv {
        name: String,
        value: String,
    },

    /// Header name is empty or contains characters not allowed in a header.
    InvalidHeaderName {
        name: String,
    },

    /// Signature and timestamp headers resolve to the same name.
    DuplicateHeaderName {
        name: String,
    },

    /// A zero-second freshness window would reject everything not signed
    /// in the same millisecond.
    ZeroMaxAge,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EmptySecret =>
                write!(f, "webhook secret must not be empty"),
            ConfigError::MissingEnv { name } =>
                write!(f, "environment variable {} is not set", name),
            ConfigError::InvalidEnv { name, value } =>
                write!(f, "environment variable {} has invalid value {:?}", name, value),
            ConfigError::InvalidHeaderName { name } =>
                write!(f, "invalid header name: {:?}", name),
            ConfigError::DuplicateHeaderName { name } =>
                write!(f, "signature and timestamp headers share the name {:?}", name),
            ConfigError::ZeroMaxAge =>
                write!(f, "max age must be at least one second"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_reason_class() {
        assert_eq!(RejectReason::SignatureMismatch.status_code(), 401);
        assert_eq!(RejectReason::MissingTimestamp.status_code(), 401);
        assert_eq!(
            RejectReason::StaleOrFutureTimestamp { age_seconds: 600.0 }.status_code(),
            401
        );
        assert_eq!(
            RejectReason::MalformedPayload { detail: "eof".into() }.status_code(),
            400
        );
        assert_eq!(
            RejectReason::PayloadTooLarge { size: 10, limit: 5 }.status_code(),
            413
        );
    }

    #[test]
    fn serializes_with_reason_tag() {
        let json = serde_json::to_value(RejectReason::StaleOrFutureTimestamp { age_seconds: 600.0 })
            .unwrap();
        assert_eq!(json["reason"], "stale_or_future_timestamp");
        assert_eq!(json["age_seconds"], 600.0);

        let json = serde_json::to_value(RejectReason::SignatureMismatch).unwrap();
        assert_eq!(json, serde_json::json!({ "reason": "signature_mismatch" }));
    }

    #[test]
    fn labels_match_serialized_tags() {
        let reasons = [
            RejectReason::MissingSignature,
            RejectReason::MissingTimestamp,
            RejectReason::InvalidTimestamp,
            RejectReason::StaleOrFutureTimestamp { age_seconds: 1.0 },
            RejectReason::PayloadTooLarge { size: 2, limit: 1 },
            RejectReason::SignatureMismatch,
            RejectReason::MalformedPayload { detail: String::new() },
        ];
        for reason in reasons {
            let json = serde_json::to_value(&reason).unwrap();
            assert_eq!(json["reason"], reason.as_str());
        }
    }
}
