use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::SignatureEncoding;

/// Default freshness window, in seconds.
pub const DEFAULT_MAX_AGE_SECS: u64 = 300;

/// Default body size limit, in bytes.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Validation policy shared by every request a validator handles.
///
/// The shared secret is deliberately absent; it travels separately as a
/// [`crate::Credential`] so this struct can be loaded from files and logged.
///
/// Deserializing does not check the values. Call [`ValidatorConfig::validate`]
/// on a loaded config, or hand it to [`crate::SignatureValidator::new`],
/// which does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ValidatorConfig {
    /// Header carrying the encoded MAC.
    pub signature_header_name: String,

    /// Header carrying the ISO-8601 signing instant.
    pub timestamp_header_name: String,

    /// Maximum absolute distance between the timestamp and now.
    #[serde(rename = "maxAgeSeconds")]
    pub max_age_secs: u64,

    /// Encoding of the MAC in the signature header.
    pub signature_encoding: SignatureEncoding,

    /// Reject requests without a timestamp header.
    ///
    /// Turning this off removes replay protection for unstamped requests.
    pub require_timestamp: bool,

    /// Reject bodies larger than this before hashing. `None` disables the check.
    pub max_body_bytes: Option<usize>,

    /// Log signatures and a payload preview at debug level.
    pub debug_logging: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            signature_header_name: "x-signature".to_string(),
            timestamp_header_name: "x-timestamp".to_string(),
            max_age_secs: DEFAULT_MAX_AGE_SECS,
            signature_encoding: SignatureEncoding::Base64,
            require_timestamp: true,
            max_body_bytes: Some(DEFAULT_MAX_BODY_BYTES),
            debug_logging: false,
        }
    }
}

impl ValidatorConfig {
    /// Customize signature header.
    pub fn with_signature_header(mut self, header: impl Into<String>) -> Self {
        self.signature_header_name = header.into();
        self
    }

    /// Customize timestamp header.
    pub fn with_timestamp_header(mut self, header: impl Into<String>) -> Self {
        self.timestamp_header_name = header.into();
        self
    }

    /// Set the freshness window.
    pub fn with_max_age_secs(mut self, max_age_secs: u64) -> Self {
        self.max_age_secs = max_age_secs;
        self
    }

    /// Set the signature encoding agreed with the signer.
    pub fn with_signature_encoding(mut self, encoding: SignatureEncoding) -> Self {
        self.signature_encoding = encoding;
        self
    }

    /// Require or waive the timestamp header.
    pub fn with_require_timestamp(mut self, require: bool) -> Self {
        self.require_timestamp = require;
        self
    }

    /// Set or clear the body size limit.
    pub fn with_max_body_bytes(mut self, limit: Option<usize>) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Enable or disable diagnostic logging.
    pub fn with_debug_logging(mut self, enabled: bool) -> Self {
        self.debug_logging = enabled;
        self
    }

    /// Check the policy for values that could never validate correctly.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_header_name(&self.signature_header_name)?;
        check_header_name(&self.timestamp_header_name)?;

        if self
            .signature_header_name
            .eq_ignore_ascii_case(&self.timestamp_header_name)
        {
            return Err(ConfigError::DuplicateHeaderName {
                name: self.signature_header_name.clone(),
            });
        }

        if self.max_age_secs == 0 {
            return Err(ConfigError::ZeroMaxAge);
        }

        Ok(())
    }

    /// Load from `WEBHOOK_*` environment variables, falling back to defaults
    /// for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("WEBHOOK_SIGNATURE_HEADER") {
            config.signature_header_name = value;
        }
        if let Some(value) = lookup("WEBHOOK_TIMESTAMP_HEADER") {
            config.timestamp_header_name = value;
        }
        if let Some(value) = lookup("WEBHOOK_MAX_AGE_SECS") {
            config.max_age_secs = parse_env("WEBHOOK_MAX_AGE_SECS", &value)?;
        }
        if let Some(value) = lookup("WEBHOOK_SIGNATURE_ENCODING") {
            config.signature_encoding = value
                .parse()
                .map_err(|_| invalid_env("WEBHOOK_SIGNATURE_ENCODING", &value))?;
        }
        if let Some(value) = lookup("WEBHOOK_REQUIRE_TIMESTAMP") {
            config.require_timestamp = parse_bool("WEBHOOK_REQUIRE_TIMESTAMP", &value)?;
        }
        if let Some(value) = lookup("WEBHOOK_MAX_BODY_BYTES") {
            let limit: usize = parse_env("WEBHOOK_MAX_BODY_BYTES", &value)?;
            config.max_body_bytes = (limit > 0).then_some(limit);
        }
        if let Some(value) = lookup("WEBHOOK_DEBUG_LOGGING") {
            config.debug_logging = parse_bool("WEBHOOK_DEBUG_LOGGING", &value)?;
        }

        config.validate()?;
        Ok(config)
    }
}

fn check_header_name(name: &str) -> Result<(), ConfigError> {
    // RFC 9110 token characters.
    let valid = !name.is_empty()
        && name.bytes().all(|b| {
            b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
        });

    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidHeaderName {
            name: name.to_string(),
        })
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| invalid_env(name, value))
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid_env(name, value)),
    }
}

fn invalid_env(name: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnv {
        name: name.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn defaults_are_safe() {
        let config = ValidatorConfig::default();
        assert_eq!(config.max_age_secs, 300);
        assert_eq!(config.signature_encoding, SignatureEncoding::Base64);
        assert!(config.require_timestamp);
        assert!(!config.debug_logging);
        assert_eq!(config.max_body_bytes, Some(DEFAULT_MAX_BODY_BYTES));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn deserializes_camel_case_with_defaults() {
        let config: ValidatorConfig = serde_json::from_str(
            r#"{"signatureHeaderName":"x-cipp-signature","signatureEncoding":"hex","maxAgeSeconds":60}"#,
        )
        .unwrap();
        assert_eq!(config.signature_header_name, "x-cipp-signature");
        assert_eq!(config.signature_encoding, SignatureEncoding::Hex);
        assert_eq!(config.max_age_secs, 60);
        assert_eq!(config.timestamp_header_name, "x-timestamp");
        assert!(config.require_timestamp);
        assert_eq!(config.max_body_bytes, Some(DEFAULT_MAX_BODY_BYTES));
    }

    #[test]
    fn deserialized_config_is_checked_by_validate() {
        let config: ValidatorConfig = serde_json::from_str(
            r#"{"signatureHeaderName":"x-webhook","timestampHeaderName":"X-Webhook","maxAgeSeconds":0}"#,
        )
        .unwrap();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateHeaderName { .. })
        ));
    }

    #[test]
    fn serializes_with_external_names() {
        let json = serde_json::to_value(ValidatorConfig::default()).unwrap();
        assert_eq!(json["maxAgeSeconds"], 300);
        assert_eq!(json["signatureEncoding"], "base64");
        assert_eq!(json["requireTimestamp"], true);
        assert!(json.get("secret").is_none());
    }

    #[test]
    fn rejects_bad_header_names() {
        let config = ValidatorConfig::default().with_signature_header("");
        assert!(matches!(config.validate(), Err(ConfigError::InvalidHeaderName { .. })));

        let config = ValidatorConfig::default().with_timestamp_header("x timestamp");
        assert!(matches!(config.validate(), Err(ConfigError::InvalidHeaderName { .. })));

        let config = ValidatorConfig::default()
            .with_signature_header("X-Sig")
            .with_timestamp_header("x-sig");
        assert!(matches!(config.validate(), Err(ConfigError::DuplicateHeaderName { .. })));
    }

    #[test]
    fn rejects_zero_max_age() {
        let config = ValidatorConfig::default().with_max_age_secs(0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroMaxAge));
    }

    #[test]
    fn env_overrides_defaults() {
        let config = ValidatorConfig::from_lookup(lookup(&[
            ("WEBHOOK_SIGNATURE_HEADER", "x-cipp-signature"),
            ("WEBHOOK_TIMESTAMP_HEADER", "x-cipp-timestamp"),
            ("WEBHOOK_MAX_AGE_SECS", "120"),
            ("WEBHOOK_SIGNATURE_ENCODING", "hex"),
            ("WEBHOOK_REQUIRE_TIMESTAMP", "false"),
            ("WEBHOOK_MAX_BODY_BYTES", "0"),
            ("WEBHOOK_DEBUG_LOGGING", "on"),
        ]))
        .unwrap();

        assert_eq!(config.signature_header_name, "x-cipp-signature");
        assert_eq!(config.timestamp_header_name, "x-cipp-timestamp");
        assert_eq!(config.max_age_secs, 120);
        assert_eq!(config.signature_encoding, SignatureEncoding::Hex);
        assert!(!config.require_timestamp);
        assert_eq!(config.max_body_bytes, None);
        assert!(config.debug_logging);
    }

    #[test]
    fn empty_env_yields_defaults() {
        let config = ValidatorConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ValidatorConfig::default());
    }

    #[test]
    fn invalid_env_values_are_reported() {
        let err = ValidatorConfig::from_lookup(lookup(&[("WEBHOOK_MAX_AGE_SECS", "five")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidEnv {
                name: "WEBHOOK_MAX_AGE_SECS".to_string(),
                value: "five".to_string(),
            }
        );

        let err = ValidatorConfig::from_lookup(lookup(&[("WEBHOOK_SIGNATURE_ENCODING", "rot13")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { .. }));

        let err = ValidatorConfig::from_lookup(lookup(&[("WEBHOOK_REQUIRE_TIMESTAMP", "maybe")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { .. }));
    }
}
