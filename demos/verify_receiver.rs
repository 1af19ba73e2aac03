use chrono::Utc;
use tracing_subscriber::EnvFilter;
use webhook_validator::{
    format_timestamp, Credential, IncomingRequest, SignatureValidator, ValidatorConfig,
};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .init();

    let config = ValidatorConfig::default()
        .with_signature_header("X-Cipp-Signature")
        .with_timestamp_header("X-Cipp-Timestamp")
        .with_debug_logging(true);

    let secret = Credential::new("supersecret").expect("non-empty secret");
    let validator = SignatureValidator::new(config, secret).expect("valid config");

    // What a transport hands over: the body exactly as read off the socket.
    // The timestamp is fresh, so the bogus signature reaches the MAC check and
    // the diagnostics line shows expected and received values.
    let request = IncomingRequest::new(br#"{"id":123}"#.to_vec())
        .with_header("X-Cipp-Signature", "abcd...")
        .with_header("X-Cipp-Timestamp", format_timestamp(Utc::now()));

    match validator.validate(&request) {
        Ok(accepted) => println!("accepted: {}", accepted.into_enriched()),
        Err(reason) => println!("rejected ({}): {}", reason.status_code(), reason),
    }
}
