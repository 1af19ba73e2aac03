use webhook_validator::{
    Credential, IncomingRequest, SignatureEncoding, SignatureValidator, ValidatorConfig,
};

fn main() {
    let config = ValidatorConfig::default().with_signature_encoding(SignatureEncoding::Hex);
    let validator = SignatureValidator::new(config, Credential::new(b"supersecret".to_vec()).expect("secret"))
        .expect("valid config");

    let body = br#"{"alert":"disk almost full","tenant":"contoso"}"#;
    let headers = validator.sign(body);

    let mut request = IncomingRequest::new(body.to_vec());
    for (name, value) in headers.pairs() {
        println!("{}: {}", name, value);
        request = request.with_header(name, value);
    }

    match validator.validate(&request) {
        Ok(accepted) => println!("accepted: {}", accepted.payload),
        Err(reason) => println!("rejected: {}", reason),
    }

    request.body = br#"{"alert":"all clear","tenant":"contoso"}"#.to_vec();
    match validator.validate(&request) {
        Ok(_) => println!("tampered body accepted?!"),
        Err(reason) => println!("tampered body rejected: {}", reason),
    }
}
