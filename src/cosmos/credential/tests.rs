use super::*;

fn token(value: &str) -> AccessToken {
    AccessToken::new(value, Utc::now() + ChronoDuration::hours(1))
}

#[test]
fn cosmos_scope_uses_account_origin() {
    let endpoint = Url::parse("https://retail-demo.documents.azure.com:443/").expect("valid url");
    assert_eq!(
        cosmos_scope(&endpoint),
        "https://retail-demo.documents.azure.com/.default"
    );

    let with_path = Url::parse("https://retail-demo.documents.azure.com/dbs/retail").expect("valid url");
    assert_eq!(
        cosmos_scope(&with_path),
        "https://retail-demo.documents.azure.com/.default"
    );
}

#[test]
fn token_expiry_margin() {
    let now = Utc::now();
    let token = AccessToken::new("t", now + ChronoDuration::minutes(3));

    assert!(token.expires_within(now, ChronoDuration::minutes(5)));
    assert!(!token.expires_within(now, ChronoDuration::minutes(1)));
}

#[test]
fn token_debug_hides_secret() {
    let rendered = format!("{:?}", token("super-secret-token"));
    assert!(!rendered.contains("super-secret-token"));
}

#[test]
fn static_credential_returns_its_token_for_any_scope() {
    let credential = StaticTokenCredential::new(token("from-static"));

    let first = credential
        .get_token("https://retail-demo.documents.azure.com/.default")
        .expect("static token should be returned");
    let second = credential
        .get_token("https://other.documents.azure.com/.default")
        .expect("static token should be returned");

    assert_eq!(first.token, "from-static");
    assert_eq!(first, second);
    assert_eq!(credential.name(), "StaticTokenCredential");
}

#[test]
fn identity_expiry_converts_unix_seconds() {
    let expiry = expiry_from_unix(1_893_456_000).expect("timestamp should convert");
    assert_eq!(expiry.timestamp(), 1_893_456_000);
    assert_eq!(expiry.to_rfc3339(), "2030-01-01T00:00:00+00:00");

    assert!(expiry_from_unix(i64::MAX).is_none());
}

#[test]
fn request_error_names_the_credential() {
    let error = CredentialError::request("AzureIdentityCredential", "no identity configured");
    assert_eq!(
        error.to_string(),
        "AzureIdentityCredential failed: no identity configured"
    );
}
