use super::*;
use chrono::TimeZone;

const TEST_KEY: &str = "Y2F0YWxvZy1hc3Npc3QtdGVzdC1tYXN0ZXIta2V5LTAxMjM0NTY3ODk=";

#[test]
fn signature_matches_known_vector() {
    let key = MasterKey::from_base64(TEST_KEY).expect("key should decode");

    let signature = key
        .signature("GET", "dbs", "", "Thu, 27 Apr 2017 00:51:12 GMT")
        .expect("should sign");
    assert_eq!(signature, "xgqRoksIGc9Djwmz0a4uF6uUIBqyRXowWELo7QN1eNI=");
}

#[test]
fn authorization_is_url_encoded() {
    let key = MasterKey::from_base64(TEST_KEY).expect("key should decode");

    let header = key
        .authorization(
            "POST",
            "docs",
            "dbs/retail/colls/products",
            "Tue, 01 Oct 2024 08:30:00 GMT",
        )
        .expect("should sign");
    assert_eq!(
        header,
        "type%3Dmaster%26ver%3D1.0%26sig%3DAf8G7Skfd86Azocidy4eZf%2F8GxYFpwNTXt7GzB9P8JA%3D"
    );
}

#[test]
fn verb_and_date_case_do_not_matter() {
    let key = MasterKey::from_base64(TEST_KEY).expect("key should decode");

    let upper = key
        .signature("GET", "DBS", "", "THU, 27 APR 2017 00:51:12 GMT")
        .expect("should sign");
    let lower = key
        .signature("get", "dbs", "", "thu, 27 apr 2017 00:51:12 gmt")
        .expect("should sign");
    assert_eq!(upper, lower);
}

#[test]
fn invalid_keys_are_rejected() {
    assert!(matches!(
        MasterKey::from_base64("not base64!"),
        Err(CosmosError::InvalidKey(_))
    ));
    assert!(matches!(
        MasterKey::from_base64(""),
        Err(CosmosError::InvalidKey(_))
    ));
}

#[test]
fn debug_output_hides_key() {
    let key = MasterKey::from_base64(TEST_KEY).expect("key should decode");
    assert!(!format!("{:?}", key).contains("Y2F0"));
}

#[test]
fn aad_header_format() {
    assert_eq!(
        aad_authorization("eyJ0eXAi.abc"),
        "type%3Daad%26ver%3D1.0%26sig%3DeyJ0eXAi.abc"
    );
}

#[test]
fn http_date_format() {
    let date = Utc
        .with_ymd_and_hms(2017, 4, 27, 0, 51, 12)
        .single()
        .expect("valid date");
    assert_eq!(http_date(date), "Thu, 27 Apr 2017 00:51:12 GMT");
}
