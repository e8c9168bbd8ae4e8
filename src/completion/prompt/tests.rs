use super::*;
use std::io::ErrorKind;
use tempfile::TempDir;

#[test]
fn loads_prompt_verbatim() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("addToCartPrompt.txt");
    let text = "Pick the products the user wants.\nRespond with JSON: {\"products\": []}\n";
    fs::write(&path, text).expect("should write prompt file");

    let prompt = load_prompt(&path).expect("should load prompt");
    assert_eq!(prompt, text);
}

#[test]
fn missing_prompt_is_config_error() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("missing.txt");

    match load_prompt(&path) {
        Err(ConfigError::PromptFile { path: reported, source }) => {
            assert_eq!(reported, path);
            assert_eq!(source.kind(), ErrorKind::NotFound);
        }
        other => panic!("expected prompt file error, got {:?}", other),
    }
}

#[test]
fn non_utf8_prompt_is_rejected() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("latin1.txt");
    fs::write(&path, [0x63, 0x61, 0x66, 0xE9]).expect("should write prompt file");

    assert!(load_prompt(&path).is_err());
}
