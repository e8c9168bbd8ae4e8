use super::*;
use crate::completion::{ContentPart, Role};
use serde_json::json;

fn paint_products() -> Vec<Product> {
    let products = json!([
        {
            "id": "OM-403",
            "name": "Effervescent Jade, Interior Wall Paint, 1 gallon bucket",
            "type": "Paint Shade",
            "price": "$47.99"
        },
        {
            "id": "DC-401",
            "name": "Drop Cloth",
            "type": "Paint Accessories",
            "price": "$10.00"
        }
    ]);
    serde_json::from_value(products).expect("products should deserialize")
}

fn text_of(message: &ChatMessage) -> &str {
    match message.content.as_slice() {
        [ContentPart::Text { text }] => text.as_str(),
        other => panic!("expected one text part, got {:?}", other),
    }
}

#[test]
fn builds_three_messages_in_order() {
    let products = paint_products();
    let messages = build_messages("SYSTEM PROMPT", "add 2 gallons of jade", &products)
        .expect("should build messages");

    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0].role, Role::System);
    assert_eq!(text_of(&messages[0]), "SYSTEM PROMPT");
    assert_eq!(messages[1].role, Role::User);
    assert_eq!(text_of(&messages[1]), "add 2 gallons of jade");
    assert_eq!(messages[2].role, Role::User);
}

#[test]
fn product_message_is_json_of_products() {
    let products = paint_products();
    let messages = build_messages("prompt", "question", &products).expect("should build messages");

    let decoded: Vec<Product> =
        serde_json::from_str(text_of(&messages[2])).expect("product message should be JSON");
    assert_eq!(decoded, products);
}

#[test]
fn empty_product_list_still_builds_prompt() {
    let messages = build_messages("prompt", "anything in stock?", &[]).expect("should build messages");

    assert_eq!(messages.len(), 3);
    assert_eq!(text_of(&messages[2]), "[]");
}

#[test]
fn from_config_requires_prompt_file() {
    let config = CompletionConfig {
        endpoint: "https://demo.openai.azure.com/".to_string(),
        deployment: "cart-gpt".to_string(),
        api_key: "key".to_string(),
        prompt_path: "/nonexistent/addToCartPrompt.txt".into(),
        ..CompletionConfig::default()
    };

    let result = CartMatcher::from_config(&config);
    assert!(matches!(
        result,
        Err(CompletionError::InvalidConfig(
            crate::config::ConfigError::PromptFile { .. }
        ))
    ));
}
