// Cart matching module
// Asks the completion model which candidate products a cart request refers to

#[cfg(test)]
mod tests;

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::completion::{ChatCompletionClient, ChatMessage, CompletionError, load_prompt};
use crate::config::CompletionConfig;

/// Product record passed through to the model as-is
pub type Product = Map<String, Value>;

/// Cart-match tool: one prompt template, one completion deployment.
#[derive(Debug, Clone)]
pub struct CartMatcher {
    client: ChatCompletionClient,
    prompt: String,
}

impl CartMatcher {
    #[inline]
    pub fn new(client: ChatCompletionClient, prompt: impl Into<String>) -> Self {
        Self {
            client,
            prompt: prompt.into(),
        }
    }

    /// Build the client and read the prompt template named in `config`.
    #[inline]
    pub fn from_config(config: &CompletionConfig) -> Result<Self, CompletionError> {
        let client = ChatCompletionClient::new(config)?;
        let prompt = load_prompt(&config.prompt_path)?;
        Ok(Self::new(client, prompt))
    }

    #[inline]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Ask the model which of `products` the user wants added to the cart.
    ///
    /// Returns the model's reply verbatim; interpreting it (usually JSON
    /// naming the chosen products) is left to the caller.
    #[inline]
    pub fn match_products(
        &self,
        question: &str,
        products: &[Product],
    ) -> Result<String, CompletionError> {
        let messages = build_messages(&self.prompt, question, products)?;

        info!(
            "Matching cart request against {} candidate products",
            products.len()
        );
        let response = self.client.complete(&messages)?;
        debug!("Cart match response length: {}", response.len());

        Ok(response)
    }
}

/// System instructions, the user's request, then the serialized candidates
#[inline]
pub fn build_messages(
    prompt: &str,
    question: &str,
    products: &[Product],
) -> Result<Vec<ChatMessage>, CompletionError> {
    let product_json = serde_json::to_string(products)?;

    Ok(vec![
        ChatMessage::system(prompt),
        ChatMessage::user(question),
        ChatMessage::user(product_json),
    ])
}
