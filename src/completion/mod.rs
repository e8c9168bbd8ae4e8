// Completion module
// Azure OpenAI chat-completion client and prompt template loading

pub mod azure_openai;
pub mod prompt;

pub use azure_openai::{
    ChatCompletionClient, ChatMessage, CompletionError, ContentPart, DecodingParams, Role,
};
pub use prompt::load_prompt;
