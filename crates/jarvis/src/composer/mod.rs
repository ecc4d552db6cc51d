//! Response composers turn raw capability results into something worth saying
//! back to the user.

pub mod llm;
pub mod template;

use async_trait::async_trait;

pub use llm::LlmComposer;
pub use template::TemplateComposer;

#[derive(Debug, thiserror::Error)]
pub enum ComposerError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Not configured: {0}")]
    NotConfigured(String),
}

#[async_trait]
pub trait ResponseComposer: Send + Sync {
    /// Phrase a successful action. `details` is the provider's own message.
    async fn phrase_success(&self, action: &str, details: &str) -> Result<String, ComposerError>;

    /// Friendly explanation of an unexpected error; never fails
    async fn explain_error(&self, error: &str, context: &str) -> String;

    /// Conversational reply to free-form text
    async fn reply(&self, message: &str) -> Result<String, ComposerError>;
}
