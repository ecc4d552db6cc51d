//! Composer backed by an OpenAI-compatible chat completions endpoint

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::{
    template::{OFFLINE_REPLY, UNREACHABLE_REPLY},
    ComposerError, ResponseComposer, TemplateComposer,
};
use crate::config::JarvisConfig;

const BUDDY_SYSTEM_PROMPT: &str = r#"You are {name}, a friendly AI assistant with a buddy-like personality.
You're helpful, slightly informal, and supportive, like a tech-savvy friend who's always ready to help.

Guidelines:
- Use friendly, conversational language
- Occasionally use emojis (🙂, 😅, 🔥) but keep it professional
- Be encouraging and supportive
- If you make a mistake or can't do something, be honest and apologetic
- Keep responses concise but warm
- Use phrases like "buddy", "friend", or "pal" occasionally (but not excessively)

Current context: You're helping control a PC via voice commands. You can open apps, search the web,
manage files, control system settings, and type text. Always prioritize safety and ask for
confirmation on destructive actions.

If the user asks something you can't do via system control, offer helpful alternatives or
explain what you can do instead."#;

const MAX_TOKENS: u32 = 500;

pub struct LlmComposer {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
    system_prompt: String,
    max_retries: u32,
    fallback: TemplateComposer,
}

impl LlmComposer {
    pub fn new(config: &JarvisConfig) -> Result<Self, ComposerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.llm.timeout_secs))
            .build()
            .map_err(|e| ComposerError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.llm.endpoint.clone(),
            model: config.llm.model.clone(),
            api_key: config.llm.api_key(),
            temperature: config.llm.temperature,
            system_prompt: BUDDY_SYSTEM_PROMPT.replace("{name}", &config.assistant.name),
            max_retries: 3,
            fallback: TemplateComposer::new(),
        })
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// One prompt in, one completion out, retrying transient failures with a
    /// linear backoff
    pub async fn chat(&self, prompt: &str, temperature: f32) -> Result<String, ComposerError> {
        let mut last_error = None;

        for attempt in 0..self.max_retries {
            match self.chat_once(prompt, temperature).await {
                Ok(text) => return Ok(text),
                Err(e) if !is_transient(&e) => return Err(e),
                Err(e) => {
                    tracing::warn!("[LLM] Request failed (attempt {}): {}", attempt + 1, e);
                    last_error = Some(e);
                    if attempt + 1 < self.max_retries {
                        tokio::time::sleep(Duration::from_millis(500 * (attempt as u64 + 1))).await;
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| ComposerError::RequestFailed("no attempts made".to_string())))
    }

    async fn chat_once(&self, prompt: &str, temperature: f32) -> Result<String, ComposerError> {
        let auth_header = self
            .api_key
            .as_ref()
            .map(|k| format!("Bearer {}", k))
            .ok_or_else(|| ComposerError::NotConfigured("No API key configured".to_string()))?;

        let payload = serde_json::json!({
            "model": self.model,
            "temperature": temperature,
            "max_tokens": MAX_TOKENS,
            "messages": [
                { "role": "system", "content": self.system_prompt },
                { "role": "user", "content": prompt }
            ]
        });

        tracing::debug!("[LLM] Sending request: model={}", self.model);

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .header("Authorization", auth_header)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ComposerError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ComposerError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ComposerError::ParseError(e.to_string()))?;

        parse_completion(&json)
    }
}

fn parse_completion(json: &serde_json::Value) -> Result<String, ComposerError> {
    let content = json["choices"][0]["message"]["content"]
        .as_str()
        .map(str::trim)
        .unwrap_or_default();

    if content.is_empty() {
        return Err(ComposerError::ParseError("Empty completion".to_string()));
    }
    Ok(content.to_string())
}

fn is_transient(error: &ComposerError) -> bool {
    match error {
        ComposerError::RequestFailed(_) | ComposerError::ParseError(_) => true,
        ComposerError::ApiError { status, .. } => *status == 429 || *status >= 500,
        ComposerError::NotConfigured(_) => false,
    }
}

impl std::fmt::Debug for LlmComposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmComposer")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("has_api_key", &self.api_key.is_some())
            .finish()
    }
}

#[async_trait]
impl ResponseComposer for LlmComposer {
    async fn phrase_success(&self, action: &str, details: &str) -> Result<String, ComposerError> {
        let prompt = format!(
            "The user asked me to {}. It succeeded.\nDetails: {}\n\n\
             Give a brief, friendly response (1-2 sentences) as a helpful buddy.\n\
             Be natural and conversational.",
            action, details
        );

        match self.chat(&prompt, 0.6).await {
            Ok(text) => Ok(text),
            Err(e) => {
                tracing::warn!("[LLM] Falling back to template phrase: {}", e);
                self.fallback.phrase_success(action, details).await
            }
        }
    }

    async fn explain_error(&self, error: &str, context: &str) -> String {
        let prompt = format!(
            "I encountered an error while trying to help the user.\n\
             Context: {}\nError: {}\n\n\
             Explain this error in a friendly, helpful way (1-2 sentences) and suggest what to try next.\n\
             Be supportive and not overly technical.",
            context, error
        );

        match self.chat(&prompt, 0.5).await {
            Ok(text) => text,
            Err(_) => self.fallback.explain_error(error, context).await,
        }
    }

    async fn reply(&self, message: &str) -> Result<String, ComposerError> {
        match self.chat(message, self.temperature).await {
            Ok(text) => Ok(text),
            Err(ComposerError::NotConfigured(_)) => Ok(OFFLINE_REPLY.to_string()),
            Err(e) => {
                tracing::error!("[LLM] Chat failed: {}", e);
                Ok(UNREACHABLE_REPLY.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    use super::*;

    /// Serve one canned HTTP response per connection
    async fn mock_endpoint(status: u16, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut request = Vec::new();
                let mut buf = [0u8; 4096];
                loop {
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    if n == 0 {
                        break;
                    }
                    request.extend_from_slice(&buf[..n]);
                    if request_complete(&request) {
                        break;
                    }
                }

                let response = format!(
                    "HTTP/1.1 {} OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        format!("http://{}/v1/chat/completions", addr)
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        request.len() >= header_end + 4 + content_length
    }

    fn composer_for(endpoint: String) -> LlmComposer {
        let mut config = JarvisConfig::default();
        config.llm.endpoint = endpoint;
        config.llm.timeout_secs = 5;
        config.llm.api_key_env = "JARVIS_TEST_UNSET_KEY".to_string();
        LlmComposer::new(&config).unwrap().with_max_retries(1)
    }

    #[tokio::test]
    async fn test_reply_uses_completion() {
        let endpoint = mock_endpoint(
            200,
            r#"{"choices":[{"message":{"role":"assistant","content":"  Doing great, buddy!  "}}]}"#,
        )
        .await;
        let composer = composer_for(endpoint).with_api_key("test-key");

        assert_eq!(composer.reply("how are you").await.unwrap(), "Doing great, buddy!");
    }

    #[tokio::test]
    async fn test_reply_without_key_is_offline_notice() {
        let composer = composer_for("http://127.0.0.1:9/v1/chat/completions".to_string());
        assert!(!composer.has_api_key());
        assert_eq!(composer.reply("hello").await.unwrap(), OFFLINE_REPLY);
    }

    #[tokio::test]
    async fn test_api_error_falls_back_to_templates() {
        let endpoint = mock_endpoint(500, r#"{"error":"boom"}"#).await;
        let composer = composer_for(endpoint).with_api_key("test-key");

        assert_eq!(composer.reply("hello").await.unwrap(), UNREACHABLE_REPLY);
        assert_eq!(
            composer.explain_error("disk full", "copy").await,
            "Hmm, I hit a snag: disk full. Want to try again? 😅"
        );
        let phrase = composer.phrase_success("open chrome", "Chrome is opening up!").await;
        assert!(phrase.is_ok());
    }

    #[test]
    fn test_parse_completion_rejects_empty() {
        let json = serde_json::json!({"choices":[{"message":{"content":"   "}}]});
        assert!(matches!(parse_completion(&json), Err(ComposerError::ParseError(_))));
    }

    #[test]
    fn test_transient_errors() {
        assert!(is_transient(&ComposerError::ApiError {
            status: 429,
            message: String::new()
        }));
        assert!(!is_transient(&ComposerError::ApiError {
            status: 401,
            message: String::new()
        }));
        assert!(!is_transient(&ComposerError::NotConfigured("x".to_string())));
    }
}
