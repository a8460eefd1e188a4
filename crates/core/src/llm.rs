use crate::error::{AssistantError, Result};
use crate::models::{GenerationOptions, Message};
use crate::traits::LanguageModelClient;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Option<ChatMessage>,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Appends `route` to the host, keeping any path prefix the host carries
/// (e.g. a reverse proxy mounted at `/ollama`).
pub(crate) fn ollama_endpoint(host: &str, route: &str) -> Result<Url> {
    let mut base = Url::parse(host)?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base.join(route)?)
}

/// Single-turn, non-streaming chat against an Ollama host. No retries.
pub struct OllamaClient {
    client: Client,
    endpoint: Url,
}

impl OllamaClient {
    pub fn new(host: &str) -> Result<Self> {
        Ok(Self {
            client: Client::new(),
            endpoint: ollama_endpoint(host, "api/chat")?,
        })
    }
}

#[async_trait]
impl LanguageModelClient for OllamaClient {
    async fn generate(
        &self,
        model: &str,
        messages: &[Message],
        options: GenerationOptions,
    ) -> Result<String> {
        let request = ChatRequest {
            model,
            messages,
            stream: false,
            options: ChatOptions {
                temperature: options.temperature,
                num_predict: options.max_tokens,
            },
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::upstream("ollama", format!("{status}: {body}")));
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .message
            .and_then(|message| message.content)
            .ok_or_else(|| AssistantError::upstream("ollama", "chat response had no message content"))
    }
}

#[cfg(test)]
mod tests {
    use super::{ollama_endpoint, ChatOptions, ChatRequest, ChatResponse, OllamaClient};
    use crate::models::Message;

    #[test]
    fn endpoint_keeps_host_path_prefix() -> crate::Result<()> {
        assert_eq!(
            ollama_endpoint("http://proxy:8080/ollama", "api/chat")?.as_str(),
            "http://proxy:8080/ollama/api/chat"
        );
        assert_eq!(
            ollama_endpoint("http://proxy:8080/ollama/", "api/embed")?.as_str(),
            "http://proxy:8080/ollama/api/embed"
        );
        assert_eq!(
            ollama_endpoint("http://localhost:11434", "api/chat")?.as_str(),
            "http://localhost:11434/api/chat"
        );

        let client = OllamaClient::new("http://proxy:8080/ollama")?;
        assert_eq!(client.endpoint.as_str(), "http://proxy:8080/ollama/api/chat");
        Ok(())
    }

    #[test]
    fn request_carries_generation_options() -> Result<(), serde_json::Error> {
        let messages = vec![Message::user("hello")];
        let request = ChatRequest {
            model: "deepseek-coder:6.7b",
            messages: &messages,
            stream: false,
            options: ChatOptions {
                temperature: 0.5,
                num_predict: 256,
            },
        };

        let encoded = serde_json::to_value(&request)?;
        assert_eq!(encoded["stream"], false);
        assert_eq!(encoded["options"]["num_predict"], 256);
        assert_eq!(encoded["messages"][0]["role"], "user");
        Ok(())
    }

    #[test]
    fn response_content_is_extracted() -> Result<(), serde_json::Error> {
        let parsed: ChatResponse = serde_json::from_str(
            r#"{"model":"m","message":{"role":"assistant","content":"An answer."},"done":true}"#,
        )?;
        let content = parsed.message.and_then(|message| message.content);
        assert_eq!(content.as_deref(), Some("An answer."));
        Ok(())
    }
}
