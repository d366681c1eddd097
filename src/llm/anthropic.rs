use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::LlmClient;
use crate::error::GenerationError;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Minimal request/response structs for the Anthropic Messages API.
#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

/// Anthropic-based implementation of LlmClient.
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    api_base_url: String,
}

impl AnthropicClient {
    pub fn new(
        api_key: String,
        model: String,
        max_tokens: u32,
        api_base_url: String,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(AnthropicClient {
            client,
            api_key,
            model,
            max_tokens,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn messages_url(&self) -> String {
        if self.api_base_url.ends_with("/v1") {
            format!("{}/messages", self.api_base_url)
        } else {
            format!("{}/v1/messages", self.api_base_url)
        }
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let req = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        log::info!("Calling Anthropic model {:?}", &self.model);
        log::trace!("Prompt:\n{}", truncate(prompt, 4000));

        let resp = self
            .client
            .post(self.messages_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&req)
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(GenerationError::Rejected { status, body });
        }

        let parsed: MessagesResponse = resp
            .json()
            .await
            .map_err(|e| GenerationError::Transport(format!("failed to parse response: {e}")))?;

        if let Some(usage) = &parsed.usage {
            log::info!(
                "Token usage: input={}, output={}",
                usage.input_tokens,
                usage.output_tokens
            );
        }

        let text = extract_text(parsed)?;
        log::trace!("Completion:\n{}", truncate(&text, 4000));
        Ok(text)
    }
}

/// Accept only a text completion; anything else is a protocol anomaly.
fn extract_text(resp: MessagesResponse) -> Result<String, GenerationError> {
    if resp.stop_reason.as_deref() == Some("refusal") {
        return Err(GenerationError::UnexpectedResponse(
            "the model refused to answer".into(),
        ));
    }

    let first = resp
        .content
        .into_iter()
        .next()
        .ok_or_else(|| GenerationError::UnexpectedResponse("response has no content".into()))?;

    match (first.kind.as_str(), first.text) {
        ("text", Some(text)) => Ok(text),
        (kind, _) => Err(GenerationError::UnexpectedResponse(format!(
            "expected a text block, got '{kind}'"
        ))),
    }
}

/// Truncate long strings for debug logging.
fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...\n[truncated {} bytes]", &s[..end], s.len() - end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: &str) -> MessagesResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn request_is_single_user_turn() {
        let req = MessagesRequest {
            model: "claude-sonnet-4-20250514",
            max_tokens: 1000,
            messages: vec![ChatMessage {
                role: "user",
                content: "prompt text",
            }],
        };
        let json = serde_json::to_value(&req).unwrap();

        assert_eq!(json["max_tokens"], 1000);
        assert_eq!(json["messages"].as_array().unwrap().len(), 1);
        assert_eq!(json["messages"][0]["role"], "user");
        assert!(json.get("system").is_none());
    }

    #[test]
    fn text_block_is_returned() {
        let resp = response(
            r#"{"content": [{"type": "text", "text": "<commit-message>Fix it</commit-message>"}],
                "stop_reason": "end_turn", "usage": {"input_tokens": 10, "output_tokens": 5}}"#,
        );
        assert_eq!(
            extract_text(resp).unwrap(),
            "<commit-message>Fix it</commit-message>"
        );
    }

    #[test]
    fn tool_use_block_is_rejected() {
        let resp = response(
            r#"{"content": [{"type": "tool_use", "id": "t1", "name": "x", "input": {}}],
                "stop_reason": "tool_use"}"#,
        );
        assert!(matches!(
            extract_text(resp),
            Err(GenerationError::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn refusal_and_empty_content_are_rejected() {
        let refusal = response(r#"{"content": [], "stop_reason": "refusal"}"#);
        assert!(extract_text(refusal).is_err());

        let empty = response(r#"{"content": [], "stop_reason": "end_turn"}"#);
        assert!(extract_text(empty).is_err());
    }

    #[test]
    fn messages_url_handles_versioned_base() {
        let timeout = Duration::from_secs(5);
        let plain = AnthropicClient::new(
            "k".into(),
            "m".into(),
            10,
            "https://api.anthropic.com/".into(),
            timeout,
        )
        .unwrap();
        assert_eq!(plain.messages_url(), "https://api.anthropic.com/v1/messages");

        let versioned =
            AnthropicClient::new("k".into(), "m".into(), 10, "http://proxy/v1".into(), timeout)
                .unwrap();
        assert_eq!(versioned.messages_url(), "http://proxy/v1/messages");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let s = "あいうえお";
        let t = truncate(s, 4);
        assert!(t.starts_with("あ..."));
    }
}
