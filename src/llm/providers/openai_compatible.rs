use std::time::Duration;

use async_trait::async_trait;

use crate::errors::{VizCueError, VizCueResult};
use crate::llm::provider::VisionModel;
use crate::llm::types::{CallConfig, ChatMessage};
use crate::parser::ModelFamily;

/// Vision model behind any OpenAI-style `chat/completions` endpoint.
/// `api_base` is the full endpoint URL.
pub struct OpenAiCompatibleVision {
    id: String,
    api_base: String,
    api_key: String,
    call: CallConfig,
    family: ModelFamily,
    client: reqwest::Client,
}

impl OpenAiCompatibleVision {
    pub fn new(
        id: String,
        api_base: String,
        api_key: String,
        call: CallConfig,
        family: ModelFamily,
    ) -> VizCueResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(call.timeout_secs.max(1)))
            .build()?;
        Ok(Self {
            id,
            api_base,
            api_key,
            call,
            family,
            client,
        })
    }

    fn request_body(&self, image_ref: &str, prompt: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.call.model,
            "messages": [ChatMessage::user_with_image(image_ref, prompt)],
            "stream": false,
            "temperature": self.call.temperature,
        })
    }
}

#[async_trait]
impl VisionModel for OpenAiCompatibleVision {
    fn name(&self) -> &str {
        &self.id
    }

    fn model(&self) -> &str {
        &self.call.model
    }

    fn family(&self) -> ModelFamily {
        self.family
    }

    async fn analyze(&self, image_ref: &str, prompt: &str) -> VizCueResult<String> {
        let body = self.request_body(image_ref, prompt);
        tracing::debug!(
            provider = %self.id,
            model = %self.call.model,
            body = %redact_images(&body),
            "sending vision request"
        );

        let mut request = self.client.post(&self.api_base).json(&body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }
        let response = request
            .send()
            .await
            .map_err(|e| VizCueError::Model(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let err_body = response.text().await.unwrap_or_default();
            return Err(VizCueError::Model(format!("{status}: {err_body}")));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| VizCueError::Model(format!("invalid response body: {e}")))?;
        let content = extract_content(&json)?;
        tracing::info!(
            provider = %self.id,
            content_len = content.len(),
            "vision response received"
        );
        Ok(content)
    }
}

/// `choices[0].message.content`, either a string or a list of text parts.
pub fn extract_content(json: &serde_json::Value) -> VizCueResult<String> {
    let content = &json["choices"][0]["message"]["content"];
    if let Some(text) = content.as_str() {
        return Ok(text.to_string());
    }
    if let Some(parts) = content.as_array() {
        let text: Vec<&str> = parts.iter().filter_map(|p| p["text"].as_str()).collect();
        if !text.is_empty() {
            return Ok(text.join("\n"));
        }
    }
    if let Some(message) = json["error"]["message"].as_str() {
        return Err(VizCueError::Model(message.to_string()));
    }
    Err(VizCueError::Model("response carried no message content".into()))
}

/// Request body for logs, with inline image payloads replaced.
fn redact_images(body: &serde_json::Value) -> String {
    let mut log_body = body.clone();
    if let Some(msgs) = log_body.get_mut("messages").and_then(|m| m.as_array_mut()) {
        for msg in msgs {
            let Some(parts) = msg.get_mut("content").and_then(|c| c.as_array_mut()) else {
                continue;
            };
            for part in parts {
                if let Some(url) = part.pointer_mut("/image_url/url") {
                    if url.as_str().is_some_and(|u| u.starts_with("data:")) {
                        *url = serde_json::Value::String("<omitted_base64_image>".into());
                    }
                }
            }
        }
    }
    serde_json::to_string(&log_body).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vision() -> OpenAiCompatibleVision {
        OpenAiCompatibleVision::new(
            "local".into(),
            "http://127.0.0.1:9/v1/chat/completions".into(),
            String::new(),
            CallConfig {
                model: "gemini-1.5-flash".into(),
                temperature: 0.2,
                timeout_secs: 5,
            },
            ModelFamily::Gemini,
        )
        .unwrap()
    }

    #[test]
    fn body_has_image_then_prompt() {
        let body = vision().request_body("data:image/png;base64,AAAA", "find mail");
        assert_eq!(body["model"], "gemini-1.5-flash");
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"][0]["content"][0]["image_url"]["url"], "data:image/png;base64,AAAA");
        assert_eq!(body["messages"][0]["content"][1]["text"], "find mail");
    }

    #[test]
    fn inline_images_are_redacted_in_logs() {
        let v = vision();
        let logged = redact_images(&v.request_body("data:image/png;base64,SECRET", "p"));
        assert!(!logged.contains("SECRET"));
        let logged = redact_images(&v.request_body("https://cdn/x.png", "p"));
        assert!(logged.contains("https://cdn/x.png"));
    }

    #[test]
    fn content_is_read_from_first_choice() {
        let json = serde_json::json!({"choices": [{"message": {"content": "Grid Cell: B3"}}]});
        assert_eq!(extract_content(&json).unwrap(), "Grid Cell: B3");

        let parts = serde_json::json!({"choices": [{"message": {"content": [{"type": "text", "text": "a"}, {"type": "text", "text": "b"}]}}]});
        assert_eq!(extract_content(&parts).unwrap(), "a\nb");
    }

    #[test]
    fn missing_content_is_a_model_error() {
        let json = serde_json::json!({"error": {"message": "quota exceeded"}});
        assert!(matches!(extract_content(&json), Err(VizCueError::Model(m)) if m == "quota exceeded"));
        assert!(extract_content(&serde_json::json!({})).is_err());
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_model_error() {
        let err = vision().analyze("data:image/png;base64,AA", "p").await.unwrap_err();
        assert!(matches!(err, VizCueError::Model(_)));
        assert!(err.is_collaborator_failure());
    }
}
