use crate::traits::LanguageModel;
use crate::{GenerationConfig, QueryError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash-exp";

pub struct GeminiClient {
    endpoint: Url,
    model: String,
    api_key: String,
    generation: GenerationConfig,
    client: Client,
}

impl GeminiClient {
    pub fn new(
        endpoint: &str,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, QueryError> {
        let api_key = api_key.into().trim().to_string();
        if api_key.is_empty() {
            return Err(QueryError::InvalidArgument(
                "gemini api key is empty".to_string(),
            ));
        }

        Ok(Self {
            endpoint: Url::parse(endpoint)?,
            model: model.into(),
            api_key,
            generation: GenerationConfig::default(),
            client: Client::new(),
        })
    }

    pub fn with_generation_config(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn generate_url(&self) -> Result<Url, QueryError> {
        Ok(self
            .endpoint
            .join(&format!("v1beta/models/{}:generateContent", self.model))?)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: &'a GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

fn response_text(response: GenerateResponse) -> Result<String, QueryError> {
    if let Some(reason) = response
        .prompt_feedback
        .and_then(|feedback| feedback.block_reason)
    {
        return Err(QueryError::Upstream(format!("prompt blocked: {reason}")));
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| QueryError::Upstream("response has no candidates".to_string()))?;

    let parts = candidate
        .content
        .map(|content| content.parts)
        .unwrap_or_default();

    let text = parts
        .into_iter()
        .filter_map(|part| part.text)
        .collect::<String>();

    if text.is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".to_string());
        return Err(QueryError::Upstream(format!(
            "candidate has no text (finish reason: {reason})"
        )));
    }

    Ok(text)
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String, QueryError> {
        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: &self.generation,
        };

        let response = self
            .client
            .post(self.generate_url()?)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|error| QueryError::Upstream(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let details = response.text().await.unwrap_or_default();
            return Err(QueryError::Upstream(format!(
                "gemini returned {status}: {}",
                details.trim()
            )));
        }

        let payload: GenerateResponse = response
            .json()
            .await
            .map_err(|error| QueryError::Upstream(format!("unreadable gemini response: {error}")))?;

        response_text(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> GenerateResponse {
        serde_json::from_str(raw).expect("fixture should deserialize")
    }

    #[test]
    fn text_parts_are_concatenated_verbatim() {
        let response = parse(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"X is "},{"text":"42.\n"}]},"finishReason":"STOP"}]}"#,
        );
        assert_eq!(response_text(response).unwrap(), "X is 42.\n");
    }

    #[test]
    fn blocked_prompt_is_an_upstream_error() {
        let response = parse(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#);
        match response_text(response) {
            Err(QueryError::Upstream(message)) => assert!(message.contains("SAFETY")),
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[test]
    fn candidate_without_text_reports_finish_reason() {
        let response = parse(r#"{"candidates":[{"finishReason":"MAX_TOKENS"}]}"#);
        match response_text(response) {
            Err(QueryError::Upstream(message)) => assert!(message.contains("MAX_TOKENS")),
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[test]
    fn request_body_carries_generation_config() {
        let generation = GenerationConfig::default();
        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: "hello" }],
            }],
            generation_config: &generation,
        };

        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(value["generationConfig"]["topP"], serde_json::json!(0.95f32));
        assert_eq!(value["generationConfig"]["responseMimeType"], "text/plain");
    }

    #[test]
    fn generate_url_targets_model() -> Result<(), QueryError> {
        let client = GeminiClient::new(DEFAULT_GEMINI_ENDPOINT, DEFAULT_GEMINI_MODEL, "key")?;
        assert_eq!(
            client.generate_url()?.as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash-exp:generateContent"
        );
        Ok(())
    }

    #[test]
    fn blank_api_key_is_rejected() {
        let result = GeminiClient::new(DEFAULT_GEMINI_ENDPOINT, DEFAULT_GEMINI_MODEL, "  ");
        assert!(matches!(result, Err(QueryError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn transport_failure_is_an_upstream_error() -> Result<(), QueryError> {
        let client = GeminiClient::new("http://127.0.0.1:1", DEFAULT_GEMINI_MODEL, "key")?;

        let result = client.complete("hello").await;

        match result {
            Err(error) => assert!(error.is_upstream(), "unexpected error: {error:?}"),
            Ok(text) => panic!("expected failure, got {text:?}"),
        }
        Ok(())
    }
}
