//! Google Gemini `generateContent` client.
//!
//! One non-streaming call per [`GenerateRequest`]. The key travels in the
//! `x-goog-api-key` header; JSON-format requests set
//! `generationConfig.responseMimeType` to `application/json`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{GenerateRequest, LanguageModel, LlmError, ResponseFormat, Role};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

fn text_content(role: Option<&str>, text: &str) -> GeminiContent {
    GeminiContent {
        role: role.map(str::to_string),
        parts: vec![Part {
            text: Some(text.to_string()),
        }],
    }
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Model => "model",
    }
}

fn build_request(request: &GenerateRequest) -> GeminiRequest {
    let mut contents: Vec<GeminiContent> = request
        .history
        .iter()
        .map(|turn| text_content(Some(role_name(turn.role)), &turn.text))
        .collect();
    contents.push(text_content(Some("user"), &request.prompt));

    GeminiRequest {
        contents,
        system_instruction: request
            .system_instruction
            .as_deref()
            .map(|instruction| text_content(None, instruction)),
        generation_config: match request.response_format {
            ResponseFormat::Text => None,
            ResponseFormat::Json => Some(GenerationConfig {
                response_mime_type: "application/json".into(),
            }),
        },
    }
}

/// Prefer the message inside Gemini's error envelope, fall back to the body.
fn map_api_error(status: u16, body: &str) -> LlmError {
    let message = serde_json::from_str::<GeminiResponse>(body)
        .ok()
        .and_then(|r| r.error)
        .map_or_else(|| body.trim().to_string(), |e| e.message);
    LlmError::Api { status, message }
}

fn extract_text(body: &str) -> Result<String, LlmError> {
    let response: GeminiResponse =
        serde_json::from_str(body).map_err(|e| LlmError::Decode(e.to_string()))?;
    if let Some(error) = response.error {
        return Err(LlmError::Api {
            status: 200,
            message: error.message,
        });
    }

    let candidate = response.candidates.into_iter().next().ok_or(LlmError::EmptyResponse)?;
    if let Some(reason) = candidate.finish_reason.as_deref() {
        tracing::debug!(finish_reason = reason, "gemini candidate finished");
    }
    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(LlmError::EmptyResponse);
    }
    Ok(text)
}

pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        let trimmed = base_url.trim().trim_end_matches('/');
        if !trimmed.is_empty() {
            self.base_url = trimmed.to_string();
        }
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, LlmError> {
        let body = build_request(request);
        tracing::debug!(
            model = %self.model,
            turns = body.contents.len(),
            json = matches!(request.response_format, ResponseFormat::Json),
            "sending gemini request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            tracing::error!(status = %status, "gemini API error");
            return Err(map_api_error(status.as_u16(), &text));
        }
        extract_text(&text)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Turn;

    #[test]
    fn request_carries_history_prompt_and_system_instruction() {
        let request = GenerateRequest::new("How long is a cycle?")
            .with_system_instruction("Be kind.")
            .with_history(vec![Turn::user("hi"), Turn::model("hello!")]);

        let value = serde_json::to_value(build_request(&request)).unwrap();
        let contents = value["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["parts"][0]["text"], "How long is a cycle?");
        assert_eq!(value["systemInstruction"]["parts"][0]["text"], "Be kind.");
        assert!(value.get("generationConfig").is_none());
    }

    #[test]
    fn json_requests_set_response_mime_type() {
        let request = GenerateRequest::new("predict").json();
        let value = serde_json::to_value(build_request(&request)).unwrap();
        assert_eq!(value["generationConfig"]["responseMimeType"], "application/json");
        assert!(value.get("systemInstruction").is_none());
    }

    #[test]
    fn api_errors_prefer_envelope_message() {
        let body = r#"{"error":{"code":429,"message":"You exceeded your current quota","status":"RESOURCE_EXHAUSTED"}}"#;
        let err = map_api_error(429, body);
        assert_eq!(
            err.to_string(),
            "model API error (429): You exceeded your current quota"
        );
        assert!(err.is_rate_limited());

        let err = map_api_error(502, "Bad Gateway\n");
        assert_eq!(err.to_string(), "model API error (502): Bad Gateway");
    }

    #[test]
    fn extracts_text_from_first_candidate() {
        let body = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hello, "},{"text":"friend"}]},"finishReason":"STOP"}]}"#;
        assert_eq!(extract_text(body).unwrap(), "Hello, friend");
    }

    #[test]
    fn blank_or_missing_candidates_are_empty_responses() {
        assert!(matches!(
            extract_text(r#"{"candidates":[]}"#),
            Err(LlmError::EmptyResponse)
        ));
        assert!(matches!(
            extract_text(r#"{"candidates":[{"content":{"parts":[{"text":"  "}]}}]}"#),
            Err(LlmError::EmptyResponse)
        ));
        assert!(matches!(extract_text("not json"), Err(LlmError::Decode(_))));
    }

    #[test]
    fn endpoint_uses_model_and_trimmed_base_url() {
        let client = GeminiClient::new("k", "gemini-2.5-flash")
            .with_base_url("http://localhost:9000/v1beta/");
        assert_eq!(
            client.endpoint(),
            "http://localhost:9000/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert!(!format!("{client:?}").contains("\"k\""));
    }
}
