// Inference service client for workflow diagnosis
//
// The coordinator talks to an `InferenceService`; `GeminiClient` implements it
// over the `generateContent` REST endpoint, asking for a JSON response.

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::prompt::build_prompt;
use super::types::{DiagnosisError, DiagnosisRequest, DiagnosisResult};
use super::wire::parse_diagnosis;
use crate::config::InferenceConfig;

/// External service that turns a workflow into a diagnosis
#[async_trait]
pub trait InferenceService: Send + Sync {
    /// Diagnose a workflow. One request per call.
    async fn diagnose(&self, request: &DiagnosisRequest) -> Result<DiagnosisResult, DiagnosisError>;

    /// Service name for logs
    fn name(&self) -> &str {
        "inference"
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<TextPart<'a>>,
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| content.parts.iter().filter_map(|p| p.text.as_deref()).collect())
            .unwrap_or_default()
    }
}

/// HTTP client for a Gemini-style generative language API
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    /// Create a client from the inference configuration
    pub fn new(config: &InferenceConfig) -> Result<Self, DiagnosisError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(DiagnosisError::MissingApiKey)?;

        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl InferenceService for GeminiClient {
    async fn diagnose(&self, request: &DiagnosisRequest) -> Result<DiagnosisResult, DiagnosisError> {
        let prompt = build_prompt(request)?;
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![TextPart { text: &prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
            },
        };

        let url = self.endpoint();
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Diagnosis request failed: {} - {}", status, body);
            return Err(DiagnosisError::Service {
                status: status.as_u16(),
                body,
            });
        }

        let payload: GenerateContentResponse = response.json().await?;
        parse_diagnosis(&payload.text())
    }

    fn name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_requires_api_key() {
        let config = InferenceConfig::default();
        assert!(matches!(GeminiClient::new(&config), Err(DiagnosisError::MissingApiKey)));

        let config = InferenceConfig {
            api_key: Some("   ".to_string()),
            ..InferenceConfig::default()
        };
        assert!(matches!(GeminiClient::new(&config), Err(DiagnosisError::MissingApiKey)));
    }

    #[test]
    fn test_endpoint() {
        let config = InferenceConfig {
            base_url: "http://localhost:8080/".to_string(),
            model: "gemini-test".to_string(),
            api_key: Some("key".to_string()),
            ..InferenceConfig::default()
        };
        let client = GeminiClient::new(&config).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8080/v1beta/models/gemini-test:generateContent");
        assert_eq!(client.model(), "gemini-test");
    }

    #[test]
    fn test_request_body_shape() {
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![TextPart { text: "hello" }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
    }

    #[test]
    fn test_response_text_extraction() {
        let payload: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "{\"analysis\":"}, {"text": "\"ok\"}"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(payload.text(), r#"{"analysis":"ok"}"#);

        let empty: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.text(), "");
    }
}
