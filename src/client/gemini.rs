use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::schema::{analysis_response_schema, teacher_prompt, DEFAULT_MODEL};
use crate::error::AnalysisError;
use crate::types::analysis::AnalysisResult;

const GENERATE_CONTENT_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

/// Client for one analysis round trip against Gemini `generateContent`.
/// Stateless per invocation: the credential and model are injected at
/// construction, nothing is retained between calls, and a failed call is
/// surfaced immediately with no retry.
#[derive(Debug, Clone)]
pub struct AnalysisClient {
    api_key: Option<String>,
    model: String,
}

#[derive(Serialize, Debug)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize, Debug)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize, Debug)]
struct Part {
    text: String,
}

#[derive(Serialize, Debug)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
    #[serde(rename = "responseSchema")]
    response_schema: serde_json::Value,
}

#[derive(Deserialize, Debug)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

impl AnalysisClient {
    /// A missing or blank key is remembered as absent and reported as a
    /// configuration error on the first `analyze`, before any network I/O.
    pub fn new(api_key: Option<String>, model: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn analyze(&self, text: &str) -> Result<AnalysisResult, AnalysisError> {
        let api_key = self.api_key.as_deref().ok_or(AnalysisError::Configuration)?;

        let body = build_request(text);
        let url = format!(
            "{GENERATE_CONTENT_BASE}/{}:generateContent?key={}",
            self.model, api_key
        );

        debug!(model = %self.model, "sending analysis request");
        let http = http_client()?;
        let response = http
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| AnalysisError::Service(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().unwrap_or_default();
            return Err(AnalysisError::Service(format!(
                "provider returned {status}: {detail}"
            )));
        }

        let envelope: GenerateContentResponse = response
            .json()
            .map_err(|e| AnalysisError::Service(format!("unreadable provider response: {e}")))?;

        let payload = extract_payload(&envelope)?;
        parse_payload(&payload)
    }
}

/// Built per call: the client stays stateless between invocations and a
/// builder failure becomes a typed error instead of a panic that would
/// also lose the request timeout.
fn http_client() -> Result<reqwest::blocking::Client, AnalysisError> {
    reqwest::blocking::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| AnalysisError::Service(format!("failed to set up HTTP client: {e}")))
}

fn build_request(text: &str) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            parts: vec![Part {
                text: teacher_prompt(text),
            }],
        }],
        generation_config: GenerationConfig {
            response_mime_type: "application/json",
            response_schema: analysis_response_schema(),
        },
    }
}

/// Pulls the JSON payload text out of the first candidate. An empty or
/// candidate-less response counts as a service failure, not validation:
/// there is nothing to validate.
fn extract_payload(envelope: &GenerateContentResponse) -> Result<String, AnalysisError> {
    envelope
        .candidates
        .first()
        .and_then(|c| c.content.parts.first())
        .map(|p| p.text.clone())
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AnalysisError::Service("no content in provider response".to_string()))
}

/// Parses the payload and enforces the `AnalysisResult` shape. A payload
/// missing any required field fails whole; there is no partial result.
fn parse_payload(payload: &str) -> Result<AnalysisResult, AnalysisError> {
    let result: AnalysisResult =
        serde_json::from_str(payload).map_err(|e| AnalysisError::Validation(e.to_string()))?;
    result
        .check_invariants()
        .map_err(AnalysisError::Validation)?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credential_fails_before_any_network_call() {
        // `analyze` must return synchronously here: the key check happens
        // before a request is even built.
        let client = AnalysisClient::new(None, None);
        assert!(!client.has_credential());
        let err = client.analyze("Hello world.").unwrap_err();
        assert!(matches!(err, AnalysisError::Configuration));
    }

    #[test]
    fn blank_credential_counts_as_missing() {
        let client = AnalysisClient::new(Some("   ".to_string()), None);
        assert!(!client.has_credential());
        let err = client.analyze("Hello world.").unwrap_err();
        assert!(matches!(err, AnalysisError::Configuration));
    }

    #[test]
    fn http_client_setup_is_fallible_not_panicking() {
        let http = http_client();
        assert!(http.is_ok());
    }

    #[test]
    fn default_model_matches_the_shipped_one() {
        let client = AnalysisClient::new(Some("key".to_string()), None);
        assert_eq!(client.model(), DEFAULT_MODEL);
        let client = AnalysisClient::new(Some("key".to_string()), Some("gemini-3-pro".to_string()));
        assert_eq!(client.model(), "gemini-3-pro");
    }

    #[test]
    fn request_body_carries_json_mime_type_and_schema() {
        let body = serde_json::to_value(build_request("She go to school everyday.")).unwrap();
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        let required = body["generationConfig"]["responseSchema"]["required"]
            .as_array()
            .unwrap();
        assert_eq!(required.len(), 4);
        let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(prompt.contains("She go to school everyday."));
    }

    #[test]
    fn extracts_payload_from_first_candidate() {
        let envelope: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "{\"ok\": true}"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_payload(&envelope).unwrap(), "{\"ok\": true}");
    }

    #[test]
    fn empty_candidates_is_a_service_error() {
        let envelope: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert!(matches!(
            extract_payload(&envelope).unwrap_err(),
            AnalysisError::Service(_)
        ));
        let envelope: GenerateContentResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert!(matches!(
            extract_payload(&envelope).unwrap_err(),
            AnalysisError::Service(_)
        ));
    }

    #[test]
    fn blank_payload_text_is_a_service_error() {
        let envelope: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "  "}]}}]}"#,
        )
        .unwrap();
        assert!(matches!(
            extract_payload(&envelope).unwrap_err(),
            AnalysisError::Service(_)
        ));
    }

    #[test]
    fn well_formed_payload_parses_exactly() {
        let payload = r#"{
            "translation": "她每天去上学。",
            "grammarPoints": [
                {"rule": "Subject-Verb Agreement", "explanation": "第三人称单数要用 goes。"}
            ],
            "phrases": [],
            "encouragement": "继续加油！"
        }"#;
        let result = parse_payload(payload).unwrap();
        assert_eq!(result.translation, "她每天去上学。");
        assert_eq!(result.grammar_points.len(), 1);
        assert!(result.phrases.is_empty());
        assert_eq!(result.encouragement, "继续加油！");
    }

    #[test]
    fn incomplete_payload_is_a_validation_error() {
        let payload = r#"{"translation": "她每天去上学。", "phrases": [], "encouragement": "加油"}"#;
        assert!(matches!(
            parse_payload(payload).unwrap_err(),
            AnalysisError::Validation(_)
        ));
    }

    #[test]
    fn non_json_payload_is_a_validation_error() {
        assert!(matches!(
            parse_payload("Sure! Here is the analysis you asked for...").unwrap_err(),
            AnalysisError::Validation(_)
        ));
    }
}
