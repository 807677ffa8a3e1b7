//! Google Gemini `generateContent` client.
//!
//! Requests ask for a JSON reply constrained by a response schema; the reply
//! text is still decoded strictly by the caller-facing functions in the parent
//! module. Calls block the current thread for at most the configured timeout.

use std::time::Duration;

use chrono::{DateTime, Local};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{decode_parsed_task, decode_subtasks, ParsedTask, SubtaskGenerator, TaskParser};
use crate::error::AiError;
use crate::fields::Priority;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        GeminiConfig {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Blocking Gemini client implementing both collaborator roles.
#[derive(Clone)]
pub struct GeminiClient {
    config: GeminiConfig,
    agent: ureq::Agent,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(config.timeout).build();
        Self { config, agent }
    }

    fn api_key(&self) -> Result<&str, AiError> {
        self.config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(AiError::MissingCredential)
    }

    /// Send one request and return the reply text.
    fn generate(&self, body: &Value) -> Result<String, AiError> {
        let key = self.api_key()?;
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );
        tracing::debug!(model = %self.config.model, "calling generateContent");

        let response = match self
            .agent
            .post(&url)
            .set("x-goog-api-key", key)
            .send_json(body.clone())
        {
            Ok(response) => response,
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                return Err(AiError::Api { status, body });
            }
            Err(e) => return Err(AiError::Network(e.to_string())),
        };

        let text = response
            .into_string()
            .map_err(|e| AiError::Network(format!("Failed to read response: {}", e)))?;
        extract_text(&text)
    }
}

/// Pull the generated text out of a `generateContent` reply.
fn extract_text(payload: &str) -> Result<String, AiError> {
    let response: GenerateContentResponse = serde_json::from_str(payload)?;
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(AiError::EmptyResponse);
    }
    Ok(text)
}

fn parse_request(input: &str, now: DateTime<Local>) -> Value {
    let instruction = format!(
        "You are a task parsing assistant. Extract task details from the user's text. \
         Resolve relative dates such as \"tomorrow\" or \"next friday\" into ISO 8601 \
         timestamps using the current date. If no priority is given, use MEDIUM. \
         If no date is implied, return null for dueDate. Keep the title concise and \
         write it in the language of the input. Today is {}.",
        now.to_rfc3339()
    );
    json!({
        "systemInstruction": { "parts": [{ "text": instruction }] },
        "contents": [{ "role": "user", "parts": [{ "text": input }] }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "OBJECT",
                "properties": {
                    "title": { "type": "STRING", "description": "A concise title for the task" },
                    "description": { "type": "STRING", "description": "Any additional details mentioned" },
                    "priority": {
                        "type": "STRING",
                        "enum": [Priority::Low.as_str(), Priority::Medium.as_str(), Priority::High.as_str()]
                    },
                    "dueDate": { "type": "STRING", "nullable": true, "description": "ISO 8601 timestamp or null" }
                },
                "required": ["title", "priority"]
            }
        }
    })
}

fn subtasks_request(title: &str, description: Option<&str>) -> Value {
    let prompt = format!(
        "Break down the following task into 3-5 short actionable subtasks.\n\
         Task: {}\n\
         Details: {}\n\
         Answer in the language of the task. Return only a JSON array of strings.",
        title,
        description.filter(|d| !d.trim().is_empty()).unwrap_or("None")
    );
    json!({
        "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": { "type": "ARRAY", "items": { "type": "STRING" } }
        }
    })
}

impl TaskParser for GeminiClient {
    fn parse_task(&self, input: &str, now: DateTime<Local>) -> Result<ParsedTask, AiError> {
        let text = self.generate(&parse_request(input, now))?;
        decode_parsed_task(&text)
    }
}

impl SubtaskGenerator for GeminiClient {
    fn generate_subtasks(&self, title: &str, description: Option<&str>) -> Result<Vec<String>, AiError> {
        let text = self.generate(&subtasks_request(title, description))?;
        decode_subtasks(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline(api_key: Option<&str>) -> GeminiClient {
        GeminiClient::new(GeminiConfig {
            api_key: api_key.map(str::to_string),
            // Discard port; nothing should ever be sent here.
            base_url: "http://127.0.0.1:9".into(),
            timeout: Duration::from_millis(200),
            ..Default::default()
        })
    }

    #[test]
    fn test_missing_credential_fails_before_network() {
        for key in [None, Some(""), Some("   ")] {
            let client = offline(key);
            assert!(matches!(
                client.parse_task("buy milk", Local::now()),
                Err(AiError::MissingCredential)
            ));
            assert!(matches!(
                client.generate_subtasks("buy milk", None),
                Err(AiError::MissingCredential)
            ));
        }
    }

    #[test]
    fn test_extract_text() {
        let payload = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "[\"a\","}, {"text": "\"b\"]"}]},
                "finishReason": "STOP"
            }]
        }"#;
        assert_eq!(extract_text(payload).unwrap(), r#"["a","b"]"#);
        assert!(matches!(extract_text(r#"{"candidates": []}"#), Err(AiError::EmptyResponse)));
        assert!(matches!(extract_text(r#"{"promptFeedback": {}}"#), Err(AiError::EmptyResponse)));
        assert!(matches!(extract_text("<html>"), Err(AiError::Schema(_))));
    }

    #[test]
    fn test_parse_request_carries_input_and_date() {
        let now = Local::now();
        let body = parse_request("report by friday", now);
        assert_eq!(body["contents"][0]["parts"][0]["text"], "report by friday");
        let instruction = body["systemInstruction"]["parts"][0]["text"].as_str().unwrap();
        assert!(instruction.contains(&now.to_rfc3339()));
        assert_eq!(body["generationConfig"]["responseSchema"]["required"][0], "title");
    }

    #[test]
    fn test_subtasks_request_mentions_task() {
        let body = subtasks_request("Plan trip", None);
        let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(prompt.contains("Task: Plan trip"));
        assert!(prompt.contains("Details: None"));
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "ARRAY");
    }
}
