//! HTTP intent classifier
//!
//! Model-agnostic client for LLM-backed classification. Supports both
//! Anthropic and OpenAI-compatible APIs. The model only classifies: it
//! emits an intent/action/confidence tuple plus extracted parameters, and
//! never drives execution directly.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::core::error::{PilotError, Result};
use crate::oracle::context::SheetContext;
use crate::oracle::{Classification, IntentOracle};

/// API format type.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiFormat {
    Anthropic,
    OpenAI,
}

/// HTTP classifier backed by an LLM API.
pub struct HttpOracle {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
    api_format: ApiFormat,
}

impl HttpOracle {
    pub fn new(api_key: String, api_url: String, model: String) -> Self {
        let api_format = Self::detect_api_format(&api_url);
        Self {
            client: Client::new(),
            api_key,
            api_url,
            model,
            api_format,
        }
    }

    fn detect_api_format(url: &str) -> ApiFormat {
        if url.contains("anthropic.com") {
            ApiFormat::Anthropic
        } else {
            ApiFormat::OpenAI
        }
    }

    /// Create a client from environment variables.
    ///
    /// Required: SHEETPILOT_ORACLE_API_KEY
    /// Optional: SHEETPILOT_ORACLE_API_URL (defaults to the Anthropic API)
    /// Optional: SHEETPILOT_ORACLE_MODEL
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("SHEETPILOT_ORACLE_API_KEY")
            .map_err(|_| PilotError::OracleUnavailable("SHEETPILOT_ORACLE_API_KEY not set".into()))?;
        let api_url = std::env::var("SHEETPILOT_ORACLE_API_URL")
            .unwrap_or_else(|_| "https://api.anthropic.com/v1/messages".into());
        let model = std::env::var("SHEETPILOT_ORACLE_MODEL")
            .unwrap_or_else(|_| "claude-3-haiku-20240307".into());

        Ok(Self::new(api_key, api_url, model))
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        match self.api_format {
            ApiFormat::Anthropic => self.complete_anthropic(system, user).await,
            ApiFormat::OpenAI => self.complete_openai(system, user).await,
        }
    }

    async fn complete_anthropic(&self, system: &str, user: &str) -> Result<String> {
        let request = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: 1024,
            system: system.into(),
            messages: vec![Message {
                role: "user".into(),
                content: user.into(),
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| PilotError::OracleUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(PilotError::OracleUnavailable(format!(
                "API error: {}",
                error_text
            )));
        }

        let completion: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| PilotError::OracleUnavailable(e.to_string()))?;

        completion
            .content
            .first()
            .map(|c| c.text.clone())
            .ok_or_else(|| PilotError::OracleUnavailable("Empty response".into()))
    }

    async fn complete_openai(&self, system: &str, user: &str) -> Result<String> {
        let request = OpenAIRequest {
            model: self.model.clone(),
            max_tokens: 1024,
            messages: vec![
                Message {
                    role: "system".into(),
                    content: system.into(),
                },
                Message {
                    role: "user".into(),
                    content: user.into(),
                },
            ],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| PilotError::OracleUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(PilotError::OracleUnavailable(format!(
                "API error: {}",
                error_text
            )));
        }

        let completion: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| PilotError::OracleUnavailable(e.to_string()))?;

        completion
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| PilotError::OracleUnavailable("Empty response".into()))
    }
}

#[async_trait]
impl IntentOracle for HttpOracle {
    async fn classify(&self, text: &str, context: &SheetContext) -> Result<Classification> {
        let user_prompt = format!(
            "CONTEXT:\n{}\n\nUSER COMMAND:\n{}\n\nClassify this command into JSON:",
            context.summary(),
            text
        );

        let response = self.complete(CLASSIFY_SYSTEM_PROMPT, &user_prompt).await?;
        let json_str = extract_json(&response)?;

        serde_json::from_str(json_str).map_err(|e| {
            PilotError::OracleUnavailable(format!(
                "Failed to parse classification: {} - Response: {}",
                e, response
            ))
        })
    }
}

/// Extract a JSON object from an LLM response (handles surrounding text
/// and markdown fences).
fn extract_json(response: &str) -> Result<&str> {
    let start = response
        .find('{')
        .ok_or_else(|| PilotError::OracleUnavailable("No JSON found in response".into()))?;
    let end = response
        .rfind('}')
        .ok_or_else(|| PilotError::OracleUnavailable("No closing brace in response".into()))?;
    Ok(&response[start..=end])
}

/// System prompt for command classification.
const CLASSIFY_SYSTEM_PROMPT: &str = r#"You are classifying user commands for a spreadsheet assistant.
Convert natural language commands into structured JSON.

AVAILABLE INTENTS:
- freeze_operation: freeze or unfreeze rows/columns
- range_operation: format, merge, clear, or style a cell range
- row_operation: insert, delete, hide, or show rows
- column_operation: insert, delete, hide, or show columns
- table_operation: sort, filter, split text, remove duplicates, find and replace
- conditional_format: highlight cells by rule (duplicates, thresholds, text)
- hyperlink_operation: add or remove hyperlinks
- data_validation: dropdowns, number ranges, date validation
- comment_operation: add or remove cell notes
- image_operation: insert images into cells
- named_range_operation: create, delete, rename, or list named ranges
- analysis_query: answer questions about the data
- chart_request: build a chart or visualization
- workspace_insight: summarize or audit the whole workspace
- general_query: anything else the data can answer

Pick an action in snake_case describing the specific operation (for example
delete_columns_multiple, apply_bold, highlight_duplicates, freeze_rows).
Extract parameters such as "range" ("A1:C3"), "columns" (["D", "E"]),
"count", "color", "url", "find", "replace".

OUTPUT FORMAT (JSON only, no explanation):
{
  "intent": "intent_name",
  "action": "action_name",
  "confidence": 0.0-1.0,
  "target": {"identifier": "range/column/name"} or null,
  "parameters": {}
}

Examples:
"make A1:B2 bold" -> {"intent": "range_operation", "action": "apply_bold", "confidence": 0.95, "target": {"identifier": "A1:B2"}, "parameters": {"range": "A1:B2"}}
"delete column D and E" -> {"intent": "column_operation", "action": "delete_columns_multiple", "confidence": 0.9, "target": null, "parameters": {"columns": ["D", "E"]}}
"what was our best month" -> {"intent": "analysis_query", "action": "answer_question", "confidence": 0.85, "target": null, "parameters": {}}
"highlight duplicates in column C" -> {"intent": "conditional_format", "action": "highlight_duplicates", "confidence": 0.9, "target": {"identifier": "C"}, "parameters": {"column": "C"}}
"#;

// Anthropic API format.
#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    text: String,
}

// OpenAI-compatible API format.
#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

// Shared.
#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}
