/// LLM Client — the single point of entry for classifier calls.
///
/// Sends one job posting per request to a chat-completions deployment as an
/// `extract_info` function call and parses the function arguments back into
/// an `ExtractionResult`. Stateless across calls; no retries.
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::ClassifierConfig;
use crate::models::posting::{ExtractedAttributes, ExtractionResult, JobPosting};

pub mod prompts;

use prompts::{
    build_classify_prompt, extract_parameters_schema, CLASSIFY_SYSTEM,
    EXTRACT_FUNCTION_DESCRIPTION, EXTRACT_FUNCTION_NAME,
};

const TEMPERATURE: f64 = 0.3;
const TOP_P: f64 = 0.95;
const MAX_TOKENS: u32 = 800;
const FUNCTION_CALL_MODE: &str = "auto";

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("unexpected response envelope: {0}")]
    Envelope(serde_json::Error),

    #[error("malformed function-call arguments: {0}")]
    MalformedArguments(serde_json::Error),
}

/// Anything that can turn a posting into classified attributes.
///
/// `Ok(None)` means the model produced no extraction for this posting,
/// which callers treat as a normal outcome.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(
        &self,
        posting: &JobPosting,
    ) -> Result<Option<ExtractionResult>, ClassifierError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    top_p: f64,
    max_tokens: u32,
    functions: Vec<FunctionSpec<'a>>,
    function_call: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Debug, Serialize)]
struct ContentPart<'a> {
    #[serde(rename = "type")]
    part_type: &'a str,
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct FunctionSpec<'a> {
    name: &'a str,
    description: &'a str,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub function_call: Option<FunctionCall>,
}

#[derive(Debug, Deserialize)]
pub struct FunctionCall {
    /// JSON-encoded object; needs a second parse.
    pub arguments: String,
}

/// Token accounting; only logged, so every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Usage {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
}

impl ChatResponse {
    /// Arguments of the first choice's function call, if the model made one.
    pub fn function_arguments(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.function_call.as_ref())
            .map(|f| f.arguments.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// HTTP client for the classification deployment.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl LlmClient {
    pub fn new(config: &ClassifierConfig) -> Result<Self, ClassifierError> {
        Ok(Self {
            client: Client::builder().timeout(config.timeout).build()?,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Makes a raw extraction call, returning the full response envelope.
    /// Transport failures and non-2xx statuses are errors.
    pub async fn call(
        &self,
        description: &str,
        seniority: &str,
        employment_type: &str,
        title: &str,
        company_name: &str,
    ) -> Result<ChatResponse, ClassifierError> {
        let prompt =
            build_classify_prompt(title, description, seniority, employment_type, company_name);
        let request_body = ChatRequest {
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: vec![ContentPart {
                        part_type: "text",
                        text: CLASSIFY_SYSTEM,
                    }],
                },
                ChatMessage {
                    role: "user",
                    content: vec![ContentPart {
                        part_type: "text",
                        text: &prompt,
                    }],
                },
            ],
            temperature: TEMPERATURE,
            top_p: TOP_P,
            max_tokens: MAX_TOKENS,
            functions: vec![FunctionSpec {
                name: EXTRACT_FUNCTION_NAME,
                description: EXTRACT_FUNCTION_DESCRIPTION,
                parameters: extract_parameters_schema(),
            }],
            function_call: FUNCTION_CALL_MODE,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(ClassifierError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: ChatResponse =
            serde_json::from_str(&body).map_err(ClassifierError::Envelope)?;

        if let Some(usage) = &envelope.usage {
            debug!(
                prompt_tokens = ?usage.prompt_tokens,
                completion_tokens = ?usage.completion_tokens,
                "Classifier call succeeded"
            );
        }

        Ok(envelope)
    }
}

#[async_trait]
impl Classifier for LlmClient {
    async fn classify(
        &self,
        posting: &JobPosting,
    ) -> Result<Option<ExtractionResult>, ClassifierError> {
        let envelope = self
            .call(
                &posting.description,
                &posting.seniority,
                &posting.employment_type,
                &posting.title,
                &posting.company_name,
            )
            .await?;

        let Some(arguments) = envelope.function_arguments() else {
            debug!(title = %posting.title, "classifier returned no function call");
            return Ok(None);
        };

        let attributes = parse_arguments(arguments)?;
        Ok(Some(ExtractionResult::from_parts(attributes, posting)))
    }
}

/// Second parse step: the function-call arguments are themselves JSON.
pub fn parse_arguments(arguments: &str) -> Result<ExtractedAttributes, ClassifierError> {
    serde_json::from_str(strip_json_fences(arguments)).map_err(ClassifierError::MalformedArguments)
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}
