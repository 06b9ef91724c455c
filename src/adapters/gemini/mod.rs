//! Gemini adapter: remote narrative generation over the `generateContent` API.
//!
//! One blocking POST per evaluation, bounded by the configured timeout. Any
//! failure is returned as a [`NarrativeError`] and the caller falls back to the
//! local template.

use reqwest::blocking::Client;
use reqwest::Url;
use serde_json::{json, Value};

use crate::adapters::sanitize::sanitize;
use crate::config::{GeminiConfig, GENERATION_MAX_OUTPUT_TOKENS, GENERATION_TEMPERATURE};
use crate::domain::NarrativeOrigin;
use crate::ports::{NarrativeError, NarrativeRequest, NarrativeSource};

/// Error bodies are cut to this many characters.
const MAX_ERROR_BODY_CHARS: usize = 320;

const SYSTEM_INSTRUCTION: &str = "You are a virtual cardiologist. Your goal is to provide a concise, professional and structured clinical analysis. Format your answer as an HTML fragment (without <html>/<body> tags) with three main sections using <p> tags with <strong>bold</strong> text and line breaks (<br>):
1. **RISK ANALYSIS**: Assess the percentage probability.
2. **KEY FACTORS**: Name the 2 to 3 most critical parameters (e.g. high cholesterol, angina, narrowed vessels) that drive the result.
3. **CLINICAL RECOMMENDATION**: Give a clear medical recommendation based on the risk level (e.g. annual check-up, immediate consultation, diet adjustment).
Make sure the output is a single valid HTML string.";

/// Remote narrative source backed by the Gemini API.
pub struct GeminiNarrative {
    client: Client,
    url: Url,
    model: String,
}

impl GeminiNarrative {
    /// Build a client for the configured endpoint.
    ///
    /// # Errors
    /// Returns `NarrativeError::Transport` if the endpoint is not a valid URL
    /// or the HTTP client cannot be created.
    pub fn new(config: &GeminiConfig) -> Result<Self, NarrativeError> {
        let url = resolve_endpoint(&config.endpoint, &config.model, &config.api_key)?;
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| NarrativeError::Transport(sanitize(&e.to_string())))?;

        tracing::info!(
            "Remote narrative enabled (model={}, timeout={}s)",
            config.model,
            config.timeout.as_secs()
        );

        Ok(Self {
            client,
            url,
            model: config.model.clone(),
        })
    }

    /// Model name requests are sent to.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl NarrativeSource for GeminiNarrative {
    fn origin(&self) -> NarrativeOrigin {
        NarrativeOrigin::Remote
    }

    fn generate(&self, request: &NarrativeRequest<'_>) -> Result<String, NarrativeError> {
        let payload = build_payload(request);

        let response = self
            .client
            .post(self.url.clone())
            .json(&payload)
            .send()
            .map_err(|e| NarrativeError::Transport(sanitize(&e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(NarrativeError::Status {
                status: status.as_u16(),
                body: truncate(&sanitize(&body), MAX_ERROR_BODY_CHARS),
            });
        }

        let body: Value = response
            .json()
            .map_err(|e| NarrativeError::MalformedResponse(sanitize(&e.to_string())))?;

        extract_text(&body)
    }
}

/// Build the request URL from a base endpoint, or accept a full
/// `...:generateContent` URL as is. The key is appended unless present.
fn resolve_endpoint(endpoint: &str, model: &str, api_key: &str) -> Result<Url, NarrativeError> {
    let mut url = if endpoint.contains(":generateContent") {
        Url::parse(endpoint).map_err(|e| {
            NarrativeError::Transport(format!("invalid endpoint {}: {e}", sanitize(endpoint)))
        })?
    } else {
        let base = endpoint.trim_end_matches('/');
        let generated = format!("{base}/v1beta/models/{model}:generateContent");
        Url::parse(&generated)
            .map_err(|e| NarrativeError::Transport(format!("invalid endpoint {generated}: {e}")))?
    };

    if !url.query_pairs().any(|(k, _)| k == "key") {
        url.query_pairs_mut().append_pair("key", api_key);
    }

    Ok(url)
}

fn user_message(request: &NarrativeRequest<'_>) -> String {
    let mut message = format!(
        "Analyze the following clinical parameters with a predicted risk of {}% (Level: {}):\n\n",
        request.percentage(),
        request.risk_level.to_string().to_uppercase()
    );
    for (label, value) in request.record.describe() {
        message.push_str(&format!("- {label}: {value}\n"));
    }
    message
}

fn build_payload(request: &NarrativeRequest<'_>) -> Value {
    json!({
        "contents": [
            {
                "parts": [
                    {
                        "text": user_message(request)
                    }
                ]
            }
        ],
        "systemInstruction": {
            "parts": [
                {
                    "text": SYSTEM_INSTRUCTION
                }
            ]
        },
        "generationConfig": {
            "temperature": GENERATION_TEMPERATURE,
            "maxOutputTokens": GENERATION_MAX_OUTPUT_TOKENS
        }
    })
}

/// Join the text parts of the first candidate. Blank output is an error.
fn extract_text(body: &Value) -> Result<String, NarrativeError> {
    let parts = body["candidates"]
        .as_array()
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate["content"]["parts"].as_array())
        .ok_or_else(|| NarrativeError::MalformedResponse("no candidate content".to_string()))?;

    let text = parts
        .iter()
        .filter_map(|part| part["text"].as_str())
        .collect::<Vec<_>>()
        .join("\n");

    let text = text.trim();
    if text.is_empty() {
        return Err(NarrativeError::MalformedResponse(
            "candidate text is empty".to_string(),
        ));
    }
    Ok(text.to_string())
}

fn truncate(value: &str, max_chars: usize) -> String {
    let mut chars = value.chars();
    let truncated: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{truncated}...")
    } else {
        truncated
    }
}
