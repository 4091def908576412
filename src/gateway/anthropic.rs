//! Anthropic Messages API client over `ureq`.
use super::{GenerateRequest, ModelGateway};
use crate::config::PxoConfig;
use crate::error::GatewayError;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};

/// Blocking client for `POST /v1/messages`.
pub struct AnthropicGateway {
    agent: ureq::Agent,
    api_url: String,
    api_key: String,
    api_version: String,
    model: String,
}

impl AnthropicGateway {
    pub fn new(config: &PxoConfig, api_key: String) -> Result<Self, GatewayError> {
        if api_key.trim().is_empty() {
            return Err(GatewayError::MissingApiKey);
        }
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .http_status_as_error(false)
            .build()
            .into();
        Ok(Self {
            agent,
            api_url: config.api_url.clone(),
            api_key,
            api_version: config.anthropic_version.clone(),
            model: config.model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl ModelGateway for AnthropicGateway {
    fn generate(&self, request: &GenerateRequest<'_>) -> Result<String, GatewayError> {
        request.validate()?;
        let body = build_request_body(&self.model, request);
        let start = Instant::now();
        let mut response = self
            .agent
            .post(self.api_url.as_str())
            .header("x-api-key", self.api_key.as_str())
            .header("anthropic-version", self.api_version.as_str())
            .send_json(&body)
            .map_err(|err| GatewayError::Transport(err.to_string()))?;
        let status = response.status().as_u16();
        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|err| GatewayError::Transport(format!("read response body: {err}")))?;

        tracing::info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            status,
            prompt_bytes = request.prompt.len(),
            with_image = request.image.is_some(),
            response_bytes = text.len(),
            "model call complete"
        );

        parse_response(status, &text)
    }
}

/// Build the Messages API body. The image block, when present, precedes the
/// text block.
fn build_request_body(model: &str, request: &GenerateRequest<'_>) -> Value {
    let mut content = Vec::with_capacity(2);
    if let Some(image) = request.image {
        content.push(json!({
            "type": "image",
            "source": {
                "type": "base64",
                "media_type": image.media_type.as_mime(),
                "data": base64::engine::general_purpose::STANDARD.encode(&image.bytes),
            }
        }));
    }
    content.push(json!({ "type": "text", "text": request.prompt }));
    json!({
        "model": model,
        "max_tokens": request.max_output_tokens,
        "messages": [{ "role": "user", "content": content }],
    })
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    message: String,
}

/// Interpret a response: only a text first content block is accepted.
fn parse_response(status: u16, text: &str) -> Result<String, GatewayError> {
    if !(200..300).contains(&status) {
        let message = match serde_json::from_str::<ErrorEnvelope>(text) {
            Ok(envelope) => match envelope.error.kind {
                Some(kind) => format!("{kind}: {}", envelope.error.message),
                None => envelope.error.message,
            },
            Err(_) => crate::util::truncate_string(text.trim(), 500),
        };
        return Err(GatewayError::Upstream { status, message });
    }
    let parsed: MessagesResponse = serde_json::from_str(text).map_err(|err| {
        GatewayError::UnexpectedResponse(format!("response is not a message object: {err}"))
    })?;
    let first = parsed
        .content
        .into_iter()
        .next()
        .ok_or_else(|| GatewayError::UnexpectedResponse("no content blocks".to_string()))?;
    match (first.kind.as_str(), first.text) {
        ("text", Some(text)) => Ok(text),
        (kind, _) => Err(GatewayError::UnexpectedResponse(format!(
            "first content block is {kind:?}, expected text"
        ))),
    }
}
