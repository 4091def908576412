//! Model gateway: "generate text for a prompt and optional image, or fail".
//!
//! The pipeline only ever talks to `ModelGateway`. The production
//! implementation calls the Anthropic Messages API; the scripted one replays
//! canned replies for offline runs and tests.
use crate::error::GatewayError;
use crate::inputs::ImageAttachment;

mod anthropic;
mod scripted;

pub use anthropic::AnthropicGateway;
pub use scripted::{RecordedCall, ScriptedGateway, ScriptedReply};

/// One model call.
#[derive(Debug, Clone, Copy)]
pub struct GenerateRequest<'a> {
    pub prompt: &'a str,
    pub image: Option<&'a ImageAttachment>,
    pub max_output_tokens: u32,
}

impl GenerateRequest<'_> {
    /// Reject requests no upstream could answer.
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.prompt.trim().is_empty() {
            return Err(GatewayError::InvalidRequest("prompt is empty".to_string()));
        }
        if self.max_output_tokens == 0 {
            return Err(GatewayError::InvalidRequest(
                "max_output_tokens must be positive".to_string(),
            ));
        }
        if matches!(self.image, Some(image) if image.bytes.is_empty()) {
            return Err(GatewayError::InvalidRequest("image is empty".to_string()));
        }
        Ok(())
    }
}

/// Stateless text generation capability. Implementations must not retry on
/// behalf of the pipeline.
pub trait ModelGateway: Send + Sync {
    fn generate(&self, request: &GenerateRequest<'_>) -> Result<String, GatewayError>;
}

impl<F> ModelGateway for F
where
    F: Fn(&GenerateRequest<'_>) -> Result<String, GatewayError> + Send + Sync,
{
    fn generate(&self, request: &GenerateRequest<'_>) -> Result<String, GatewayError> {
        request.validate()?;
        self(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_prompt_is_rejected_before_the_call() {
        let gateway = |_: &GenerateRequest<'_>| -> Result<String, GatewayError> {
            panic!("closure gateway must not be reached")
        };
        let request = GenerateRequest {
            prompt: "   ",
            image: None,
            max_output_tokens: 10,
        };
        assert!(matches!(
            gateway.generate(&request),
            Err(GatewayError::InvalidRequest(_))
        ));
    }

    #[test]
    fn closure_gateway_sees_request() {
        let gateway = |request: &GenerateRequest<'_>| -> Result<String, GatewayError> {
            Ok(format!("{}:{}", request.prompt, request.max_output_tokens))
        };
        let request = GenerateRequest {
            prompt: "hi",
            image: None,
            max_output_tokens: 7,
        };
        assert_eq!(gateway.generate(&request).expect("generate"), "hi:7");
    }
}
