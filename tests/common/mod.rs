//! Shared test infrastructure for integration tests.
#![allow(dead_code)]

use pxo::error::GatewayError;
use pxo::gateway::{GenerateRequest, ModelGateway};
use pxo::inputs::{AnalysisInputs, RawForm, RawImage};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::Mutex;

/// Smallest byte prefix every PNG decoder recognizes.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// The brief used throughout: checkout abandonment for new users.
pub fn sample_form() -> RawForm {
    RawForm {
        image: Some(RawImage {
            bytes: PNG_SIGNATURE.to_vec(),
            content_type: Some("image/png".to_string()),
        }),
        problem_statement: Some("Users abandon checkout".to_string()),
        user_segment: Some("new users".to_string()),
        metric_at_risk: Some("conversion".to_string()),
        risk_level: Some("High".to_string()),
        ..RawForm::default()
    }
}

pub fn sample_inputs() -> AnalysisInputs {
    AnalysisInputs::from_form(sample_form()).expect("sample inputs are valid")
}

/// Deterministic gateway keyed on prompt content: `DESC` for the screenshot,
/// `STEP_<id>` for each step and `SUM` for the summary. Optionally fails the
/// step with id `fail_at`.
#[derive(Debug, Default)]
pub struct StubGateway {
    fail_at: Option<usize>,
    prompts: Mutex<Vec<String>>,
}

impl StubGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_at(step_id: usize) -> Self {
        Self {
            fail_at: Some(step_id),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Every prompt received, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompts lock").clone()
    }
}

impl ModelGateway for StubGateway {
    fn generate(&self, request: &GenerateRequest<'_>) -> Result<String, GatewayError> {
        self.prompts
            .lock()
            .expect("prompts lock")
            .push(request.prompt.to_string());
        if request.prompt.contains("executive summary") {
            return Ok("SUM".to_string());
        }
        match step_number(request.prompt) {
            Some(number) => {
                let id = number - 1;
                if self.fail_at == Some(id) {
                    return Err(GatewayError::Upstream {
                        status: 529,
                        message: "overloaded".to_string(),
                    });
                }
                Ok(format!("STEP_{id}"))
            }
            None => Ok("DESC".to_string()),
        }
    }
}

/// Read N out of "This is step N of".
fn step_number(prompt: &str) -> Option<usize> {
    let rest = prompt.split("This is step ").nth(1)?;
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Replies for a full successful run over `step_count` steps.
pub fn replay_texts(step_count: usize) -> Vec<String> {
    let mut texts = vec!["DESC".to_string()];
    texts.extend((0..step_count).map(|id| format!("STEP_{id}")));
    texts.push("SUM".to_string());
    texts
}

pub fn write_png(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, PNG_SIGNATURE).expect("write png");
    path
}

pub fn write_replay(dir: &Path, replies: &serde_json::Value) -> PathBuf {
    let path = dir.join("replay.json");
    std::fs::write(&path, replies.to_string()).expect("write replay");
    path
}

/// Run the built `pxo` binary with a clean key environment.
pub fn run_pxo(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pxo"))
        .args(args)
        .env_remove("PXO_API_KEY")
        .env_remove("ANTHROPIC_API_KEY")
        .env_remove("PXO_CONFIG")
        .env("RUST_LOG", "warn")
        .output()
        .expect("run pxo")
}
