use super::{SectionResult, Stage};
use crate::error::PipelineError;
use crate::gateway::{GenerateRequest, ModelGateway};
use crate::inputs::{AnalysisInputs, ImageAttachment};
use crate::prompts;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Output token budgets per stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Budgets {
    pub pre_analysis: u32,
    pub step: u32,
    pub summary: u32,
    pub single_shot: u32,
}

impl Default for Budgets {
    fn default() -> Self {
        Self {
            pre_analysis: 1500,
            step: 2000,
            summary: 600,
            single_shot: 16000,
        }
    }
}

/// Describe the screenshot once; the text becomes context for every step.
pub fn pre_analysis(
    gateway: &dyn ModelGateway,
    inputs: &AnalysisInputs,
    step_count: usize,
    budget: u32,
) -> Result<String, PipelineError> {
    let prompt = prompts::screenshot_prompt(&inputs.problem_statement, step_count);
    call(gateway, Stage::PreAnalysis, &prompt, Some(&inputs.image), budget)
}

/// Closing synthesis over every completed section.
pub fn summarize(
    gateway: &dyn ModelGateway,
    sections: &[SectionResult],
    inputs: &AnalysisInputs,
    budget: u32,
) -> Result<String, PipelineError> {
    let prompt = prompts::summary_prompt(sections, inputs);
    call(gateway, Stage::Summary, &prompt, None, budget)
}

/// One gateway call, tagged with its stage for logs and errors.
pub(crate) fn call(
    gateway: &dyn ModelGateway,
    stage: Stage,
    prompt: &str,
    image: Option<&ImageAttachment>,
    max_output_tokens: u32,
) -> Result<String, PipelineError> {
    let request = GenerateRequest {
        prompt,
        image,
        max_output_tokens,
    };
    let start = Instant::now();
    tracing::debug!(%stage, prompt_bytes = prompt.len(), max_output_tokens, "stage call");
    let text = gateway
        .generate(&request)
        .map_err(|source| PipelineError::Gateway { stage, source })?;
    tracing::info!(
        %stage,
        elapsed_ms = start.elapsed().as_millis() as u64,
        response_bytes = text.len(),
        "stage complete"
    );
    Ok(text)
}
