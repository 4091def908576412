//! Blocking delivery: the whole report as one JSON document.
//!
//! `sequential` drives the same runner as the event stream and throws the
//! progress events away. `single-shot` asks the model for the entire document
//! in one call and is all-or-nothing.
use crate::catalog::StepDefinition;
use crate::error::{FormatError, PipelineError};
use crate::gateway::ModelGateway;
use crate::inputs::AnalysisInputs;
use crate::pipeline::{
    self, run_pipeline, Budgets, EventSink, PipelineEvent, SectionResult, SinkClosed, Stage,
};
use crate::prompts;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The blocking-mode success document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub summary: String,
    pub sections: Vec<SectionResult>,
}

/// The blocking-mode failure document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDocument {
    pub error: String,
    pub kind: &'static str,
}

impl ErrorDocument {
    pub fn new(kind: &'static str, error: impl fmt::Display) -> Self {
        Self {
            error: error.to_string(),
            kind,
        }
    }
}

/// How a blocking request produces its report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// One call per step, each building on the previous sections.
    #[default]
    Sequential,
    /// One call for the whole document.
    SingleShot,
}

/// Drops progress events; blocking callers only want the final document.
struct DiscardEvents;

impl EventSink for DiscardEvents {
    fn emit(&mut self, _event: PipelineEvent) -> Result<(), SinkClosed> {
        Ok(())
    }
}

/// Produce the full report without incremental delivery.
pub fn build_report(
    gateway: &dyn ModelGateway,
    catalog: &[StepDefinition],
    inputs: &AnalysisInputs,
    budgets: &Budgets,
    strategy: Strategy,
) -> Result<AnalysisReport, PipelineError> {
    match strategy {
        Strategy::Sequential => {
            let outcome = run_pipeline(gateway, catalog, inputs, budgets, &mut DiscardEvents)?;
            Ok(AnalysisReport {
                summary: outcome.summary,
                sections: outcome.sections,
            })
        }
        Strategy::SingleShot => {
            crate::catalog::check_catalog(catalog).map_err(PipelineError::Catalog)?;
            let prompt = prompts::single_shot_prompt(catalog, inputs);
            let text = pipeline::call(
                gateway,
                Stage::SingleShot,
                &prompt,
                Some(&inputs.image),
                budgets.single_shot,
            )?;
            let report = parse_single_shot(&text, catalog).inspect_err(|err| {
                tracing::warn!(error = %err, response_bytes = text.len(), "single-shot report unreadable");
            })?;
            Ok(report)
        }
    }
}

/// Read a single-shot response, tolerating code fences and surrounding prose.
fn parse_single_shot(
    text: &str,
    catalog: &[StepDefinition],
) -> Result<AnalysisReport, FormatError> {
    let mut report = read_document(text).map_err(|err| {
        FormatError::InvalidJson(format!(
            "{err}; first 200 chars: {}",
            crate::util::truncate_string(text, 200)
        ))
    })?;
    if report.summary.trim().is_empty() {
        return Err(FormatError::EmptySummary);
    }
    if report.sections.len() != catalog.len() {
        return Err(FormatError::SectionMismatch(format!(
            "expected {} sections, got {}",
            catalog.len(),
            report.sections.len()
        )));
    }
    for (section, step) in report.sections.iter_mut().zip(catalog) {
        if section.id != step.id {
            return Err(FormatError::SectionMismatch(format!(
                "expected section id {} at position {}, got {}",
                step.id, step.id, section.id
            )));
        }
        if section.content.trim().is_empty() {
            return Err(FormatError::SectionMismatch(format!(
                "section {} has no content",
                step.id
            )));
        }
        // Catalog titles are canonical; models tend to paraphrase them.
        section.title = step.title.to_string();
        section.subtitle = step.subtitle.to_string();
    }
    Ok(report)
}

/// Parse the document as sent, then unwrapped from an outer code fence, then
/// as the outermost brace span. Section content is markdown and may carry
/// its own fences, so unwrapping is only a fallback. The error reported is
/// the one from the document as sent.
fn read_document(text: &str) -> Result<AnalysisReport, serde_json::Error> {
    let trimmed = text.trim();
    let direct = serde_json::from_str(trimmed);
    if direct.is_ok() {
        return direct;
    }
    fence_body(trimmed)
        .into_iter()
        .chain(brace_span(trimmed))
        .find_map(|candidate| serde_json::from_str::<AnalysisReport>(candidate).ok())
        .map_or(direct, Ok)
}

/// Body of a response wrapped whole in a code fence. The info line after the
/// opening backticks is dropped and the last fence closes, so fences inside
/// section content stay intact.
fn fence_body(text: &str) -> Option<&str> {
    let after_open = text.strip_prefix("```")?;
    let body = &after_open[after_open.find('\n')? + 1..];
    let close = body.rfind("```")?;
    Some(body[..close].trim())
}

fn brace_span(text: &str) -> Option<&str> {
    let open = text.find('{')?;
    let close = text.rfind('}')?;
    if open < close {
        Some(&text[open..=close])
    } else {
        None
    }
}
