//! Prompt assembly for every pipeline stage.
//!
//! Templates live in `prompts/` and are compiled in. Placeholders are
//! `{name}` and are substituted in a single pass, so user text or model
//! output that happens to contain `{...}` is never re-expanded.
use crate::catalog::StepDefinition;
use crate::inputs::AnalysisInputs;
use crate::pipeline::SectionResult;

// Prompt templates loaded at compile time
const SCREENSHOT: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/screenshot.md"
));
const STEP: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/prompts/step.md"));
const SUMMARY: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/prompts/summary.md"));
const SINGLE_SHOT: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/single_shot.md"
));

const PREVIOUS_HEADER: &str = "## Previous Analysis (build on this, do not repeat it):";

/// Prompt for the one-off screenshot description.
pub fn screenshot_prompt(problem_statement: &str, step_count: usize) -> String {
    render(
        SCREENSHOT,
        &[
            ("step_count", &step_count.to_string()),
            ("problem_statement", problem_statement),
        ],
    )
}

/// Prompt for one catalog step. `previous` holds only sections that have
/// already completed.
pub fn step_prompt(
    step: &StepDefinition,
    step_count: usize,
    screenshot_description: &str,
    inputs: &AnalysisInputs,
    previous: &[SectionResult],
) -> String {
    let previous_sections = if previous.is_empty() {
        String::new()
    } else {
        format!("\n{PREVIOUS_HEADER}\n{}", render_sections(previous))
    };
    render(
        STEP,
        &[
            ("step_number", &(step.id + 1).to_string()),
            ("step_count", &step_count.to_string()),
            ("screenshot_description", screenshot_description),
            ("problem_statement", &inputs.problem_statement),
            ("user_segment", &inputs.user_segment),
            ("metric_at_risk", &inputs.metric_at_risk),
            ("hypothesis", &inputs.hypothesis()),
            ("risk_level", inputs.risk_level.as_str()),
            ("previous_sections", &previous_sections),
            ("step_title", step.title),
            ("step_focus", step.focus),
        ],
    )
}

/// Prompt for the closing executive summary.
pub fn summary_prompt(sections: &[SectionResult], inputs: &AnalysisInputs) -> String {
    render(
        SUMMARY,
        &[
            ("problem_statement", &inputs.problem_statement),
            ("risk_level", inputs.risk_level.as_str()),
            ("sections", &render_sections(sections)),
        ],
    )
}

/// Prompt asking for the whole report as one JSON document.
pub fn single_shot_prompt(catalog: &[StepDefinition], inputs: &AnalysisInputs) -> String {
    let steps = catalog
        .iter()
        .map(|step| {
            format!(
                "### {}. {} ({})\n{}",
                step.id, step.title, step.subtitle, step.focus
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    render(
        SINGLE_SHOT,
        &[
            ("problem_statement", &inputs.problem_statement),
            ("user_segment", &inputs.user_segment),
            ("metric_at_risk", &inputs.metric_at_risk),
            ("hypothesis", &inputs.hypothesis()),
            ("risk_level", inputs.risk_level.as_str()),
            ("step_count", &catalog.len().to_string()),
            ("last_id", &catalog.len().saturating_sub(1).to_string()),
            ("steps", &steps),
        ],
    )
}

fn render_sections(sections: &[SectionResult]) -> String {
    sections
        .iter()
        .map(|section| format!("### {}\n{}", section.title, section.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Substitute `{name}` placeholders in one left-to-right pass. Braces that do
/// not name a known placeholder are copied through untouched.
fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len() + 1024);
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let name = &after[..close];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
