use super::stages::{call, pre_analysis, summarize, Budgets};
use super::{EventSink, PipelineContext, PipelineEvent, SectionResult, Stage};
use crate::catalog::{check_catalog, StepDefinition};
use crate::error::PipelineError;
use crate::gateway::ModelGateway;
use crate::inputs::AnalysisInputs;
use crate::prompts;

pub const PRE_ANALYSIS_LABEL: &str = "Analyzing screenshot...";
pub const SUMMARY_LABEL: &str = "Writing summary...";

/// Everything a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutcome {
    pub description: String,
    pub sections: Vec<SectionResult>,
    pub summary: String,
}

/// Run the full pipeline, reporting progress to `sink`.
///
/// Exactly one terminal event (`Done` or `Error`) is emitted last, unless the
/// sink closed mid-run, in which case the run stops before its next model
/// call and returns `PipelineError::Abandoned`.
pub fn run_pipeline<S: EventSink + ?Sized>(
    gateway: &dyn ModelGateway,
    catalog: &[StepDefinition],
    inputs: &AnalysisInputs,
    budgets: &Budgets,
    sink: &mut S,
) -> Result<PipelineOutcome, PipelineError> {
    let span = tracing::info_span!("pipeline", steps = catalog.len());
    let _guard = span.enter();

    let result = run_stages(gateway, catalog, inputs, budgets, sink);
    let terminal = match &result {
        Ok(_) => PipelineEvent::Done,
        Err(PipelineError::Abandoned) => return result,
        Err(err) => {
            tracing::warn!(kind = err.kind(), error = %err, "pipeline failed");
            PipelineEvent::Error {
                message: err.to_string(),
            }
        }
    };
    if sink.emit(terminal).is_err() {
        tracing::debug!("event receiver closed before the terminal event");
    }
    result
}

fn run_stages<S: EventSink + ?Sized>(
    gateway: &dyn ModelGateway,
    catalog: &[StepDefinition],
    inputs: &AnalysisInputs,
    budgets: &Budgets,
    sink: &mut S,
) -> Result<PipelineOutcome, PipelineError> {
    check_catalog(catalog).map_err(PipelineError::Catalog)?;
    let step_count = catalog.len();

    emit(
        sink,
        PipelineEvent::StageStarted {
            stage: Stage::PreAnalysis,
            label: PRE_ANALYSIS_LABEL.to_string(),
        },
    )?;
    let description = pre_analysis(gateway, inputs, step_count, budgets.pre_analysis)?;
    emit(
        sink,
        PipelineEvent::PreAnalysisCompleted {
            description: description.clone(),
        },
    )?;

    let mut context = PipelineContext::default();
    for step in catalog {
        emit(
            sink,
            PipelineEvent::StageStarted {
                stage: Stage::Step(step.id),
                label: step.title.to_string(),
            },
        )?;
        let prompt =
            prompts::step_prompt(step, step_count, &description, inputs, context.sections());
        let content = call(gateway, Stage::Step(step.id), &prompt, None, budgets.step)?;
        let section = SectionResult {
            id: step.id,
            title: step.title.to_string(),
            subtitle: step.subtitle.to_string(),
            content,
        };
        context.push(section.clone());
        emit(sink, PipelineEvent::StageCompleted(section))?;
    }

    emit(
        sink,
        PipelineEvent::StageStarted {
            stage: Stage::Summary,
            label: SUMMARY_LABEL.to_string(),
        },
    )?;
    let summary = summarize(gateway, context.sections(), inputs, budgets.summary)?;
    emit(
        sink,
        PipelineEvent::SummaryCompleted {
            summary: summary.clone(),
        },
    )?;

    Ok(PipelineOutcome {
        description,
        sections: context.into_sections(),
        summary,
    })
}

fn emit<S: EventSink + ?Sized>(sink: &mut S, event: PipelineEvent) -> Result<(), PipelineError> {
    sink.emit(event).map_err(|_| {
        tracing::info!("event receiver closed; abandoning run");
        PipelineError::Abandoned
    })
}
