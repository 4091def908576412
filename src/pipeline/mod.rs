//! Sequential, context-accumulating PXO pipeline.
//!
//! Screenshot pre-analysis runs once, then every catalog step runs in order
//! with all earlier sections embedded in its prompt, then a closing summary.
//! Progress goes out through an `EventSink` as it happens.
mod events;
mod runner;
mod stages;

pub use events::{EventSink, PipelineEvent, SinkClosed};
pub use runner::{run_pipeline, PipelineOutcome, PRE_ANALYSIS_LABEL, SUMMARY_LABEL};
pub use stages::{pre_analysis, summarize, Budgets};
pub(crate) use stages::call;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which part of the pipeline an event or failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    PreAnalysis,
    Step(usize),
    Summary,
    /// The one-call report strategy; never reported as a progress stage.
    SingleShot,
}

impl Stage {
    /// Ordinal used on the wire: -1 before the steps, the step id, or the
    /// catalog length for the summary.
    pub fn ordinal(self, step_count: usize) -> i64 {
        match self {
            Self::PreAnalysis => -1,
            Self::Step(id) => id as i64,
            Self::Summary | Self::SingleShot => step_count as i64,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PreAnalysis => write!(f, "screenshot pre-analysis"),
            Self::Step(id) => write!(f, "step {id}"),
            Self::Summary => write!(f, "summary"),
            Self::SingleShot => write!(f, "single-shot report"),
        }
    }
}

/// One generated report section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionResult {
    pub id: usize,
    pub title: String,
    pub subtitle: String,
    pub content: String,
}

/// Sections completed so far in one run. Append-only; readers get a slice.
#[derive(Debug, Default)]
pub struct PipelineContext {
    sections: Vec<SectionResult>,
}

impl PipelineContext {
    pub fn sections(&self) -> &[SectionResult] {
        &self.sections
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub(crate) fn push(&mut self, section: SectionResult) {
        debug_assert_eq!(section.id, self.sections.len());
        self.sections.push(section);
    }

    pub fn into_sections(self) -> Vec<SectionResult> {
        self.sections
    }
}
