//! Error taxonomy for the analysis pipeline.
//!
//! Validation failures happen before any model call and are kept separate
//! from pipeline failures so callers can tell "nothing ran" apart from
//! "partial analysis available".
use crate::pipeline::Stage;
use thiserror::Error;

/// Request inputs were incomplete or malformed. No model call was made.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Image is required")]
    MissingImage,
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("unsupported image media type {0:?} (expected png, jpeg, gif or webp)")]
    UnsupportedMediaType(String),
    #[error("risk level must be Low, Medium or High (got {0:?})")]
    InvalidRiskLevel(String),
}

/// The model call failed or returned something this system cannot read.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("invalid model request: {0}")]
    InvalidRequest(String),
    #[error("model transport failed: {0}")]
    Transport(String),
    #[error("model upstream returned status {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("unexpected model response: {0}")]
    UnexpectedResponse(String),
    #[error("scripted gateway has no reply left for call {0}")]
    Exhausted(usize),
    #[error("no API key configured (set PXO_API_KEY or ANTHROPIC_API_KEY)")]
    MissingApiKey,
}

/// The single-shot report could not be read as the expected document.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("report is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("report sections do not match the step catalog: {0}")]
    SectionMismatch(String),
    #[error("report summary is empty")]
    EmptySummary,
}

/// Terminal failure of one analysis run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{stage} failed: {source}")]
    Gateway {
        stage: Stage,
        #[source]
        source: GatewayError,
    },
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("invalid step catalog: {0}")]
    Catalog(String),
    #[error("event receiver went away; run abandoned")]
    Abandoned,
}

impl PipelineError {
    /// Short machine-readable discriminator used in error documents.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Gateway { .. } => "gateway",
            Self::Format(_) => "format",
            Self::Catalog(_) => "catalog",
            Self::Abandoned => "abandoned",
        }
    }
}
