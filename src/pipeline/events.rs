use super::{SectionResult, Stage};
use std::sync::mpsc;
use thiserror::Error;

/// Progress reported while a run is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    StageStarted { stage: Stage, label: String },
    PreAnalysisCompleted { description: String },
    StageCompleted(SectionResult),
    SummaryCompleted { summary: String },
    Done,
    Error { message: String },
}

impl PipelineEvent {
    /// `Done` and `Error` end a run; nothing may follow them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error { .. })
    }
}

/// The receiving side is gone; further events cannot be delivered.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("event sink closed")]
pub struct SinkClosed;

/// Destination for pipeline events, written in generation order.
pub trait EventSink {
    fn emit(&mut self, event: PipelineEvent) -> Result<(), SinkClosed>;
}

impl EventSink for Vec<PipelineEvent> {
    fn emit(&mut self, event: PipelineEvent) -> Result<(), SinkClosed> {
        self.push(event);
        Ok(())
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn emit(&mut self, event: PipelineEvent) -> Result<(), SinkClosed> {
        (**self).emit(event)
    }
}

impl EventSink for mpsc::Sender<PipelineEvent> {
    fn emit(&mut self, event: PipelineEvent) -> Result<(), SinkClosed> {
        self.send(event).map_err(|_| SinkClosed)
    }
}

/// Must be driven from a blocking thread (e.g. `spawn_blocking`), never from
/// inside an async task.
impl EventSink for tokio::sync::mpsc::Sender<PipelineEvent> {
    fn emit(&mut self, event: PipelineEvent) -> Result<(), SinkClosed> {
        self.blocking_send(event).map_err(|_| SinkClosed)
    }
}
