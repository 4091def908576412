//! Server-pushed event stream: wire events and the `data: ...` frame codec.
//!
//! Each frame is `data: <json>` followed by a blank line. The JSON object
//! carries a `type` discriminator.
use crate::pipeline::{EventSink, PipelineEvent, SectionResult, SinkClosed};
use serde::{Deserialize, Serialize};
use std::io::Write;
use thiserror::Error;

const DATA_MARKER: &str = "data: ";
const FRAME_SEPARATOR: &[u8] = b"\n\n";

/// Wire form of a `PipelineEvent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireEvent {
    StepStart { step: i64, title: String },
    StepComplete { section: SectionResult },
    ScreenshotDone,
    SummaryComplete { summary: String },
    Done,
    Error { message: String },
}

impl WireEvent {
    /// `step_count` resolves the summary sentinel ordinal.
    pub fn from_event(event: &PipelineEvent, step_count: usize) -> Self {
        match event {
            PipelineEvent::StageStarted { stage, label } => Self::StepStart {
                step: stage.ordinal(step_count),
                title: label.clone(),
            },
            PipelineEvent::PreAnalysisCompleted { .. } => Self::ScreenshotDone,
            PipelineEvent::StageCompleted(section) => Self::StepComplete {
                section: section.clone(),
            },
            PipelineEvent::SummaryCompleted { summary } => Self::SummaryComplete {
                summary: summary.clone(),
            },
            PipelineEvent::Done => Self::Done,
            PipelineEvent::Error { message } => Self::Error {
                message: message.clone(),
            },
        }
    }
}

/// Encode one frame, terminator included.
pub fn encode_frame(event: &WireEvent) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(event)?;
    Ok(format!("{DATA_MARKER}{json}\n\n"))
}

/// Writes frames as events arrive, flushing after each one.
pub struct SseWriter<W: Write> {
    writer: W,
    step_count: usize,
}

impl<W: Write> SseWriter<W> {
    pub fn new(writer: W, step_count: usize) -> Self {
        Self { writer, step_count }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> EventSink for SseWriter<W> {
    fn emit(&mut self, event: PipelineEvent) -> Result<(), SinkClosed> {
        let frame = encode_frame(&WireEvent::from_event(&event, self.step_count))
            .map_err(|err| {
                tracing::error!(error = %err, "encode stream frame");
                SinkClosed
            })?;
        self.writer
            .write_all(frame.as_bytes())
            .and_then(|()| self.writer.flush())
            .map_err(|err| {
                tracing::info!(error = %err, "stream writer closed");
                SinkClosed
            })
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("stream frame is not UTF-8")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("stream frame is not a known event: {0}")]
    Json(#[from] serde_json::Error),
}

/// Incremental consumer-side parser. Feed it chunks as they arrive; a frame
/// split across chunks is held until its terminator shows up.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    buffer: Vec<u8>,
    deferred: Option<DecodeError>,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a chunk and return every event it completed. Frames without the
    /// `data: ` marker are skipped.
    ///
    /// Decoding stops at a malformed frame. Events decoded before it in the
    /// same call are returned and the error comes from the next call; frames
    /// after it stay buffered until then. `push(&[])` drains them.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<WireEvent>, DecodeError> {
        self.buffer.extend_from_slice(chunk);
        if let Some(err) = self.deferred.take() {
            return Err(err);
        }
        let mut events = Vec::new();
        while let Some(end) = find_separator(&self.buffer) {
            let frame: Vec<u8> = self.buffer.drain(..end + FRAME_SEPARATOR.len()).collect();
            match decode_frame(&frame[..end]) {
                Ok(Some(event)) => events.push(event),
                Ok(None) => {}
                Err(err) if events.is_empty() => return Err(err),
                Err(err) => {
                    self.deferred = Some(err);
                    break;
                }
            }
        }
        Ok(events)
    }

    /// Bytes not yet decoded.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

fn decode_frame(frame: &[u8]) -> Result<Option<WireEvent>, DecodeError> {
    let text = std::str::from_utf8(frame)?;
    match text.strip_prefix(DATA_MARKER) {
        Some(json) => Ok(Some(serde_json::from_str(json)?)),
        None => Ok(None),
    }
}

fn find_separator(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(FRAME_SEPARATOR.len())
        .position(|window| window == FRAME_SEPARATOR)
}
