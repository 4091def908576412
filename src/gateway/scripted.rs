//! Canned-reply gateway for offline runs (`--replay`) and tests.
//!
//! Replies are consumed in call order. A replay file is a JSON array whose
//! entries are either a reply string or `{"error": "..."}` to simulate an
//! upstream failure at that position.
use super::{GenerateRequest, ModelGateway};
use crate::error::GatewayError;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

/// One scripted reply.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ScriptedReply {
    Text(String),
    Failure { error: String },
}

/// What the scripted gateway was asked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub prompt: String,
    pub with_image: bool,
    pub max_output_tokens: u32,
}

#[derive(Debug, Default)]
pub struct ScriptedGateway {
    replies: Mutex<VecDeque<ScriptedReply>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedGateway {
    pub fn new(replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Script that answers every call with text, in order.
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(texts.into_iter().map(|text| ScriptedReply::Text(text.into())))
    }

    /// Load a replay file.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).with_context(|| format!("read replay {}", path.display()))?;
        let replies: Vec<ScriptedReply> =
            serde_json::from_slice(&bytes).context("parse replay JSON")?;
        Ok(Self::new(replies))
    }

    /// Every request seen so far, in call order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn remaining(&self) -> usize {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl ModelGateway for ScriptedGateway {
    fn generate(&self, request: &GenerateRequest<'_>) -> Result<String, GatewayError> {
        request.validate()?;
        let call_index = {
            let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
            calls.push(RecordedCall {
                prompt: request.prompt.to_string(),
                with_image: request.image.is_some(),
                max_output_tokens: request.max_output_tokens,
            });
            calls.len() - 1
        };
        let reply = self
            .replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        tracing::debug!(call_index, prompt_bytes = request.prompt.len(), "scripted call");
        match reply {
            Some(ScriptedReply::Text(text)) => Ok(text),
            Some(ScriptedReply::Failure { error }) => Err(GatewayError::Upstream {
                status: 500,
                message: error,
            }),
            None => Err(GatewayError::Exhausted(call_index)),
        }
    }
}
