//! PXO analysis: one screenshot and a short product brief in, a twelve-section
//! product/UX report out.
//!
//! The report is produced by a fixed sequence of model calls. A screenshot
//! description comes first, then one call per catalog step (each seeing every
//! earlier section), then a short executive summary. Progress is delivered as
//! it happens, either as a server-pushed event stream or folded into a single
//! JSON document.
pub mod catalog;
pub mod config;
pub mod error;
pub mod gateway;
pub mod inputs;
pub mod pipeline;
pub mod prompts;
pub mod report;
pub mod server;
pub mod stream;
mod util;
