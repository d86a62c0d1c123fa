//! # robinwood-engine
//!
//! Pipelines that shrink payloads and the request flow around them:
//!
//! - [`pipeline`]: generic sequential engine with size metrics
//! - [`audio`]: PCM operations and the external transcoder boundary
//! - [`text`]: whitespace, dictionary and JSON-block operations
//! - [`presets`]: named operation lists and operation catalogues
//! - [`metering`]: idempotent usage recording against a quota store
//! - [`service`]: validate, run, encode and meter one request

#![deny(unsafe_code)]

pub mod audio;
pub mod metering;
pub mod pipeline;
pub mod presets;
pub mod service;
pub mod text;

pub use metering::UsageMeter;
pub use pipeline::{Executor, Pipeline, PipelineResult};
pub use presets::{OperationInfo, Preset, PresetCatalog, PresetSummary};
pub use service::{AudioInput, AudioSteal, RequestContext, StealRequest, StealService, TextSteal};
