//! Rendering pipeline: theme stylesheet + external conversion + HTML assembly + PDF export

pub mod converter;
pub mod error;
pub mod html;
pub mod pdf;
pub mod pipeline;
pub mod scheduler;

use std::path::PathBuf;
use std::sync::Arc;

pub use converter::{BuiltinConverter, Converter, PandocConverter};
pub use error::RenderError;
pub use html::Variant;
pub use pdf::{DocumentRenderer, WkhtmltopdfRenderer};
pub use pipeline::{ExportProgress, ExportReport, Pipeline, PipelineSettings, Preview};
pub use scheduler::{PreviewOutcome, PreviewScheduler};

/// One render operation, consumed once
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub source: String,
    pub stylesheet: Arc<str>,
    /// Directory relative links in `source` resolve against
    pub base_path: PathBuf,
    pub variant: Variant,
}
