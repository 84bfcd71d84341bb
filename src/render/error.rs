//! Error taxonomy of the rendering pipeline

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors raised while turning a markdown source into HTML or a PDF
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("unknown theme: {0}")]
    UnknownTheme(String),

    #[error("{tool} not found")]
    ToolNotFound { tool: String },

    #[error("{tool} timed out after {}s", .after.as_secs())]
    ConversionTimeout { tool: String, after: Duration },

    #[error("{tool} error: {stderr}")]
    ConversionFailed { tool: String, stderr: String },

    #[error("conversion error: {detail}")]
    ConversionError { detail: String },

    /// The renderer ran but left no output document behind
    #[error("no document produced at {}", .output.display())]
    RenderFailed { output: PathBuf },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl RenderError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Hint shown next to the message on the diagnostic page
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::ToolNotFound { tool } => Some(format!(
                "Install {tool} (e.g. `sudo apt install {tool}`) or set its path in the config"
            )),
            _ => None,
        }
    }
}
