//! Render orchestration for the preview and export flows

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;

use super::html::{self, Variant};
use super::{Converter, DocumentRenderer, RenderError, RenderRequest};
use crate::theme::ThemeRegistry;

/// Timeouts applied to the converter
#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub preview_timeout: Duration,
    /// `None` leaves batch conversions unbounded
    pub export_timeout: Option<Duration>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            preview_timeout: Duration::from_secs(30),
            export_timeout: None,
        }
    }
}

/// Preview HTML, or a diagnostic page when rendering failed
#[derive(Debug, Clone)]
pub struct Preview {
    pub html: String,
    pub error: Option<String>,
}

/// Per-file events emitted while an export runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportProgress {
    Converting { name: String },
    Generated { output: PathBuf },
    Failed { name: String, error: String },
}

impl fmt::Display for ExportProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Converting { name } => write!(f, "Converting {name}"),
            Self::Generated { output } => write!(f, "Generated {}", output.display()),
            Self::Failed { name, error } => write!(f, "Failed {name}: {error}"),
        }
    }
}

/// Outcome of a batch export; partial success is a normal result
#[derive(Debug, Clone, Default)]
pub struct ExportReport {
    pub total: usize,
    pub generated: Vec<PathBuf>,
    pub failures: Vec<(PathBuf, String)>,
}

impl ExportReport {
    pub fn succeeded(&self) -> usize {
        self.generated.len()
    }
}

impl fmt::Display for ExportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} documents generated", self.succeeded(), self.total)
    }
}

/// Shared handle over the themes and the two external tools
#[derive(Clone)]
pub struct Pipeline {
    themes: Arc<ThemeRegistry>,
    converter: Arc<dyn Converter>,
    renderer: Arc<dyn DocumentRenderer>,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        themes: Arc<ThemeRegistry>,
        converter: Arc<dyn Converter>,
        renderer: Arc<dyn DocumentRenderer>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            themes,
            converter,
            renderer,
            settings,
        }
    }

    pub fn themes(&self) -> &ThemeRegistry {
        &self.themes
    }

    /// Build a request against `theme_id`, falling back to the default theme
    pub fn request(
        &self,
        source: impl Into<String>,
        theme_id: &str,
        base_path: impl Into<PathBuf>,
        variant: Variant,
    ) -> RenderRequest {
        let stylesheet = self
            .themes
            .stylesheet(theme_id)
            .unwrap_or_else(|_| Arc::clone(&self.themes.get_or_default(theme_id).stylesheet));
        RenderRequest {
            source: source.into(),
            stylesheet,
            base_path: base_path.into(),
            variant,
        }
    }

    /// Convert and assemble; the timeout depends on the variant
    pub async fn render_html(&self, request: &RenderRequest) -> Result<String, RenderError> {
        let timeout = match request.variant {
            Variant::Preview => Some(self.settings.preview_timeout),
            Variant::Export => self.settings.export_timeout,
        };
        let body = self.converter.convert(&request.source, timeout).await?;
        Ok(html::assemble(
            &body,
            &request.stylesheet,
            &request.base_path,
            request.variant,
        ))
    }

    /// Never fails: errors become a diagnostic page
    pub async fn preview(&self, request: &RenderRequest) -> Preview {
        match self.render_html(request).await {
            Ok(html) => Preview { html, error: None },
            Err(err) => {
                tracing::warn!(tool = self.converter.name(), error = %err, "Preview failed");
                let message = err.to_string();
                Preview {
                    html: html::diagnostic_page(&message, err.hint().as_deref()),
                    error: Some(message),
                }
            }
        }
    }

    /// Export `files` one after another into `output_dir`.
    ///
    /// A failing file is recorded in the report and the batch moves on.
    pub async fn export(
        &self,
        files: &[PathBuf],
        theme_id: &str,
        output_dir: &Path,
        progress: Option<&UnboundedSender<ExportProgress>>,
    ) -> ExportReport {
        let mut report = ExportReport {
            total: files.len(),
            ..Default::default()
        };
        let emit = |event: ExportProgress| {
            if let Some(tx) = progress {
                let _ = tx.send(event);
            }
        };

        if let Err(err) = tokio::fs::create_dir_all(output_dir).await {
            tracing::error!(dir = %output_dir.display(), error = %err, "Cannot create output directory");
            let error = RenderError::io(output_dir, err).to_string();
            for file in files {
                emit(ExportProgress::Failed {
                    name: file_stem(file),
                    error: error.clone(),
                });
                report.failures.push((file.clone(), error.clone()));
            }
            return report;
        }

        let stylesheet = Arc::clone(&self.themes.get_or_default(theme_id).stylesheet);
        tracing::info!(
            files = files.len(),
            theme = theme_id,
            converter = self.converter.name(),
            renderer = self.renderer.name(),
            "Starting export"
        );

        for file in files {
            let name = file_stem(file);
            emit(ExportProgress::Converting { name: name.clone() });

            match self.export_one(file, &stylesheet, output_dir).await {
                Ok(output) => {
                    tracing::info!(file = %file.display(), output = %output.display(), "Exported");
                    emit(ExportProgress::Generated {
                        output: output.clone(),
                    });
                    report.generated.push(output);
                }
                Err(err) => {
                    tracing::warn!(file = %file.display(), error = %err, "Export failed");
                    emit(ExportProgress::Failed {
                        name,
                        error: err.to_string(),
                    });
                    report.failures.push((file.clone(), err.to_string()));
                }
            }
        }

        tracing::info!("{}", report);
        report
    }

    async fn export_one(
        &self,
        source: &Path,
        stylesheet: &Arc<str>,
        output_dir: &Path,
    ) -> Result<PathBuf, RenderError> {
        let source_path = tokio::fs::canonicalize(source)
            .await
            .map_err(|err| RenderError::io(source, err))?;
        let content = tokio::fs::read_to_string(&source_path)
            .await
            .map_err(|err| RenderError::io(&source_path, err))?;

        let base_path = source_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let request = RenderRequest {
            source: content,
            stylesheet: Arc::clone(stylesheet),
            base_path,
            variant: Variant::Export,
        };
        let html = self.render_html(&request).await?;

        let (html_path, pdf_path) = output_paths(output_dir, source);
        tokio::fs::write(&html_path, html)
            .await
            .map_err(|err| RenderError::io(&html_path, err))?;

        // The renderer's success is judged by file existence, so drop any previous run's output
        match tokio::fs::remove_file(&pdf_path).await {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(RenderError::io(&pdf_path, err)),
        }

        self.renderer.render(&html_path, &pdf_path).await?;
        Ok(pdf_path)
    }
}

/// `<output_dir>/<stem>.html` and `<output_dir>/<stem>.pdf`
pub fn output_paths(output_dir: &Path, source: &Path) -> (PathBuf, PathBuf) {
    let stem = file_stem(source);
    (
        output_dir.join(format!("{stem}.html")),
        output_dir.join(format!("{stem}.pdf")),
    )
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "untitled".to_string())
}
