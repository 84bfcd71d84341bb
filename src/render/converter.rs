//! Markdown to HTML body conversion
//!
//! The default converter is an external `pandoc` process fed through stdin.
//! A bundled pulldown-cmark converter covers machines without pandoc.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use pulldown_cmark::{html, Options, Parser};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::RenderError;

/// Markdown dialect: pipe tables, strikeout and emoji shortcodes
pub const PANDOC_FROM: &str = "markdown+pipe_tables+strikeout+emoji";

/// Converts markdown source into an HTML fragment
#[async_trait]
pub trait Converter: Send + Sync {
    /// Tool name used in logs and error messages
    fn name(&self) -> &str;

    /// Convert `source`, giving up after `timeout` when one is set
    async fn convert(&self, source: &str, timeout: Option<Duration>) -> Result<String, RenderError>;
}

/// External pandoc process
#[derive(Debug, Clone)]
pub struct PandocConverter {
    program: PathBuf,
    name: String,
}

impl PandocConverter {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        let program = program.into();
        let name = tool_name(&program);
        Self { program, name }
    }

    fn args() -> [&'static str; 5] {
        ["-f", PANDOC_FROM, "-t", "html5", "--wrap=none"]
    }
}

#[async_trait]
impl Converter for PandocConverter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn convert(&self, source: &str, timeout: Option<Duration>) -> Result<String, RenderError> {
        let started_at = Instant::now();
        tracing::debug!(program = %self.program.display(), args = ?Self::args(), "Spawning converter");

        let mut child = Command::new(&self.program)
            .args(Self::args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| spawn_error(&self.name, err))?;

        // Feed stdin concurrently so a large document cannot deadlock on a full stdout pipe
        let mut stdin = child.stdin.take().ok_or_else(|| RenderError::ConversionError {
            detail: format!("{} stdin unavailable", self.name),
        })?;
        let input = source.to_owned();
        let writer = tokio::spawn(async move {
            stdin.write_all(input.as_bytes()).await?;
            stdin.shutdown().await
        });

        let output = match timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| {
                    tracing::warn!(tool = %self.name, timeout_secs = limit.as_secs(), "Converter timed out");
                    RenderError::ConversionTimeout {
                        tool: self.name.clone(),
                        after: limit,
                    }
                })?,
            None => child.wait_with_output().await,
        }
        .map_err(|err| RenderError::ConversionError {
            detail: err.to_string(),
        })?;

        if let Ok(Err(err)) = writer.await {
            tracing::debug!(tool = %self.name, error = %err, "Converter closed stdin early");
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::warn!(
                tool = %self.name,
                exit_code = output.status.code().unwrap_or(-1),
                stderr = %stderr,
                "Converter failed"
            );
            return Err(RenderError::ConversionFailed {
                tool: self.name.clone(),
                stderr,
            });
        }

        let body = String::from_utf8(output.stdout).map_err(|err| RenderError::ConversionError {
            detail: format!("{} produced invalid UTF-8: {err}", self.name),
        })?;
        tracing::debug!(
            tool = %self.name,
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            html_bytes = body.len(),
            "Converted markdown"
        );
        Ok(body)
    }
}

/// In-process converter backed by pulldown-cmark
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinConverter;

#[async_trait]
impl Converter for BuiltinConverter {
    fn name(&self) -> &str {
        "builtin"
    }

    async fn convert(&self, source: &str, _timeout: Option<Duration>) -> Result<String, RenderError> {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);

        let parser = Parser::new_ext(source, options);
        let mut body = String::with_capacity(source.len() * 3 / 2);
        html::push_html(&mut body, parser);
        Ok(body)
    }
}

/// Map a spawn failure onto the error taxonomy
pub(crate) fn spawn_error(tool: &str, err: std::io::Error) -> RenderError {
    if err.kind() == ErrorKind::NotFound {
        tracing::warn!(tool = %tool, "Executable not found");
        RenderError::ToolNotFound {
            tool: tool.to_string(),
        }
    } else {
        RenderError::ConversionError {
            detail: format!("failed to spawn {tool}: {err}"),
        }
    }
}

pub(crate) fn tool_name(program: &std::path::Path) -> String {
    program
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| program.to_string_lossy().to_string())
}
