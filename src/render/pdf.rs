//! HTML to PDF rendering through wkhtmltopdf

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::process::Command;

use super::converter::{spawn_error, tool_name};
use super::RenderError;

/// Turns an assembled HTML file into a fixed-layout document
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    fn name(&self) -> &str;

    async fn render(&self, html_path: &Path, output_path: &Path) -> Result<(), RenderError>;
}

/// External wkhtmltopdf process
#[derive(Debug, Clone)]
pub struct WkhtmltopdfRenderer {
    program: PathBuf,
    name: String,
}

impl WkhtmltopdfRenderer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        let program = program.into();
        let name = tool_name(&program);
        Self { program, name }
    }

    /// A4 portrait, no margins, 300 dpi, print media rules
    fn args() -> [&'static str; 19] {
        [
            "--quiet",
            "--enable-local-file-access",
            "--page-size",
            "A4",
            "--orientation",
            "Portrait",
            "--margin-top",
            "0",
            "--margin-bottom",
            "0",
            "--margin-left",
            "0",
            "--margin-right",
            "0",
            "--dpi",
            "300",
            "--print-media-type",
            "--no-outline",
            "--disable-smart-shrinking",
        ]
    }
}

#[async_trait]
impl DocumentRenderer for WkhtmltopdfRenderer {
    fn name(&self) -> &str {
        &self.name
    }

    /// Success means the output file exists afterwards.
    ///
    /// wkhtmltopdf exits non-zero on recoverable page errors while still writing
    /// a usable PDF, so the exit code is only logged.
    async fn render(&self, html_path: &Path, output_path: &Path) -> Result<(), RenderError> {
        let started_at = Instant::now();
        let output = Command::new(&self.program)
            .args(Self::args())
            .arg(html_path)
            .arg(output_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|err| {
                if err.kind() == ErrorKind::NotFound {
                    return spawn_error(&self.name, err);
                }
                tracing::warn!(tool = %self.name, error = %err, "Failed to start renderer");
                RenderError::io(&self.program, err)
            })?;

        if !output.status.success() {
            tracing::debug!(
                tool = %self.name,
                exit_code = output.status.code().unwrap_or(-1),
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "Renderer exited with failure status"
            );
        }

        if !output_path.exists() {
            return Err(RenderError::RenderFailed {
                output: output_path.to_path_buf(),
            });
        }

        tracing::debug!(
            tool = %self.name,
            output = %output_path.display(),
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "Rendered document"
        );
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::render::converter::tests::fake_tool;

    #[tokio::test]
    async fn test_passes_fixed_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let args_log = dir.path().join("args.log");
        let script = fake_tool(
            dir.path(),
            "wkhtmltopdf",
            &format!(
                "echo \"$@\" > \"{}\"\nfor last; do :; done\necho pdf > \"$last\"",
                args_log.display()
            ),
        );
        let html = dir.path().join("doc.html");
        let pdf = dir.path().join("doc.pdf");
        std::fs::write(&html, "<html></html>").unwrap();

        WkhtmltopdfRenderer::new(&script).render(&html, &pdf).await.unwrap();

        assert!(pdf.exists());
        let args = std::fs::read_to_string(args_log).unwrap();
        assert!(args.starts_with("--quiet --enable-local-file-access --page-size A4"));
        assert!(args.contains("--margin-top 0 --margin-bottom 0 --margin-left 0 --margin-right 0"));
        assert!(args.contains("--dpi 300 --print-media-type --no-outline --disable-smart-shrinking"));
        assert!(args.trim_end().ends_with(&format!("{} {}", html.display(), pdf.display())));
    }

    // Exit status is ignored in favour of the output file check
    #[tokio::test]
    async fn test_success_follows_output_file_not_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let html = dir.path().join("doc.html");
        let pdf = dir.path().join("doc.pdf");
        std::fs::write(&html, "<html></html>").unwrap();

        let partial = fake_tool(dir.path(), "partial", "for last; do :; done\necho pdf > \"$last\"\nexit 1");
        WkhtmltopdfRenderer::new(&partial).render(&html, &pdf).await.unwrap();

        std::fs::remove_file(&pdf).unwrap();
        let silent = fake_tool(dir.path(), "silent", "exit 0");
        let err = WkhtmltopdfRenderer::new(&silent).render(&html, &pdf).await.unwrap_err();
        assert!(matches!(err, RenderError::RenderFailed { .. }));
    }

    #[tokio::test]
    async fn test_unstartable_renderer_keeps_io_detail() {
        let dir = tempfile::tempdir().unwrap();
        let html = dir.path().join("doc.html");
        let pdf = dir.path().join("doc.pdf");
        std::fs::write(&html, "<html></html>").unwrap();
        // Present but not executable
        let program = dir.path().join("wkhtmltopdf");
        std::fs::write(&program, "#!/bin/sh\nexit 0\n").unwrap();

        let err = WkhtmltopdfRenderer::new(&program).render(&html, &pdf).await.unwrap_err();
        match err {
            RenderError::Io { path, source } => {
                assert_eq!(path, program);
                assert_eq!(source.kind(), std::io::ErrorKind::PermissionDenied);
            }
            other => panic!("expected io error, got {other:?}"),
        }
    }
}
