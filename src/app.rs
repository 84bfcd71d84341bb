//! Interactive state and coordination between the editing buffer and the pipeline
//!
//! `Studio` owns every piece of UI-facing state and is only ever touched from
//! one task. Rendering happens on spawned tasks; finished previews come back
//! through the scheduler's channel and are applied with [`Studio::apply_preview`].

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use notify::{Event, RecursiveMode, Watcher};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;

use crate::core::{document::Document, workspace::Workspace};
use crate::render::{
    ExportProgress, ExportReport, Pipeline, PreviewOutcome, PreviewScheduler, Variant,
};

/// Preview pane status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreviewStatus {
    #[default]
    Idle,
    Rendering,
    Ready,
}

/// Main application state
pub struct Studio {
    scheduler: PreviewScheduler,
    workspace: Workspace,
    /// Document in the editing buffer
    document: Option<Document>,
    /// Current theme id
    theme: &'static str,
    status: PreviewStatus,
    /// Last applied preview HTML
    preview_html: Option<String>,
    /// Error of the last applied preview, if it failed
    last_error: Option<String>,
    /// Sequence number of the last applied preview
    applied_seq: u64,
}

impl Studio {
    /// Create a studio and the channel finished previews arrive on
    pub fn new(
        pipeline: Pipeline,
        workspace: Workspace,
        theme: &str,
        debounce: std::time::Duration,
    ) -> (Self, UnboundedReceiver<PreviewOutcome>) {
        let theme = pipeline.themes().get_or_default(theme).id;
        let (scheduler, outcomes) = PreviewScheduler::new(pipeline, debounce);
        let studio = Self {
            scheduler,
            workspace,
            document: None,
            theme,
            status: PreviewStatus::Idle,
            preview_html: None,
            last_error: None,
            applied_seq: 0,
        };
        (studio, outcomes)
    }

    fn pipeline(&self) -> &Pipeline {
        self.scheduler.pipeline()
    }

    pub fn theme(&self) -> &'static str {
        self.theme
    }

    pub fn status(&self) -> PreviewStatus {
        self.status
    }

    pub fn preview_html(&self) -> Option<&str> {
        self.preview_html.as_deref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// `output/<stem>.preview.html` for the open document
    pub fn preview_path(&self) -> Option<PathBuf> {
        let doc = self.document.as_ref()?;
        Some(
            self.workspace
                .output_dir()
                .join(format!("{}.preview.html", doc.stem())),
        )
    }

    /// Load a document into the buffer and render it immediately
    pub fn open_document(&mut self, path: &Path) -> Result<Option<u64>> {
        let doc = Document::open(path)?;
        tracing::info!("Opened document: {}", path.display());
        self.document = Some(doc);
        Ok(self.request_preview(true))
    }

    /// Replace the buffer content; renders after the debounce period
    pub fn set_content(&mut self, content: String) -> Option<u64> {
        let untitled = self.workspace.documents_dir().join("untitled.md");
        let doc = self.document.get_or_insert_with(|| Document::new(untitled));
        if !doc.set_content(content) {
            return None;
        }
        self.request_preview(false)
    }

    /// Switch theme and re-render immediately
    pub fn select_theme(&mut self, id: &str) -> Option<u64> {
        let theme = self.pipeline().themes().get_or_default(id);
        tracing::info!("Theme: {} ({})", theme.label(), theme.description);
        let id = theme.id;
        self.theme = id;
        self.request_preview(true)
    }

    /// Schedule a preview of the buffer; blank buffers are not rendered
    pub fn request_preview(&mut self, immediate: bool) -> Option<u64> {
        let doc = self.document.as_ref()?;
        if doc.content.trim().is_empty() {
            self.scheduler.supersede();
            self.status = PreviewStatus::Idle;
            return None;
        }

        let base = if doc.path.exists() {
            doc.base_dir()
        } else {
            std::fs::canonicalize(self.workspace.root())
                .unwrap_or_else(|_| self.workspace.root().to_path_buf())
        };
        let request = self
            .pipeline()
            .request(doc.content.clone(), self.theme, base, Variant::Preview);

        self.status = PreviewStatus::Rendering;
        let seq = if immediate {
            self.scheduler.render_now(request)
        } else {
            self.scheduler.schedule(request)
        };
        Some(seq)
    }

    /// Apply a finished preview; stale results are dropped
    pub fn apply_preview(&mut self, outcome: PreviewOutcome) -> bool {
        if outcome.seq < self.applied_seq {
            tracing::debug!(seq = outcome.seq, applied = self.applied_seq, "Dropping stale preview");
            return false;
        }
        self.applied_seq = outcome.seq;
        self.preview_html = Some(outcome.preview.html);
        self.last_error = outcome.preview.error;
        if outcome.seq >= self.scheduler.latest() {
            self.status = PreviewStatus::Ready;
        }
        true
    }

    /// Export `files` on a background task, reporting progress on the returned channel
    pub fn spawn_export(
        &self,
        files: Vec<PathBuf>,
    ) -> (JoinHandle<ExportReport>, UnboundedReceiver<ExportProgress>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let pipeline = self.pipeline().clone();
        let theme = self.theme;
        let output_dir = self.workspace.output_dir();

        let handle = tokio::spawn(async move {
            pipeline.export(&files, theme, &output_dir, Some(&tx)).await
        });
        (handle, rx)
    }

    /// Watch the open document on disk and keep `out` updated with its preview until Ctrl-C
    pub async fn watch(
        &mut self,
        outcomes: &mut UnboundedReceiver<PreviewOutcome>,
        out: &Path,
        open_browser: bool,
    ) -> Result<()> {
        let path = self
            .document
            .as_ref()
            .map(|doc| doc.path.clone())
            .context("No document to watch")?;
        let path = std::fs::canonicalize(&path)
            .with_context(|| format!("Failed to resolve {}", path.display()))?;
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        // Editors often replace files on save, so watch the directory and filter
        let (tx, mut events) = mpsc::unbounded_channel::<notify::Result<Event>>();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })
        .context("Failed to create file watcher")?;
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {}", dir.display()))?;
        tracing::info!("Watching {} (type a theme id to switch, Ctrl-C to stop)", path.display());

        let mut commands = BufReader::new(tokio::io::stdin()).lines();
        let mut stdin_open = true;

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);
        let mut opened = false;
        if open_browser && out.exists() {
            opened = true;
            open_in_browser(out);
        }

        loop {
            tokio::select! {
                Some(event) = events.recv() => match event {
                    Ok(event) if (event.kind.is_modify() || event.kind.is_create())
                        && event.paths.iter().any(|p| p == &path) =>
                    {
                        match tokio::fs::read_to_string(&path).await {
                            Ok(content) => {
                                self.set_content(content);
                            }
                            Err(err) => tracing::warn!("Failed to reload {}: {}", path.display(), err),
                        }
                    }
                    Ok(_) => {}
                    Err(err) => tracing::warn!("Watcher error: {}", err),
                },
                Some(outcome) = outcomes.recv() => {
                    if self.apply_preview(outcome) {
                        self.write_preview(out).await?;
                        if let Some(err) = self.last_error() {
                            tracing::warn!("Preview failed: {}", err);
                        } else {
                            tracing::info!("Preview updated: {}", out.display());
                        }
                        if open_browser && !opened {
                            opened = true;
                            open_in_browser(out);
                        }
                    }
                },
                line = commands.next_line(), if stdin_open => match line {
                    Ok(Some(line)) if !line.trim().is_empty() => {
                        self.select_theme(line.trim());
                    }
                    Ok(Some(_)) => {}
                    Ok(None) | Err(_) => stdin_open = false,
                },
                _ = &mut shutdown => break,
            }
        }

        tracing::info!("Stopped watching {}", path.display());
        Ok(())
    }

    /// Write the last applied preview to `out`
    pub async fn write_preview(&self, out: &Path) -> Result<()> {
        let Some(html) = self.preview_html.as_deref() else {
            return Ok(());
        };
        if let Some(parent) = out.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(out, html)
            .await
            .with_context(|| format!("Failed to write preview: {}", out.display()))
    }
}

fn open_in_browser(path: &Path) {
    if let Err(err) = open::that(path) {
        tracing::warn!("Failed to open preview: {}", err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::render::pipeline::tests::{fake_pipeline, FakeConverter};
    use crate::render::Preview;

    fn studio(dir: &Path) -> (Studio, UnboundedReceiver<PreviewOutcome>, Arc<FakeConverter>) {
        let converter = Arc::new(FakeConverter::default());
        let (studio, rx) = Studio::new(
            fake_pipeline(converter.clone()),
            Workspace::new(dir),
            "zen",
            Duration::from_millis(400),
        );
        (studio, rx, converter)
    }

    #[tokio::test(start_paused = true)]
    async fn test_edits_are_debounced_and_applied() {
        let dir = tempfile::tempdir().unwrap();
        let (mut studio, mut rx, converter) = studio(dir.path());
        assert_eq!(studio.status(), PreviewStatus::Idle);

        studio.set_content("# a".to_string());
        studio.set_content("# ab".to_string());
        let last = studio.set_content("# abc".to_string()).unwrap();
        assert_eq!(studio.status(), PreviewStatus::Rendering);

        let outcome = rx.recv().await.unwrap();
        assert_eq!(outcome.seq, last);
        assert!(studio.apply_preview(outcome));
        assert_eq!(studio.status(), PreviewStatus::Ready);
        assert!(studio.preview_html().unwrap().contains("<p># abc</p>"));
        assert_eq!(converter.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_blank_buffer_is_not_rendered() {
        let dir = tempfile::tempdir().unwrap();
        let (mut studio, _rx, converter) = studio(dir.path());
        assert!(studio.set_content("   \n".to_string()).is_none());
        assert_eq!(studio.status(), PreviewStatus::Idle);
        assert_eq!(converter.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blanking_buffer_cancels_pending_render() {
        let dir = tempfile::tempdir().unwrap();
        let (mut studio, mut rx, converter) = studio(dir.path());

        studio.set_content("# stale".to_string()).unwrap();
        assert_eq!(studio.status(), PreviewStatus::Rendering);
        assert!(studio.set_content("   ".to_string()).is_none());
        assert_eq!(studio.status(), PreviewStatus::Idle);

        let outcome = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await;
        assert!(outcome.is_err());
        assert_eq!(converter.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert!(converter.sources.lock().unwrap().is_empty());
        assert_eq!(studio.status(), PreviewStatus::Idle);
    }

    #[tokio::test]
    async fn test_failed_preview_returns_to_ready_with_diagnostic() {
        let dir = tempfile::tempdir().unwrap();
        let (mut studio, mut rx, _) = studio(dir.path());

        studio.set_content("| FAIL |".to_string());
        studio.request_preview(true);
        let outcome = rx.recv().await.unwrap();
        studio.apply_preview(outcome);

        assert_eq!(studio.status(), PreviewStatus::Ready);
        assert!(studio.preview_html().unwrap().contains("bad table"));
        assert!(studio.last_error().unwrap().contains("bad table"));
    }

    #[tokio::test]
    async fn test_stale_outcome_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let (mut studio, _rx, _) = studio(dir.path());
        let preview = |html: &str| Preview {
            html: html.to_string(),
            error: None,
        };

        assert!(studio.apply_preview(PreviewOutcome { seq: 2, preview: preview("new") }));
        assert!(!studio.apply_preview(PreviewOutcome { seq: 1, preview: preview("old") }));
        assert_eq!(studio.preview_html(), Some("new"));
    }

    #[tokio::test]
    async fn test_open_document_and_switch_theme() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.md");
        std::fs::write(&path, "hello").unwrap();
        let (mut studio, mut rx, _) = studio(dir.path());

        assert!(studio.preview_path().is_none());
        studio.open_document(&path).unwrap().unwrap();
        assert_eq!(
            studio.preview_path().unwrap(),
            dir.path().join("output").join("doc.preview.html")
        );
        let first = rx.recv().await.unwrap();
        studio.apply_preview(first);
        let base = std::fs::canonicalize(dir.path()).unwrap();
        assert!(studio
            .preview_html()
            .unwrap()
            .contains(&format!("<base href=\"file://{}/\">", base.display())));

        studio.select_theme("unknown-theme");
        assert_eq!(studio.theme(), "gaming");
        let second = rx.recv().await.unwrap();
        assert!(studio.apply_preview(second));
        assert!(studio.preview_html().unwrap().contains("A4 Preview"));
    }

    #[tokio::test]
    async fn test_spawned_export_reports_progress() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path());
        std::fs::create_dir_all(ws.documents_dir()).unwrap();
        std::fs::write(ws.documents_dir().join("one.md"), "# one").unwrap();
        std::fs::write(ws.documents_dir().join("two.md"), "# two").unwrap();
        let (studio, _rx, _) = studio(dir.path());

        let (handle, mut progress) = studio.spawn_export(ws.list_documents());
        let report = handle.await.unwrap();
        assert_eq!(report.to_string(), "2/2 documents generated");
        assert!(ws.output_dir().join("one.pdf").exists());

        let mut events = Vec::new();
        while let Some(event) = progress.recv().await {
            events.push(event.to_string());
        }
        assert_eq!(events[0], "Converting one");
    }

    #[tokio::test]
    async fn test_write_preview() {
        let dir = tempfile::tempdir().unwrap();
        let (mut studio, _rx, _) = studio(dir.path());
        let out = dir.path().join("output").join("doc.preview.html");

        studio.write_preview(&out).await.unwrap();
        assert!(!out.exists());

        studio.apply_preview(PreviewOutcome {
            seq: 1,
            preview: Preview {
                html: "<html></html>".to_string(),
                error: None,
            },
        });
        studio.write_preview(&out).await.unwrap();
        assert_eq!(std::fs::read_to_string(out).unwrap(), "<html></html>");
    }
}
