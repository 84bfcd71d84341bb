//! Workspace directory layout and document discovery

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

pub const DOCUMENTS_DIR: &str = "documents";
pub const TEMPLATES_DIR: &str = "templates";
pub const ATTACHMENTS_DIR: &str = "attachments";
pub const OUTPUT_DIR: &str = "output";

/// Application root holding the input folders and the export output
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn documents_dir(&self) -> PathBuf {
        self.root.join(DOCUMENTS_DIR)
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.root.join(TEMPLATES_DIR)
    }

    pub fn attachments_dir(&self) -> PathBuf {
        self.root.join(ATTACHMENTS_DIR)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join(OUTPUT_DIR)
    }

    /// Create the output directory; a no-op when it already exists
    pub fn ensure_output_dir(&self) -> Result<PathBuf> {
        let dir = self.output_dir();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
        Ok(dir)
    }

    /// Markdown files of documents, templates, attachments, then the root.
    ///
    /// Each folder is scanned non-recursively and sorted by name; missing
    /// folders are skipped.
    pub fn list_documents(&self) -> Vec<PathBuf> {
        let dirs = [
            self.documents_dir(),
            self.templates_dir(),
            self.attachments_dir(),
            self.root.clone(),
        ];

        let files: Vec<PathBuf> = dirs
            .iter()
            .filter(|dir| dir.is_dir())
            .flat_map(|dir| {
                WalkDir::new(dir)
                    .min_depth(1)
                    .max_depth(1)
                    .sort_by_file_name()
                    .into_iter()
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_type().is_file() && is_markdown(e.path()))
                    .map(|e| e.path().to_path_buf())
            })
            .collect();

        tracing::debug!("Found {} documents under {}", files.len(), self.root.display());
        files
    }
}

/// Check if a path is a markdown file
pub fn is_markdown(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext == "md" || ext == "markdown")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_list_documents_order() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path());
        fs::create_dir_all(ws.documents_dir().join("nested")).unwrap();
        fs::create_dir_all(ws.templates_dir()).unwrap();
        fs::write(ws.documents_dir().join("b.md"), "").unwrap();
        fs::write(ws.documents_dir().join("a.md"), "").unwrap();
        fs::write(ws.documents_dir().join("notes.txt"), "").unwrap();
        fs::write(ws.documents_dir().join("nested").join("deep.md"), "").unwrap();
        fs::write(ws.templates_dir().join("letter.md"), "").unwrap();
        fs::write(dir.path().join("README.md"), "").unwrap();

        let names: Vec<String> = ws
            .list_documents()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, ["a.md", "b.md", "letter.md", "README.md"]);
    }

    #[test]
    fn test_ensure_output_dir_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path());
        let out = ws.ensure_output_dir().unwrap();
        assert!(out.is_dir());
        assert_eq!(ws.ensure_output_dir().unwrap(), out);
    }
}
