//! Markdown source documents

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// A markdown document held by the editing buffer
#[derive(Debug, Clone)]
pub struct Document {
    /// File path
    pub path: PathBuf,
    /// Document content
    pub content: String,
}

impl Document {
    /// Create a new empty document
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            content: String::new(),
        }
    }

    /// Open a document from a file
    pub fn open(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;

        Ok(Self {
            path: path.to_path_buf(),
            content,
        })
    }

    /// File name without extension
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "Untitled".to_string())
    }

    /// Directory relative resources resolve against
    pub fn base_dir(&self) -> PathBuf {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf())
    }

    /// Replace the content; returns whether it changed
    pub fn set_content(&mut self, content: String) -> bool {
        if self.content != content {
            self.content = content;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_and_edit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        fs::write(&path, "# Notes").unwrap();

        let mut doc = Document::open(&path).unwrap();
        assert_eq!(doc.stem(), "notes");
        assert_eq!(doc.base_dir(), fs::canonicalize(dir.path()).unwrap());
        assert!(!doc.set_content("# Notes".to_string()));
        assert!(doc.set_content("# Notes\n\nmore".to_string()));
        assert_eq!(doc.content, "# Notes\n\nmore");
    }

    #[test]
    fn test_open_missing_file() {
        let err = Document::open(Path::new("/nonexistent/notes.md")).unwrap_err();
        assert!(err.to_string().contains("Failed to read file"));
    }
}
