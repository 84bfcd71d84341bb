//! Application configuration management

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::render::PipelineSettings;
use crate::theme::DEFAULT_THEME;

/// Which markdown converter backs the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ConverterKind {
    /// External pandoc process
    #[default]
    Pandoc,
    /// Bundled pulldown-cmark converter
    Builtin,
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// External tool settings
    pub tools: ToolsConfig,
    /// Preview settings
    pub preview: PreviewConfig,
    /// Export settings
    pub export: ExportConfig,
    /// Theme used when none is given on the command line
    pub default_theme: String,
    /// Theme of the last interactive session
    pub last_theme: Option<String>,
    /// Recently previewed files, most recent first
    pub recent_files: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub converter: ConverterKind,
    /// pandoc executable
    pub pandoc: PathBuf,
    /// wkhtmltopdf executable
    pub wkhtmltopdf: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Quiet period after the last edit before rendering
    pub debounce_ms: u64,
    /// Converter timeout for previews
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Converter timeout for exports; unset means no bound
    pub timeout_secs: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tools: ToolsConfig::default(),
            preview: PreviewConfig::default(),
            export: ExportConfig::default(),
            default_theme: DEFAULT_THEME.to_string(),
            last_theme: None,
            recent_files: Vec::new(),
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            converter: ConverterKind::default(),
            pandoc: PathBuf::from("pandoc"),
            wkhtmltopdf: PathBuf::from("wkhtmltopdf"),
        }
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 400,
            timeout_secs: 30,
        }
    }
}

impl AppConfig {
    /// Get the default config file path
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "pagesmith", "Pagesmith")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Load configuration from `path`, or the default location
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) => path,
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config: {}", path.display()))?;
        tracing::debug!("Loaded config from: {}", path.display());
        Ok(config)
    }

    /// Save configuration to `path`, or the default location
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()
                .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?,
        };

        // Ensure config directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)?;

        tracing::info!("Saved config to: {}", path.display());
        Ok(())
    }

    /// Add a file to recent files
    pub fn add_recent_file(&mut self, path: PathBuf) {
        // Remove if already exists
        self.recent_files.retain(|p| p != &path);
        // Add to front
        self.recent_files.insert(0, path);
        // Keep only last 10
        self.recent_files.truncate(10);
    }

    /// Theme to start with: last session's, then the configured default
    pub fn startup_theme(&self) -> &str {
        self.last_theme.as_deref().unwrap_or(&self.default_theme)
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            preview_timeout: Duration::from_secs(self.preview.timeout_secs),
            export_timeout: self.export.timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.preview.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "tools": { "converter": "builtin" }, "export": { "timeout_secs": 90 } }"#)
                .unwrap();
        assert_eq!(config.tools.converter, ConverterKind::Builtin);
        assert_eq!(config.tools.pandoc, PathBuf::from("pandoc"));
        assert_eq!(config.preview.debounce_ms, 400);
        let settings = config.pipeline_settings();
        assert_eq!(settings.preview_timeout, Duration::from_secs(30));
        assert_eq!(settings.export_timeout, Some(Duration::from_secs(90)));
    }

    #[test]
    fn test_export_unbounded_by_default() {
        assert_eq!(AppConfig::default().pipeline_settings().export_timeout, None);
    }

    #[test]
    fn test_recent_files_dedup_and_cap() {
        let mut config = AppConfig::default();
        for i in 0..12 {
            config.add_recent_file(PathBuf::from(format!("{i}.md")));
        }
        config.add_recent_file(PathBuf::from("5.md"));
        assert_eq!(config.recent_files.len(), 10);
        assert_eq!(config.recent_files[0], PathBuf::from("5.md"));
        assert_eq!(config.recent_files.iter().filter(|p| p.as_os_str() == "5.md").count(), 1);
    }

    #[test]
    fn test_save_and_load_roundtrip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let mut config = AppConfig::default();
        config.last_theme = Some("luxury".to_string());
        config.save(Some(&path)).unwrap();

        let loaded = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded.startup_theme(), "luxury");
        assert_eq!(AppConfig::load(Some(&dir.path().join("absent.json"))).unwrap().startup_theme(), DEFAULT_THEME);
    }
}
