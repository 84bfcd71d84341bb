//! Command-line arguments

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint};

use crate::core::config::{AppConfig, ConverterKind};

#[derive(Debug, Parser)]
#[command(name = "pagesmith", version, about = "Themed markdown to A4 PDF studio")]
pub struct Cli {
    /// Workspace root holding documents/, templates/, attachments/ and output/
    #[arg(long, global = true, env = "PAGESMITH_ROOT", value_name = "DIR", value_hint = ValueHint::DirPath)]
    pub root: Option<PathBuf>,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, env = "PAGESMITH_CONFIG", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub tools: ToolArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args, Clone, Default)]
pub struct ToolArgs {
    /// Markdown converter backend
    #[arg(long, global = true, value_enum)]
    pub converter: Option<ConverterKind>,

    /// pandoc executable
    #[arg(long, global = true, value_name = "PATH")]
    pub pandoc: Option<PathBuf>,

    /// wkhtmltopdf executable
    #[arg(long, global = true, value_name = "PATH")]
    pub wkhtmltopdf: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List available themes
    Themes,
    /// List markdown documents in the workspace
    List,
    /// Render a one-shot preview of a document
    Preview(PreviewArgs),
    /// Re-render the preview whenever the document changes
    Watch(PreviewArgs),
    /// Export documents to PDF
    Export(ExportArgs),
}

#[derive(Debug, Args, Clone)]
pub struct PreviewArgs {
    /// Markdown file to preview
    #[arg(value_hint = ValueHint::FilePath)]
    pub file: PathBuf,

    /// Theme id (see `pagesmith themes`)
    #[arg(short, long)]
    pub theme: Option<String>,

    /// Where to write the preview HTML (defaults to output/<stem>.preview.html)
    #[arg(short, long, value_name = "PATH")]
    pub out: Option<PathBuf>,

    /// Open the preview in the default browser
    #[arg(long)]
    pub open: bool,
}

#[derive(Debug, Args, Clone)]
pub struct ExportArgs {
    /// Markdown files to export, in order
    #[arg(value_hint = ValueHint::FilePath)]
    pub files: Vec<PathBuf>,

    /// Export every document in the workspace
    #[arg(long, conflicts_with = "files")]
    pub all: bool,

    /// Theme id (see `pagesmith themes`)
    #[arg(short, long)]
    pub theme: Option<String>,

    /// Converter timeout per file in seconds (unbounded by default)
    #[arg(long, value_name = "SECS")]
    pub export_timeout: Option<u64>,
}

impl ToolArgs {
    /// Override config values with the ones given on the command line
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(converter) = self.converter {
            config.tools.converter = converter;
        }
        if let Some(pandoc) = &self.pandoc {
            config.tools.pandoc = pandoc.clone();
        }
        if let Some(wkhtmltopdf) = &self.wkhtmltopdf {
            config.tools.wkhtmltopdf = wkhtmltopdf.clone();
        }
    }
}
