//! Pagesmith - themed markdown to A4 PDF studio
//!
//! Previews markdown as paginated A4 pages under a visual theme and exports
//! it to PDF through pandoc and wkhtmltopdf.

mod app;
mod cli;
mod core;
mod render;
mod theme;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::{filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt};

use app::Studio;
use cli::{Cli, Command, ExportArgs, PreviewArgs};
use crate::core::{
    config::{AppConfig, ConverterKind},
    workspace::Workspace,
};
use render::{BuiltinConverter, Converter, PandocConverter, Pipeline, WkhtmltopdfRenderer};
use theme::ThemeRegistry;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(level)
        .init();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    cli.tools.apply(&mut config);

    let root = match &cli.root {
        Some(root) => root.clone(),
        None => std::env::current_dir().context("Could not determine working directory")?,
    };
    let workspace = Workspace::new(root);
    let themes = Arc::new(ThemeRegistry::new());

    match cli.command {
        Command::Themes => {
            let default = themes.get_or_default(&config.default_theme).id;
            for id in themes.list_ids() {
                let marker = if id == default { "*" } else { " " };
                let label = themes.get(id)?.label();
                println!("{marker} {id:<10} {label:<14} {}", themes.description(id)?);
            }
            Ok(())
        }
        Command::List => {
            for path in workspace.list_documents() {
                println!("{}", path.display());
            }
            Ok(())
        }
        Command::Preview(args) => preview(&config, themes, workspace, args, false)
            .await
            .map(|_| ()),
        Command::Watch(args) => {
            let file = args.file.clone();
            let theme = preview(&config, themes, workspace, args, true).await?;
            remember_session(&mut config, cli.config.as_deref(), theme, &file);
            Ok(())
        }
        Command::Export(args) => export(&mut config, themes, workspace, args).await,
    }
}

fn build_pipeline(config: &AppConfig, themes: Arc<ThemeRegistry>) -> Pipeline {
    let converter: Arc<dyn Converter> = match config.tools.converter {
        ConverterKind::Pandoc => Arc::new(PandocConverter::new(&config.tools.pandoc)),
        ConverterKind::Builtin => Arc::new(BuiltinConverter),
    };
    let renderer = Arc::new(WkhtmltopdfRenderer::new(&config.tools.wkhtmltopdf));
    Pipeline::new(themes, converter, renderer, config.pipeline_settings())
}

async fn preview(
    config: &AppConfig,
    themes: Arc<ThemeRegistry>,
    workspace: Workspace,
    args: PreviewArgs,
    watch: bool,
) -> Result<&'static str> {
    let theme = args.theme.as_deref().unwrap_or(config.startup_theme()).to_string();
    let pipeline = build_pipeline(config, themes);
    let (mut studio, mut outcomes) = Studio::new(pipeline, workspace, &theme, config.debounce());

    let rendering = studio.open_document(&args.file)?.is_some();
    let out = match args.out.clone().or_else(|| studio.preview_path()) {
        Some(out) => out,
        None => bail!("No preview target for {}", args.file.display()),
    };

    if rendering {
        let outcome = outcomes
            .recv()
            .await
            .context("Preview task ended unexpectedly")?;
        studio.apply_preview(outcome);
        studio.write_preview(&out).await?;
        match studio.last_error() {
            Some(err) => tracing::warn!("Preview failed: {}", err),
            None => tracing::info!("Preview written to {}", out.display()),
        }
    } else {
        tracing::info!("{} is empty, nothing to preview", args.file.display());
    }

    if watch {
        studio.watch(&mut outcomes, &out, args.open).await?;
    } else if args.open && out.exists() {
        open::that(&out).with_context(|| format!("Failed to open {}", out.display()))?;
    }
    Ok(studio.theme())
}

async fn export(
    config: &mut AppConfig,
    themes: Arc<ThemeRegistry>,
    workspace: Workspace,
    args: ExportArgs,
) -> Result<()> {
    if let Some(secs) = args.export_timeout {
        config.export.timeout_secs = Some(secs);
    }

    let files = if args.all {
        workspace.list_documents()
    } else {
        args.files.clone()
    };
    if files.is_empty() {
        bail!("No documents to export (pass files or --all)");
    }

    let theme = args.theme.as_deref().unwrap_or(config.startup_theme()).to_string();
    let pipeline = build_pipeline(config, themes);
    let output_dir = workspace.ensure_output_dir()?;
    let (studio, _outcomes) = Studio::new(pipeline, workspace, &theme, Duration::ZERO);

    let (handle, mut progress) = studio.spawn_export(files);
    while let Some(event) = progress.recv().await {
        println!("{event}");
    }
    let report = handle.await.context("Export task panicked")?;

    for (file, error) in &report.failures {
        eprintln!("  {}: {}", file.display(), error);
    }
    println!("{report} in {}", output_dir.display());
    Ok(())
}

/// Remember theme and file for the next session
fn remember_session(config: &mut AppConfig, path: Option<&Path>, theme: &str, file: &Path) {
    config.last_theme = Some(theme.to_string());
    let file = std::fs::canonicalize(file).unwrap_or_else(|_| file.to_path_buf());
    config.add_recent_file(file);
    if let Err(err) = config.save(path) {
        tracing::warn!("Failed to save config: {}", err);
    }
}
