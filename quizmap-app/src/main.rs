use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use quizmap_common::DocumentVariant;
use quizmap_common::observability::{LogConfig, init_logging};
use quizmap_config::{QuizmapConfig, QuizmapConfigLoader};
use quizmap_core::{DocumentBuilder, Extractor, Harvest, resolver};

mod pages;
mod progress;

const DEFAULT_CONFIG_FILE: &str = "quizmap.yaml";

#[derive(Parser)]
#[command(name = "quizmap", about = "Freeplane mind maps from question-bank page dumps")]
struct Cli {
    /// Config file (default: ./quizmap.yaml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract every page dump and write one map
    Build {
        /// Page dump files or directories of *.json dumps
        #[arg(required = true)]
        pages: Vec<PathBuf>,
        /// Output file (default: output.dir/output.filename from config)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// legacy or modern-templated
        #[arg(long)]
        variant: Option<DocumentVariant>,
        /// Do not highlight items answered wrong
        #[arg(long)]
        no_highlight: bool,
    },
    /// Print the answer key of each page dump
    Answers {
        #[arg(required = true)]
        pages: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) Config (env wins over the file)
    let cfg = load_config(cli.config.as_deref())?;

    // 2) Logging from the config's logging section
    init_logging(LogConfig {
        app_name: "quizmap",
        log_dir: cfg.logging.dir.clone(),
        emit_stderr: cfg.logging.emit_stderr,
        format: cfg.logging.format,
        default_filter: cfg.logging.filter.clone(),
    })?;

    let t0 = Instant::now();
    match cli.command {
        Commands::Build {
            pages,
            output,
            variant,
            no_highlight,
        } => build(&cfg, &pages, output, variant, no_highlight)?,
        Commands::Answers { pages } => answers(&pages)?,
    }
    tracing::info!(elapsed_ms = t0.elapsed().as_millis() as u64, "done");
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<QuizmapConfig> {
    let loader = match path {
        Some(path) => QuizmapConfigLoader::new().with_file(path),
        None => QuizmapConfigLoader::new().with_optional_file(DEFAULT_CONFIG_FILE),
    };
    let cfg = loader.load().context("failed to load configuration")?;
    cfg.validate()?;
    Ok(cfg)
}

fn build(
    cfg: &QuizmapConfig,
    inputs: &[PathBuf],
    output: Option<PathBuf>,
    variant: Option<DocumentVariant>,
    no_highlight: bool,
) -> Result<()> {
    let mut render = cfg.render.clone();
    if let Some(variant) = variant {
        render.document_variant = variant;
    }
    if no_highlight {
        render.highlight_wrong_answers = false;
    }

    let dumps = pages::load_all(inputs)?;
    if dumps.is_empty() {
        bail!("no readable page dumps among {} input(s)", inputs.len());
    }

    let mut harvest = Harvest::new(Extractor::new(render.clone()))
        .with_observer(progress::ProgressObserver::new(dumps.len()));
    for dump in &dumps {
        let report = harvest.add_page(dump);
        tracing::debug!(
            page = %report.page,
            resolved = report.resolved,
            extracted = report.extracted,
            discarded = report.discarded,
            "page done"
        );
    }
    if harvest.is_empty() {
        bail!("no items extracted from {} page(s)", dumps.len());
    }

    let document = harvest.finish(&DocumentBuilder::new(&render))?;

    let path = output.unwrap_or_else(|| cfg.output.path());
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(&path, document.as_str())
        .with_context(|| format!("failed to write {}", path.display()))?;

    tracing::info!(
        path = %path.display(),
        nodes = document.node_count,
        variant = document.variant.as_str(),
        "map written"
    );
    println!("Wrote {} items to {}", document.node_count, path.display());
    Ok(())
}

fn answers(inputs: &[PathBuf]) -> Result<()> {
    let dumps = pages::load_all(inputs)?;
    if dumps.is_empty() {
        bail!("no readable page dumps among {} input(s)", inputs.len());
    }
    for dump in &dumps {
        let key = resolver::resolve(&dump.stats);
        println!("{}: {}", dump.label(), key.summary());
    }
    Ok(())
}
