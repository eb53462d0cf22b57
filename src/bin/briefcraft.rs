//! CLI binary for briefcraft.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `GenerationConfig`, submits one job, polls its status until terminal,
//! and writes the rendered artifacts to disk.

use anyhow::{bail, Context, Result};
use briefcraft::{
    AnthropicProvider, DetailLevel, GenerationConfig, GenerationService, JobStatus, OutputFormat,
    DEFAULT_ANTHROPIC_MODEL,
};
use clap::Parser;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # One PDF in, a PDF report out (written to the current directory)
  briefcraft q3-results.pdf

  # Several documents, an executive report plus a slide deck
  briefcraft q3.pdf notes.docx metrics.xlsx --detail executive --formats pdf,pptx

  # Custom title and instructions
  briefcraft deck.pptx --title "Market Entry Review" \
      --instructions "Focus on the competitive landscape"

  # Slide-count range and output directory
  briefcraft report.docx --formats pptx --slides 6-10 -o out/

SUPPORTED INPUT FORMATS:
  .pdf  .docx  .xlsx  .pptx

ENVIRONMENT VARIABLES:
  ANTHROPIC_API_KEY   API key for the bundled Anthropic provider (required)
  BRIEFCRAFT_MODEL    Override the model ID

SETUP:
  1. Set API key:   export ANTHROPIC_API_KEY=sk-ant-...
  2. Generate:      briefcraft document.pdf -o out/
"#;

/// Turn business documents into an AI-generated report and slide deck.
#[derive(Parser, Debug)]
#[command(
    name = "briefcraft",
    version,
    about = "Turn business documents (PDF/DOCX/XLSX/PPTX) into AI-generated reports and slide decks",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Source documents (.pdf, .docx, .xlsx, .pptx).
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Output directory for rendered artifacts.
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Comma-separated output formats: pdf, docx, pptx.
    #[arg(long, default_value = "pdf")]
    formats: String,

    /// Report depth: executive, standard, comprehensive.
    #[arg(long, value_enum, default_value = "standard")]
    detail: DetailArg,

    /// Suggested report title.
    #[arg(long)]
    title: Option<String>,

    /// Free-text instructions for the report.
    #[arg(long)]
    instructions: Option<String>,

    /// Requested slide range for the deck, e.g. 8-15.
    #[arg(long)]
    slides: Option<String>,

    /// LLM model ID.
    #[arg(long, env = "BRIEFCRAFT_MODEL")]
    model: Option<String>,

    /// Polling interval in milliseconds.
    #[arg(long, default_value_t = 500)]
    poll_ms: u64,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum DetailArg {
    Executive,
    Standard,
    Comprehensive,
}

impl From<DetailArg> for DetailLevel {
    fn from(v: DetailArg) -> Self {
        match v {
            DetailArg::Executive => DetailLevel::Executive,
            DetailArg::Standard => DetailLevel::Standard,
            DetailArg::Comprehensive => DetailLevel::Comprehensive,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let formats = parse_formats(&cli.formats)?;
    let mut builder = GenerationConfig::builder()
        .detail_level(cli.detail.clone().into())
        .output_formats(formats);
    if let Some(ref title) = cli.title {
        builder = builder.title(title);
    }
    if let Some(ref instructions) = cli.instructions {
        builder = builder.custom_instructions(instructions);
    }
    if let Some(ref slides) = cli.slides {
        let (min, max) = parse_slide_range(slides)?;
        builder = builder.slide_range(min, max);
    }
    let config = builder.build().context("Invalid configuration")?;

    // ── Build service ────────────────────────────────────────────────────
    let api_key = std::env::var("ANTHROPIC_API_KEY")
        .context("ANTHROPIC_API_KEY is required (export ANTHROPIC_API_KEY=sk-ant-...)")?;
    let model = cli
        .model
        .clone()
        .unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_string());
    let service = GenerationService::builder()
        .llm(Arc::new(AnthropicProvider::new(api_key, model)))
        .build()
        .context("Failed to build service")?;

    // ── Read inputs ──────────────────────────────────────────────────────
    let mut files = Vec::new();
    for path in &cli.files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("Invalid file path: {}", path.display()))?;
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        files.push((name, bytes));
    }

    // ── Submit and poll ──────────────────────────────────────────────────
    let job_id = service
        .submit(files, config)
        .await
        .context("Submission failed")?;
    if !cli.quiet {
        eprintln!("Job {job_id} submitted");
    }

    let mut last_line = String::new();
    loop {
        let status = service.get_status(&job_id).await?;
        let line = format!("{:>3}%  {}", status.progress, status.status_label);
        if !cli.quiet && line != last_line {
            eprintln!("{line}");
            last_line = line;
        }
        match status.status {
            JobStatus::Completed => break,
            JobStatus::Failed => {
                bail!(
                    "Generation failed: {}",
                    status.error.unwrap_or_else(|| "unknown error".into())
                );
            }
            JobStatus::Cancelled => bail!("Job was cancelled"),
            _ => tokio::time::sleep(Duration::from_millis(cli.poll_ms)).await,
        }
    }

    // ── Write artifacts ──────────────────────────────────────────────────
    let result = service.get_result(&job_id).await?;
    tokio::fs::create_dir_all(&cli.output_dir)
        .await
        .with_context(|| format!("Failed to create {}", cli.output_dir.display()))?;

    for artifact in &result.artifacts {
        let bytes = service.artifact_bytes(&artifact.handle).await?;
        let target = cli
            .output_dir
            .join(format!("report.{}", artifact.format.as_str()));
        tokio::fs::write(&target, &bytes)
            .await
            .with_context(|| format!("Failed to write {}", target.display()))?;
        if !cli.quiet {
            eprintln!("Wrote {} ({} bytes)", target.display(), bytes.len());
        }
    }
    for failure in &result.render_failures {
        eprintln!("Warning: {failure}");
    }
    for file in &result.files {
        if let Some(ref err) = file.error {
            eprintln!("Warning: {err}");
        }
    }
    if !cli.quiet {
        eprintln!(
            "Tokens: {} in / {} out",
            result.token_usage.input_tokens, result.token_usage.output_tokens
        );
    }

    Ok(())
}

/// Parse `--formats pdf,docx,pptx`.
fn parse_formats(s: &str) -> Result<Vec<OutputFormat>> {
    let mut formats = Vec::new();
    for part in s.split(',') {
        let format = match part.trim().to_lowercase().as_str() {
            "pdf" => OutputFormat::Pdf,
            "docx" => OutputFormat::Docx,
            "pptx" => OutputFormat::Pptx,
            other => bail!("Unknown output format '{other}' (expected pdf, docx, or pptx)"),
        };
        if !formats.contains(&format) {
            formats.push(format);
        }
    }
    if formats.is_empty() {
        bail!("At least one output format is required");
    }
    Ok(formats)
}

/// Parse `--slides 8-15` into a (min, max) range.
fn parse_slide_range(s: &str) -> Result<(usize, usize)> {
    let (min, max) = s
        .split_once('-')
        .with_context(|| format!("Invalid slide range '{s}' (expected MIN-MAX, e.g. 8-15)"))?;
    let min: usize = min.trim().parse().context("Invalid minimum slide count")?;
    let max: usize = max.trim().parse().context("Invalid maximum slide count")?;
    if min == 0 || min > max {
        bail!("Invalid slide range {min}-{max}: need 1 <= min <= max");
    }
    Ok((min, max))
}
