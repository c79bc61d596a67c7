//! CLI binary for medreport-biomarkers.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `AnalysisConfig` and renders results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use medreport_biomarkers::{analyze, inspect, AnalysisConfig, AnalysisOutput};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract biomarkers and explain them (stdout)
  medreport lab_report.pdf

  # Structured JSON for downstream tooling
  medreport --json lab_report.pdf > analysis.json

  # Extraction only, no explanation request
  medreport --extract-only lab_report.pdf

  # Analyse a report fetched over HTTP
  medreport https://example.com/results/cbc_panel.pdf

  # Show the raw text the model would see (no API key needed)
  medreport --dump-text lab_report.pdf

  # Write the rendered analysis to a file
  medreport lab_report.pdf -o analysis.txt

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY       Gemini API key (also read from a .env file)
  MEDREPORT_MODEL      Override the model id (default: gemini-1.5-flash)

SETUP:
  1. Set API key:   export GEMINI_API_KEY=...
  2. Analyse:       medreport lab_report.pdf

NOTE:
  Biomarker values and reference ranges are reported exactly as the model
  read them; nothing here is medical advice. Failed model calls are retried
  up to --max-attempts times with a flat --retry-delay-ms pause between
  attempts.
"#;

/// Extract biomarkers from medical-report PDFs and explain them in plain language.
#[derive(Parser, Debug)]
#[command(
    name = "medreport",
    version,
    about = "Extract biomarkers from medical-report PDFs and explain them using Gemini",
    long_about = "Extract structured biomarker data (name, value, test, reference range) from a \
medical-report PDF and generate a plain-language explanation, using the Google Gemini API for \
both steps. Accepts local files or HTTP/HTTPS URLs.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Write the rendered analysis to this file instead of stdout.
    #[arg(short, long, env = "MEDREPORT_OUTPUT")]
    output: Option<PathBuf>,

    /// Gemini model id.
    #[arg(long, env = "MEDREPORT_MODEL", default_value = "gemini-1.5-flash")]
    model: String,

    /// Gemini API key. Falls back to GEMINI_API_KEY (env or .env file).
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Total attempts per model request, including the first.
    #[arg(long, env = "MEDREPORT_MAX_ATTEMPTS", default_value_t = 3)]
    max_attempts: u32,

    /// Flat delay between failed attempts in milliseconds.
    #[arg(long, env = "MEDREPORT_RETRY_DELAY_MS", default_value_t = 2000)]
    retry_delay_ms: u64,

    /// Per-model-call timeout in seconds.
    #[arg(long, env = "MEDREPORT_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// HTTP download timeout in seconds for URL inputs.
    #[arg(long, env = "MEDREPORT_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Skip the explanation request; extract biomarkers only.
    #[arg(long, env = "MEDREPORT_EXTRACT_ONLY")]
    extract_only: bool,

    /// Path to a text file containing a custom extraction prompt prefix.
    #[arg(long, env = "MEDREPORT_EXTRACTION_PROMPT")]
    extraction_prompt: Option<PathBuf>,

    /// Path to a text file containing a custom explanation prompt prefix.
    #[arg(long, env = "MEDREPORT_EXPLANATION_PROMPT")]
    explanation_prompt: Option<PathBuf>,

    /// Output structured JSON (AnalysisOutput) instead of rendered text.
    #[arg(long, env = "MEDREPORT_JSON")]
    json: bool,

    /// Print the extracted report text only, no model calls (no API key needed).
    #[arg(long)]
    dump_text: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "MEDREPORT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "MEDREPORT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and results.
    #[arg(short, long, env = "MEDREPORT_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Pick up GEMINI_API_KEY from a .env file before clap reads the env.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the spinner is active; the
    // spinner provides the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Dump-text mode ───────────────────────────────────────────────────
    if cli.dump_text {
        let report = inspect(&cli.input)
            .await
            .context("Failed to read report text")?;
        if !cli.quiet {
            eprintln!(
                "{} {} pages, {} chars ({} empty pages)",
                cyan("◆"),
                report.page_count(),
                report.joined().len(),
                report.empty_pages()
            );
        }
        println!("{}", report.joined());
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let config = build_config(&cli).await?;

    // ── Run analysis ─────────────────────────────────────────────────────
    let spinner = if show_progress {
        Some(make_spinner(&cli.input))
    } else {
        None
    };

    let result = analyze(&cli.input, &config).await;

    if let Some(ref bar) = spinner {
        bar.finish_and_clear();
    }

    let output = result.context("Analysis failed")?;

    // ── Render ───────────────────────────────────────────────────────────
    let rendered = if cli.json {
        serde_json::to_string_pretty(&output).context("Failed to serialise output")? + "\n"
    } else {
        render_analysis(&output)
    };

    match cli.output {
        Some(ref path) => {
            write_atomic(path, &rendered).await?;
            if !cli.quiet {
                eprintln!(
                    "{}  {} biomarkers  {}ms  →  {}",
                    green("✔"),
                    output.biomarkers.len(),
                    output.stats.total_duration_ms,
                    bold(&path.display().to_string()),
                );
            }
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(rendered.as_bytes())
                .context("Failed to write to stdout")?;
        }
    }

    if !cli.quiet && !cli.json {
        eprintln!(
            "   {}",
            dim(&format!(
                "{} pages · {} chars · extraction {} attempt(s) · {}ms total",
                output.stats.page_count,
                output.stats.report_chars,
                output.stats.extraction_attempts,
                output.stats.total_duration_ms
            ))
        );
    }

    Ok(())
}

/// Map CLI args to `AnalysisConfig`.
async fn build_config(cli: &Cli) -> Result<AnalysisConfig> {
    let mut builder = AnalysisConfig::builder()
        .model(&cli.model)
        .max_attempts(cli.max_attempts)
        .retry_delay_ms(cli.retry_delay_ms)
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout)
        .skip_explanation(cli.extract_only);

    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key);
    }

    if let Some(ref path) = cli.extraction_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read extraction prompt from {path:?}"))?;
        builder = builder.extraction_prompt(prompt);
    }

    if let Some(ref path) = cli.explanation_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read explanation prompt from {path:?}"))?;
        builder = builder.explanation_prompt(prompt);
    }

    builder.build().context("Invalid configuration")
}

fn make_spinner(input: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.set_prefix("Analysing");
    bar.set_message(input.to_string());
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

/// Render the analysis as human-readable text.
fn render_analysis(output: &AnalysisOutput) -> String {
    let mut out = String::new();

    out.push_str(&format!("{}\n", bold("Extracted Biomarkers")));
    if output.biomarkers.is_empty() {
        out.push_str("  (none found)\n");
    } else {
        // Column widths sized to the content so values line up.
        let name_w = output
            .biomarkers
            .biomarkers
            .iter()
            .map(|b| b.name.chars().count())
            .max()
            .unwrap_or(0)
            .max(4);
        let value_w = output
            .biomarkers
            .biomarkers
            .iter()
            .map(|b| b.value.chars().count())
            .max()
            .unwrap_or(0)
            .max(5);

        for b in &output.biomarkers.biomarkers {
            out.push_str(&format!(
                "  {:<name_w$}  {:<value_w$}  {}\n",
                b.name,
                b.value,
                dim(&format!("ref {}  ·  {}", blank_dash(&b.reference_range), blank_dash(&b.test_name))),
            ));
        }
    }

    if let Some(ref explanation) = output.explanation {
        out.push_str(&format!("\n{}\n{}\n", bold("Explanation"), explanation.trim_end()));
    }
    if let Some(ref e) = output.explanation_error {
        out.push_str(&format!("\n{} {}\n", red("✗ Explanation failed:"), e));
    }

    out
}

/// Placeholder for fields the model left empty.
fn blank_dash(s: &str) -> &str {
    if s.trim().is_empty() {
        "—"
    } else {
        s
    }
}

/// Atomic write: temp file in the same directory, then rename.
async fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory {parent:?}"))?;
        }
    }

    let tmp_path = path.with_extension("tmp");
    tokio::fs::write(&tmp_path, contents)
        .await
        .with_context(|| format!("Failed to write {tmp_path:?}"))?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("Failed to move output into place at {path:?}"))?;
    Ok(())
}
