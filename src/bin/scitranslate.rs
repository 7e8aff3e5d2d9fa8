//! CLI binary for edgequake-scitranslate.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `TranslationConfig`, follows the session stages on a spinner, and
//! writes the translated text.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_scitranslate::output::write_atomic;
use edgequake_scitranslate::{
    extract_document, resolve_input, Orchestrator, OutputFormat, PageSelection,
    PageSeparator, ProgressCallback, RenderSummary, RenderUnit, SessionProgressCallback, Stage,
    TranslationConfig, TranslationOutput,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one spinner whose prefix shows the current
/// stage, plus a log line per finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl SessionProgressCallback for CliProgressCallback {
    fn on_session_start(&self, _session: u64, file_name: &str) {
        self.bar.set_message(file_name.to_string());
    }

    fn on_stage(&self, _session: u64, stage: Stage) {
        match stage {
            Stage::Complete => {
                self.bar.finish_and_clear();
                eprintln!("{} {}", green("✔"), bold("Translation complete"));
            }
            Stage::Idle => self.bar.finish_and_clear(),
            working => {
                if let Some(step) = working.step() {
                    self.bar
                        .println(format!("{} Step {step}/3  {}", cyan("◆"), working.label()));
                }
                self.bar.set_prefix(working.label());
            }
        }
    }

    fn on_page_extracted(&self, page_num: usize, total_pages: usize, text_len: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page_num,
            total_pages,
            dim(&format!("{text_len:>6} bytes")),
        ));
    }

    fn on_session_error(&self, _session: u64, error: &str) {
        self.bar.finish_and_clear();
        let first_line = error.lines().next().unwrap_or(error);
        eprintln!("{} {}", red("✘"), first_line);
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Translate a Vietnamese PDF to English (stdout)
  scitranslate bai-giang.pdf

  # Write the raw translation to a file
  scitranslate bai-giang.pdf -o translated_bai-giang.txt

  # Also render the translation with typeset math
  scitranslate bai-giang.pdf --html bai-giang.html

  # Write translated_<name>.txt into a directory
  scitranslate bai-giang.pdf --download-dir out/

  # Only extract the PDF text layer (no API key needed)
  scitranslate --extract-only bai-giang.pdf

  # Another language pair and model
  scitranslate --source-lang French --target-lang English --model gpt-4.1 cours.pdf

  # JSON output with render units
  scitranslate --json bai-giang.pdf > output.json

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (default provider)
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (gemini, openai, anthropic, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium (otherwise the system library is used)
  RUST_LOG                Override the log filter (e.g. edgequake_scitranslate=debug)
"#;

/// Translate scientific documents while preserving formulas.
#[derive(Parser, Debug)]
#[command(
    name = "scitranslate",
    version,
    about = "Translate scientific PDFs with an LLM, keeping every formula intact",
    long_about = "Extract the text of a scientific PDF, translate the prose with an LLM \
while leaving $…$ and $$…$$ math untouched, and render the result with typeset formulas. \
Supports Gemini, OpenAI, Anthropic, and any provider edgequake-llm can reach.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF or Word (.docx) document to translate.
    input: PathBuf,

    /// Write the translated text to this file instead of stdout.
    #[arg(short, long, env = "SCITRANSLATE_OUTPUT")]
    output: Option<PathBuf>,

    /// Write translated_<name>.txt into this directory.
    #[arg(long, env = "SCITRANSLATE_DOWNLOAD_DIR")]
    download_dir: Option<PathBuf>,

    /// Write a standalone HTML page with typeset formulas.
    #[arg(long, env = "SCITRANSLATE_HTML")]
    html: Option<PathBuf>,

    /// Output structured JSON (output, render units, summary) instead of text.
    #[arg(long, env = "SCITRANSLATE_JSON")]
    json: bool,

    /// Print the extracted text only, no translation.
    #[arg(long)]
    extract_only: bool,

    /// Output format label: docx or pdf. Both produce a plain-text download.
    #[arg(long, env = "SCITRANSLATE_FORMAT", value_enum, default_value = "docx")]
    format: FormatArg,

    /// LLM provider: gemini, openai, anthropic, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// LLM model ID (default: gemini-2.5-flash).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// Language of the source document.
    #[arg(long, env = "SCITRANSLATE_SOURCE_LANG", default_value = "Vietnamese")]
    source_lang: String,

    /// Language to translate into.
    #[arg(long, env = "SCITRANSLATE_TARGET_LANG", default_value = "English")]
    target_lang: String,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "SCITRANSLATE_PAGES", default_value = "all")]
    pages: String,

    /// Page separator: none, hr, comment, or custom string.
    #[arg(long, env = "SCITRANSLATE_SEPARATOR", default_value = "none")]
    separator: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "SCITRANSLATE_PASSWORD")]
    password: Option<String>,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "SCITRANSLATE_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Max LLM output tokens.
    #[arg(long, env = "SCITRANSLATE_MAX_TOKENS", default_value_t = 16384)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "SCITRANSLATE_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Pause in the reconstructing stage, in milliseconds.
    #[arg(long, env = "SCITRANSLATE_RECONSTRUCT_DELAY_MS", default_value_t = 500)]
    reconstruct_delay_ms: u64,

    /// Translation call timeout in seconds.
    #[arg(long, env = "SCITRANSLATE_API_TIMEOUT", default_value_t = 180)]
    api_timeout: u64,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SCITRANSLATE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "SCITRANSLATE_QUIET")]
    quiet: bool,

    /// Disable the stage spinner.
    #[arg(long, env = "SCITRANSLATE_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Docx,
    Pdf,
}

impl From<FormatArg> for OutputFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Docx => OutputFormat::Docx,
            FormatArg::Pdf => OutputFormat::Pdf,
        }
    }
}

/// Shape of `--json` output.
#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    output: &'a TranslationOutput,
    download_name: String,
    summary: RenderSummary,
    units: &'a [RenderUnit],
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner carries the stage feedback, so library INFO logs are
    // hidden while it is active.
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

    let input = cli.input.to_string_lossy().into_owned();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn SessionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb).await?;

    // ── Extract-only mode ────────────────────────────────────────────────
    if cli.extract_only {
        let extracted = extract_document(&input, &config)
            .await
            .context("Extraction failed")?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "pages": extracted.page_count,
                    "text": extracted.text,
                }))
                .context("Failed to serialise extracted text")?
            );
        } else {
            write_stdout(&extracted.text)?;
        }
        return Ok(());
    }

    // ── Run the session ──────────────────────────────────────────────────
    let document = resolve_input(&input).context("Cannot translate this file")?;
    let orchestrator = Orchestrator::new();
    let ticket = orchestrator.select_file(&document.name, &config);
    let output = orchestrator
        .run(&ticket, &document, &config)
        .await
        .context("Translation failed")?;

    let renderer = &config.formula_renderer;
    let units = output.render(renderer);
    let summary = RenderSummary::of(&units);

    if let Some(ref path) = cli.output {
        write_atomic(path, &output.translated_text)
            .await
            .context("Failed to write translated text")?;
    }
    if let Some(ref dir) = cli.download_dir {
        let path = output
            .write_download(dir)
            .await
            .context("Failed to write download")?;
        if !cli.quiet {
            eprintln!("{} {}", green("↓"), bold(&path.display().to_string()));
        }
    }
    if let Some(ref path) = cli.html {
        write_atomic(path, &output.to_html_page(renderer))
            .await
            .context("Failed to write HTML")?;
    }

    if cli.json {
        let report = JsonReport {
            output: &output,
            download_name: output.download_name(),
            summary,
            units: &units,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise output")?
        );
    } else if cli.output.is_none() {
        write_stdout(&output.translated_text)?;
    }

    if !cli.quiet && !cli.json {
        eprintln!(
            "   {} pages  {} formulas  {}  {}ms total",
            output.stats.pages,
            summary.formulas(),
            dim(&format!("download as {}", output.output_format.label())),
            output.stats.total_duration_ms,
        );
        if summary.failed_formulas > 0 {
            eprintln!(
                "   {} {} formulas could not be typeset and are shown as source",
                cyan("⚠"),
                summary.failed_formulas
            );
        }
    }

    Ok(())
}

fn write_stdout(text: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(text.as_bytes())
        .context("Failed to write to stdout")?;
    if !text.ends_with('\n') {
        handle.write_all(b"\n").ok();
    }
    Ok(())
}

/// Map CLI args to `TranslationConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<TranslationConfig> {
    let mut builder = TranslationConfig::builder()
        .source_language(&cli.source_lang)
        .target_language(&cli.target_lang)
        .pages(parse_pages(&cli.pages)?)
        .page_separator(parse_separator(&cli.separator))
        .output_format(cli.format.into())
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .reconstruct_delay_ms(cli.reconstruct_delay_ms)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!(
                "Invalid page range '{}-{}': start must be <= end",
                start,
                end
            );
        }
        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .context(format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;
        if let Some(&p) = pages.iter().find(|&&p| p < 1) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
        }
        return Ok(PageSelection::Set(pages));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }
    Ok(PageSelection::Single(page))
}

/// Parse `--separator` string into `PageSeparator`.
fn parse_separator(s: &str) -> PageSeparator {
    match s.to_lowercase().as_str() {
        "none" => PageSeparator::None,
        "hr" | "---" => PageSeparator::HorizontalRule,
        "comment" => PageSeparator::Comment,
        _ => PageSeparator::Custom(s.to_string()),
    }
}
