//! CLI binary for edgequake-ocrbatch.
//!
//! A thin shim over the library crate that maps CLI flags onto
//! `ExtractionConfig` / `BatchConfig` and prints results.

use anyhow::{bail, Context, Result};
use clap::Parser;
use edgequake_ocrbatch::upload::{self, Upload};
use edgequake_ocrbatch::{
    Attachment, BatchConfig, Batcher, DispatchConfig, Dispatcher, Document, DocumentKind,
    ExtractionConfig, ExtractionPipeline, ExtractionProgressCallback, ProgressCallback,
    TesseractEngine, TokenCounter, TokenEncoding, DEFAULT_TOKEN_CEILING,
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner until the page count is known, then
/// a bar advanced once per recognised page.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening document…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, total_pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} pages  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");
        self.bar.set_length(total_pages as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("OCR");
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, text_len: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{text_len:>5} chars")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            red("✗"),
            page_num,
            total,
            red(error),
        ));
        self.bar.abandon();
    }

    fn on_extraction_complete(&self, _total_pages: usize, _text_len: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # OCR a scanned PDF to stdout
  ocrbatch scan.pdf

  # Upload-style JSON (data URL, pathname, contentType, text); enforces the 5 MB limit
  ocrbatch --json receipt.jpg

  # Show the token-bounded batches the text would be sent as
  ocrbatch --batch --ceiling 4000 report.pdf

  # Send the batches to a chat endpoint and print the combined reply
  ocrbatch --endpoint http://localhost:3000/api/chat --attachment https://cdn/x.png scan.pdf

ENVIRONMENT VARIABLES:
  OCRBATCH_ENDPOINT     Chat endpoint for --endpoint
  OCRBATCH_CEILING      Token ceiling per batch (default 4000)
  OCRBATCH_TESSERACT    Path to the tesseract executable
  OCRBATCH_PDFIUM_LIB   Path to libpdfium (file or directory)
  RUST_LOG              Overrides the log filter
"#;

/// OCR images and PDFs, then batch the text under a token ceiling.
#[derive(Parser, Debug)]
#[command(
    name = "ocrbatch",
    version,
    about = "OCR images and PDFs, then batch the text under a token ceiling",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local JPEG, PNG or PDF file.
    input: PathBuf,

    /// Declared media type. Sniffed from the file's magic bytes if not set.
    #[arg(long, env = "OCRBATCH_CONTENT_TYPE")]
    content_type: Option<String>,

    /// Print the upload response JSON instead of plain text.
    #[arg(long, env = "OCRBATCH_JSON")]
    json: bool,

    /// Print the token-bounded batches as JSON.
    #[arg(long, env = "OCRBATCH_BATCH")]
    batch: bool,

    /// Maximum tokens per text batch.
    #[arg(long, env = "OCRBATCH_CEILING", default_value_t = DEFAULT_TOKEN_CEILING)]
    ceiling: usize,

    /// BPE encoding used for counting tokens.
    #[arg(long, env = "OCRBATCH_ENCODING", value_enum, default_value = "cl100k-base")]
    encoding: EncodingArg,

    /// Attachment URL appended as the final batch. Repeatable.
    #[arg(long = "attachment", value_name = "URL")]
    attachments: Vec<String>,

    /// POST each batch to this endpoint and print the combined reply.
    #[arg(long, env = "OCRBATCH_ENDPOINT")]
    endpoint: Option<String>,

    /// PDF viewport scale used for rasterising (0.5–8.0).
    #[arg(long, env = "OCRBATCH_SCALE", default_value_t = 2.0)]
    scale: f32,

    /// Directory for scratch images. Defaults to the system temp dir.
    #[arg(long, env = "OCRBATCH_TEMP_DIR")]
    temp_dir: Option<PathBuf>,

    /// Path to the tesseract executable.
    #[arg(long, env = "OCRBATCH_TESSERACT", default_value = "tesseract")]
    tesseract: PathBuf,

    /// Path to libpdfium, or the directory containing it.
    #[arg(long, env = "OCRBATCH_PDFIUM_LIB")]
    pdfium_lib: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "OCRBATCH_PASSWORD")]
    password: Option<String>,

    /// Disable progress bar.
    #[arg(long, env = "OCRBATCH_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "OCRBATCH_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "OCRBATCH_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum EncodingArg {
    Cl100kBase,
    P50kBase,
    R50kBase,
}

impl From<EncodingArg> for TokenEncoding {
    fn from(v: EncodingArg) -> Self {
        match v {
            EncodingArg::Cl100kBase => TokenEncoding::Cl100kBase,
            EncodingArg::P50kBase => TokenEncoding::P50kBase,
            EncodingArg::R50kBase => TokenEncoding::R50kBase,
        }
    }
}

#[derive(Serialize)]
struct BatchView<'a> {
    role: &'a edgequake_ocrbatch::Role,
    tokens: usize,
    content: &'a str,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; --verbose always wins.
    let show_progress = !cli.quiet && !cli.no_progress;
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

    // ── Read input ───────────────────────────────────────────────────────
    let content = tokio::fs::read(&cli.input)
        .await
        .with_context(|| format!("Failed to read {:?}", cli.input))?;

    let content_type = match cli.content_type.clone() {
        Some(ct) => ct,
        None => match DocumentKind::sniff(&content) {
            Some(ct) => ct.to_string(),
            None => bail!(
                "Could not detect the type of {:?}; pass --content-type",
                cli.input
            ),
        },
    };

    if !TesseractEngine::new(cli.tesseract.clone()).is_available().await {
        bail!(
            "Cannot run {:?}; install tesseract or pass --tesseract /path/to/tesseract",
            cli.tesseract
        );
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;
    let pipeline = ExtractionPipeline::from_config(&config);

    // ── Extract ──────────────────────────────────────────────────────────
    let text = if cli.json {
        let filename = cli
            .input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let response = upload::process_upload(
            &pipeline,
            Upload {
                filename,
                content_type,
                content,
            },
        )
        .await
        .context("Extraction failed")?;

        if cli.batch || cli.endpoint.is_some() {
            response.text
        } else {
            println!(
                "{}",
                serde_json::to_string_pretty(&response).context("Failed to serialise response")?
            );
            return Ok(());
        }
    } else {
        pipeline
            .extract(&Document::new(content, content_type))
            .await
            .context("Extraction failed")?
    };

    if !cli.batch && cli.endpoint.is_none() {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(text.as_bytes())
            .context("Failed to write to stdout")?;
        return Ok(());
    }

    // ── Batch ────────────────────────────────────────────────────────────
    let batch_config = BatchConfig {
        ceiling: cli.ceiling,
        encoding: cli.encoding.clone().into(),
    };
    let batcher = Batcher::from_config(&batch_config).context("Invalid batch configuration")?;
    let attachments: Vec<Attachment> = cli.attachments.iter().map(Attachment::new).collect();
    let batches = batcher.batch(&text, &attachments);

    if !cli.quiet {
        eprintln!(
            "{} {} batches at ceiling {} ({})",
            green("✔"),
            batches.len(),
            batcher.ceiling(),
            batch_config.encoding
        );
    }

    // ── Dispatch or print ────────────────────────────────────────────────
    if let Some(endpoint) = cli.endpoint.clone() {
        let dispatcher = Dispatcher::new(DispatchConfig::new(endpoint));
        if !cli.quiet {
            eprintln!("{} sending to {}", dim("→"), dispatcher.endpoint());
        }
        let combined = dispatcher
            .dispatch(&batches)
            .await
            .context("Dispatch failed")?;
        print!("{combined}");
    } else {
        let view: Vec<BatchView<'_>> = batches
            .iter()
            .map(|b| BatchView {
                role: &b.role,
                tokens: batcher.counter().count_tokens(&b.content),
                content: &b.content,
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&view).context("Failed to serialise batches")?
        );
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .render_scale(cli.scale)
        .tesseract_path(cli.tesseract.clone());

    if let Some(ref dir) = cli.temp_dir {
        builder = builder.temp_dir(dir.clone());
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_lib_path(lib.clone());
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
