//! CLI binary for tex2docx.
//!
//! A thin shim over the library crate: `serve` runs the web form,
//! `convert` runs one local file through the same pipeline, `doctor`
//! prints what the server would show in its diagnostics panel.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tex2docx::server::{self, AppState, ServerConfig};
use tex2docx::{
    convert_to_file, probe, ConversionObserver, ConversionOptions, ConverterConfig, ErrorKind,
};
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

// ── CLI observer using indicatif ─────────────────────────────────────────────

/// Terminal spinner that follows one conversion through its states.
struct SpinnerObserver {
    bar: ProgressBar,
}

impl SpinnerObserver {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Checking converter…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ConversionObserver for SpinnerObserver {
    fn on_staged(&self, _input_path: &Path, bytes: usize) {
        self.bar.set_prefix("Staged");
        self.bar.set_message(format!("{bytes} bytes"));
    }

    fn on_invoked(&self, command: &str) {
        self.bar.set_prefix("Converting");
        self.bar.set_message(command.to_string());
    }

    fn on_succeeded(&self, file_name: &str, bytes: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {}  {}",
            green("✔"),
            bold(file_name),
            dim(&format!("{bytes} bytes"))
        );
    }

    fn on_failed(&self, kind: ErrorKind, _message: &str) {
        self.bar.finish_and_clear();
        eprintln!("{} conversion failed ({kind:?})", red("✘"));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve the upload form on http://127.0.0.1:8501
  tex2docx serve

  # Listen on all interfaces with a shorter converter timeout
  tex2docx serve --bind 0.0.0.0:8080 --timeout 30

  # Convert one file (writes paper.docx, or paper1.docx if that exists)
  tex2docx convert paper.tex

  # Explicit output path, equations as images instead of MathML
  tex2docx convert paper.tex -o out/paper.docx --no-mathml

  # Is pandoc installed, and which version?
  tex2docx doctor --json

ENVIRONMENT VARIABLES:
  TEX2DOCX_BIND               Listen address for `serve`
  TEX2DOCX_CONVERTER          Converter program name (default: pandoc)
  TEX2DOCX_CONVERTER_PATH     Absolute path to the converter, skips PATH lookup
  TEX2DOCX_TIMEOUT            Converter timeout in seconds (default: 120)
  TEX2DOCX_MAX_UPLOAD_BYTES   Largest accepted upload (default: 20 MiB)
  RUST_LOG                    Overrides --verbose / --quiet log levels

SETUP:
  Install pandoc (https://pandoc.org/installing.html), then run `tex2docx doctor`.
"#;

/// Convert LaTeX documents to Word through a local web form.
#[derive(Parser, Debug)]
#[command(
    name = "tex2docx",
    version,
    about = "Convert LaTeX documents to Word (.docx) with pandoc",
    long_about = "Serve a small web form that converts uploaded .tex files to .docx with \
pandoc, or convert local files directly. Each conversion runs in its own temporary \
directory that is removed afterwards.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    converter: ConverterArgs,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "TEX2DOCX_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "TEX2DOCX_QUIET")]
    quiet: bool,
}

#[derive(Args, Debug)]
struct ConverterArgs {
    /// Converter program name or path.
    #[arg(long, global = true, env = "TEX2DOCX_CONVERTER", default_value = "pandoc")]
    converter: String,

    /// Converter timeout in seconds.
    #[arg(long, global = true, env = "TEX2DOCX_TIMEOUT", default_value_t = 120,
          value_parser = clap::value_parser!(u64).range(1..))]
    timeout: u64,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the upload form.
    Serve {
        /// Address to listen on.
        #[arg(long, env = "TEX2DOCX_BIND", default_value = "127.0.0.1:8501")]
        bind: SocketAddr,

        /// Largest accepted upload in bytes.
        #[arg(long, env = "TEX2DOCX_MAX_UPLOAD_BYTES", default_value_t = 20 * 1024 * 1024)]
        max_upload_bytes: usize,
    },

    /// Convert a local .tex file.
    Convert {
        /// LaTeX source file.
        input: PathBuf,

        /// Write the document here instead of `<input stem>.docx`.
        #[arg(short, long, env = "TEX2DOCX_OUTPUT")]
        output: Option<PathBuf>,

        /// Do not pass the MathML flag to the converter.
        #[arg(long, env = "TEX2DOCX_NO_MATHML")]
        no_mathml: bool,

        /// Print the conversion result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show whether the converter is installed and its version.
    Doctor {
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // A one-shot convert shows a spinner, so library INFO logs would only
    // interleave with it; the server has no spinner and keeps them.
    let show_progress = !cli.quiet && matches!(cli.command, Command::Convert { json: false, .. });
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

    match cli.command {
        Command::Serve {
            bind,
            max_upload_bytes,
        } => {
            let config = build_config(&cli.converter, None)?;
            let report = probe(&config).await;
            if !report.is_available() {
                tracing::warn!(
                    "Converter '{}' not found; conversions will fail until it is installed",
                    report.program
                );
            }

            let state = AppState::new(
                config,
                ServerConfig {
                    bind,
                    max_upload_bytes,
                },
            );
            server::serve(state).await.context("Server failed")?;
        }

        Command::Convert {
            ref input,
            ref output,
            no_mathml,
            json,
        } => {
            let observer: Option<Arc<dyn ConversionObserver>> = if show_progress {
                Some(SpinnerObserver::new() as Arc<dyn ConversionObserver>)
            } else {
                None
            };
            let config = build_config(&cli.converter, observer)?;

            let options = ConversionOptions {
                output_base_name: input
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                use_math_markup: !no_mathml,
            };

            let written = convert_to_file(input, output.as_deref(), &options, &config)
                .await
                .context("Conversion failed")?;

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&written).context("Failed to serialise output")?
                );
            } else if !cli.quiet {
                let tool_output = written.output.tool_output.trim();
                if !tool_output.is_empty() {
                    eprintln!("{}", dim(tool_output));
                }
                eprintln!(
                    "{}  {}ms  →  {}",
                    green("✔"),
                    written.output.stats.total_duration_ms,
                    bold(&written.path.display().to_string()),
                );
            }
        }

        Command::Doctor { json } => {
            let config = build_config(&cli.converter, None)?;
            let report = probe(&config).await;

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report).context("Failed to serialise report")?
                );
            } else {
                println!("Converter:    {}", report.program);
                match report.tool_path {
                    Some(ref p) => println!("Path:         {}", p.display()),
                    None => println!("Path:         {}", red("not found")),
                }
                if let Some(ref v) = report.version_line {
                    println!("Version:      {}", v);
                }
                println!("Platform:     {}", report.platform);
                println!("tex2docx:     {}", report.server_version);
            }

            if !report.is_available() {
                anyhow::bail!(
                    "'{}' is not installed. See https://pandoc.org/installing.html",
                    report.program
                );
            }
        }
    }

    Ok(())
}

/// Map CLI args to `ConverterConfig`.
fn build_config(
    args: &ConverterArgs,
    observer: Option<Arc<dyn ConversionObserver>>,
) -> Result<ConverterConfig> {
    let mut builder = ConverterConfig::builder()
        .program(args.converter.as_str())
        .timeout_secs(args.timeout);

    if let Some(o) = observer {
        builder = builder.observer(o);
    }

    builder.build().context("Invalid configuration")
}
