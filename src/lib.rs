//! # tex2docx
//!
//! Convert LaTeX documents to Word (`.docx`) through a small web form that
//! drives an external converter (pandoc by default).
//!
//! ## Why this crate?
//!
//! Pandoc already does the hard part. What it does not do is accept a file
//! from someone who has never opened a terminal, keep concurrent requests
//! from trampling each other's files, and explain what went wrong when the
//! LaTeX does not parse. This crate wraps one pandoc run per request in a
//! private staging directory and reports failures with the command line and
//! the tool's own output.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload (.tex)
//!  │
//!  ├─ 1. Check    upload present, name ends in .tex, converter on PATH
//!  ├─ 2. Stage    write bytes into a per-request TempDir
//!  ├─ 3. Resolve  output.docx, or output1.docx, output2.docx, … if taken
//!  ├─ 4. Invoke   pandoc <in> -o <out> [--mathml]   (argv, no shell, timeout)
//!  └─ 5. Return   .docx bytes; the TempDir is removed on every exit path
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tex2docx::{convert, ConversionOptions, ConverterConfig, UploadedDocument};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let upload = UploadedDocument::new(std::fs::read("paper.tex")?, Some("paper.tex".into()));
//!     let options = ConversionOptions {
//!         output_base_name: "paper".into(),
//!         use_math_markup: true,
//!     };
//!     let output = convert(Some(upload), &options, &ConverterConfig::default()).await?;
//!     std::fs::write(&output.file_name, &output.bytes)?;
//!     eprintln!("{} in {}ms", output.command, output.stats.total_duration_ms);
//!     Ok(())
//! }
//! ```
//!
//! ## Serving the form
//!
//! ```rust,no_run
//! use tex2docx::{server, ConverterConfig};
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let state = server::AppState::new(ConverterConfig::default(), server::ServerConfig::default());
//!     server::serve(state).await
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `tex2docx` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when embedding the library or the router:
//! ```toml
//! tex2docx = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod observer;
pub mod output;
pub mod pipeline;
pub mod probe;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    sanitize_base_name, ConversionOptions, ConverterConfig, ConverterConfigBuilder, DOCX_MIME,
};
pub use convert::{convert, convert_in, convert_sync, convert_to_file};
pub use error::{ErrorKind, Tex2DocxError};
pub use observer::{ConversionObserver, NoopObserver};
pub use output::{ConversionOutput, ConversionStats, WrittenFile};
pub use pipeline::stage::{StagingDirectory, UploadedDocument};
pub use probe::{probe, ProbeReport, SearchPathResolver, ToolResolver};
