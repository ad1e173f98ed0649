//! Error types for the tex2docx library.
//!
//! Every fatal condition is a [`Tex2DocxError`] variant. Variants are grouped
//! by the pipeline stage that raises them, and each one classifies into a
//! coarse [`ErrorKind`] so the HTTP layer and the CLI can decide how to
//! present it without matching on every variant.
//!
//! Messages are written for the person at the form: they carry the path,
//! the command line and whatever the converter printed, so a failure can be
//! diagnosed from the error text alone.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a [`Tex2DocxError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Nothing usable was uploaded. No process was spawned.
    MissingInput,
    /// The converter is not installed. No process was spawned.
    ToolNotFound,
    /// Staging or reading back the result failed.
    Io,
    /// The converter ran and failed, hung, or lied about success.
    ExternalTool,
    /// The configuration was rejected before any request ran.
    Config,
}

/// All fatal errors returned by the tex2docx library.
#[derive(Debug, Error)]
pub enum Tex2DocxError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The request carried no file.
    #[error("No file was uploaded.\nChoose a .tex file and submit the form again.")]
    MissingInput,

    /// The request body exceeded the configured upload limit.
    #[error("Upload exceeds the {limit}-byte limit")]
    UploadTooLarge { limit: usize },

    /// The request carried something that is not an acceptable upload.
    #[error("Invalid upload: {reason}")]
    InvalidUpload { reason: String },

    // ── Environment errors ────────────────────────────────────────────────
    /// The converter binary is not on the search path.
    #[error(
        "Converter '{program}' was not found on PATH.\n\n\
Install it and restart the server, for example:\n\
  • Debian/Ubuntu:  apt-get install pandoc\n\
  • macOS:          brew install pandoc\n\
  • Windows:        winget install --id JohnMacFarlane.Pandoc\n\
Or set TEX2DOCX_CONVERTER_PATH=/path/to/{program}.\n"
    )]
    ToolNotFound { program: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not read a local input file (CLI).
    #[error("Failed to read input file '{path}': {source}")]
    InputReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create the per-request staging directory.
    #[error("Failed to create staging directory: {source}")]
    StagingDirFailed {
        #[source]
        source: std::io::Error,
    },

    /// Could not write the uploaded bytes into the staging directory.
    #[error("Failed to stage upload at '{path}': {source}")]
    StageWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not read the converter's output back into memory.
    #[error("Failed to read converted file '{path}': {source}")]
    OutputReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not write a converted file to its final destination (CLI).
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Converter errors ──────────────────────────────────────────────────
    /// The converter was found but could not be started.
    #[error("Failed to start converter: {source}\nCommand: {command}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The converter exited with a non-zero status.
    #[error("Converter failed ({status}).\nCommand: {command}\n\n{output}")]
    ConverterFailed {
        command: String,
        status: String,
        exit_code: Option<i32>,
        output: String,
    },

    /// The converter reported success but the output file is not there.
    #[error(
        "Converter exited successfully but produced no file at '{path}'.\nCommand: {command}\n\n{output}"
    )]
    OutputMissing {
        command: String,
        path: PathBuf,
        output: String,
    },

    /// The converter did not finish within the configured timeout.
    #[error("Converter timed out after {secs}s and was stopped.\nCommand: {command}")]
    ConverterTimedOut { command: String, secs: u64 },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Tex2DocxError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingInput | Self::UploadTooLarge { .. } | Self::InvalidUpload { .. } => {
                ErrorKind::MissingInput
            }
            Self::ToolNotFound { .. } => ErrorKind::ToolNotFound,
            Self::InputReadFailed { .. }
            | Self::StagingDirFailed { .. }
            | Self::StageWriteFailed { .. }
            | Self::OutputReadFailed { .. }
            | Self::OutputWriteFailed { .. }
            | Self::Internal(_) => ErrorKind::Io,
            Self::SpawnFailed { .. }
            | Self::ConverterFailed { .. }
            | Self::OutputMissing { .. }
            | Self::ConverterTimedOut { .. } => ErrorKind::ExternalTool,
            Self::InvalidConfig(_) => ErrorKind::Config,
        }
    }

    /// Whatever the converter printed, when the error carries it.
    pub fn tool_output(&self) -> Option<&str> {
        match self {
            Self::ConverterFailed { output, .. } | Self::OutputMissing { output, .. } => {
                Some(output.as_str())
            }
            _ => None,
        }
    }
}
