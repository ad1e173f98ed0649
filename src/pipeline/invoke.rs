//! Converter invocation: build the argument vector, run the child process,
//! read the result back.
//!
//! ## Why a discrete argument vector?
//!
//! File names and the output name come from the client. Passing each piece
//! as its own `argv` entry means no shell ever sees them, so a file called
//! `x; rm -rf ~.tex` is just an odd file name.
//!
//! ## Timeouts
//!
//! The child runs under [`tokio::time::timeout`] with `kill_on_drop(true)`:
//! when the deadline passes the `output()` future is dropped and the process
//! is killed, so a hung converter cannot pin a request forever.

use crate::config::{ConversionOptions, ConverterConfig};
use crate::error::Tex2DocxError;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Program plus arguments, ready to spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl CommandLine {
    /// Human-readable rendering for logs and error messages.
    ///
    /// Arguments with spaces or quotes are single-quoted. Display only; the
    /// process is never started through a shell.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(|a| a.as_os_str()))
            .map(|s| quote_for_display(&s.to_string_lossy()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Everything the converter printed, plus how it exited.
#[derive(Debug, Clone, Default)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub status: String,
    pub duration_ms: u64,
}

impl CapturedOutput {
    /// Stdout and stderr joined by a newline, empty streams omitted.
    pub fn combined(&self) -> String {
        [self.stdout.trim_end(), self.stderr.trim_end()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// `[program, input, <output flag>, output, (<math flag>)]`.
pub fn build_command_line(
    program: &Path,
    input: &Path,
    output: &Path,
    options: &ConversionOptions,
    config: &ConverterConfig,
) -> CommandLine {
    let mut args: Vec<OsString> = vec![
        input.as_os_str().to_os_string(),
        OsString::from(&config.output_flag),
        output.as_os_str().to_os_string(),
    ];
    if options.use_math_markup {
        args.push(OsString::from(&config.math_flag));
    }
    CommandLine {
        program: program.to_path_buf(),
        args,
    }
}

/// Run the converter to completion.
///
/// Returns the captured output on exit status 0. Non-zero exit, spawn
/// failure and timeout are errors; none are retried.
pub async fn run_converter(
    cmd: &CommandLine,
    timeout: Duration,
    max_captured: usize,
) -> Result<CapturedOutput, Tex2DocxError> {
    let command = cmd.display();
    info!("Running converter: {}", command);

    let start = Instant::now();
    let mut child = Command::new(&cmd.program);
    child
        .args(&cmd.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = match tokio::time::timeout(timeout, child.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(source)) => {
            return Err(Tex2DocxError::SpawnFailed { command, source });
        }
        Err(_) => {
            warn!("Converter timed out after {}s: {}", timeout.as_secs(), command);
            return Err(Tex2DocxError::ConverterTimedOut {
                command,
                secs: timeout.as_secs(),
            });
        }
    };

    let captured = CapturedOutput {
        stdout: truncate_output(&String::from_utf8_lossy(&output.stdout), max_captured),
        stderr: truncate_output(&String::from_utf8_lossy(&output.stderr), max_captured),
        exit_code: output.status.code(),
        status: output.status.to_string(),
        duration_ms: start.elapsed().as_millis() as u64,
    };

    if !output.status.success() {
        warn!(
            "Converter failed ({}) after {}ms: {}",
            captured.status, captured.duration_ms, command
        );
        return Err(Tex2DocxError::ConverterFailed {
            command,
            status: captured.status.clone(),
            exit_code: captured.exit_code,
            output: captured.combined(),
        });
    }

    if !captured.stderr.trim().is_empty() {
        warn!("Converter warnings: {}", captured.stderr.trim_end());
    }
    debug!("Converter finished in {}ms", captured.duration_ms);
    Ok(captured)
}

/// Read the produced file fully into memory.
///
/// A missing file after exit status 0 is [`Tex2DocxError::OutputMissing`],
/// kept separate from a non-zero exit so the caller sees which signal lied.
pub async fn read_output(
    path: &Path,
    cmd: &CommandLine,
    captured: &CapturedOutput,
) -> Result<Vec<u8>, Tex2DocxError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Tex2DocxError::OutputMissing {
            command: cmd.display(),
            path: path.to_path_buf(),
            output: captured.combined(),
        }),
        Err(source) => Err(Tex2DocxError::OutputReadFailed {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn quote_for_display(s: &str) -> String {
    if !s.is_empty() && !s.chars().any(|c| c.is_whitespace() || "'\"\\$`;&|<>".contains(c)) {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Cut `s` to at most `max` bytes on a char boundary, noting what was dropped.
fn truncate_output(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}\n… [{} more bytes truncated]", &s[..cut], s.len() - cut)
}
