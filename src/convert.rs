//! Conversion entry points: the per-request orchestrator.
//!
//! A request moves through `Idle → Staged → Invoked → {Succeeded | Failed}`:
//!
//! 1. Check there is an upload with an acceptable name (no process spawned
//!    otherwise).
//! 2. Resolve the converter on the search path (no staging otherwise).
//! 3. Create a [`StagingDirectory`] and write the upload into it.
//! 4. Resolve a free output path, build the argument vector, run the tool.
//! 5. Read the produced file back into memory.
//!
//! The staging directory is owned by the call frame, so it is removed on
//! every exit path, including `?` returns and panics.

use crate::config::{ConversionOptions, ConverterConfig};
use crate::error::Tex2DocxError;
use crate::output::{ConversionOutput, ConversionStats, WrittenFile};
use crate::pipeline::stage::{self, StagingDirectory, UploadedDocument};
use crate::pipeline::{invoke, resolve};
use crate::probe::resolve_tool;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Convert an uploaded LaTeX document to DOCX.
///
/// This is the primary entry point for the library and the HTTP handler.
///
/// # Arguments
/// * `upload`: the uploaded file, or `None` when the form had no file
/// * `options`: the user's per-request choices
/// * `config`: how to run the converter
///
/// # Errors
/// See [`crate::error::ErrorKind`] for the classes. Every error is terminal
/// for this request and nothing is retried.
///
/// # Example
/// ```rust,no_run
/// use tex2docx::{convert, ConversionOptions, ConverterConfig, UploadedDocument};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let upload = UploadedDocument::new(std::fs::read("paper.tex")?, Some("paper.tex".into()));
/// let output = convert(Some(upload), &ConversionOptions::default(), &ConverterConfig::default()).await?;
/// std::fs::write(&output.file_name, &output.bytes)?;
/// # Ok(())
/// # }
/// ```
pub async fn convert(
    upload: Option<UploadedDocument>,
    options: &ConversionOptions,
    config: &ConverterConfig,
) -> Result<ConversionOutput, Tex2DocxError> {
    let result = convert_inner(upload, options, config).await;
    notify_failure(config, result)
}

/// Run the staged part of the pipeline inside a caller-owned staging
/// directory.
///
/// Skips the upload and tool checks of [`convert`]; `program` must already be
/// resolved. Useful when the caller wants to inspect or pre-populate the
/// staging directory.
pub async fn convert_in(
    staging: &StagingDirectory,
    program: &Path,
    upload: &UploadedDocument,
    options: &ConversionOptions,
    config: &ConverterConfig,
) -> Result<ConversionOutput, Tex2DocxError> {
    let result = run_staged(staging, program, upload, options, config, Instant::now()).await;
    notify_failure(config, result)
}

/// Convert a local `.tex` file and write the result to disk.
///
/// Writes atomically (unique temp file + rename) so a failed run never
/// leaves a half-written document. A write failure is reported to the
/// observer like any other failure. Without `output_path`, the file lands in the
/// current directory under the converted name, suffixed if it already exists.
pub async fn convert_to_file(
    input_path: impl AsRef<Path>,
    output_path: Option<&Path>,
    options: &ConversionOptions,
    config: &ConverterConfig,
) -> Result<WrittenFile, Tex2DocxError> {
    let input_path = input_path.as_ref();
    let read = tokio::fs::read(input_path)
        .await
        .map_err(|source| Tex2DocxError::InputReadFailed {
            path: input_path.to_path_buf(),
            source,
        });
    let bytes = notify_failure(config, read)?;
    let file_name = input_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned());

    let output = convert(Some(UploadedDocument::new(bytes, file_name)), options, config).await?;

    let written = write_output(output_path, &output).await;
    let path = notify_failure(config, written)?;
    info!("Wrote {} bytes to {}", output.bytes.len(), path.display());

    Ok(WrittenFile { path, output })
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    upload: Option<UploadedDocument>,
    options: &ConversionOptions,
    config: &ConverterConfig,
) -> Result<ConversionOutput, Tex2DocxError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Tex2DocxError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(upload, options, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn convert_inner(
    upload: Option<UploadedDocument>,
    options: &ConversionOptions,
    config: &ConverterConfig,
) -> Result<ConversionOutput, Tex2DocxError> {
    let started = Instant::now();

    // ── Step 1: Validate input ───────────────────────────────────────────
    let mut upload = upload.ok_or(Tex2DocxError::MissingInput)?;
    let input_name = stage::staged_file_name(upload.file_name.as_deref(), &config.default_input_name);
    stage::validate_extension(&input_name, &config.input_extension)?;
    upload.file_name = Some(input_name);

    // ── Step 2: Gate on the converter being installed ────────────────────
    let program = resolve_tool(config).ok_or_else(|| Tex2DocxError::ToolNotFound {
        program: config.program.clone(),
    })?;
    debug!("Using converter at {}", program.display());

    // ── Step 3: Per-request staging directory ────────────────────────────
    let staging = StagingDirectory::new()?;
    run_staged(&staging, &program, &upload, options, config, started).await
    // `staging` is dropped here; the directory goes with it.
}

async fn run_staged(
    staging: &StagingDirectory,
    program: &Path,
    upload: &UploadedDocument,
    options: &ConversionOptions,
    config: &ConverterConfig,
    started: Instant,
) -> Result<ConversionOutput, Tex2DocxError> {
    let input_name = stage::staged_file_name(upload.file_name.as_deref(), &config.default_input_name);
    info!("Starting conversion: {} ({} bytes)", input_name, upload.bytes.len());

    // ── Staged ───────────────────────────────────────────────────────────
    let input_path = staging.stage_upload(&upload.bytes, &input_name).await?;
    if let Some(ref o) = config.observer {
        o.on_staged(&input_path, upload.bytes.len());
    }

    // ── Resolve output path ──────────────────────────────────────────────
    let base = staging
        .path()
        .join(options.output_file_name(&config.output_extension));
    let output_path =
        resolve::next_available_path(&base).map_err(|source| Tex2DocxError::OutputReadFailed {
            path: base.clone(),
            source,
        })?;
    if output_path != base {
        debug!("{} is taken, writing {}", base.display(), output_path.display());
    }

    // ── Invoked ──────────────────────────────────────────────────────────
    let cmd = invoke::build_command_line(program, &input_path, &output_path, options, config);
    if let Some(ref o) = config.observer {
        o.on_invoked(&cmd.display());
    }
    let captured = invoke::run_converter(
        &cmd,
        Duration::from_secs(config.timeout_secs),
        config.max_captured_output,
    )
    .await?;

    // ── Succeeded: buffer the result ─────────────────────────────────────
    let bytes = invoke::read_output(&output_path, &cmd, &captured).await?;
    let file_name = output_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| options.output_file_name(&config.output_extension));

    let stats = ConversionStats {
        input_bytes: upload.bytes.len(),
        output_bytes: bytes.len(),
        converter_duration_ms: captured.duration_ms,
        total_duration_ms: started.elapsed().as_millis() as u64,
    };
    info!(
        "Conversion complete: {} ({} bytes) in {}ms",
        file_name, stats.output_bytes, stats.total_duration_ms
    );
    if let Some(ref o) = config.observer {
        o.on_succeeded(&file_name, bytes.len());
    }

    Ok(ConversionOutput {
        file_name,
        mime_type: config.output_mime.clone(),
        bytes,
        command: cmd.display(),
        tool_output: captured.combined(),
        stats,
    })
}

fn notify_failure<T>(
    config: &ConverterConfig,
    result: Result<T, Tex2DocxError>,
) -> Result<T, Tex2DocxError> {
    if let Err(ref e) = result {
        info!("Conversion failed ({:?}): {}", e.kind(), e);
        if let Some(ref o) = config.observer {
            o.on_failed(e.kind(), &e.to_string());
        }
    }
    result
}

async fn write_output(
    output_path: Option<&Path>,
    output: &ConversionOutput,
) -> Result<PathBuf, Tex2DocxError> {
    let path = match output_path {
        Some(p) => p.to_path_buf(),
        None => resolve::next_available_path(Path::new(&output.file_name)).map_err(|source| {
            Tex2DocxError::OutputWriteFailed {
                path: PathBuf::from(&output.file_name),
                source,
            }
        })?,
    };
    write_atomic(&path, &output.bytes).await?;
    Ok(path)
}

/// Write to a uniquely named sibling temp file, then rename over `path`, so
/// readers never see a partial file and concurrent writers never share a
/// temp file.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), Tex2DocxError> {
    let write_err = |source| Tex2DocxError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
            parent.to_path_buf()
        }
        None => PathBuf::from("."),
    };
    let prefix = format!(
        ".{}.",
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    );

    let target = path.to_path_buf();
    let bytes = bytes.to_vec();
    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let mut tmp = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(".tmp")
            .tempfile_in(&parent)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        // On error the temp file is dropped, which deletes it.
        tmp.persist(&target).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|e| Tex2DocxError::Internal(format!("Output writer panicked: {e}")))?
    .map_err(write_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_upload_is_reported_first() {
        let err = convert(None, &ConversionOptions::default(), &ConverterConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Tex2DocxError::MissingInput));
    }

    #[tokio::test]
    async fn wrong_extension_is_rejected_before_tool_lookup() {
        let config = ConverterConfig::builder()
            .program("definitely-not-installed-converter")
            .build()
            .unwrap();
        let upload = UploadedDocument::new(b"# hi".to_vec(), Some("notes.md".into()));
        let err = convert(Some(upload), &ConversionOptions::default(), &config)
            .await
            .unwrap_err();
        assert!(matches!(err, Tex2DocxError::InvalidUpload { .. }));
    }

    #[tokio::test]
    async fn atomic_write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("nested/out.docx");
        write_atomic(&dest, b"PK\x03\x04").await.unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"PK\x03\x04");
        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("nested"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("out.docx")]);
    }

    #[tokio::test]
    async fn atomic_write_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.docx");
        std::fs::write(&dest, b"old").unwrap();
        write_atomic(&dest, b"new").await.unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"new");
    }

    #[tokio::test]
    async fn atomic_write_into_a_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();
        let err = write_atomic(&blocker.join("out.docx"), b"x").await.unwrap_err();
        assert!(matches!(err, Tex2DocxError::OutputWriteFailed { .. }));
    }
}
