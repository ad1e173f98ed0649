//! Input staging: put the uploaded bytes on disk where the converter can
//! read them.
//!
//! Pandoc only reads from paths, so every request gets a fresh
//! [`StagingDirectory`] backed by a [`tempfile::TempDir`]. The directory and
//! everything written into it (input, output, converter scratch files) is
//! removed when the guard is dropped, whichever way the request ends.

use crate::error::Tex2DocxError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// A file received from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedDocument {
    /// Raw content, staged verbatim.
    pub bytes: Vec<u8>,
    /// File name as sent by the client, if any.
    pub file_name: Option<String>,
}

impl UploadedDocument {
    pub fn new(bytes: impl Into<Vec<u8>>, file_name: Option<String>) -> Self {
        Self {
            bytes: bytes.into(),
            file_name,
        }
    }
}

/// Per-request scratch directory, deleted on drop.
#[derive(Debug)]
pub struct StagingDirectory {
    dir: TempDir,
}

impl StagingDirectory {
    /// Create a fresh, uniquely named directory under the system temp dir.
    pub fn new() -> Result<Self, Tex2DocxError> {
        let dir = tempfile::Builder::new()
            .prefix("tex2docx-")
            .tempdir()
            .map_err(|source| Tex2DocxError::StagingDirFailed { source })?;
        debug!("Created staging directory {}", dir.path().display());
        Ok(Self { dir })
    }

    /// Path of the directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `bytes` verbatim to `<dir>/<file_name>` and return that path.
    ///
    /// `file_name` must already be a bare file name (see [`staged_file_name`]).
    pub async fn stage_upload(
        &self,
        bytes: &[u8],
        file_name: &str,
    ) -> Result<PathBuf, Tex2DocxError> {
        let path = self.dir.path().join(file_name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| Tex2DocxError::StageWriteFailed {
                path: path.clone(),
                source,
            })?;
        debug!("Staged {} bytes at {}", bytes.len(), path.display());
        Ok(path)
    }

    /// Delete the directory now and report any error, instead of silently
    /// on drop.
    pub fn close(self) -> std::io::Result<()> {
        self.dir.close()
    }
}

/// The name an upload is staged under.
///
/// Uses the last path component of the client-supplied name, so a name such
/// as `../../x.tex` cannot escape the staging directory. Falls back to
/// `default_name` when nothing usable remains.
pub fn staged_file_name(suggested: Option<&str>, default_name: &str) -> String {
    let candidate = suggested
        .and_then(|s| s.rsplit(['/', '\\']).next())
        .map(|s| s.trim().to_string())
        .unwrap_or_default();
    match candidate.as_str() {
        "" | "." | ".." => default_name.to_string(),
        _ => candidate,
    }
}

/// Longest file name most filesystems accept, in bytes.
pub const MAX_FILE_NAME_BYTES: usize = 255;

/// Reject uploads whose name cannot be staged or does not end in
/// `.<extension>`.
///
/// Control characters (NUL included) and names longer than
/// [`MAX_FILE_NAME_BYTES`] are client errors, not staging failures.
pub fn validate_extension(file_name: &str, extension: &str) -> Result<(), Tex2DocxError> {
    if file_name.len() > MAX_FILE_NAME_BYTES {
        return Err(Tex2DocxError::InvalidUpload {
            reason: format!(
                "file name is {} bytes long (at most {MAX_FILE_NAME_BYTES} allowed)",
                file_name.len()
            ),
        });
    }
    if file_name.chars().any(char::is_control) {
        return Err(Tex2DocxError::InvalidUpload {
            reason: format!("{file_name:?} contains control characters"),
        });
    }
    let accepted = Path::new(file_name)
        .extension()
        .map(|e| e.to_string_lossy().eq_ignore_ascii_case(extension))
        .unwrap_or(false);
    if accepted {
        Ok(())
    } else {
        Err(Tex2DocxError::InvalidUpload {
            reason: format!("'{file_name}' is not a .{extension} file"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staged_name_defaults() {
        assert_eq!(staged_file_name(None, "main.tex"), "main.tex");
        assert_eq!(staged_file_name(Some(""), "main.tex"), "main.tex");
        assert_eq!(staged_file_name(Some("  "), "main.tex"), "main.tex");
        assert_eq!(staged_file_name(Some(".."), "main.tex"), "main.tex");
        assert_eq!(staged_file_name(Some("dir/"), "main.tex"), "main.tex");
    }

    #[test]
    fn staged_name_keeps_only_last_component() {
        assert_eq!(staged_file_name(Some("paper.tex"), "main.tex"), "paper.tex");
        assert_eq!(staged_file_name(Some("../../etc/x.tex"), "main.tex"), "x.tex");
        assert_eq!(staged_file_name(Some("C:\\work\\thesis.tex"), "main.tex"), "thesis.tex");
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        assert!(validate_extension("paper.tex", "tex").is_ok());
        assert!(validate_extension("PAPER.TEX", "tex").is_ok());
        assert!(validate_extension("paper.md", "tex").is_err());
        assert!(validate_extension("tex", "tex").is_err());
    }

    #[test]
    fn unstageable_names_are_invalid_uploads() {
        for name in ["a\0b.tex", "line\nbreak.tex", "tab\there.tex", "bell\u{7}.tex"] {
            let err = validate_extension(name, "tex").unwrap_err();
            assert!(matches!(err, Tex2DocxError::InvalidUpload { .. }), "{name:?}");
        }

        let longest = format!("{}.tex", "a".repeat(MAX_FILE_NAME_BYTES - 4));
        assert!(validate_extension(&longest, "tex").is_ok());
        let too_long = format!("{}.tex", "a".repeat(MAX_FILE_NAME_BYTES));
        let err = validate_extension(&too_long, "tex").unwrap_err();
        assert!(matches!(err, Tex2DocxError::InvalidUpload { .. }));
        assert!(err.to_string().contains("at most 255"));
    }

    #[tokio::test]
    async fn staged_bytes_are_identical() {
        let staging = StagingDirectory::new().unwrap();
        // Invalid UTF-8, NULs, CRLF: nothing may be transcoded.
        let bytes: Vec<u8> = vec![0xff, 0xfe, 0x00, b'\\', b'a', b'\r', b'\n', 0xc3, 0x28];
        let path = staging.stage_upload(&bytes, "main.tex").await.unwrap();
        assert_eq!(path, staging.path().join("main.tex"));
        assert_eq!(std::fs::read(&path).unwrap(), bytes);
    }

    #[tokio::test]
    async fn directory_is_removed_on_drop() {
        let staging = StagingDirectory::new().unwrap();
        let dir = staging.path().to_path_buf();
        staging.stage_upload(b"x", "main.tex").await.unwrap();
        assert!(dir.exists());
        drop(staging);
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn write_failure_names_the_path() {
        let staging = StagingDirectory::new().unwrap();
        let err = staging
            .stage_upload(b"x", "missing-subdir/main.tex")
            .await
            .unwrap_err();
        assert!(matches!(err, Tex2DocxError::StageWriteFailed { .. }));
        assert!(err.to_string().contains("missing-subdir"));
    }

    #[test]
    fn separate_requests_get_separate_directories() {
        let a = StagingDirectory::new().unwrap();
        let b = StagingDirectory::new().unwrap();
        assert_ne!(a.path(), b.path());
        a.close().unwrap();
        b.close().unwrap();
    }
}
