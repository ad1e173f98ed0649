//! Result types returned by the conversion entry points.

use serde::Serialize;
use std::path::PathBuf;

/// A successfully converted document, fully buffered in memory.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionOutput {
    /// File name to offer for download, e.g. `output.docx` or `output1.docx`.
    pub file_name: String,
    /// MIME type of `bytes`.
    pub mime_type: String,
    /// The produced file.
    #[serde(skip)]
    pub bytes: Vec<u8>,
    /// Command line that produced it, for display.
    pub command: String,
    /// Anything the converter printed while succeeding (usually warnings).
    pub tool_output: String,
    /// Timing and size figures.
    pub stats: ConversionStats,
}

/// Timing and size figures for one conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversionStats {
    /// Size of the staged upload.
    pub input_bytes: usize,
    /// Size of the produced file.
    pub output_bytes: usize,
    /// Wall-clock time spent in the converter process.
    pub converter_duration_ms: u64,
    /// Wall-clock time from request start to bytes in memory.
    pub total_duration_ms: u64,
}

/// Where [`crate::convert::convert_to_file`] put its result.
#[derive(Debug, Clone, Serialize)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub output: ConversionOutput,
}
