//! Configuration types for LaTeX-to-DOCX conversion.
//!
//! Two structs split the knobs by lifetime:
//!
//! * [`ConverterConfig`] is fixed when the server (or CLI) starts: which
//!   program to run, which flags it understands, how long it may take.
//!   Built via [`ConverterConfigBuilder`], shared read-only between requests.
//! * [`ConversionOptions`] is what the user picks on the form for one
//!   request: the output base name and whether to pass the math flag.

use crate::error::Tex2DocxError;
use crate::observer::Observer;
use crate::probe::ToolResolver;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// MIME type of an Office Open XML word-processing document.
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Base name used when the user leaves the output name blank.
pub const DEFAULT_OUTPUT_BASE_NAME: &str = "output";

/// How to invoke the external converter.
///
/// # Example
/// ```rust
/// use tex2docx::ConverterConfig;
///
/// let config = ConverterConfig::builder()
///     .program("pandoc")
///     .timeout_secs(60)
///     .build()
///     .unwrap();
/// assert_eq!(config.math_flag, "--mathml");
/// ```
#[derive(Clone, Serialize)]
pub struct ConverterConfig {
    /// Converter executable name or path. Default: `pandoc`.
    pub program: String,

    /// Flag that precedes the output path. Default: `-o`.
    pub output_flag: String,

    /// Flag appended when math markup is requested. Default: `--mathml`.
    pub math_flag: String,

    /// Flag that makes the converter print its version. Default: `-v`.
    pub version_flag: String,

    /// Extension of produced files, without the dot. Default: `docx`.
    pub output_extension: String,

    /// MIME type reported for produced files. Default: [`DOCX_MIME`].
    pub output_mime: String,

    /// Accepted upload extension, without the dot. Default: `tex`.
    pub input_extension: String,

    /// Staged file name when the upload carries none. Default: `main.tex`.
    pub default_input_name: String,

    /// Wall-clock limit for one converter run in seconds. Default: 120.
    ///
    /// Pandoc can spin forever on some malformed inputs (runaway macro
    /// expansion). When the limit is hit the child is killed and the request
    /// fails with [`Tex2DocxError::ConverterTimedOut`].
    pub timeout_secs: u64,

    /// Wall-clock limit for the `<program> -v` diagnostics query in seconds.
    /// Default: 10.
    pub probe_timeout_secs: u64,

    /// Maximum bytes of stdout and of stderr kept for error messages.
    /// Default: 16 KiB each.
    pub max_captured_output: usize,

    /// Custom converter lookup. If None, searches `PATH`.
    #[serde(skip)]
    pub resolver: Option<Arc<dyn ToolResolver>>,

    /// Receives state-machine events for each conversion.
    #[serde(skip)]
    pub observer: Option<Observer>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            program: "pandoc".to_string(),
            output_flag: "-o".to_string(),
            math_flag: "--mathml".to_string(),
            version_flag: "-v".to_string(),
            output_extension: "docx".to_string(),
            output_mime: DOCX_MIME.to_string(),
            input_extension: "tex".to_string(),
            default_input_name: "main.tex".to_string(),
            timeout_secs: 120,
            probe_timeout_secs: 10,
            max_captured_output: 16 * 1024,
            resolver: None,
            observer: None,
        }
    }
}

impl fmt::Debug for ConverterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterConfig")
            .field("program", &self.program)
            .field("output_flag", &self.output_flag)
            .field("math_flag", &self.math_flag)
            .field("version_flag", &self.version_flag)
            .field("output_extension", &self.output_extension)
            .field("input_extension", &self.input_extension)
            .field("default_input_name", &self.default_input_name)
            .field("timeout_secs", &self.timeout_secs)
            .field("probe_timeout_secs", &self.probe_timeout_secs)
            .field("resolver", &self.resolver.as_ref().map(|_| "<dyn ToolResolver>"))
            .field("observer", &self.observer.as_ref().map(|_| "<dyn ConversionObserver>"))
            .finish()
    }
}

impl ConverterConfig {
    /// Create a new builder for `ConverterConfig`.
    pub fn builder() -> ConverterConfigBuilder {
        ConverterConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConverterConfig`].
#[derive(Debug)]
pub struct ConverterConfigBuilder {
    config: ConverterConfig,
}

impl ConverterConfigBuilder {
    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.config.program = program.into();
        self
    }

    pub fn output_flag(mut self, flag: impl Into<String>) -> Self {
        self.config.output_flag = flag.into();
        self
    }

    pub fn math_flag(mut self, flag: impl Into<String>) -> Self {
        self.config.math_flag = flag.into();
        self
    }

    pub fn version_flag(mut self, flag: impl Into<String>) -> Self {
        self.config.version_flag = flag.into();
        self
    }

    pub fn default_input_name(mut self, name: impl Into<String>) -> Self {
        self.config.default_input_name = name.into();
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    pub fn probe_timeout_secs(mut self, secs: u64) -> Self {
        self.config.probe_timeout_secs = secs;
        self
    }

    pub fn max_captured_output(mut self, bytes: usize) -> Self {
        self.config.max_captured_output = bytes.max(256);
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn ToolResolver>) -> Self {
        self.config.resolver = Some(resolver);
        self
    }

    pub fn observer(mut self, observer: Observer) -> Self {
        self.config.observer = Some(observer);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConverterConfig, Tex2DocxError> {
        let c = &self.config;
        for (name, value) in [
            ("program", &c.program),
            ("output flag", &c.output_flag),
            ("math flag", &c.math_flag),
            ("version flag", &c.version_flag),
        ] {
            if value.trim().is_empty() {
                return Err(Tex2DocxError::InvalidConfig(format!(
                    "{name} must not be empty"
                )));
            }
        }
        if c.timeout_secs == 0 || c.probe_timeout_secs == 0 {
            return Err(Tex2DocxError::InvalidConfig(
                "Timeouts must be ≥ 1 second".into(),
            ));
        }
        let suffix = format!(".{}", c.input_extension);
        if !c.default_input_name.to_ascii_lowercase().ends_with(&suffix) {
            return Err(Tex2DocxError::InvalidConfig(format!(
                "Default input name '{}' must end with '{}'",
                c.default_input_name, suffix
            )));
        }
        Ok(self.config)
    }
}

// ── Per-request options ──────────────────────────────────────────────────

/// Options the user chooses for one conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionOptions {
    /// Output file name without extension. Default: `output`.
    pub output_base_name: String,

    /// Pass the math flag so equations stay editable. Default: true.
    pub use_math_markup: bool,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            output_base_name: DEFAULT_OUTPUT_BASE_NAME.to_string(),
            use_math_markup: true,
        }
    }
}

impl ConversionOptions {
    /// The output base name after [`sanitize_base_name`].
    pub fn sanitized_base_name(&self) -> String {
        sanitize_base_name(&self.output_base_name)
    }

    /// `<sanitized base name>.<extension>`.
    pub fn output_file_name(&self, extension: &str) -> String {
        format!("{}.{}", self.sanitized_base_name(), extension)
    }
}

/// Clean a user-typed output name so it is a single safe file-name stem.
///
/// Keeps only the last path component, drops control characters, strips
/// trailing dots and spaces, and falls back to `output` when nothing is left.
pub fn sanitize_base_name(raw: &str) -> String {
    let last = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let cleaned: String = last.chars().filter(|c| !c.is_control()).collect();
    let cleaned = cleaned.trim_start().trim_end_matches(['.', ' ']);
    if cleaned.is_empty() {
        DEFAULT_OUTPUT_BASE_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}
