//! Diagnostics probe: is the converter installed, and which version is it?
//!
//! The probe never fails. A missing converter is reported as
//! `tool_path: None`; a converter that cannot be run is reported through a
//! synthesized `version_line` that embeds the failure text. Conversion code
//! uses [`resolve_tool`] to gate requests off before anything is staged.

use crate::config::ConverterConfig;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

/// Looks up the converter executable.
///
/// The default, [`SearchPathResolver`], walks `PATH`. Tests substitute stubs
/// to simulate a host without the converter or to point at a fake one.
pub trait ToolResolver: Send + Sync {
    /// Absolute path of `program`, or `None` when it is not installed.
    fn resolve(&self, program: &str) -> Option<PathBuf>;
}

/// Resolves programs through [`converter_locate::locate`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchPathResolver;

impl ToolResolver for SearchPathResolver {
    fn resolve(&self, program: &str) -> Option<PathBuf> {
        converter_locate::locate(program)
    }
}

/// Result of [`probe`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeReport {
    /// Program name the server is configured to run.
    pub program: String,
    /// Absolute path of the converter, if found.
    pub tool_path: Option<PathBuf>,
    /// First line of `<program> -v`, or a message describing why it failed.
    pub version_line: Option<String>,
    /// Dotted version number extracted from `version_line`.
    pub version: Option<String>,
    /// Host `os/arch`.
    pub platform: String,
    /// Version of this crate.
    pub server_version: String,
}

impl ProbeReport {
    /// `true` when the converter was found on the search path.
    pub fn is_available(&self) -> bool {
        self.tool_path.is_some()
    }
}

/// Resolve the configured converter with the configured resolver.
pub fn resolve_tool(config: &ConverterConfig) -> Option<PathBuf> {
    match config.resolver {
        Some(ref resolver) => resolver.resolve(&config.program),
        None => SearchPathResolver.resolve(&config.program),
    }
}

/// Locate the converter and query its version.
///
/// Spawns at most one short-lived child process, killed after
/// `probe_timeout_secs`. Runs on the blocking pool because both the
/// filesystem walk and the version query are synchronous.
pub async fn probe(config: &ConverterConfig) -> ProbeReport {
    let cfg = config.clone();
    match tokio::task::spawn_blocking(move || probe_blocking(&cfg)).await {
        Ok(report) => report,
        Err(e) => {
            warn!("Diagnostics probe task failed: {}", e);
            ProbeReport {
                version_line: Some(format!("probe task failed: {e}")),
                ..empty_report(config)
            }
        }
    }
}

/// Blocking implementation of [`probe`].
pub fn probe_blocking(config: &ConverterConfig) -> ProbeReport {
    let Some(path) = resolve_tool(config) else {
        debug!("Converter '{}' not found on search path", config.program);
        return empty_report(config);
    };

    let timeout = Duration::from_secs(config.probe_timeout_secs);
    let queried = converter_locate::query_version(&path, &config.version_flag, timeout);
    let version_line = match queried {
        Ok(line) => line,
        Err(e) => {
            warn!("Version query failed for {}: {}", path.display(), e);
            e.to_string()
        }
    };
    debug!("Converter at {}: {}", path.display(), version_line);

    ProbeReport {
        version: parse_version(&version_line),
        tool_path: Some(path),
        version_line: Some(version_line),
        ..empty_report(config)
    }
}

fn empty_report(config: &ConverterConfig) -> ProbeReport {
    ProbeReport {
        program: config.program.clone(),
        tool_path: None,
        version_line: None,
        version: None,
        platform: format!("{}/{}", std::env::consts::OS, std::env::consts::ARCH),
        server_version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

static VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d+\.\d+(?:\.\d+)*)\b").expect("valid regex"));

/// Extract the first dotted version number from a banner line.
///
/// `"pandoc 3.1.11.1"` → `"3.1.11.1"`, `"pandoc.exe 2.19"` → `"2.19"`.
pub fn parse_version(line: &str) -> Option<String> {
    VERSION_RE
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
