//! Shared helpers for the integration tests: stub converters and recorders.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tex2docx::{ConversionObserver, ConverterConfig, ErrorKind, ToolResolver};

/// Route library logs to the test harness. Filter with `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Resolver that always reports the converter as missing.
pub struct NotInstalled;

impl ToolResolver for NotInstalled {
    fn resolve(&self, _program: &str) -> Option<PathBuf> {
        None
    }
}

/// Resolver that always answers with one fixed path.
pub struct FixedPath(pub PathBuf);

impl ToolResolver for FixedPath {
    fn resolve(&self, _program: &str) -> Option<PathBuf> {
        Some(self.0.clone())
    }
}

/// Observer that records every event as a short string.
#[derive(Default)]
pub struct Recorder {
    pub events: Mutex<Vec<String>>,
    pub staged_paths: Mutex<Vec<PathBuf>>,
}

impl Recorder {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl ConversionObserver for Recorder {
    fn on_staged(&self, input_path: &Path, _bytes: usize) {
        self.staged_paths
            .lock()
            .unwrap()
            .push(input_path.to_path_buf());
        self.events.lock().unwrap().push("staged".into());
    }

    fn on_invoked(&self, _command: &str) {
        self.events.lock().unwrap().push("invoked".into());
    }

    fn on_succeeded(&self, file_name: &str, _bytes: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("succeeded:{file_name}"));
    }

    fn on_failed(&self, kind: ErrorKind, _message: &str) {
        self.events.lock().unwrap().push(format!("failed:{kind:?}"));
    }
}

/// Write an executable shell script named `pandoc` into `dir`.
///
/// The script is called as `pandoc <input> -o <output> [--mathml]`, so `$1`
/// is the staged input and `$3` the output path.
#[cfg(unix)]
pub fn stub_converter(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("pandoc");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Config that runs `converter` regardless of `PATH`.
pub fn config_with(converter: PathBuf, observer: Option<Arc<Recorder>>) -> ConverterConfig {
    let mut builder = ConverterConfig::builder()
        .resolver(Arc::new(FixedPath(converter)))
        .timeout_secs(10);
    if let Some(o) = observer {
        builder = builder.observer(o);
    }
    builder.build().unwrap()
}

/// Config whose converter is never found.
pub fn config_not_installed(observer: Option<Arc<Recorder>>) -> ConverterConfig {
    let mut builder = ConverterConfig::builder().resolver(Arc::new(NotInstalled));
    if let Some(o) = observer {
        builder = builder.observer(o);
    }
    builder.build().unwrap()
}
