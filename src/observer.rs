//! Observer trait for per-request conversion events.
//!
//! Inject an [`Arc<dyn ConversionObserver>`] via
//! [`crate::config::ConverterConfigBuilder::observer`] to follow a request
//! through its states:
//!
//! ```text
//! Idle ──▶ Staged ──▶ Invoked ──▶ Succeeded
//!                              └─▶ Failed
//! ```
//!
//! `on_failed` also fires for requests that never reach `Invoked` (missing
//! upload, converter not installed, staging write error), so every request
//! ends with exactly one terminal event.
//!
//! # Example
//!
//! ```rust
//! use tex2docx::{ConversionObserver, ConverterConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingObserver {
//!     invoked: AtomicUsize,
//! }
//!
//! impl ConversionObserver for CountingObserver {
//!     fn on_invoked(&self, command: &str) {
//!         self.invoked.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("running: {command}");
//!     }
//! }
//!
//! let observer = Arc::new(CountingObserver { invoked: AtomicUsize::new(0) });
//!
//! let config = ConverterConfig::builder()
//!     .observer(observer as Arc<dyn ConversionObserver>)
//!     .build()
//!     .unwrap();
//! ```

use crate::error::ErrorKind;
use std::path::Path;
use std::sync::Arc;

/// Called by the orchestrator as a request moves through its states.
///
/// Implementations must be `Send + Sync`: the server runs requests
/// concurrently and shares one config between them. All methods have
/// default no-op implementations.
pub trait ConversionObserver: Send + Sync {
    /// Called once the upload is written to the staging directory.
    ///
    /// # Arguments
    /// * `input_path`: staged input file
    /// * `bytes`: number of bytes written
    fn on_staged(&self, input_path: &Path, bytes: usize) {
        let _ = (input_path, bytes);
    }

    /// Called immediately before the converter process is spawned.
    ///
    /// # Arguments
    /// * `command`: the command line, for display only
    fn on_invoked(&self, command: &str) {
        let _ = command;
    }

    /// Called after the output file has been read back.
    ///
    /// # Arguments
    /// * `file_name`: name offered for download
    /// * `bytes`: size of the produced file
    fn on_succeeded(&self, file_name: &str, bytes: usize) {
        let _ = (file_name, bytes);
    }

    /// Called when the request fails in any state.
    fn on_failed(&self, kind: ErrorKind, message: &str) {
        let _ = (kind, message);
    }
}

/// A no-op implementation for callers that don't need events.
pub struct NoopObserver;

impl ConversionObserver for NoopObserver {}

/// Convenience alias matching the type stored in [`crate::config::ConverterConfig`].
pub type Observer = Arc<dyn ConversionObserver>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl ConversionObserver for Recorder {
        fn on_staged(&self, _input_path: &Path, bytes: usize) {
            self.events.lock().unwrap().push(format!("staged:{bytes}"));
        }

        fn on_invoked(&self, _command: &str) {
            self.events.lock().unwrap().push("invoked".into());
        }

        fn on_failed(&self, kind: ErrorKind, _message: &str) {
            self.events.lock().unwrap().push(format!("failed:{kind:?}"));
        }
    }

    #[test]
    fn noop_observer_does_not_panic() {
        let o = NoopObserver;
        o.on_staged(Path::new("/tmp/main.tex"), 10);
        o.on_invoked("pandoc main.tex -o output.docx");
        o.on_succeeded("output.docx", 100);
        o.on_failed(ErrorKind::Io, "disk full");
    }

    #[test]
    fn recorder_sees_events_in_order() {
        let r = Recorder::default();
        r.on_staged(Path::new("main.tex"), 3);
        r.on_invoked("pandoc");
        r.on_succeeded("output.docx", 1);
        r.on_failed(ErrorKind::ExternalTool, "exit 2");
        assert_eq!(
            *r.events.lock().unwrap(),
            vec!["staged:3", "invoked", "failed:ExternalTool"]
        );
    }

    #[test]
    fn arc_dyn_observer_works() {
        let o: Observer = Arc::new(NoopObserver);
        o.on_invoked("pandoc -v");
    }
}
