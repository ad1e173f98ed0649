//! Pipeline stages for LaTeX-to-DOCX conversion.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own against a real temporary directory.
//!
//! ## Data Flow
//!
//! ```text
//! upload ──▶ stage ──▶ resolve ──▶ invoke ──▶ bytes
//! (form)     (TempDir)  (name)     (pandoc)   (download)
//! ```
//!
//! 1. [`stage`]: write the upload into a per-request `TempDir`; the
//!    directory and everything in it disappear when the guard is dropped
//! 2. [`resolve`]: pick an output path that does not collide with anything
//!    already in the staging directory
//! 3. [`invoke`]: run the converter as a child process with a discrete
//!    argument vector and a timeout, then read the produced file back

pub mod invoke;
pub mod resolve;
pub mod stage;
