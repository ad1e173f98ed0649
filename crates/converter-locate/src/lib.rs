//! # converter-locate
//!
//! Find an external converter executable (Pandoc by default) the way a shell
//! would, and ask it for its version string.
//!
//! ## How it works
//!
//! [`locate`] resolves a program name to an absolute path:
//!
//! 1. If `TEX2DOCX_CONVERTER_PATH` names an existing executable, use it.
//! 2. If the program name contains a path separator, check it directly.
//! 3. Otherwise walk each directory of `PATH` in order and return the first
//!    executable candidate (`PATHEXT` suffixes are tried on Windows).
//!
//! [`query_version`] runs `<program> <flag>` with stdin closed and returns the
//! first line of the combined stdout/stderr. A query that outlives its
//! timeout is killed and reported as [`LocateError::TimedOut`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use converter_locate::{locate, query_version};
//! use std::time::Duration;
//!
//! if let Some(path) = locate("pandoc") {
//!     let line = query_version(&path, "-v", Duration::from_secs(10))
//!         .unwrap_or_else(|e| e.to_string());
//!     println!("{} -> {}", path.display(), line);
//! }
//! ```
//!
//! ## Environment variable overrides
//!
//! - `TEX2DOCX_CONVERTER_PATH`: path to the converter binary; skips the
//!   `PATH` search when it points at an executable file.

use std::ffi::{OsStr, OsString};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use thiserror::Error;

// ── Public constants ─────────────────────────────────────────────────────────

/// Environment variable that pins the converter to an explicit path.
pub const OVERRIDE_ENV: &str = "TEX2DOCX_CONVERTER_PATH";

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned by [`query_version`].
#[derive(Error, Debug)]
pub enum LocateError {
    /// The binary exists but could not be started.
    #[error("{program} {flag} failed: {source}")]
    Spawn {
        program: String,
        flag: String,
        #[source]
        source: std::io::Error,
    },

    /// The binary ran but exited unsuccessfully.
    #[error("{program} {flag} failed: exit status {status}{}", detail_suffix(.detail))]
    NonZeroExit {
        program: String,
        flag: String,
        status: String,
        detail: String,
    },

    /// The binary was still running when the timeout expired and was killed.
    #[error("{program} {flag} failed: timed out after {secs}s")]
    TimedOut {
        program: String,
        flag: String,
        secs: u64,
    },

    /// The binary ran successfully but printed nothing.
    #[error("{program} {flag} failed: no output")]
    EmptyOutput { program: String, flag: String },
}

fn detail_suffix(detail: &str) -> String {
    if detail.is_empty() {
        String::new()
    } else {
        format!(": {detail}")
    }
}

// ── Public API ───────────────────────────────────────────────────────────────

/// Resolve `program` using the override variable, then the process `PATH`.
///
/// Returns `None` when nothing executable is found. Never panics and never
/// spawns a process.
pub fn locate(program: &str) -> Option<PathBuf> {
    locate_with(
        program,
        std::env::var_os(OVERRIDE_ENV).as_deref(),
        std::env::var_os("PATH").as_deref(),
    )
}

/// Resolve `program` with an explicit override path and search path.
///
/// An override that is missing, empty or not executable is ignored and the
/// search path is walked as usual.
pub fn locate_with(
    program: &str,
    override_path: Option<&OsStr>,
    search_path: Option<&OsStr>,
) -> Option<PathBuf> {
    if let Some(p) = override_path.filter(|p| !p.is_empty()) {
        let p = PathBuf::from(p);
        if is_executable(&p) {
            return Some(absolutize(p));
        }
    }
    locate_in(program, search_path)
}

/// Resolve `program` against an explicit search path (a `PATH`-style list).
///
/// Ignores [`OVERRIDE_ENV`]. Empty entries in the list are skipped rather
/// than treated as the current directory.
pub fn locate_in(program: &str, search_path: Option<&OsStr>) -> Option<PathBuf> {
    if program.is_empty() {
        return None;
    }

    if has_separator(program) {
        let p = PathBuf::from(program);
        return candidate_names(&p)
            .into_iter()
            .find(|c| is_executable(c))
            .map(absolutize);
    }

    let search_path = search_path?;
    for dir in std::env::split_paths(search_path) {
        if dir.as_os_str().is_empty() {
            continue;
        }
        for candidate in candidate_names(&dir.join(program)) {
            if is_executable(&candidate) {
                return Some(absolutize(candidate));
            }
        }
    }
    None
}

/// Run `<program> <flag>` and return the first line of its combined output.
///
/// Stdout is read before stderr; Pandoc prints its banner on stdout, other
/// tools sometimes use stderr. The child is killed when it is still running
/// after `timeout`.
pub fn query_version(program: &Path, flag: &str, timeout: Duration) -> Result<String, LocateError> {
    let program_name = program.display().to_string();
    let spawn_err = |source| LocateError::Spawn {
        program: program_name.clone(),
        flag: flag.to_string(),
        source,
    };

    let mut child = Command::new(program)
        .arg(flag)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(spawn_err)?;
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(LocateError::TimedOut {
                    program: program_name,
                    flag: flag.to_string(),
                    secs: timeout.as_secs(),
                });
            }
            Ok(None) => std::thread::sleep(POLL_INTERVAL),
            Err(source) => {
                let _ = child.kill();
                return Err(spawn_err(source));
            }
        }
    };

    let mut combined = collect(stdout);
    combined.push_str(&collect(stderr));
    let first = first_line(&combined);

    if !status.success() {
        return Err(LocateError::NonZeroExit {
            program: program_name,
            flag: flag.to_string(),
            status: status.to_string(),
            detail: first.unwrap_or_default(),
        });
    }

    first.ok_or(LocateError::EmptyOutput {
        program: program_name,
        flag: flag.to_string(),
    })
}

/// Returns `true` when `path` is a regular file the current user may execute.
pub fn is_executable(path: &Path) -> bool {
    let Ok(meta) = std::fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────────

fn has_separator(program: &str) -> bool {
    program.contains('/') || (cfg!(windows) && program.contains('\\'))
}

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Read a child pipe to the end on its own thread so neither stream can
/// fill up and stall the child.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

fn collect(handle: JoinHandle<Vec<u8>>) -> String {
    String::from_utf8_lossy(&handle.join().unwrap_or_default()).into_owned()
}

fn first_line(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim_end)
        .find(|l| !l.trim().is_empty())
        .map(str::to_string)
}

/// Candidate file names for `base`: the name itself, plus `PATHEXT` variants
/// on Windows when `base` has no extension.
fn candidate_names(base: &Path) -> Vec<PathBuf> {
    let mut out = vec![base.to_path_buf()];
    if cfg!(windows) && base.extension().is_none() {
        let exts = std::env::var_os("PATHEXT")
            .unwrap_or_else(|| OsString::from(".COM;.EXE;.BAT;.CMD"));
        for ext in exts.to_string_lossy().split(';').filter(|e| !e.is_empty()) {
            let mut name = base.as_os_str().to_os_string();
            name.push(ext.to_ascii_lowercase());
            out.push(PathBuf::from(name));
        }
    }
    out
}

fn absolutize(p: PathBuf) -> PathBuf {
    if p.is_absolute() {
        return p;
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(&p))
        .unwrap_or(p)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const QUERY_TIMEOUT: Duration = Duration::from_secs(10);

    #[cfg(unix)]
    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn empty_program_is_never_found() {
        assert_eq!(locate_in("", Some(OsStr::new("/usr/bin"))), None);
    }

    #[test]
    fn missing_search_path_finds_nothing() {
        assert_eq!(locate_in("pandoc", None), None);
    }

    #[test]
    fn first_line_skips_leading_blank_lines() {
        assert_eq!(
            first_line("\n\npandoc 3.1.9\nFeatures: +server\n").as_deref(),
            Some("pandoc 3.1.9")
        );
        assert_eq!(first_line("   \n"), None);
    }

    #[cfg(unix)]
    #[test]
    fn finds_executable_in_search_path_order() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        write_script(b.path(), "fakeconv", "exit 0");
        let first = write_script(a.path(), "fakeconv", "exit 0");

        let joined = std::env::join_paths([a.path(), b.path()]).unwrap();
        let found = locate_in("fakeconv", Some(&joined)).unwrap();
        assert_eq!(found, first);
    }

    #[cfg(unix)]
    #[test]
    fn skips_files_without_execute_bit() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("plainfile"), "not a program").unwrap();
        let joined = std::env::join_paths([dir.path()]).unwrap();
        assert_eq!(locate_in("plainfile", Some(&joined)), None);
    }

    #[cfg(unix)]
    #[test]
    fn skips_directories_with_the_program_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("pandoc")).unwrap();
        let joined = std::env::join_paths([dir.path()]).unwrap();
        assert_eq!(locate_in("pandoc", Some(&joined)), None);
    }

    #[cfg(unix)]
    #[test]
    fn program_with_separator_is_checked_directly() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "conv.sh", "exit 0");
        let found = locate_in(script.to_str().unwrap(), None).unwrap();
        assert_eq!(found, script);
    }

    #[cfg(unix)]
    #[test]
    fn query_version_returns_first_line() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "conv", "echo 'conv 1.2.3'\necho 'second line'");
        assert_eq!(query_version(&script, "-v", QUERY_TIMEOUT).unwrap(), "conv 1.2.3");
    }

    #[cfg(unix)]
    #[test]
    fn query_version_reads_stderr_when_stdout_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "conv", "echo 'conv 0.9' >&2");
        assert_eq!(query_version(&script, "-v", QUERY_TIMEOUT).unwrap(), "conv 0.9");
    }

    #[cfg(unix)]
    #[test]
    fn query_version_reports_non_zero_exit() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "conv", "echo 'bad flag' >&2\nexit 3");
        let err = query_version(&script, "-v", QUERY_TIMEOUT).unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, LocateError::NonZeroExit { .. }));
        assert!(msg.contains("-v failed"), "got: {msg}");
        assert!(msg.contains("bad flag"), "got: {msg}");
    }

    #[cfg(unix)]
    #[test]
    fn query_version_reports_empty_output() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "conv", "exit 0");
        let err = query_version(&script, "-v", QUERY_TIMEOUT).unwrap_err();
        assert!(matches!(err, LocateError::EmptyOutput { .. }));
    }

    #[test]
    fn query_version_reports_spawn_failure() {
        let err = query_version(Path::new("/definitely/not/here/conv"), "-v", QUERY_TIMEOUT).unwrap_err();
        assert!(matches!(err, LocateError::Spawn { .. }));
        assert!(err.to_string().contains("-v failed"));
    }

    #[cfg(unix)]
    #[test]
    fn query_version_kills_hung_program() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "conv", "exec sleep 30");
        let started = Instant::now();
        let err = query_version(&script, "-v", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, LocateError::TimedOut { secs: 1, .. }));
        assert!(err.to_string().contains("-v failed: timed out after 1s"));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[test]
    fn override_wins_over_search_path() {
        let on_path = tempfile::tempdir().unwrap();
        let pinned = tempfile::tempdir().unwrap();
        write_script(on_path.path(), "pandoc", "exit 0");
        let pinned_tool = write_script(pinned.path(), "my-pandoc", "exit 0");

        let joined = std::env::join_paths([on_path.path()]).unwrap();
        let found = locate_with("pandoc", Some(pinned_tool.as_os_str()), Some(&joined));
        assert_eq!(found, Some(pinned_tool));
    }

    #[cfg(unix)]
    #[test]
    fn missing_override_falls_back_to_search_path() {
        let on_path = tempfile::tempdir().unwrap();
        let tool = write_script(on_path.path(), "pandoc", "exit 0");
        let joined = std::env::join_paths([on_path.path()]).unwrap();

        let missing = on_path.path().join("not-there");
        assert_eq!(
            locate_with("pandoc", Some(missing.as_os_str()), Some(&joined)),
            Some(tool.clone())
        );
        assert_eq!(
            locate_with("pandoc", Some(OsStr::new("")), Some(&joined)),
            Some(tool)
        );
    }

    #[cfg(unix)]
    #[test]
    fn non_executable_override_falls_back_to_search_path() {
        let on_path = tempfile::tempdir().unwrap();
        let tool = write_script(on_path.path(), "pandoc", "exit 0");
        let plain = on_path.path().join("plain");
        std::fs::write(&plain, "not a program").unwrap();

        let joined = std::env::join_paths([on_path.path()]).unwrap();
        assert_eq!(
            locate_with("pandoc", Some(plain.as_os_str()), Some(&joined)),
            Some(tool)
        );
    }
}
