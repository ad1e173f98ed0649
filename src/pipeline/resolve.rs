//! Output path resolution.
//!
//! The staging directory is private to one request, so the base path is
//! almost always free. When it is not (the upload itself is called
//! `output.docx`, say) we insert the smallest free integer after the stem:
//! `output.docx` → `output1.docx` → `output2.docx` …

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// First path in `base, stem1.ext, stem2.ext, …` that does not exist.
///
/// Only queries the filesystem; creates nothing. Errors only when the
/// existence check itself fails (e.g. permission denied on the directory).
pub fn next_available_path(base: &Path) -> std::io::Result<PathBuf> {
    if !base.try_exists()? {
        return Ok(base.to_path_buf());
    }

    let dir = base.parent().unwrap_or_else(|| Path::new(""));
    let stem = base.file_stem().unwrap_or_default();
    let ext = base.extension();

    let mut i: u64 = 1;
    loop {
        let candidate = dir.join(suffixed_name(stem, i, ext));
        if !candidate.try_exists()? {
            return Ok(candidate);
        }
        i += 1;
    }
}

fn suffixed_name(stem: &std::ffi::OsStr, i: u64, ext: Option<&std::ffi::OsStr>) -> OsString {
    let mut name = stem.to_os_string();
    name.push(i.to_string());
    if let Some(ext) = ext {
        name.push(".");
        name.push(ext);
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_path_is_returned_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("output.docx");
        assert_eq!(next_available_path(&base).unwrap(), base);
    }

    #[test]
    fn taken_path_gets_suffix_one() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("output.docx");
        std::fs::write(&base, b"old").unwrap();
        assert_eq!(
            next_available_path(&base).unwrap(),
            dir.path().join("output1.docx")
        );
    }

    #[test]
    fn picks_smallest_unused_suffix() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["output.docx", "output1.docx", "output2.docx", "output4.docx"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let got = next_available_path(&dir.path().join("output.docx")).unwrap();
        assert_eq!(got, dir.path().join("output3.docx"));
        assert!(!got.exists());
    }

    #[test]
    fn suffix_goes_after_stem_not_after_extension() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("report.v2.docx");
        std::fs::write(&base, b"").unwrap();
        assert_eq!(
            next_available_path(&base).unwrap(),
            dir.path().join("report.v21.docx")
        );
    }

    #[test]
    fn name_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("output");
        std::fs::write(&base, b"").unwrap();
        assert_eq!(next_available_path(&base).unwrap(), dir.path().join("output1"));
    }

    #[test]
    fn existing_directory_counts_as_taken() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("output.docx")).unwrap();
        assert_eq!(
            next_available_path(&dir.path().join("output.docx")).unwrap(),
            dir.path().join("output1.docx")
        );
    }
}
