//! Per-job scratch directories.
//!
//! Every job gets its own directory under the scratch root. The staged input,
//! the engine's report, and anything else the engine drops next to its input
//! live there, and the whole directory goes away on [`StagedInput::release`]
//! or, failing that, when the handle is dropped.

use cerberus_core::{CerberusError, Result};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// Name of the scratch root under the system temp directory
pub const DEFAULT_SCRATCH_DIR_NAME: &str = "cerberus";

/// Used when the submitted name has nothing usable left after sanitizing
pub const FALLBACK_FILE_NAME: &str = "upload.bin";

const MAX_FILE_NAME_LEN: usize = 128;

/// Allocates isolated job directories under a scratch root
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new(std::env::temp_dir().join(DEFAULT_SCRATCH_DIR_NAME))
    }
}

impl Workspace {
    /// Use `root` as the scratch root; it is created on first use
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Scratch root
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `bytes` into a fresh job directory
    ///
    /// The file keeps a sanitized form of `suggested_name`. Two concurrent
    /// jobs with the same name never share a path.
    pub async fn stage(&self, bytes: &[u8], suggested_name: &str) -> Result<StagedInput> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| CerberusError::io(&self.root, e))?;

        let root = self.root.clone();
        let dir = tokio::task::spawn_blocking(move || {
            tempfile::Builder::new().prefix("job-").tempdir_in(root)
        })
        .await
        .map_err(|e| CerberusError::io(&self.root, std::io::Error::other(e)))?
        .map_err(|e| CerberusError::io(&self.root, e))?;

        let input = dir.path().join(sanitize_file_name(suggested_name));
        tokio::fs::write(&input, bytes)
            .await
            .map_err(|e| CerberusError::io(&input, e))?;

        debug!(path = %input.display(), bytes = bytes.len(), "staged input");
        Ok(StagedInput { dir, input })
    }
}

/// An input file sitting in its own job directory
#[derive(Debug)]
pub struct StagedInput {
    dir: TempDir,
    input: PathBuf,
}

impl StagedInput {
    /// Path handed to the engine
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.input
    }

    /// Job directory holding the input and the engine's output
    #[must_use]
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Remove the job directory and everything in it
    pub async fn release(self) -> Result<()> {
        let dir = self.dir.path().to_path_buf();
        let handle = self.dir;
        tokio::task::spawn_blocking(move || handle.close())
            .await
            .map_err(|e| CerberusError::io(&dir, std::io::Error::other(e)))?
            .map_err(|e| CerberusError::io(&dir, e))?;
        debug!(dir = %dir.display(), "released job directory");
        Ok(())
    }
}

/// Reduce a client-supplied name to a safe single path component
///
/// Directory parts are dropped, anything outside `[A-Za-z0-9._-]` becomes
/// `_`, and leading dots are stripped so the result is never `..` or hidden.
#[must_use]
pub fn sanitize_file_name(suggested: &str) -> String {
    let base = suggested.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_FILE_NAME_LEN)
        .collect();

    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        FALLBACK_FILE_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("model.onnx"), "model.onnx");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\models\\net.dll"), "net.dll");
        assert_eq!(sanitize_file_name("my model (v2).so"), "my_model__v2_.so");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name(".."), FALLBACK_FILE_NAME);
        assert_eq!(sanitize_file_name(""), FALLBACK_FILE_NAME);
        assert_eq!(sanitize_file_name("dir/"), FALLBACK_FILE_NAME);
        assert_eq!(sanitize_file_name(&"a".repeat(500)).len(), MAX_FILE_NAME_LEN);
    }

    #[tokio::test]
    async fn test_stage_and_release() {
        let scratch = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(scratch.path().join("jobs"));

        let staged = workspace.stage(b"\x7fELF", "net.so").await.unwrap();
        assert!(staged.path().starts_with(workspace.root()));
        assert_eq!(staged.path().file_name().unwrap(), "net.so");
        assert_eq!(std::fs::read(staged.path()).unwrap(), b"\x7fELF");

        let dir = staged.dir().to_path_buf();
        std::fs::write(dir.join("net.so.analysis.json"), "{}").unwrap();
        staged.release().await.unwrap();
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_same_name_gets_distinct_paths() {
        let scratch = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(scratch.path());

        let a = workspace.stage(b"a", "same.bin").await.unwrap();
        let b = workspace.stage(b"b", "same.bin").await.unwrap();
        assert_ne!(a.path(), b.path());
        assert_eq!(std::fs::read(a.path()).unwrap(), b"a");
        assert_eq!(std::fs::read(b.path()).unwrap(), b"b");
    }

    #[tokio::test]
    async fn test_dropped_handle_cleans_up() {
        let scratch = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(scratch.path());

        let staged = workspace.stage(b"x", "x.bin").await.unwrap();
        let dir = staged.dir().to_path_buf();
        drop(staged);
        assert!(!dir.exists());
    }
}
