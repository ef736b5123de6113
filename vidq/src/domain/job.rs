//! Video job entity.

use std::path::{Path, PathBuf};

/// One pending or active upload.
///
/// Identity is the path; the title is descriptive only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoJob {
    path: PathBuf,
    title: String,
}

impl VideoJob {
    /// Create a job; the title is the file's base name without extension.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let title = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, title }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// File name with extension, for display.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Path relative to `root`, or the full path when it lies outside it.
    pub fn relative_to(&self, root: &Path) -> String {
        self.path
            .strip_prefix(root)
            .unwrap_or(&self.path)
            .display()
            .to_string()
    }

    /// Size of the file on disk, if it can be read.
    pub fn file_size(&self) -> std::io::Result<u64> {
        std::fs::metadata(&self.path).map(|m| m.len())
    }
}

impl std::fmt::Display for VideoJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path.display())
    }
}
