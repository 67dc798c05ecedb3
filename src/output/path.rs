//! Deterministic artifact paths
//!
//! Every artifact lands directly in the output directory as
//! `<slug>-<version>.<ext>`.
//!
//! # Usage Example
//!
//! ```rust
//! use catalog_harvester::output::OutputPathBuilder;
//! use catalog_harvester::CatalogEntry;
//! use std::path::PathBuf;
//!
//! let builder = OutputPathBuilder::new(PathBuf::from("artifacts")).with_extension("zip");
//! let entry = CatalogEntry::new("akismet", "5.3", "https://d.example/akismet.zip", 10);
//!
//! assert_eq!(builder.artifact_path(&entry), PathBuf::from("artifacts/akismet-5.3.zip"));
//! ```

use super::{OutputError, OutputResult};
use crate::downloader::config::DEFAULT_FILE_EXTENSION;
use crate::CatalogEntry;
use std::path::{Path, PathBuf};

/// Builds output paths for catalog entries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPathBuilder {
    root_dir: PathBuf,
    extension: String,
}

impl OutputPathBuilder {
    /// Create a builder rooted at `root_dir` with the default extension
    pub fn new(root_dir: PathBuf) -> Self {
        Self {
            root_dir,
            extension: DEFAULT_FILE_EXTENSION.to_string(),
        }
    }

    /// Set the extension; a leading dot is ignored, an empty one means none
    pub fn with_extension(mut self, extension: impl AsRef<str>) -> Self {
        self.extension = sanitize_component(extension.as_ref().trim_start_matches('.'));
        self
    }

    /// Output directory
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// File name for `entry`
    ///
    /// Slug and version are sanitized so a hostile catalog cannot escape the
    /// output directory. Distinct entries with the same slug and version map
    /// to the same file, and the later download overwrites the earlier one.
    pub fn file_name(&self, entry: &CatalogEntry) -> String {
        let stem = if entry.version.is_empty() {
            sanitize_component(&entry.slug)
        } else {
            format!(
                "{}-{}",
                sanitize_component(&entry.slug),
                sanitize_component(&entry.version)
            )
        };

        if self.extension.is_empty() {
            stem
        } else {
            format!("{stem}.{}", self.extension)
        }
    }

    /// Full path for `entry`
    pub fn artifact_path(&self, entry: &CatalogEntry) -> PathBuf {
        self.root_dir.join(self.file_name(entry))
    }

    /// Create the output directory if missing
    pub fn ensure_directories(&self) -> OutputResult<()> {
        std::fs::create_dir_all(&self.root_dir).map_err(|e| {
            OutputError::IoError(format!(
                "Failed to create output directory {}: {e}",
                self.root_dir.display()
            ))
        })
    }
}

/// Make one path component safe.
///
/// Separators, `:`, control characters, and `..` are replaced with `_`; a
/// component consisting only of dots becomes underscores.
fn sanitize_component(name: &str) -> String {
    let replaced: String = name
        .replace("..", "__")
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if !replaced.is_empty() && replaced.chars().all(|c| c == '.') {
        "_".repeat(replaced.len())
    } else {
        replaced
    }
}
