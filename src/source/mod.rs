//! File Tree Reader: discovers table files under a scan root.
//!
//! [`read_tree`] walks the root depth-first and returns every regular file whose extension
//! matches, keyed by its [`FileIndex`] (relative path, extension stripped). Remote sources are
//! first materialized on disk by [`checkout`].

pub mod checkout;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{ConvertError, ConvertResult};
use crate::types::FileIndex;

pub use checkout::{Checkout, SourceRoot};

/// Declared file type, taken from the extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// Spreadsheet workbook (`.xlsx`).
    Xlsx,
    /// Comma-separated values.
    Csv,
    /// Tab-separated values.
    Tsv,
}

impl FileKind {
    /// Parse a file kind from an extension, with or without the leading dot (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "xlsx" => Some(Self::Xlsx),
            "csv" => Some(Self::Csv),
            "tsv" => Some(Self::Tsv),
            _ => None,
        }
    }
}

/// Metadata for one discovered file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Size in bytes at discovery time.
    pub size: u64,
    /// Extension the file was selected by (without the dot).
    pub ext: String,
}

impl SourceFile {
    pub fn kind(&self) -> Option<FileKind> {
        FileKind::from_extension(&self.ext)
    }
}

/// Recursively collect files under `root` whose extension equals `ext`.
///
/// Non-matching files are skipped. A missing root or any unreadable entry is an error; an
/// empty result is not.
pub fn read_tree(root: impl AsRef<Path>, ext: &str) -> ConvertResult<BTreeMap<FileIndex, SourceFile>> {
    let root = root.as_ref();
    let ext = ext.trim_start_matches('.');
    let mut files = BTreeMap::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|source| ConvertError::Walk {
            root: root.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some(ext) {
            continue;
        }

        let rel = path.strip_prefix(root).unwrap_or(path).with_extension("");
        let index = FileIndex::new(rel.to_string_lossy());
        let size = entry
            .metadata()
            .map_err(|source| ConvertError::Walk {
                root: root.to_path_buf(),
                source,
            })?
            .len();

        files.insert(
            index,
            SourceFile {
                path: path.to_path_buf(),
                size,
                ext: ext.to_string(),
            },
        );
    }

    Ok(files)
}
