//! Archive extraction functionality.
//!
//! Release archives are extracted from the downloads cache into the
//! installation directory. ZIP and 7z are supported; every entry name goes
//! through the traversal check in [`path`] before anything is written.
//!
//! - `extractor` - [`ArchiveExtractor`] and its result and progress types
//! - `path` - entry name normalisation
//! - `flatten` - single-root detection and directory merging
//! - `zip` / `sevenz` - the format readers

pub mod extractor;
pub mod flatten;
pub mod path;
pub mod sevenz;
pub mod zip;

pub use extractor::{ArchiveExtractor, ExtractionCallback, ExtractionProgress, ExtractionResult};
pub use flatten::{merge_dir, single_root, MergeStats};
pub use path::{entry_components, safe_join};

use crate::error::ExtractError;
use std::path::Path;

/// One entry of an archive listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    /// Raw name as stored in the archive.
    pub name: String,
    pub is_dir: bool,
    /// Uncompressed size in bytes.
    pub size: u64,
}

/// Supported archive formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    SevenZip,
}

impl ArchiveKind {
    /// Pick the format from the file extension, ignoring case.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "zip" => Some(Self::Zip),
            "7z" => Some(Self::SevenZip),
            _ => None,
        }
    }

    /// List the entries of `path`.
    pub fn list(self, path: &Path) -> Result<Vec<EntryInfo>, ExtractError> {
        match self {
            Self::Zip => zip::list(path),
            Self::SevenZip => sevenz::list(path),
        }
    }
}
