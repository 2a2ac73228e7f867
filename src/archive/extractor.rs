//! Archive extraction into an installation tree.
//!
//! # Examples
//!
//! ```rust,no_run
//! use obsup::archive::ArchiveExtractor;
//! use std::path::Path;
//!
//! let extractor = ArchiveExtractor::new().on_progress(|p| {
//!     println!("{}/{} {}", p.files_extracted, p.total_files, p.current_file);
//! });
//!
//! let result = extractor.extract(
//!     Path::new("downloads/obs-studio-30.1.2-windows-x64.zip"),
//!     Path::new("C:/obs"),
//!     true,
//! );
//! if !result.success {
//!     eprintln!("extraction failed: {:?}", result.error);
//! }
//! ```

use super::{
    flatten::{merge_dir, single_root},
    path::{entry_components, safe_join},
    sevenz, zip, ArchiveKind, EntryInfo,
};
use crate::error::ExtractError;

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Callback type for extraction progress
pub type ExtractionCallback = Box<dyn Fn(&ExtractionProgress) + Send + Sync>;

/// Progress of a running extraction, reported after each written file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionProgress {
    pub current_file: String,
    pub files_extracted: usize,
    pub total_files: usize,
    pub bytes_extracted: u64,
    pub total_bytes: u64,
}

/// How an extraction ended.
///
/// `success` is true when the archive was opened and walked to its end
/// without cancellation; skipped and failed entries do not change it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionResult {
    pub success: bool,
    pub files_extracted: usize,
    /// Entries refused by the traversal check.
    pub entries_skipped: usize,
    /// Entries that could not be written.
    pub entries_failed: usize,
    pub bytes_extracted: u64,
    pub error: Option<String>,
}

/// Extracts ZIP and 7z archives.
#[derive(Clone, Default)]
pub struct ArchiveExtractor {
    cancel: CancellationToken,
    on_progress: Option<Arc<ExtractionCallback>>,
}

impl std::fmt::Debug for ArchiveExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveExtractor")
            .field("cancelled", &self.cancel.is_cancelled())
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

impl ArchiveExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check this token between entries.
    pub fn cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ExtractionProgress) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(Box::new(callback)));
        self
    }

    /// Extract `archive` into `target_dir`.
    ///
    /// With `flatten_if_single_root`, an archive whose entries all live under
    /// one top-level directory has that directory's contents merged straight
    /// into `target_dir`.
    pub fn extract(
        &self,
        archive: &Path,
        target_dir: &Path,
        flatten_if_single_root: bool,
    ) -> ExtractionResult {
        match self.try_extract(archive, target_dir, flatten_if_single_root) {
            Ok(result) => result,
            Err((partial, e)) => {
                warn!("Extraction of {:?} failed: {}", archive, e);
                ExtractionResult {
                    success: false,
                    error: Some(e.to_string()),
                    ..partial
                }
            }
        }
    }

    fn try_extract(
        &self,
        archive: &Path,
        target_dir: &Path,
        flatten: bool,
    ) -> Result<ExtractionResult, (ExtractionResult, ExtractError)> {
        let fail = |e: ExtractError| (ExtractionResult::default(), e);

        let kind = ArchiveKind::from_path(archive)
            .ok_or_else(|| fail(ExtractError::UnsupportedFormat(archive.to_path_buf())))?;
        let entries = kind.list(archive).map_err(fail)?;
        fs::create_dir_all(target_dir).map_err(|e| fail(e.into()))?;

        let root = if flatten { single_root(&entries) } else { None };

        let Some(root) = root else {
            info!("Extracting {:?} into {:?}", archive, target_dir);
            return self.walk(kind, archive, target_dir, &entries);
        };

        // The scratch directory lives inside the target so the final moves
        // are renames on the same filesystem.
        let scratch = tempfile::Builder::new()
            .prefix(".obsup-extract-")
            .tempdir_in(target_dir)
            .map_err(|e| fail(e.into()))?;
        info!(
            "Extracting {:?} into {:?}, flattening '{}'",
            archive, target_dir, root
        );

        let mut result = self.walk(kind, archive, scratch.path(), &entries)?;

        let moved = merge_dir(&scratch.path().join(&root), target_dir)
            .map_err(|e| (result.clone(), e.into()))?;
        debug!("Merged {} items from '{}'", moved.moved, root);
        result.entries_failed += moved.failed;

        if let Err(e) = scratch.close() {
            warn!("Cannot remove scratch directory: {}", e);
        }
        Ok(result)
    }

    fn walk(
        &self,
        kind: ArchiveKind,
        archive: &Path,
        dest: &Path,
        entries: &[EntryInfo],
    ) -> Result<ExtractionResult, (ExtractionResult, ExtractError)> {
        let total_files = entries.iter().filter(|e| !e.is_dir).count();
        let total_bytes = entries.iter().filter(|e| !e.is_dir).map(|e| e.size).sum();

        let mut sink = EntrySink {
            dest,
            cancel: &self.cancel,
            on_progress: self.on_progress.as_deref(),
            total_files,
            total_bytes,
            result: ExtractionResult::default(),
        };

        let walked = match kind {
            ArchiveKind::Zip => zip::extract(archive, &mut sink),
            ArchiveKind::SevenZip => sevenz::extract(archive, &mut sink),
        };

        let mut result = sink.result;
        match walked {
            Ok(()) => {
                result.success = true;
                info!(
                    "Extracted {} files ({} bytes), {} skipped, {} failed",
                    result.files_extracted,
                    result.bytes_extracted,
                    result.entries_skipped,
                    result.entries_failed
                );
                Ok(result)
            }
            Err(e) => Err((result, e)),
        }
    }
}

/// Shared writer for every archive format: applies the traversal check,
/// writes the entry and keeps the counters.
pub(crate) struct EntrySink<'a> {
    dest: &'a Path,
    cancel: &'a CancellationToken,
    on_progress: Option<&'a ExtractionCallback>,
    total_files: usize,
    total_bytes: u64,
    result: ExtractionResult,
}

impl EntrySink<'_> {
    pub(crate) fn dest(&self) -> &Path {
        self.dest
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Count an entry whose header could not even be read.
    pub(crate) fn unreadable(&mut self, index: usize, message: impl std::fmt::Display) {
        warn!("Cannot read archive entry #{}: {}", index, message);
        self.result.entries_failed += 1;
    }

    /// Write one entry. `reader` is drained even when the entry is refused.
    pub(crate) fn entry(&mut self, name: &str, is_dir: bool, reader: &mut dyn Read) {
        let Some(out) = safe_join(self.dest, name) else {
            if entry_components(name).is_some_and(|parts| parts.is_empty()) {
                return;
            }
            warn!("Skipping unsafe archive entry {:?}", name);
            self.result.entries_skipped += 1;
            let _ = io::copy(reader, &mut io::sink());
            return;
        };

        if is_dir {
            if let Err(e) = fs::create_dir_all(&out) {
                warn!("Cannot create directory {:?}: {}", out, e);
                self.result.entries_failed += 1;
            }
            return;
        }

        match write_file(&out, reader) {
            Ok(bytes) => {
                self.result.files_extracted += 1;
                self.result.bytes_extracted += bytes;
                if let Some(callback) = self.on_progress {
                    callback(&ExtractionProgress {
                        current_file: name.to_string(),
                        files_extracted: self.result.files_extracted,
                        total_files: self.total_files,
                        bytes_extracted: self.result.bytes_extracted,
                        total_bytes: self.total_bytes,
                    });
                }
            }
            Err(e) => {
                warn!("Cannot extract {:?}: {}", name, e);
                self.result.entries_failed += 1;
                let _ = io::copy(reader, &mut io::sink());
            }
        }
    }
}

fn write_file(out: &Path, reader: &mut dyn Read) -> io::Result<u64> {
    if let Some(parent) = out.parent() {
        fs::create_dir_all(parent)?;
    }
    if out.is_dir() {
        fs::remove_dir_all(out)?;
    }
    let mut file = File::create(out)?;
    io::copy(reader, &mut file)
}
