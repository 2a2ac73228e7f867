//! ZIP archives, read with the `zip` crate.

use super::{extractor::EntrySink, EntryInfo};
use crate::error::ExtractError;

use std::fs::File;
use std::path::Path;

fn open(path: &Path) -> Result<::zip::ZipArchive<File>, ExtractError> {
    let file = File::open(path)?;
    ::zip::ZipArchive::new(file).map_err(|e| ExtractError::Open {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// List the entries of the central directory.
pub fn list(path: &Path) -> Result<Vec<EntryInfo>, ExtractError> {
    let mut archive = open(path)?;
    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        // Unreadable headers are reported again, and counted, while extracting.
        let Ok(entry) = archive.by_index_raw(i) else {
            continue;
        };
        entries.push(EntryInfo {
            name: entry.name().to_string(),
            is_dir: entry.is_dir(),
            size: entry.size(),
        });
    }
    Ok(entries)
}

pub(crate) fn extract(path: &Path, sink: &mut EntrySink<'_>) -> Result<(), ExtractError> {
    let mut archive = open(path)?;

    for i in 0..archive.len() {
        if sink.is_cancelled() {
            return Err(ExtractError::Cancelled);
        }

        let mut entry = match archive.by_index(i) {
            Ok(entry) => entry,
            Err(e) => {
                sink.unreadable(i, e);
                continue;
            }
        };
        let name = entry.name().to_string();
        let is_dir = entry.is_dir();
        sink.entry(&name, is_dir, &mut entry);
    }

    Ok(())
}
