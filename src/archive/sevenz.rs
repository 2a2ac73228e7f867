//! 7z archives, read with `sevenz-rust2`.

use super::{extractor::EntrySink, EntryInfo};
use crate::error::ExtractError;

use std::fs::File;
use std::path::Path;

fn open_error(path: &Path, e: impl std::fmt::Display) -> ExtractError {
    ExtractError::Open {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

/// List the entries of the archive header.
pub fn list(path: &Path) -> Result<Vec<EntryInfo>, ExtractError> {
    let archive = sevenz_rust2::Archive::open(path).map_err(|e| open_error(path, e))?;
    Ok(archive
        .files
        .iter()
        .map(|entry| EntryInfo {
            name: entry.name().to_string(),
            is_dir: entry.is_directory(),
            size: entry.size(),
        })
        .collect())
}

pub(crate) fn extract(path: &Path, sink: &mut EntrySink<'_>) -> Result<(), ExtractError> {
    let file = File::open(path)?;
    let dest = sink.dest().to_path_buf();
    let mut cancelled = false;

    sevenz_rust2::decompress_with_extract_fn(file, &dest, |entry, reader, _dest| {
        if sink.is_cancelled() {
            cancelled = true;
            return Ok(false);
        }
        sink.entry(entry.name(), entry.is_directory(), reader);
        Ok(true)
    })
    .map_err(|e| open_error(path, e))?;

    if cancelled {
        return Err(ExtractError::Cancelled);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_entries() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(src.join("plugin/bin")).unwrap();
        std::fs::write(src.join("plugin/bin/p.dll"), b"dll").unwrap();

        let archive = dir.path().join("p.7z");
        sevenz_rust2::compress_to_path(&src, &archive).unwrap();

        let entries = list(&archive).unwrap();
        let file = entries
            .iter()
            .find(|e| e.name.ends_with("p.dll"))
            .unwrap();
        assert!(!file.is_dir);
        assert_eq!(file.size, 3);
    }

    #[test]
    fn test_not_a_7z() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.7z");
        std::fs::write(&path, b"nope").unwrap();

        assert!(matches!(list(&path), Err(ExtractError::Open { .. })));
    }
}
