//! Single-root detection and directory merging.
//!
//! Release archives often wrap everything in one folder named after the
//! release (`obs-studio-30.1.2/`). When flattening is requested the archive is
//! extracted into a scratch directory and the contents of that folder are
//! merged into the real target.

use super::{path::entry_components, EntryInfo};

use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, warn};

/// Name of the single top-level directory shared by every entry, if any.
///
/// An archive holding one plain file at its root has no directory root.
/// Unsafe entry names are ignored; they are never extracted anyway.
pub fn single_root(entries: &[EntryInfo]) -> Option<String> {
    let mut root: Option<&str> = None;
    let mut nested = false;

    for entry in entries {
        let Some(parts) = entry_components(&entry.name) else {
            continue;
        };
        let Some(first) = parts.first() else {
            continue;
        };

        match root {
            None => root = Some(first),
            Some(r) if r == *first => {}
            Some(_) => return None,
        }

        if parts.len() > 1 {
            nested = true;
        } else if !entry.is_dir {
            return None;
        }
    }

    if nested {
        root.map(str::to_owned)
    } else {
        None
    }
}

/// What a merge did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeStats {
    /// Items (files or whole directories) moved into place.
    pub moved: usize,
    /// Items that could not be moved.
    pub failed: usize,
}

/// Move the contents of `src` into `dst`.
///
/// Same-named files are overwritten, same-named directories are merged
/// recursively, and a file/directory clash replaces the existing item.
/// Per-item failures are logged and counted; only an unreadable `src` is an
/// error.
pub fn merge_dir(src: &Path, dst: &Path) -> io::Result<MergeStats> {
    let mut stats = MergeStats::default();
    fs::create_dir_all(dst)?;

    for item in fs::read_dir(src)? {
        let item = match item {
            Ok(item) => item,
            Err(e) => {
                warn!("Cannot read an entry of {:?}: {}", src, e);
                stats.failed += 1;
                continue;
            }
        };
        let from = item.path();
        let to = dst.join(item.file_name());

        match merge_item(&from, &to) {
            Ok(inner) => {
                stats.moved += inner.moved;
                stats.failed += inner.failed;
            }
            Err(e) => {
                warn!("Cannot move {:?} to {:?}: {}", from, to, e);
                stats.failed += 1;
            }
        }
    }

    Ok(stats)
}

fn merge_item(from: &Path, to: &Path) -> io::Result<MergeStats> {
    let from_is_dir = from.is_dir();

    if from_is_dir && to.is_dir() {
        let stats = merge_dir(from, to)?;
        let _ = fs::remove_dir(from);
        return Ok(stats);
    }

    if to.is_dir() {
        debug!("Replacing directory {:?} with a file", to);
        fs::remove_dir_all(to)?;
    } else if to.exists() {
        fs::remove_file(to)?;
    }

    move_path(from, to)?;
    Ok(MergeStats {
        moved: 1,
        failed: 0,
    })
}

/// Rename, falling back to copy and delete across filesystems.
fn move_path(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) if from.is_file() => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
        Err(_) if from.is_dir() => {
            fs::create_dir_all(to)?;
            let stats = merge_dir(from, to)?;
            if stats.failed > 0 {
                return Err(io::Error::other(format!(
                    "{} items of {:?} could not be moved",
                    stats.failed, from
                )));
            }
            fs::remove_dir_all(from)
        }
        Err(e) => Err(e),
    }
}
