//! Downloads cache housekeeping.
//!
//! Archives accumulate in the downloads directory as objects are updated.
//! [`prune`] removes the ones that are both old and no longer the recorded
//! file of any object.

use crate::archive::ArchiveKind;

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Delete archives in `cache_dir` last modified more than `retention_days`
/// ago, keeping every file named in `keep`.
///
/// Only `.zip` and `.7z` files directly inside `cache_dir` are considered.
/// Returns the removed paths; a file that cannot be removed is logged and
/// left alone.
pub fn prune(cache_dir: &Path, retention_days: u32, keep: &HashSet<String>) -> io::Result<Vec<PathBuf>> {
    let cutoff = SystemTime::now()
        .checked_sub(DAY * retention_days)
        .unwrap_or(SystemTime::UNIX_EPOCH);
    prune_before(cache_dir, cutoff, keep)
}

pub(crate) fn prune_before(
    cache_dir: &Path,
    cutoff: SystemTime,
    keep: &HashSet<String>,
) -> io::Result<Vec<PathBuf>> {
    let mut removed = Vec::new();

    let entries = match std::fs::read_dir(cache_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(removed),
        Err(e) => return Err(e),
    };

    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if !file_type.is_file() || ArchiveKind::from_path(&path).is_none() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        if keep.contains(&name) {
            continue;
        }

        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                debug!("No modification time for {:?}: {}", path, e);
                continue;
            }
        };
        if modified >= cutoff {
            continue;
        }

        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!("Pruned stale archive {}", name);
                removed.push(path);
            }
            Err(e) => warn!("Cannot prune {:?}: {}", path, e),
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prune_keeps_recorded_and_non_archives() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["old.zip", "current.zip", "old.7z", "versions.json", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("sub.zip")).unwrap();

        let keep: HashSet<String> = ["current.zip".to_string()].into();
        let future = SystemTime::now() + DAY;
        let mut removed = prune_before(dir.path(), future, &keep).unwrap();
        removed.sort();

        assert_eq!(
            removed,
            vec![dir.path().join("old.7z"), dir.path().join("old.zip")]
        );
        assert!(dir.path().join("current.zip").exists());
        assert!(dir.path().join("versions.json").exists());
        assert!(dir.path().join("notes.txt").exists());
        assert!(dir.path().join("sub.zip").is_dir());
    }

    #[test]
    fn test_recent_files_survive() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("fresh.zip"), b"x").unwrap();

        let removed = prune(dir.path(), 30, &HashSet::new()).unwrap();
        assert!(removed.is_empty());
        assert!(dir.path().join("fresh.zip").exists());
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(prune(&dir.path().join("nope"), 1, &HashSet::new())
            .unwrap()
            .is_empty());
    }
}
