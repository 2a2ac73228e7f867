//! Post-extraction moves.
//!
//! Some plugin archives unpack into a folder of their own; a configured move
//! merges that folder's contents into the installation root and removes it.

use crate::archive::{merge_dir, safe_join, MergeStats};

use std::io;
use std::path::Path;
use tracing::{debug, info};

/// Merge `install_dir/<sub>` into `install_dir` and delete it.
///
/// `sub` is checked like an archive entry name, so a move can never reach
/// outside `install_dir`. A missing source directory is not an error.
pub fn apply_move(install_dir: &Path, sub: &str) -> io::Result<MergeStats> {
    let src = safe_join(install_dir, sub).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("move source '{}' escapes the installation directory", sub),
        )
    })?;

    if !src.is_dir() {
        debug!("Nothing to move, {:?} is not a directory", src);
        return Ok(MergeStats::default());
    }

    let stats = merge_dir(&src, install_dir)?;
    if stats.failed == 0 {
        std::fs::remove_dir_all(&src)?;
    }
    info!(
        "Moved {} items from '{}' into {:?}",
        stats.moved, sub, install_dir
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_into_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("plugin-folder/obs-plugins/64bit")).unwrap();
        std::fs::write(root.join("plugin-folder/obs-plugins/64bit/p.dll"), b"new").unwrap();
        std::fs::create_dir_all(root.join("obs-plugins/64bit")).unwrap();
        std::fs::write(root.join("obs-plugins/64bit/other.dll"), b"keep").unwrap();

        let stats = apply_move(root, "plugin-folder").unwrap();
        assert_eq!(stats.failed, 0);
        assert!(!root.join("plugin-folder").exists());
        assert_eq!(std::fs::read(root.join("obs-plugins/64bit/p.dll")).unwrap(), b"new");
        assert_eq!(std::fs::read(root.join("obs-plugins/64bit/other.dll")).unwrap(), b"keep");
    }

    #[test]
    fn test_traversal_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = apply_move(dir.path(), "../elsewhere").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(apply_move(dir.path(), "absent").unwrap(), MergeStats::default());
    }
}
