//! Entry name normalisation and traversal checks.
//!
//! Archive entry names are untrusted. Both `/` and `\` count as separators,
//! empty and `.` components are dropped, and any `..`, absolute root or
//! component carrying a `:` (drive letters, alternate data streams) rejects
//! the whole name.

use std::path::{Path, PathBuf};

/// Split an entry name into its clean components.
///
/// Returns `None` when the name would escape the extraction root, and an
/// empty vector for names that carry no component at all (`"./"`).
pub fn entry_components(raw: &str) -> Option<Vec<&str>> {
    if raw.starts_with('/') || raw.starts_with('\\') {
        return None;
    }

    let mut parts = Vec::new();
    for part in raw.split(['/', '\\']) {
        match part {
            "" | "." => continue,
            ".." => return None,
            p if p.contains(':') => return None,
            p => parts.push(p),
        }
    }
    Some(parts)
}

/// Join `raw` onto `root` if and only if the result stays inside `root`.
///
/// ```rust
/// use obsup::archive::safe_join;
/// use std::path::Path;
///
/// let root = Path::new("/opt/obs");
/// assert_eq!(
///     safe_join(root, "bin\\64bit\\obs64.exe"),
///     Some(root.join("bin").join("64bit").join("obs64.exe"))
/// );
/// assert_eq!(safe_join(root, "../../evil.dll"), None);
/// assert_eq!(safe_join(root, "C:/Windows/evil.dll"), None);
/// ```
pub fn safe_join(root: &Path, raw: &str) -> Option<PathBuf> {
    let parts = entry_components(raw)?;
    if parts.is_empty() {
        return None;
    }

    let mut out = root.to_path_buf();
    for part in parts {
        out.push(part);
    }
    out.starts_with(root).then_some(out)
}

/// First component of an entry name, if the name is safe.
pub fn top_level(raw: &str) -> Option<&str> {
    entry_components(raw)?.first().copied()
}
