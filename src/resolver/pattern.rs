//! Filename patterns.
//!
//! Patterns use shell-glob syntax (`*`, `?`, `[...]`) and match whole file
//! names without regard to case, since the installed files are Windows
//! binaries whose release names are not consistently cased.

use glob::{MatchOptions, Pattern, PatternError};
use std::fmt;

const OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// A compiled filename pattern.
#[derive(Debug, Clone)]
pub struct FilenamePattern {
    raw: String,
    compiled: Pattern,
}

impl FilenamePattern {
    /// Compile `raw`. A run of stars means the same as one, since file
    /// names have no directories for `**` to cross.
    pub fn new(raw: &str) -> Result<Self, PatternError> {
        Ok(Self {
            raw: raw.to_string(),
            compiled: Pattern::new(&collapse_stars(raw))?,
        })
    }

    /// Does `name` match the whole pattern?
    ///
    /// ```rust
    /// use obsup::resolver::FilenamePattern;
    ///
    /// let p = FilenamePattern::new("obs-studio-*-windows-x64.zip").unwrap();
    /// assert!(p.matches("obs-studio-30.1.2-windows-x64.zip"));
    /// assert!(p.matches("OBS-Studio-30.1.2-Windows-x64.zip"));
    /// assert!(!p.matches("obs-studio-30.1.2-windows-x64.zip.sig"));
    /// ```
    pub fn matches(&self, name: &str) -> bool {
        self.compiled.matches_with(name, OPTIONS)
    }

    /// A pattern without `*` or `?` names one exact file.
    pub fn is_static(&self) -> bool {
        !self.raw.contains(['*', '?'])
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

fn collapse_stars(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c == '*' && out.ends_with('*') {
            continue;
        }
        out.push(c);
    }
    out
}

impl fmt::Display for FilenamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for FilenamePattern {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for FilenamePattern {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_star_and_question() {
        let p = FilenamePattern::new("move-transition-?.*-windows.zip").unwrap();
        assert!(p.matches("move-transition-3.0.2-windows.zip"));
        assert!(!p.matches("move-transition-30.0.2-windows.zip"));
    }

    #[test]
    fn test_double_star_matches_like_single() {
        let p = FilenamePattern::new("plugin-**.zip").unwrap();
        assert!(p.matches("plugin-1.2.zip"));
        assert!(!p.matches("plugin-1.2.7z"));
        assert_eq!(p.as_str(), "plugin-**.zip");
        assert!(!p.is_static());
    }

    #[test]
    fn test_brackets() {
        let p = FilenamePattern::new("plugin-[0-9]*.7z").unwrap();
        assert!(p.matches("plugin-2.1.7z"));
        assert!(!p.matches("plugin-beta.7z"));
    }

    #[test]
    fn test_whole_name_only() {
        let p = FilenamePattern::new("x.zip").unwrap();
        assert!(p.matches("X.ZIP"));
        assert!(!p.matches("prefix-x.zip"));
        assert!(!p.matches("x.zip.sha256"));
    }

    #[test]
    fn test_is_static() {
        assert!(FilenamePattern::new("x.zip").unwrap().is_static());
        assert!(FilenamePattern::new("x-[12].zip").unwrap().is_static());
        assert!(!FilenamePattern::new("x-*.zip").unwrap().is_static());
        assert!(!FilenamePattern::new("x-?.zip").unwrap().is_static());
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(FilenamePattern::new("broken-[.zip").is_err());
    }
}
