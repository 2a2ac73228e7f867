//! Forum download-page parsing.
//!
//! A forum resource with several files answers its download URL with a page
//! listing each file as a `contentRow-title` element, preceded by an anchor
//! carrying the `button--icon--download` class. This module turns that page
//! into [`ListingEntry`] values and picks the one matching a pattern. It does
//! no I/O.

use super::pattern::FilenamePattern;

use regex::Regex;
use reqwest::Url;
use std::sync::LazyLock;
use tracing::debug;

static ANCHOR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<a\s[^>]*>").unwrap());

static CLASS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?is)\bclass\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap());

static HREF_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?is)\bhref\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap());

static OPEN_TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<([a-z][a-z0-9]*)\b[^>]*>").unwrap());

static TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());

const DOWNLOAD_CLASS: &str = "button--icon--download";
const TITLE_CLASS: &str = "contentRow-title";

/// Packaging marker for administrator deployments.
pub const VARIANT_MARKER: &str = "programdata";

/// One downloadable file of a forum resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    /// Visible title, used as the file name.
    pub title: String,
    /// Absolute download link.
    pub url: Url,
}

/// The entry chosen for a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub entry: ListingEntry,
    /// Only an administrator-deployment packaging matched.
    pub variant: bool,
}

fn attr<'a>(re: &Regex, tag: &'a str) -> Option<&'a str> {
    let caps = re.captures(tag)?;
    caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str())
}

fn has_class(tag: &str, class: &str) -> bool {
    attr(&CLASS_REGEX, tag).is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
}

/// Decode the handful of entities the forum emits in titles and links.
pub fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#039;", "'")
        .replace("&amp;", "&")
}

fn inner_text(html: &str) -> String {
    let stripped = TAG_REGEX.replace_all(html, " ");
    decode_entities(&stripped)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Find every file row on a download page.
///
/// Relative links are resolved against `page_url`. Rows without a preceding
/// download anchor, or whose link cannot be resolved, are left out.
pub fn parse_listing(html: &str, page_url: &Url) -> Vec<ListingEntry> {
    let anchors: Vec<(usize, &str)> = ANCHOR_REGEX
        .find_iter(html)
        .filter(|m| has_class(m.as_str(), DOWNLOAD_CLASS))
        .filter_map(|m| attr(&HREF_REGEX, m.as_str()).map(|href| (m.start(), href)))
        .collect();

    let lower = html.to_ascii_lowercase();
    let mut entries = Vec::new();

    for caps in OPEN_TAG_REGEX.captures_iter(html) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if !has_class(whole.as_str(), TITLE_CLASS) {
            continue;
        }

        let closing = format!("</{}", name.as_str().to_ascii_lowercase());
        let Some(close) = lower[whole.end()..].find(&closing) else {
            continue;
        };
        let title = inner_text(&html[whole.end()..whole.end() + close]);
        if title.is_empty() {
            continue;
        }

        let Some((_, href)) = anchors.iter().rev().find(|(pos, _)| *pos < whole.start()) else {
            debug!("No download link before forum row {:?}", title);
            continue;
        };
        match page_url.join(&decode_entities(href)) {
            Ok(url) => entries.push(ListingEntry { title, url }),
            Err(e) => debug!("Cannot resolve link {:?} for {:?}: {}", href, title, e),
        }
    }

    entries
}

/// Pick the entry for `pattern`.
///
/// Matching rows whose title mentions the variant marker only win when no
/// other row matches.
pub fn select(entries: Vec<ListingEntry>, pattern: &FilenamePattern) -> Option<Selection> {
    let matching: Vec<ListingEntry> = entries
        .into_iter()
        .filter(|e| pattern.matches(&e.title))
        .collect();

    let is_variant = |e: &ListingEntry| e.title.to_lowercase().contains(VARIANT_MARKER);

    if let Some(entry) = matching.iter().find(|e| !is_variant(e)) {
        return Some(Selection {
            entry: entry.clone(),
            variant: false,
        });
    }
    matching.into_iter().next().map(|entry| Selection {
        entry,
        variant: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<div class="block-body">
  <div class="contentRow">
    <div class="contentRow-extra">
      <a href="/forum/resources/move.913/download?file=101" class="button--icon--download button"><span>Download</span></a>
    </div>
    <div class="contentRow-main">
      <h3 class="contentRow-title">move-transition-3.0.2-ProgramData.zip</h3>
    </div>
  </div>
  <div class="contentRow">
    <a class="button button--icon--download" href="/forum/resources/move.913/download?file=102&amp;x=1">Download</a>
    <h3 class="contentRow-title"><span>move-transition-3.0.2-windows.zip</span></h3>
  </div>
  <div class="contentRow">
    <a class="button button--icon--download" href="https://cdn.example.com/mac.pkg">Download</a>
    <h3 class="contentRow-title">move-transition-3.0.2-macos.pkg</h3>
  </div>
</div>"#;

    fn page_url() -> Url {
        Url::parse("https://obsproject.com/forum/resources/move.913/download").unwrap()
    }

    #[test]
    fn test_parse_listing() {
        let entries = parse_listing(PAGE, &page_url());
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].title, "move-transition-3.0.2-ProgramData.zip");
        assert_eq!(
            entries[0].url.as_str(),
            "https://obsproject.com/forum/resources/move.913/download?file=101"
        );
        assert_eq!(entries[1].title, "move-transition-3.0.2-windows.zip");
        assert_eq!(
            entries[1].url.as_str(),
            "https://obsproject.com/forum/resources/move.913/download?file=102&x=1"
        );
        assert_eq!(entries[2].url.as_str(), "https://cdn.example.com/mac.pkg");
    }

    #[test]
    fn test_select_prefers_non_variant() {
        let entries = parse_listing(PAGE, &page_url());
        let pattern = FilenamePattern::new("move-transition-*.zip").unwrap();

        let selection = select(entries, &pattern).unwrap();
        assert_eq!(selection.entry.title, "move-transition-3.0.2-windows.zip");
        assert!(!selection.variant);
    }

    #[test]
    fn test_select_falls_back_to_variant() {
        let entries = parse_listing(PAGE, &page_url());
        let pattern = FilenamePattern::new("*programdata*").unwrap();

        let selection = select(entries, &pattern).unwrap();
        assert_eq!(selection.entry.title, "move-transition-3.0.2-ProgramData.zip");
        assert!(selection.variant);
    }

    #[test]
    fn test_select_no_match() {
        let entries = parse_listing(PAGE, &page_url());
        let pattern = FilenamePattern::new("*.7z").unwrap();
        assert!(select(entries, &pattern).is_none());
    }

    #[test]
    fn test_title_without_anchor_is_skipped() {
        let html = r#"<h3 class="contentRow-title">orphan.zip</h3>"#;
        assert!(parse_listing(html, &page_url()).is_empty());
    }

    #[test]
    fn test_inner_text() {
        assert_eq!(inner_text("  <b>a&amp;b</b>\n  c&nbsp;d "), "a&b c d");
    }
}
