//! Content length extraction utilities.
//!
//! Helpers to read sizes out of `Content-Length` and `Content-Range` headers,
//! used by the downloader to decide whether a partial file can be resumed.

use reqwest::header::{HeaderMap, CONTENT_LENGTH, CONTENT_RANGE};
use reqwest::Response;

/// Read the `Content-Length` header.
///
/// The header is parsed directly rather than going through the body size
/// hint, which is `0` for `HEAD` responses.
pub fn header_content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
}

/// Total size of the remote resource as advertised by a response.
///
/// A `Content-Range` header (partial responses) wins over `Content-Length`,
/// which only describes the bytes of this particular response.
pub fn get_content_length(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(CONTENT_RANGE)
        .and_then(|h| h.to_str().ok())
        .and_then(parse_content_range_total)
        .or_else(|| header_content_length(response.headers()))
}

/// Parse Content-Range header to extract total size.
///
/// Content-Range header format: "bytes start-end/total". An unknown total
/// (`*`) yields `None`.
///
/// # Example
///
/// ```rust
/// use obsup::utils::parse_content_range_total;
///
/// let total = parse_content_range_total("bytes 0-1023/2048");
/// assert_eq!(total, Some(2048));
/// ```
pub fn parse_content_range_total(content_range: &str) -> Option<u64> {
    content_range
        .split('/')
        .nth(1)
        .and_then(|size| size.trim().parse::<u64>().ok())
}

/// Parse Content-Range header to extract the first byte position.
///
/// ```rust
/// use obsup::utils::parse_content_range_start;
///
/// assert_eq!(parse_content_range_start("bytes 200-1023/1024"), Some(200));
/// ```
pub fn parse_content_range_start(content_range: &str) -> Option<u64> {
    let range = content_range.trim().strip_prefix("bytes")?.trim_start();
    range
        .split('-')
        .next()
        .and_then(|start| start.trim().parse::<u64>().ok())
}
