//! OBS forum resources.
//!
//! `GET {forum}/forum/resources/{id}/download` answers with a page listing
//! every file of the resource; the listing is parsed by
//! [`listing`](super::listing). Forum resources carry no version token, so
//! updates are driven by the filename alone.

use super::listing::{parse_listing, select};
use super::{ReleaseSource, ResolvedAsset};
use crate::config::{DownloadObject, Source};
use crate::error::ResolveError;

use async_trait::async_trait;
use reqwest::Url;
use reqwest_middleware::ClientWithMiddleware;
use std::time::Duration;
use tracing::{debug, info, warn};

/// [`ReleaseSource`] backed by the forum's resource download pages.
#[derive(Debug)]
pub struct ForumSource {
    client: ClientWithMiddleware,
    base: Url,
    timeout: Duration,
}

impl ForumSource {
    pub fn new(client: ClientWithMiddleware, base: Url, timeout: Duration) -> Self {
        Self {
            client,
            base,
            timeout,
        }
    }

    fn download_page(&self, resource: &str) -> Result<Url, ResolveError> {
        if resource.is_empty() || resource.contains(['/', '\\']) {
            return Err(ResolveError::InvalidUrl(format!(
                "'{}' is not a forum resource id",
                resource
            )));
        }

        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ResolveError::InvalidUrl(format!("'{}' cannot be used as forum base", self.base)))?
            .pop_if_empty()
            .extend(["forum", "resources", resource, "download"]);
        Ok(url)
    }
}

/// Keep only the last path component of a title used as a file name.
fn file_name_from_title(title: &str) -> Option<String> {
    let name = title.rsplit(['/', '\\']).next()?.trim();
    (!name.is_empty() && name != "." && name != "..").then(|| name.to_string())
}

#[async_trait]
impl ReleaseSource for ForumSource {
    fn name(&self) -> &'static str {
        "obsproject"
    }

    async fn resolve(&self, object: &DownloadObject) -> Result<ResolvedAsset, ResolveError> {
        let Source::Forum { resource } = &object.source else {
            return Err(ResolveError::InvalidUrl(format!(
                "{} is not a forum object",
                object.name
            )));
        };

        let url = self.download_page(resource)?;
        debug!("GET {}", url);
        let res = self
            .client
            .get(url.clone())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|source| ResolveError::Network {
                url: url.to_string(),
                source,
            })?;

        let status = res.status();
        if !status.is_success() {
            return Err(ResolveError::Http {
                url: url.to_string(),
                status,
            });
        }

        // Links on the page are relative to wherever the redirects ended.
        let page_url = res.url().clone();
        let body = res.text().await.map_err(|e| ResolveError::Parse {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let entries = parse_listing(&body, &page_url);
        debug!("{} lists {} files", page_url, entries.len());

        let not_found = || ResolveError::NotFound {
            source_desc: format!("obsproject:{}", resource),
            pattern: object.pattern.to_string(),
        };
        let selection = select(entries, &object.pattern).ok_or_else(not_found)?;
        let filename = file_name_from_title(&selection.entry.title).ok_or_else(not_found)?;

        if selection.variant {
            warn!(
                "{}: only an administrator-deployment package matched, using {}",
                object.name, filename
            );
        }
        info!("{} resolved to {}", object.name, filename);

        Ok(ResolvedAsset {
            filename,
            url: selection.entry.url,
            version: None,
            size: None,
            variant: selection.variant,
        })
    }
}
