//! GitHub releases.
//!
//! Resolves `owner/repo` to the latest release, or to a pinned tag, through
//! the REST API and picks the first asset whose name matches the object's
//! pattern. The API budget advertised in `X-RateLimit-*` headers is tracked
//! across requests so an exhausted budget waits for its reset instead of
//! burning requests on 403s.

use super::{ReleaseSource, ResolvedAsset};
use crate::config::{DownloadObject, Source};
use crate::error::ResolveError;

use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, ACCEPT, AUTHORIZATION},
    StatusCode, Url,
};
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

const API_VERSION: &str = "2022-11-28";

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
    #[serde(default)]
    assets: Vec<Asset>,
}

#[derive(Debug, Deserialize)]
struct Asset {
    name: String,
    browser_download_url: String,
    #[serde(default)]
    size: Option<u64>,
}

/// Last known API budget. `-1` means unknown.
#[derive(Debug)]
struct RateLimit {
    remaining: AtomicI64,
    reset: AtomicI64,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            remaining: AtomicI64::new(-1),
            reset: AtomicI64::new(-1),
        }
    }
}

impl RateLimit {
    fn update(&self, headers: &HeaderMap) {
        let read = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<i64>().ok())
        };
        if let Some(remaining) = read("x-ratelimit-remaining") {
            self.remaining.store(remaining, Ordering::SeqCst);
        }
        if let Some(reset) = read("x-ratelimit-reset") {
            self.reset.store(reset, Ordering::SeqCst);
        }
    }

    /// Seconds until the budget resets, if it is exhausted right now.
    fn exhausted_for(&self, now: i64) -> Option<u64> {
        if self.remaining.load(Ordering::SeqCst) != 0 {
            return None;
        }
        let reset = self.reset.load(Ordering::SeqCst);
        reset
            .checked_sub(now)
            .and_then(|secs| u64::try_from(secs).ok())
            .filter(|&secs| secs > 0)
    }
}

/// [`ReleaseSource`] backed by the GitHub REST API.
#[derive(Debug)]
pub struct GitHubSource {
    client: ClientWithMiddleware,
    api_base: Url,
    token: Option<String>,
    timeout: Duration,
    max_rate_limit_wait: Duration,
    rate_limit: RateLimit,
}

impl GitHubSource {
    pub fn new(
        client: ClientWithMiddleware,
        api_base: Url,
        token: Option<String>,
        timeout: Duration,
        max_rate_limit_wait: Duration,
    ) -> Self {
        Self {
            client,
            api_base,
            token: token.filter(|t| !t.trim().is_empty()),
            timeout,
            max_rate_limit_wait,
            rate_limit: RateLimit::default(),
        }
    }

    /// `{api}/repos/{owner}/{repo}/releases/latest` or `.../releases/tags/{tag}`.
    fn release_url(&self, repo: &str, tag: Option<&str>) -> Result<Url, ResolveError> {
        let parts: Vec<&str> = repo.split('/').filter(|p| !p.is_empty()).collect();
        let [owner, name] = parts.as_slice() else {
            return Err(ResolveError::InvalidUrl(format!(
                "GitHub repository must look like owner/name, got '{}'",
                repo
            )));
        };

        let mut url = self.api_base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                ResolveError::InvalidUrl(format!("'{}' cannot be used as API base", self.api_base))
            })?;
            segments.pop_if_empty().extend(["repos", *owner, *name, "releases"]);
            match tag {
                Some(tag) => segments.extend(["tags", tag]),
                None => segments.push("latest"),
            };
        }
        Ok(url)
    }

    async fn wait_for_budget(&self) {
        let now = chrono::Utc::now().timestamp();
        if let Some(wait) = self.rate_limit.exhausted_for(now) {
            let wait = Duration::from_secs(wait).min(self.max_rate_limit_wait);
            warn!("GitHub API budget exhausted, waiting {:?}", wait);
            tokio::time::sleep(wait).await;
        }
    }

    async fn fetch_release(&self, url: &Url) -> Result<Release, ResolveError> {
        self.wait_for_budget().await;

        let mut req = self
            .client
            .get(url.clone())
            .timeout(self.timeout)
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION);
        if let Some(token) = &self.token {
            req = req.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        debug!("GET {}", url);
        let res = req.send().await.map_err(|source| ResolveError::Network {
            url: url.to_string(),
            source,
        })?;
        self.rate_limit.update(res.headers());

        let status = res.status();
        if matches!(status, StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS) {
            let now = chrono::Utc::now().timestamp();
            if let Some(wait_secs) = self.rate_limit.exhausted_for(now) {
                return Err(ResolveError::RateLimited { wait_secs });
            }
        }
        if !status.is_success() {
            return Err(ResolveError::Http {
                url: url.to_string(),
                status,
            });
        }

        let body = res.text().await.map_err(|e| ResolveError::Parse {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&body).map_err(|e| ResolveError::Parse {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl ReleaseSource for GitHubSource {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn resolve(&self, object: &DownloadObject) -> Result<ResolvedAsset, ResolveError> {
        let Source::GitHub { repo } = &object.source else {
            return Err(ResolveError::InvalidUrl(format!(
                "{} is not a GitHub object",
                object.name
            )));
        };

        let url = self.release_url(repo, object.release.as_deref())?;
        let release = self.fetch_release(&url).await?;
        debug!(
            "{} release {} has {} assets",
            repo,
            release.tag_name,
            release.assets.len()
        );

        let Some(asset) = release
            .assets
            .into_iter()
            .find(|a| object.pattern.matches(&a.name))
        else {
            return Err(ResolveError::NotFound {
                source_desc: format!("github:{}@{}", repo, release.tag_name),
                pattern: object.pattern.to_string(),
            });
        };

        let url = Url::parse(&asset.browser_download_url)
            .map_err(|e| ResolveError::InvalidUrl(format!("{}: {}", asset.browser_download_url, e)))?;
        info!("{} resolved to {} ({})", object.name, asset.name, release.tag_name);

        Ok(ResolvedAsset {
            filename: asset.name,
            url,
            version: Some(release.tag_name),
            size: asset.size,
            variant: false,
        })
    }
}
