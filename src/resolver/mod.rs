//! Release resolution.
//!
//! Turns a [`DownloadObject`] into a concrete [`ResolvedAsset`]: a file name,
//! a download URL and, for GitHub, the release tag. Each source kind sits
//! behind the [`ReleaseSource`] trait so the page or API parsing can be
//! replaced, or faked in tests, without touching the installer.
//!
//! # Examples
//!
//! ```rust,no_run
//! use obsup::config::InstallConfig;
//! use obsup::resolver::{Resolver, ResolverConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = InstallConfig::from_json(r#"{
//!     "downloads": {
//!         "OBS": { "github": "obsproject/obs-studio", "filename": "OBS-Studio-*-Windows*.zip" }
//!     }
//! }"#)?;
//!
//! let resolver = Resolver::new(ResolverConfig::default())?;
//! let asset = resolver.resolve(&config.objects[0]).await?;
//! println!("{} {:?} -> {}", asset.filename, asset.version, asset.url);
//! # Ok(())
//! # }
//! ```

pub mod forum;
pub mod github;
pub mod listing;
pub mod pattern;

pub use forum::ForumSource;
pub use github::GitHubSource;
pub use listing::{parse_listing, select, ListingEntry, Selection};
pub use pattern::FilenamePattern;

use crate::config::{DownloadObject, Source};
use crate::error::{Error, ResolveError};
use crate::http::{create_http_client, HttpClientConfig};

use async_trait::async_trait;
use reqwest::Url;
use std::sync::Arc;
use std::time::Duration;

/// The concrete file an object currently points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAsset {
    pub filename: String,
    pub url: Url,
    /// Release tag; forum resources have none.
    pub version: Option<String>,
    /// Size announced by the source, if any.
    pub size: Option<u64>,
    /// Only an administrator-deployment packaging was available.
    pub variant: bool,
}

/// A place releases can be looked up.
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn resolve(&self, object: &DownloadObject) -> Result<ResolvedAsset, ResolveError>;
}

/// Settings shared by the built-in sources.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub github_api: Url,
    pub forum_base: Url,
    /// Personal access token for the GitHub API.
    pub github_token: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Middleware retries for transient failures.
    pub retries: u32,
    pub connect_timeout: Duration,
    /// Upper bound on a wait for the GitHub budget to reset.
    pub max_rate_limit_wait: Duration,
    pub proxy: Option<reqwest::Proxy>,
}

impl ResolverConfig {
    pub const GITHUB_API: &'static str = "https://api.github.com";
    pub const FORUM_BASE: &'static str = "https://obsproject.com";
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            github_api: Url::parse(Self::GITHUB_API).expect("constant URL"),
            forum_base: Url::parse(Self::FORUM_BASE).expect("constant URL"),
            github_token: None,
            timeout: Duration::from_secs(30),
            retries: 3,
            connect_timeout: Duration::from_secs(30),
            max_rate_limit_wait: Duration::from_secs(60),
            proxy: None,
        }
    }
}

/// Dispatches each object to the source of its kind.
#[derive(Clone)]
pub struct Resolver {
    github: Arc<dyn ReleaseSource>,
    forum: Arc<dyn ReleaseSource>,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("github", &self.github.name())
            .field("forum", &self.forum.name())
            .finish()
    }
}

impl Resolver {
    /// Build the GitHub and forum sources over one shared client.
    pub fn new(config: ResolverConfig) -> Result<Self, Error> {
        let client = create_http_client(HttpClientConfig {
            retries: config.retries,
            proxy: config.proxy,
            headers: None,
            connect_timeout: config.connect_timeout,
        })?;

        let github = GitHubSource::new(
            client.clone(),
            config.github_api,
            config.github_token,
            config.timeout,
            config.max_rate_limit_wait,
        );
        let forum = ForumSource::new(client, config.forum_base, config.timeout);

        Ok(Self::with_sources(Arc::new(github), Arc::new(forum)))
    }

    /// Use custom sources, for instance canned ones in tests.
    pub fn with_sources(github: Arc<dyn ReleaseSource>, forum: Arc<dyn ReleaseSource>) -> Self {
        Self { github, forum }
    }

    pub async fn resolve(&self, object: &DownloadObject) -> Result<ResolvedAsset, ResolveError> {
        match object.source {
            Source::GitHub { .. } => self.github.resolve(object).await,
            Source::Forum { .. } => self.forum.resolve(object).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InstallConfig;

    struct Fixed(&'static str);

    #[async_trait]
    impl ReleaseSource for Fixed {
        fn name(&self) -> &'static str {
            self.0
        }

        async fn resolve(&self, object: &DownloadObject) -> Result<ResolvedAsset, ResolveError> {
            Ok(ResolvedAsset {
                filename: format!("{}-{}.zip", self.0, object.name),
                url: Url::parse("https://example.com/x.zip").unwrap(),
                version: None,
                size: None,
                variant: false,
            })
        }
    }

    #[tokio::test]
    async fn test_dispatch_by_source_kind() {
        let config = InstallConfig::from_json(
            r#"{"downloads": {
                "a": {"github": "o/r", "filename": "*.zip"},
                "b": {"obsproject": "b.1", "filename": "*.zip"}
            }}"#,
        )
        .unwrap();
        let resolver = Resolver::with_sources(Arc::new(Fixed("gh")), Arc::new(Fixed("forum")));

        let a = config.object("a").unwrap();
        let b = config.object("b").unwrap();
        assert_eq!(resolver.resolve(a).await.unwrap().filename, "gh-a.zip");
        assert_eq!(resolver.resolve(b).await.unwrap().filename, "forum-b.zip");
    }

    #[test]
    fn test_default_config() {
        let config = ResolverConfig::default();
        assert_eq!(config.github_api.as_str(), "https://api.github.com/");
        assert_eq!(config.forum_base.as_str(), "https://obsproject.com/");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_rate_limit_wait, Duration::from_secs(60));
    }
}
