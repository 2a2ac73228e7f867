//! Builder for [`Installer`].

use super::Installer;
use crate::error::Error;
use crate::progress::StyleOptions;
use crate::resolver::{Resolver, ResolverConfig};

use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Settings for an [`Installer`].
#[derive(Debug, Clone)]
pub struct InstallerConfig {
    /// Extraction target.
    pub install_dir: PathBuf,
    /// Where archives, `versions.json` and diagnostics logs live.
    pub cache_dir: PathBuf,
    pub retries: u32,
    pub retry_delay: Duration,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub style_options: StyleOptions,
    pub cancel: CancellationToken,
    /// Prune unrecorded archives older than this many days. Off when `None`.
    pub cache_retention_days: Option<u32>,
    /// Write `downloads_<timestamp>.log` after runs that downloaded something.
    pub write_log: bool,
    pub resolver: ResolverConfig,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        let install_dir = PathBuf::from("cgg-obs");
        Self {
            cache_dir: install_dir.join("downloads"),
            install_dir,
            retries: 3,
            retry_delay: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(30),
            style_options: StyleOptions::default(),
            cancel: CancellationToken::new(),
            cache_retention_days: None,
            write_log: true,
            resolver: ResolverConfig::default(),
        }
    }
}

/// A builder used to create an [`Installer`].
///
/// ```rust
/// # fn main() -> Result<(), obsup::Error> {
/// use obsup::installer::InstallerBuilder;
/// use obsup::progress::StyleOptions;
///
/// let installer = InstallerBuilder::new()
///     .install_dir("obs".into())
///     .retries(5)
///     .style_options(StyleOptions::hidden())
///     .build()?;
/// assert_eq!(installer.cache_dir(), std::path::Path::new("obs/downloads"));
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct InstallerBuilder {
    config: InstallerConfig,
    cache_dir_set: bool,
    resolver: Option<Resolver>,
}

impl InstallerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the installation directory. Unless [`cache_dir`](Self::cache_dir)
    /// is called, the cache follows it into `<install_dir>/downloads`.
    pub fn install_dir(mut self, dir: PathBuf) -> Self {
        if !self.cache_dir_set {
            self.config.cache_dir = dir.join("downloads");
        }
        self.config.install_dir = dir;
        self
    }

    pub fn cache_dir(mut self, dir: PathBuf) -> Self {
        self.config.cache_dir = dir;
        self.cache_dir_set = true;
        self
    }

    /// Retries for both API lookups and transfers.
    pub fn retries(mut self, retries: u32) -> Self {
        self.config.retries = retries;
        self.config.resolver.retries = retries;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry_delay = delay;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self.config.resolver.connect_timeout = timeout;
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    /// GitHub personal access token. Blank tokens are ignored.
    pub fn github_token(mut self, token: Option<String>) -> Self {
        self.config.resolver.github_token = token;
        self
    }

    pub fn style_options(mut self, style_options: StyleOptions) -> Self {
        self.config.style_options = style_options;
        self
    }

    pub fn cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.config.cancel = cancel;
        self
    }

    pub fn cache_retention_days(mut self, days: Option<u32>) -> Self {
        self.config.cache_retention_days = days;
        self
    }

    pub fn write_log(mut self, write_log: bool) -> Self {
        self.config.write_log = write_log;
        self
    }

    /// Settings for the built-in release sources.
    pub fn resolver_config(mut self, resolver: ResolverConfig) -> Self {
        self.config.resolver = resolver;
        self
    }

    /// Use this resolver instead of building one from the resolver settings.
    pub fn resolver(mut self, resolver: Resolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn build(self) -> Result<Installer, Error> {
        let resolver = match self.resolver {
            Some(resolver) => resolver,
            None => Resolver::new(self.config.resolver.clone())?,
        };
        Installer::new(self.config, resolver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = InstallerConfig::default();
        assert_eq!(config.retries, 3);
        assert_eq!(config.cache_dir, PathBuf::from("cgg-obs/downloads"));
        assert_eq!(config.cache_retention_days, None);
        assert!(config.write_log);
    }

    #[test]
    fn test_cache_dir_follows_install_dir() {
        let builder = InstallerBuilder::new().install_dir("/opt/obs".into());
        assert_eq!(builder.config.cache_dir, PathBuf::from("/opt/obs/downloads"));

        let builder = InstallerBuilder::new()
            .cache_dir("/var/cache/obs".into())
            .install_dir("/opt/obs".into());
        assert_eq!(builder.config.cache_dir, PathBuf::from("/var/cache/obs"));
    }

    #[test]
    fn test_retries_reach_resolver() {
        let builder = InstallerBuilder::new().retries(7);
        assert_eq!(builder.config.retries, 7);
        assert_eq!(builder.config.resolver.retries, 7);
    }
}
