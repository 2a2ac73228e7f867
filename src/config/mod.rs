//! The configuration document.
//!
//! A JSON document lists the download objects under `downloads` and, under
//! `moves`, sub-directories that must be merged into the installation root
//! after a given object is extracted:
//!
//! ```json
//! {
//!   "downloads": {
//!     "OBS": { "github": "obsproject/obs-studio", "filename": "OBS-Studio-*-Windows*.zip" },
//!     "move-transition": { "obsproject": "move.913", "filename": "move-transition-*-windows.zip" }
//!   },
//!   "moves": { "move-transition": "move-transition" }
//! }
//! ```
//!
//! A document without a `downloads` key is read as the downloads map itself.
//! The document is read from a local path, an `http(s)` URL, or the default
//! document published upstream.

use crate::error::ConfigError;
use crate::resolver::FilenamePattern;

use reqwest::Url;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Name of the primary application object, installed before any plugin.
pub const PRIMARY_OBJECT: &str = "OBS";

/// Where a download object is published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A GitHub repository, `owner/name`.
    GitHub { repo: String },
    /// An OBS forum resource id such as `move.913`.
    Forum { resource: String },
}

impl Source {
    pub fn kind(&self) -> &'static str {
        match self {
            Source::GitHub { .. } => "github",
            Source::Forum { .. } => "obsproject",
        }
    }
}

/// One configured object. Immutable for the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadObject {
    pub name: String,
    pub source: Source,
    pub pattern: FilenamePattern,
    /// Release tag to install instead of the latest one.
    pub release: Option<String>,
    pub force_download: bool,
    /// Sub-directory of the install root merged into the root after extraction.
    pub move_to: Option<String>,
    /// Explicit flattening choice; see [`DownloadObject::flatten`].
    pub flatten: Option<bool>,
}

impl DownloadObject {
    pub fn is_primary(&self) -> bool {
        self.name.eq_ignore_ascii_case(PRIMARY_OBJECT)
    }

    /// Flatten a single root folder when extracting.
    ///
    /// Defaults to on for the primary application only: plugin archives
    /// legitimately ship a single `obs-plugins/` root.
    pub fn flatten(&self) -> bool {
        self.flatten.unwrap_or_else(|| self.is_primary())
    }
}

/// Forum ids are usually strings but bare numbers show up too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ResourceId {
    Text(String),
    Number(u64),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawObject {
    github: Option<String>,
    obsproject: Option<ResourceId>,
    filename: Option<String>,
    force_download: bool,
    release: Option<String>,
    flatten: Option<bool>,
}

/// The loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallConfig {
    /// Objects in document order.
    pub objects: Vec<DownloadObject>,
}

impl InstallConfig {
    /// Published default document.
    pub const DEFAULT_URL: &'static str =
        "https://raw.githubusercontent.com/Spafbi/cgg-obs/main/defaults.json";

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        let Value::Object(mut doc) = value else {
            return Err(ConfigError::Empty);
        };

        let moves = match doc.shift_remove("moves") {
            Some(Value::Object(moves)) => moves,
            Some(other) => {
                warn!("Ignoring 'moves': expected an object, got {}", other);
                Map::new()
            }
            None => Map::new(),
        };

        let downloads = match doc.shift_remove("downloads") {
            Some(Value::Object(downloads)) => downloads,
            Some(_) => return Err(ConfigError::Empty),
            None => doc,
        };

        let mut objects = Vec::with_capacity(downloads.len());
        for (name, value) in downloads {
            let raw: RawObject = match serde_json::from_value(value) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!("Skipping '{}': {}", name, e);
                    continue;
                }
            };
            match Self::build_object(name, raw, &moves) {
                Ok(Some(object)) => objects.push(object),
                Ok(None) => {}
                Err(e) => warn!("Skipping entry: {}", e),
            }
        }

        for name in moves.keys() {
            if !objects.iter().any(|o| &o.name == name) {
                warn!("Ignoring move for unknown object '{}'", name);
            }
        }

        if objects.is_empty() {
            return Err(ConfigError::Empty);
        }
        debug!("Loaded {} download objects", objects.len());
        Ok(Self { objects })
    }

    fn build_object(
        name: String,
        raw: RawObject,
        moves: &Map<String, Value>,
    ) -> Result<Option<DownloadObject>, ConfigError> {
        let Some(filename) = raw.filename.filter(|f| !f.trim().is_empty()) else {
            warn!("Skipping '{}': no filename pattern", name);
            return Ok(None);
        };

        let source = match (raw.obsproject, raw.github) {
            (Some(ResourceId::Text(resource)), _) => Source::Forum { resource },
            (Some(ResourceId::Number(id)), _) => Source::Forum {
                resource: id.to_string(),
            },
            (None, Some(repo)) => Source::GitHub { repo },
            (None, None) => {
                warn!("Skipping '{}': neither 'github' nor 'obsproject' is set", name);
                return Ok(None);
            }
        };

        let pattern =
            FilenamePattern::new(&filename).map_err(|_| ConfigError::InvalidPattern {
                name: name.clone(),
                pattern: filename.clone(),
            })?;

        let move_to = match moves.get(&name) {
            Some(Value::String(sub)) if !sub.trim().is_empty() => Some(sub.clone()),
            Some(other) => {
                warn!("Ignoring move for '{}': {}", name, other);
                None
            }
            None => None,
        };

        Ok(Some(DownloadObject {
            name,
            source,
            pattern,
            release: raw.release.filter(|r| !r.trim().is_empty()),
            force_download: raw.force_download,
            move_to,
            flatten: raw.flatten,
        }))
    }

    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub async fn load_url(client: &ClientWithMiddleware, url: &Url) -> Result<Self, ConfigError> {
        let fetch_error = |message: String| ConfigError::Fetch {
            url: url.to_string(),
            message,
        };

        let res = client
            .get(url.clone())
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;
        if !res.status().is_success() {
            return Err(fetch_error(format!("HTTP {}", res.status())));
        }
        let text = res.text().await.map_err(|e| fetch_error(e.to_string()))?;
        Self::from_json(&text)
    }

    /// Load from a path or URL, or from [`Self::DEFAULT_URL`] when `location`
    /// is `None`.
    pub async fn load(
        location: Option<&str>,
        client: &ClientWithMiddleware,
    ) -> Result<Self, ConfigError> {
        let location = location.unwrap_or(Self::DEFAULT_URL);

        if location.starts_with("http://") || location.starts_with("https://") {
            let url = Url::parse(location).map_err(|e| ConfigError::Fetch {
                url: location.to_string(),
                message: e.to_string(),
            })?;
            info!("Loading configuration from {}", url);
            return Self::load_url(client, &url).await;
        }

        info!("Loading configuration from {}", location);
        Self::load_file(Path::new(location))
    }

    pub fn object(&self, name: &str) -> Option<&DownloadObject> {
        self.objects.iter().find(|o| o.name == name)
    }

    /// Objects in install order: the primary application first, then the
    /// rest in document order.
    pub fn install_order(&self) -> Vec<&DownloadObject> {
        let (primary, rest): (Vec<_>, Vec<_>) = self.objects.iter().partition(|o| o.is_primary());
        primary.into_iter().chain(rest).collect()
    }
}
