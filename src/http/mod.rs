//! HTTP module containing HTTP client functionality.
//!
//! This module provides HTTP client setup and configuration shared by the
//! release resolvers and the downloader.
//!
//! # Examples
//!
//! ```rust
//! use obsup::http::{create_http_client, HttpClientConfig};
//! use reqwest::header::{HeaderMap, ACCEPT};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut headers = HeaderMap::new();
//! headers.insert(ACCEPT, "application/vnd.github+json".parse()?);
//!
//! let config = HttpClientConfig {
//!     retries: 5,
//!     headers: Some(headers),
//!     ..Default::default()
//! };
//!
//! let client = create_http_client(config)?;
//! # Ok(())
//! # }
//! ```

pub mod client;

pub use client::{create_http_client, HttpClientConfig, USER_AGENT};
