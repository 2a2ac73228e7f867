//! Progress bar functionality.
//!
//! - `style` - progress bar styling options and templates
//! - `display` - coordination of the main bar and the child bars
//!
//! # Examples
//!
//! ```rust
//! use obsup::downloader::DownloaderBuilder;
//! use obsup::progress::{ProgressDisplay, StyleOptions};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let display = ProgressDisplay::new(StyleOptions::default(), 1);
//! let downloader = DownloaderBuilder::new().progress(display).build()?;
//! # Ok(())
//! # }
//! ```

pub(crate) mod display;
pub(crate) mod style;

pub use display::ProgressDisplay;
pub use style::{ProgressBarOpts, StyleOptions};
