//! Shared utility functions.
//!
//! # Examples
//!
//! ```rust
//! use obsup::utils::parse_content_range_total;
//!
//! let header_value = "bytes 0-1023/2048";
//! if let Some(total_size) = parse_content_range_total(header_value) {
//!     println!("Total file size: {} bytes", total_size);
//! }
//! ```

pub mod content_length;

pub use content_length::{
    get_content_length, header_content_length, parse_content_range_start,
    parse_content_range_total,
};
