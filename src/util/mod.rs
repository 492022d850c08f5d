//! Utility functions for common operations.
//!
//! - **API base URLs**: scheme checks before any request is built
//! - **Text processing**: control-character stripping and width-aware truncation
//!   for server-provided notification text

mod api_url;
mod text;

pub use api_url::{validate_api_base, UrlError};
pub use text::{display_width, strip_control_chars, truncate_to_width};
