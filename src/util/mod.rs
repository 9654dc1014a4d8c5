//! Utility functions shared across the crate.
//!
//! - **Text processing**: slug derivation, control-character stripping and
//!   width-aware truncation for terminal rendering
//! - **URL validation**: base URL and browser-open checks
//!
//! # Examples
//!
//! ```
//! use taxon::util::{slugify, truncate_to_width};
//!
//! assert_eq!(slugify("Data Science & AI"), "data-science-ai");
//! assert_eq!(truncate_to_width("Photography", 8), "Photo...");
//! ```

mod text;
mod url_validator;

pub use text::{display_width, slugify, strip_control_chars, truncate_to_width};
pub use url_validator::{validate_base_url, validate_url_for_open, UrlValidationError};
