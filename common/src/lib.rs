//! Shared building blocks for panel-link.
//!
//! This crate carries the pieces every layer needs but none owns:
//! error-site capture and secret handling. It has no business logic.

pub mod error_location;
pub mod redacted_secret;

pub use error_location::ErrorLocation;
pub use redacted_secret::RedactedSecret;
