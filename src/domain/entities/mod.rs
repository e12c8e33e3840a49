//! Core domain entities.
//!
//! Entities are plain data structures. Creation inputs live in separate
//! structs (`NewShortUrl`, `NewClick`) and owner-driven changes in
//! [`ShortUrlPatch`].
//!
//! - [`ShortUrl`] - A code-to-destination mapping
//! - [`Click`] - A recorded visit to a short URL

pub mod click;
pub mod short_url;

pub use click::{Click, ClickEnrichment, ClickMetadata, NewClick, UNKNOWN};
pub use short_url::{NewShortUrl, ShortUrl, ShortUrlPatch};
