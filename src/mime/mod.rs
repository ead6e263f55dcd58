//! MIME type compatibility and media type negotiation.
//!
//! These are plain functions over `type/subtype` strings. Wildcards are
//! honoured on either side of a comparison, so `text/json` and `*/json` are
//! compatible in both directions.

mod matcher;

// Re-export public items
pub use matcher::{is_compatible, is_valid, match_media_type, normalize};
