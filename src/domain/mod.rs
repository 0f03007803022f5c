//! Domain layer types and invariants.

pub mod cache_level;
pub mod content;
pub mod content_type;
pub mod error;
pub mod routing;
pub mod segment;
