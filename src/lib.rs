//! Published-content resolution and caching engine.
//!
//! Resolves routes to published nodes and back, finds nodes by url alias,
//! and caches converted property values at the element, elements and
//! snapshot levels.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
