//! Application services layer: routing, snapshots and the composition root.

pub mod alias;
pub mod content;
pub mod error;
pub mod repos;
pub mod router;
pub mod service;
pub mod snapshot;

pub use content::PublishedContent;
pub use error::{AppError, ErrorReport, PublishedCacheError};
pub use repos::{ContentTreeProvider, ContentTypeSource, ProviderError};
pub use router::{ContentRouter, DEFAULT_URL_ALIAS_PROPERTY, RouterOptions};
pub use service::PublishedCacheService;
pub use snapshot::PublishedSnapshot;
