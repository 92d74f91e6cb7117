//! Multi-tier result cache.

pub mod tiered;
pub mod types;

pub use tiered::{ARTICLES_COLLECTION, TieredCache};
pub use types::{ArticleRecord, CacheSource, CachedVerdict, TieredLookupResult};
