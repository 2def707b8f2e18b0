//! Disk-backed caches that persist across crawl runs.
//!
//! - [`RecordCache`] keeps raw primary-catalog records.
//! - [`MappingCache`] keeps secondary → primary identifier resolutions.
//!
//! Both load once at startup and flush after every write via [`CacheStore`].

mod mapping_cache;
mod record_cache;
mod store;

pub use mapping_cache::{MappingCache, MappingKey, MappingLookup};
pub use record_cache::RecordCache;
pub use store::CacheStore;
