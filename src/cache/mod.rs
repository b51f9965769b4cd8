//! Generic list cache for paginated, API-agnostic data.
//!
//! This module knows nothing about the backend it caches. It provides:
//! - Value-equal query keys built from a resource name plus sort/filter specs
//! - An in-memory store of pages per key with one fetch in flight per key
//! - Immediate eviction once no view subscribes to a key
//! - Optimistic deletes that hide an item before the server confirms

mod key;
mod layer;
mod mutation;
mod page;
mod store;
mod traits;

pub use key::{build_key, QueryKey};
pub use layer::{CacheLayer, FetchOutcome};
pub use mutation::DeleteOutcome;
pub use page::{flatten, Page};
pub use store::{ListState, QueryStore, Subscription};
pub use traits::{Entity, FetchError, ItemId};
