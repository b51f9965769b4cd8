//! Learning-management backend: typed REST client and its cached front.

pub mod api_types;
pub mod cached_client;
pub mod client;
pub mod error;
pub mod params;
pub mod resource;
pub mod transport;
pub mod types;

pub use cached_client::CachedClient;
pub use client::ApiClient;
pub use error::ApiError;
pub use resource::{ListParams, Resource, ResourceKind};
