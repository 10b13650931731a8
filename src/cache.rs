pub mod buckets;
pub mod campaign;
pub mod collection;
pub mod manager;
pub mod resource;
pub mod weekly;

pub use manager::CacheManager;
pub use resource::{bulk_maybe_reload, Fetcher, ReloadReport, Reloadable, RemoteResource};
