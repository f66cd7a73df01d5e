//! Location tracking for wxtrack
//!
//! Tracks which locations clients request weather for, keeps them active
//! while in use, and derives the location strings and cache keys the weather
//! fetch layer uses.

pub mod cache;
pub mod client;
pub mod clock;
pub mod error;
pub mod memory;
pub mod normalize;
pub mod repository;
pub mod store;
pub mod tracker;
pub mod types;

pub use cache::{cache_key, location_string, CacheQuery};
pub use client::LocationClient;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{TrackerError, TrackerResult};
pub use memory::InMemoryLocationStore;
pub use normalize::{AliasRule, AliasTable};
pub use repository::{open_repository, LocationRepository};
pub use store::SqliteLocationStore;
pub use tracker::LocationTracker;
pub use types::{LocationKey, LocationRecord};
