pub mod engine;
pub mod markdown;
pub mod reading_time;
pub mod snippet;
pub mod static_pages;
pub mod store;

pub use engine::{PostHit, SearchEngine, SearchResponse};
pub use static_pages::{PageHit, StaticPage};
pub use store::{PostStore, StoreError};
