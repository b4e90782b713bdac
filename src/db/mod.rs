pub mod connection;
pub mod migrations;
pub mod posts;
pub mod store;
pub mod tags;

pub use connection::DbPool;
pub use store::SqliteStore;
