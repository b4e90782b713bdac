//! Storage seam for the search engine
//!
//! The engine never talks to SQLite directly: it works against this
//! trait so tests can drive it with in-memory fakes and other backends
//! can slot in behind the same four queries.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::Post;

/// Errors surfaced by a post store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),
    #[error("connection pool error: {0}")]
    Pool(String),
}

/// The post queries the search engine needs.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Post ids matching `term` in the full-text index, best match first.
    async fn ranked_ids_by_text(
        &self,
        term: &str,
        published_only: bool,
    ) -> Result<Vec<String>, StoreError>;

    /// Ids of posts carrying a tag whose name contains `needle`,
    /// case-insensitive. Order is unspecified.
    async fn ids_by_tag_name(
        &self,
        needle: &str,
        published_only: bool,
    ) -> Result<Vec<String>, StoreError>;

    /// Full posts for `ids`. Result order is unspecified; unknown ids
    /// are skipped.
    async fn posts_by_ids(&self, ids: &[String]) -> Result<Vec<Post>, StoreError>;

    /// Substring scan over title, description, content and tag names,
    /// pinned posts first, newest first.
    async fn posts_by_substring(
        &self,
        needle: &str,
        published_only: bool,
    ) -> Result<Vec<Post>, StoreError>;
}
