//! Search and snippet engine for a personal blog.
//!
//! Posts live in SQLite with an FTS5 index kept in sync by triggers. The
//! search engine merges ranked full-text matches with tag-name matches,
//! falls back to substring scans when both come up empty, and decorates
//! every hit with snippets cut from markdown-stripped content. A fixed set
//! of static pages is matched alongside the posts.

pub mod config;
pub mod db;
pub mod models;
pub mod search;

pub use config::SiteConfig;
pub use db::{DbPool, SqliteStore};
pub use models::{Post, Tag};
pub use search::{SearchEngine, SearchResponse};
