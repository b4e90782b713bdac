//! SQLite-backed implementation of the search engine's post source

use async_trait::async_trait;
use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;

use super::connection::DbPool;
use super::posts;
use crate::models::Post;
use crate::search::store::{PostStore, StoreError};

/// `PostStore` over the connection pool
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, StoreError> {
        self.pool.get().map_err(|e| StoreError::Pool(e.to_string()))
    }
}

#[async_trait]
impl PostStore for SqliteStore {
    async fn ranked_ids_by_text(
        &self,
        term: &str,
        published_only: bool,
    ) -> Result<Vec<String>, StoreError> {
        let conn = self.conn()?;
        posts::search_ranked_ids(&conn, term, published_only)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    async fn ids_by_tag_name(
        &self,
        needle: &str,
        published_only: bool,
    ) -> Result<Vec<String>, StoreError> {
        let conn = self.conn()?;
        posts::ids_by_tag_name_contains(&conn, needle, published_only)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    async fn posts_by_ids(&self, ids: &[String]) -> Result<Vec<Post>, StoreError> {
        let conn = self.conn()?;
        posts::posts_by_ids(&conn, ids).map_err(|e| StoreError::Database(e.to_string()))
    }

    async fn posts_by_substring(
        &self,
        needle: &str,
        published_only: bool,
    ) -> Result<Vec<Post>, StoreError> {
        let conn = self.conn()?;
        posts::posts_by_substring(&conn, needle, published_only)
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SearchOptions, SiteConfig};
    use crate::db::connection::init_test_pool;
    use crate::db::posts::create_post;
    use crate::models::CreatePostInput;
    use crate::search::engine::SearchEngine;

    fn post_input(title: &str, content: &str, tags: &[&str]) -> CreatePostInput {
        CreatePostInput {
            title: title.to_string(),
            slug: None,
            description: None,
            content: content.to_string(),
            published: true,
            pinned: false,
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_store_methods_roundtrip() {
        let pool = init_test_pool().unwrap();
        let seeded = {
            let conn = pool.get().unwrap();
            create_post(&conn, post_input("Kubernetes guide", "cluster notes", &[])).unwrap()
        };
        let store = SqliteStore::new(pool);

        let ids = store.ranked_ids_by_text("kubernetes", true).await.unwrap();
        assert_eq!(ids, vec![seeded.id.clone()]);

        let posts = store.posts_by_ids(&ids).await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "Kubernetes guide");

        let fallback = store.posts_by_substring("cluster", true).await.unwrap();
        assert_eq!(fallback.len(), 1);

        assert!(store.ids_by_tag_name("anything", true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_engine_end_to_end_on_sqlite() {
        let pool = init_test_pool().unwrap();
        let (text_hit, tag_hit) = {
            let conn = pool.get().unwrap();
            let mut first = post_input(
                "Kubernetes at home",
                "# Setup\n\nRunning **kubernetes** on spare laptops.",
                &[],
            );
            first.description = Some("Notes from the homelab".to_string());
            let text_hit = create_post(&conn, first).unwrap();
            let tag_hit =
                create_post(&conn, post_input("Cluster diary", "daily notes", &["kubernetes"]))
                    .unwrap();
            (text_hit, tag_hit)
        };

        let config = SiteConfig {
            search: SearchOptions::default(),
            static_pages: Vec::new(),
        };
        let engine = SearchEngine::new(SqliteStore::new(pool), &config);

        let response = engine.search("kubernetes", true).await.unwrap();
        assert_eq!(response.posts.len(), 2);

        // Text match ranks ahead of the tag-only match
        assert_eq!(response.posts[0].id, text_hit.id);
        assert_eq!(response.posts[1].id, tag_hit.id);

        // Title is injected ahead of the content snippet
        assert_eq!(response.posts[0].snippets[0], "Kubernetes at home");
        assert!(response.posts[0].snippets[1].contains("Running kubernetes"));

        // Tag-only hits come back even without matching text
        assert!(response.posts[1].snippets.is_empty());
        assert_eq!(response.posts[1].tags.len(), 1);
        assert_eq!(response.posts[1].tags[0].slug, "kubernetes");

        assert!(response.pages.is_empty());
    }

    #[tokio::test]
    async fn test_content_match_snippet_is_first_occurrence() {
        let pool = init_test_pool().unwrap();
        let seeded = {
            let conn = pool.get().unwrap();
            create_post(
                &conn,
                post_input(
                    "Zero Downtime CI/CD",
                    "We lean on **Kubernetes for rollout** so deploys never drop a request.",
                    &["DevOps"],
                ),
            )
            .unwrap()
        };

        let config = SiteConfig {
            search: SearchOptions::default(),
            static_pages: Vec::new(),
        };
        let engine = SearchEngine::new(SqliteStore::new(pool), &config);

        let response = engine.search("kubernetes", true).await.unwrap();
        assert_eq!(response.posts.len(), 1);
        assert_eq!(response.posts[0].id, seeded.id);
        // the snippet shows the emphasis-stripped body around the first hit
        assert!(response.posts[0].snippets[0].contains("Kubernetes for rollout"));
    }
}
