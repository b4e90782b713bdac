//! The search engine: ranked lookup, tag merge, fallback and assembly
//!
//! A query runs in one pass: sanitize, collect ranked ids from the
//! full-text index, collect tag-name hits, merge them in first-seen
//! order, fetch the posts, and build snippet-bearing hits. When the
//! merge comes up empty a plain substring scan keeps search usable.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{SearchOptions, SiteConfig};
use crate::models::{Post, Tag};

use super::markdown::strip_markdown;
use super::snippet::extract_snippets;
use super::static_pages::{match_pages, PageHit, StaticPage};
use super::store::{PostStore, StoreError};

/// A post matched by a search. Full content never leaves the engine;
/// clients get snippets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostHit {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub tags: Vec<Tag>,
    pub snippets: Vec<String>,
}

/// Everything one search returns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub posts: Vec<PostHit>,
    pub pages: Vec<PageHit>,
}

/// Blog search over an injected post store plus the static-page corpus.
pub struct SearchEngine<S> {
    store: S,
    options: SearchOptions,
    pages: Vec<StaticPage>,
}

impl<S: PostStore> SearchEngine<S> {
    pub fn new(store: S, config: &SiteConfig) -> Self {
        Self {
            store,
            options: config.search.clone(),
            pages: config.static_pages.clone(),
        }
    }

    /// Run a search. A blank query returns an empty response without
    /// touching the store. The ranked index is best-effort: when it
    /// errors the search continues on tag and substring matches alone.
    pub async fn search(
        &self,
        query: &str,
        published_only: bool,
    ) -> Result<SearchResponse, StoreError> {
        let q = query.trim();
        if q.is_empty() {
            return Ok(SearchResponse::default());
        }
        // apostrophes break tsquery-style parsers; spaces keep the words
        let term = q.replace('\'', " ");

        let ranked_ids = match self.store.ranked_ids_by_text(&term, published_only).await {
            Ok(ids) => ids,
            Err(e) => {
                log::warn!("[search] ranked lookup unavailable, continuing: {}", e);
                Vec::new()
            }
        };
        let tag_ids = self.store.ids_by_tag_name(q, published_only).await?;

        // ranked ids first, then tag hits; first occurrence fixes the position
        let mut order: HashMap<String, usize> = HashMap::new();
        let mut merged: Vec<String> = Vec::new();
        for id in ranked_ids.into_iter().chain(tag_ids) {
            if !order.contains_key(&id) {
                order.insert(id.clone(), merged.len());
                merged.push(id);
            }
        }

        let posts = if merged.is_empty() {
            self.store.posts_by_substring(q, published_only).await?
        } else {
            let mut posts = self.store.posts_by_ids(&merged).await?;
            posts.sort_by_key(|p| order.get(&p.id).copied().unwrap_or(usize::MAX));
            posts
        };

        log::info!("[search] '{}' matched {} posts", q, posts.len());

        let post_hits = posts.iter().map(|p| self.post_hit(p, q)).collect();
        let page_hits = match_pages(
            &self.pages,
            q,
            self.options.max_page_snippets,
            self.options.snippet_radius,
        );

        Ok(SearchResponse {
            posts: post_hits,
            pages: page_hits,
        })
    }

    /// Build the hit for one post: content snippets, then the description
    /// and title prepended when they match the query but no snippet shows
    /// them yet.
    fn post_hit(&self, post: &Post, q: &str) -> PostHit {
        let q_lower = q.to_lowercase();
        let plain = strip_markdown(&post.content);
        let mut snippets = extract_snippets(
            &plain,
            q,
            self.options.max_post_snippets,
            self.options.snippet_radius,
            self.options.max_snippet_len(),
        );

        if let Some(description) = &post.description {
            let lead: String = description.chars().take(30).collect();
            if description.to_lowercase().contains(&q_lower)
                && !snippets.iter().any(|s| s.contains(&lead))
            {
                snippets.insert(0, description.clone());
            }
        }
        let title_lower = post.title.to_lowercase();
        let title_lead: String = title_lower.chars().take(20).collect();
        if title_lower.contains(&q_lower)
            && !snippets
                .iter()
                .any(|s| s.to_lowercase().contains(&title_lead))
        {
            snippets.insert(0, post.title.clone());
        }
        snippets.truncate(self.options.max_post_snippets);

        PostHit {
            id: post.id.clone(),
            title: post.title.clone(),
            slug: post.slug.clone(),
            description: post.description.clone(),
            created_at: post.created_at,
            tags: post.tags.clone(),
            snippets,
        }
    }
}
