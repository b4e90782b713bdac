//! Static-page matching
//!
//! A handful of fixed pages (home, about, contact) never live in the
//! database. Search matches them by conjunctive token containment over a
//! small config-supplied corpus.

use serde::{Deserialize, Serialize};

use super::markdown::strip_markdown;
use super::snippet::extract_snippets;

/// A fixed page entry in the search corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticPage {
    pub path: String,
    pub title: String,
    pub searchable_text: String,
}

/// A static page matched by a search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageHit {
    pub path: String,
    pub title: String,
    pub snippets: Vec<String>,
}

/// Match `query` against the page corpus. A page matches when every
/// query token of length >= 2 is a substring of its lowercased text;
/// shorter tokens pass automatically. Parentheses count as whitespace.
pub fn match_pages(
    pages: &[StaticPage],
    query: &str,
    max_snippets: usize,
    radius: usize,
) -> Vec<PageHit> {
    let cleaned = query.to_lowercase().replace(['(', ')'], " ");
    let tokens: Vec<&str> = cleaned.split_whitespace().collect();
    pages
        .iter()
        .filter(|page| {
            let text = page.searchable_text.to_lowercase();
            tokens
                .iter()
                .all(|t| t.chars().count() < 2 || text.contains(t))
        })
        .map(|page| {
            let plain = strip_markdown(&page.searchable_text);
            let mut snippets = extract_snippets(&plain, query, max_snippets, radius, radius * 2);
            if snippets.is_empty() {
                // term only occurred inside stripped markup: show the
                // opening of the raw text instead
                let lead: String = page.searchable_text.chars().take(120).collect();
                snippets = vec![format!("{}…", lead)];
            }
            PageHit {
                path: page.path.clone(),
                title: page.title.clone(),
                snippets,
            }
        })
        .collect()
}
