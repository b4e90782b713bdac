use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A blog post
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub content: String,
    pub published: bool,
    pub pinned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Tags ordered by name
    #[serde(default)]
    pub tags: Vec<Tag>,
}

/// A tag for categorizing posts. The slug is the identity key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: String,
    pub name: String,
    pub slug: String,
}

/// Input for creating a new post
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostInput {
    pub title: String,
    /// Derived from the title when not given
    pub slug: Option<String>,
    pub description: Option<String>,
    pub content: String,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub pinned: bool,
    /// Tag names, connected or created by slug
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Input for updating an existing post
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostInput {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub published: Option<bool>,
    pub pinned: Option<bool>,
    /// When set, replaces the whole tag set
    pub tags: Option<Vec<String>>,
}

/// Filters for the dashboard post listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostFilter {
    pub published: Option<bool>,
    pub tag_slug: Option<String>,
    /// Case-insensitive containment over title, description, content or
    /// any tag name
    pub search: Option<String>,
}
