//! Post database operations
//!
//! CRUD plus the query surface the search engine is built on: ranked
//! full-text lookup, tag-name lookup, and the substring fallback.

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, ToSql};
use thiserror::Error;
use uuid::Uuid;

use super::tags::{self, TagDbError};
use crate::models::{CreatePostInput, Post, PostFilter, Tag, UpdatePostInput};

#[derive(Error, Debug)]
pub enum PostDbError {
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
    #[error("Tag error: {0}")]
    TagError(#[from] TagDbError),
    #[error("Post not found: {0}")]
    NotFound(String),
}

/// Shared SELECT head: post columns plus the tag rows aggregated to JSON,
/// ordered by tag name.
const POST_SELECT: &str = "SELECT p.id, p.title, p.slug, p.description, p.content,
        p.published, p.pinned, p.created_at, p.updated_at,
        (SELECT json_group_array(json_object('id', id, 'name', name, 'slug', slug))
         FROM (SELECT t.id, t.name, t.slug
               FROM tags t
               INNER JOIN post_tags pt ON pt.tag_id = t.id
               WHERE pt.post_id = p.id
               ORDER BY t.name)) AS tags
 FROM posts p";

/// Parse a datetime string from SQLite into a DateTime<Utc>
fn parse_datetime(s: &str) -> DateTime<Utc> {
    // SQLite stores datetimes as strings, try common formats
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    // Try SQLite's default format
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Utc.from_utc_datetime(&naive);
    }
    // Fallback to now if parsing fails
    Utc::now()
}

/// Parse the JSON tag aggregate produced by `POST_SELECT`
fn parse_tags(raw: Option<&str>) -> Vec<Tag> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    match serde_json::from_str(raw) {
        Ok(tags) => tags,
        Err(err) => {
            log::warn!("[posts] malformed tag aggregate, dropping: {}", err);
            Vec::new()
        }
    }
}

/// Map a database row to a Post struct
fn row_to_post(row: &Row) -> Result<Post, rusqlite::Error> {
    let created_at_str: String = row.get(7)?;
    let updated_at_str: String = row.get(8)?;
    let tags_json: Option<String> = row.get(9)?;

    Ok(Post {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        description: row.get(3)?,
        content: row.get(4)?,
        published: row.get(5)?,
        pinned: row.get(6)?,
        created_at: parse_datetime(&created_at_str),
        updated_at: parse_datetime(&updated_at_str),
        tags: parse_tags(tags_json.as_deref()),
    })
}

/// Create a new post
pub fn create_post(conn: &Connection, input: CreatePostInput) -> Result<Post, PostDbError> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let slug = match input.slug {
        Some(s) if !s.trim().is_empty() => s,
        _ => tags::slugify(&input.title),
    };

    conn.execute(
        "INSERT INTO posts (id, title, slug, description, content, published, pinned, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            id,
            input.title,
            slug,
            input.description,
            input.content,
            input.published,
            input.pinned,
            now,
            now,
        ],
    )?;

    tags::set_post_tags(conn, &id, &input.tags)?;

    get_post(conn, &id)?.ok_or(PostDbError::NotFound(id))
}

/// Get a post by ID
pub fn get_post(conn: &Connection, id: &str) -> Result<Option<Post>, PostDbError> {
    let mut stmt = conn.prepare(&format!("{} WHERE p.id = ?1", POST_SELECT))?;
    let post = stmt.query_row([id], row_to_post).optional()?;
    Ok(post)
}

/// Get a post by slug
pub fn get_post_by_slug(conn: &Connection, slug: &str) -> Result<Option<Post>, PostDbError> {
    let mut stmt = conn.prepare(&format!("{} WHERE p.slug = ?1", POST_SELECT))?;
    let post = stmt.query_row([slug], row_to_post).optional()?;
    Ok(post)
}

/// Update an existing post. `tags: Some(names)` replaces the tag set.
pub fn update_post(
    conn: &Connection,
    id: &str,
    input: UpdatePostInput,
) -> Result<Post, PostDbError> {
    // First check if the post exists
    let existing = get_post(conn, id)?.ok_or_else(|| PostDbError::NotFound(id.to_string()))?;

    let now = Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let title = input.title.unwrap_or(existing.title);
    let slug = input.slug.unwrap_or(existing.slug);
    let description = input.description.or(existing.description);
    let content = input.content.unwrap_or(existing.content);
    let published = input.published.unwrap_or(existing.published);
    let pinned = input.pinned.unwrap_or(existing.pinned);

    conn.execute(
        "UPDATE posts SET title = ?1, slug = ?2, description = ?3, content = ?4,
                          published = ?5, pinned = ?6, updated_at = ?7
         WHERE id = ?8",
        params![title, slug, description, content, published, pinned, now, id],
    )?;

    if let Some(names) = input.tags {
        tags::set_post_tags(conn, id, &names)?;
    }

    get_post(conn, id)?.ok_or(PostDbError::NotFound(id.to_string()))
}

/// Delete a post (cascades to post_tags, FTS row dropped by trigger)
pub fn delete_post(conn: &Connection, id: &str) -> Result<bool, PostDbError> {
    let rows_affected = conn.execute("DELETE FROM posts WHERE id = ?1", [id])?;
    Ok(rows_affected > 0)
}

/// List posts matching the filter, pinned first, newest first
pub fn list_posts(conn: &Connection, filter: &PostFilter) -> Result<Vec<Post>, PostDbError> {
    let mut sql = String::from(POST_SELECT);
    let mut clauses: Vec<String> = Vec::new();
    let mut bindings: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(published) = filter.published {
        clauses.push(format!("p.published = ?{}", bindings.len() + 1));
        bindings.push(Box::new(published));
    }
    if let Some(tag_slug) = &filter.tag_slug {
        clauses.push(format!(
            "EXISTS (SELECT 1 FROM post_tags pt
                     INNER JOIN tags t ON t.id = pt.tag_id
                     WHERE pt.post_id = p.id AND t.slug = ?{})",
            bindings.len() + 1
        ));
        bindings.push(Box::new(tag_slug.clone()));
    }
    if let Some(search) = &filter.search {
        let n = bindings.len() + 1;
        clauses.push(format!(
            "(LOWER(p.title) LIKE ?{n} OR LOWER(p.description) LIKE ?{n} OR LOWER(p.content) LIKE ?{n}
              OR EXISTS (SELECT 1 FROM post_tags pt
                         INNER JOIN tags t ON t.id = pt.tag_id
                         WHERE pt.post_id = p.id AND LOWER(t.name) LIKE ?{n}))",
            n = n
        ));
        bindings.push(Box::new(format!("%{}%", search.to_lowercase())));
    }

    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY p.pinned DESC, p.created_at DESC");

    let mut stmt = conn.prepare(&sql)?;
    let posts = stmt
        .query_map(params_from_iter(bindings), row_to_post)?
        .filter_map(Result::ok)
        .collect();

    Ok(posts)
}

/// Full-text lookup: post ids ordered best-first by bm25 with title
/// weighted over description over content
pub fn search_ranked_ids(
    conn: &Connection,
    term: &str,
    published_only: bool,
) -> Result<Vec<String>, PostDbError> {
    let expr = fts_match_expr(term);
    if expr.is_empty() {
        return Ok(Vec::new());
    }

    let sql = if published_only {
        "SELECT p.id
         FROM posts_fts
         INNER JOIN posts p ON p.rowid = posts_fts.rowid
         WHERE posts_fts MATCH ?1 AND p.published = TRUE
         ORDER BY bm25(posts_fts, 5.0, 2.0, 1.0)"
    } else {
        "SELECT p.id
         FROM posts_fts
         INNER JOIN posts p ON p.rowid = posts_fts.rowid
         WHERE posts_fts MATCH ?1
         ORDER BY bm25(posts_fts, 5.0, 2.0, 1.0)"
    };

    let mut stmt = conn.prepare(sql)?;
    let ids = stmt
        .query_map([expr], |row| row.get(0))?
        .filter_map(Result::ok)
        .collect();

    Ok(ids)
}

/// Ids of posts carrying a tag whose name contains `needle`, newest first
pub fn ids_by_tag_name_contains(
    conn: &Connection,
    needle: &str,
    published_only: bool,
) -> Result<Vec<String>, PostDbError> {
    let pattern = format!("%{}%", needle.to_lowercase());

    let sql = if published_only {
        "SELECT p.id FROM posts p
         WHERE p.published = TRUE
           AND EXISTS (SELECT 1 FROM post_tags pt
                       INNER JOIN tags t ON t.id = pt.tag_id
                       WHERE pt.post_id = p.id AND LOWER(t.name) LIKE ?1)
         ORDER BY p.created_at DESC"
    } else {
        "SELECT p.id FROM posts p
         WHERE EXISTS (SELECT 1 FROM post_tags pt
                       INNER JOIN tags t ON t.id = pt.tag_id
                       WHERE pt.post_id = p.id AND LOWER(t.name) LIKE ?1)
         ORDER BY p.created_at DESC"
    };

    let mut stmt = conn.prepare(sql)?;
    let ids = stmt
        .query_map([pattern], |row| row.get(0))?
        .filter_map(Result::ok)
        .collect();

    Ok(ids)
}

/// Fetch full posts for a set of ids. Order is not significant; callers
/// re-sort. Unknown ids are silently absent.
pub fn posts_by_ids(conn: &Connection, ids: &[String]) -> Result<Vec<Post>, PostDbError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = (1..=ids.len())
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!("{} WHERE p.id IN ({})", POST_SELECT, placeholders);

    let mut stmt = conn.prepare(&sql)?;
    let posts = stmt
        .query_map(params_from_iter(ids), row_to_post)?
        .filter_map(Result::ok)
        .collect();

    Ok(posts)
}

/// Substring fallback over title/description/content and tag names
pub fn posts_by_substring(
    conn: &Connection,
    needle: &str,
    published_only: bool,
) -> Result<Vec<Post>, PostDbError> {
    let filter = PostFilter {
        published: published_only.then_some(true),
        tag_slug: None,
        search: Some(needle.to_string()),
    };
    list_posts(conn, &filter)
}

/// Rebuild the full-text index from the posts table
pub fn rebuild_search_index(conn: &Connection) -> Result<(), PostDbError> {
    conn.execute("INSERT INTO posts_fts(posts_fts) VALUES ('rebuild')", [])?;
    log::info!("[posts] search index rebuilt");
    Ok(())
}

/// Build an FTS5 MATCH expression from free text: each whitespace token is
/// quoted as a phrase (embedded quotes doubled) so user punctuation cannot
/// inject query syntax. Tokens are AND-joined.
fn fts_match_expr(text: &str) -> String {
    text.split_whitespace()
        .map(|token| format!("\"{}\"", token.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(" ")
}
