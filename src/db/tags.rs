//! Tag database operations
//!
//! Tag identity is the slug; names are display values cleaned on entry.

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::models::Tag;

#[derive(Error, Debug)]
pub enum TagDbError {
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
    #[error("Tag not found: {0}")]
    NotFound(String),
}

/// Record of one tag touched by `cleanup_tags`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanedTag {
    pub old_name: String,
    pub new_name: String,
    pub merged: bool,
}

/// Turn a tag name into its canonical slug: lowercase, alphanumerics kept,
/// runs of whitespace / `-` / `_` collapsed into single dashes, everything
/// else dropped.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.to_lowercase().chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else if c.is_whitespace() || c == '-' || c == '_' {
            pending_dash = true;
        }
    }
    slug
}

/// Normalize a raw tag name: trim whitespace, strip wrapping quote runs
pub fn clean_tag_name(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_string()
}

/// Map a database row to a Tag struct
fn row_to_tag(row: &rusqlite::Row) -> Result<Tag, rusqlite::Error> {
    Ok(Tag {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
    })
}

/// Get a tag by ID
pub fn get_tag(conn: &Connection, id: &str) -> Result<Option<Tag>, TagDbError> {
    let mut stmt = conn.prepare("SELECT id, name, slug FROM tags WHERE id = ?1")?;
    let tag = stmt.query_row([id], row_to_tag).optional()?;
    Ok(tag)
}

/// Find a tag by slug
pub fn find_tag_by_slug(conn: &Connection, slug: &str) -> Result<Option<Tag>, TagDbError> {
    let mut stmt = conn.prepare("SELECT id, name, slug FROM tags WHERE slug = ?1")?;
    let tag = stmt.query_row([slug], row_to_tag).optional()?;
    Ok(tag)
}

/// Get all tags in the database
pub fn get_all_tags(conn: &Connection) -> Result<Vec<Tag>, TagDbError> {
    let mut stmt = conn.prepare("SELECT id, name, slug FROM tags ORDER BY name")?;

    let tags = stmt
        .query_map([], row_to_tag)?
        .filter_map(Result::ok)
        .collect();

    Ok(tags)
}

/// Find a tag by the slug of `name`, creating it if missing
pub fn find_or_create_tag(conn: &Connection, name: &str) -> Result<Tag, TagDbError> {
    let clean = clean_tag_name(name);
    let slug = slugify(&clean);

    if let Some(existing) = find_tag_by_slug(conn, &slug)? {
        return Ok(existing);
    }

    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO tags (id, name, slug) VALUES (?1, ?2, ?3)",
        params![id, clean, slug],
    )?;

    get_tag(conn, &id)?.ok_or(TagDbError::NotFound(id))
}

/// Get all tags for a specific post
pub fn tags_for_post(conn: &Connection, post_id: &str) -> Result<Vec<Tag>, TagDbError> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.name, t.slug
         FROM tags t
         INNER JOIN post_tags pt ON t.id = pt.tag_id
         WHERE pt.post_id = ?1
         ORDER BY t.name",
    )?;

    let tags = stmt
        .query_map([post_id], row_to_tag)?
        .filter_map(Result::ok)
        .collect();

    Ok(tags)
}

/// Replace the tag set of a post with the given names.
/// Names that clean down to nothing are skipped.
pub fn set_post_tags(
    conn: &Connection,
    post_id: &str,
    names: &[String],
) -> Result<Vec<Tag>, TagDbError> {
    conn.execute("DELETE FROM post_tags WHERE post_id = ?1", [post_id])?;

    let mut tags: Vec<Tag> = Vec::new();
    for name in names {
        if slugify(&clean_tag_name(name)).is_empty() {
            continue;
        }
        let tag = find_or_create_tag(conn, name)?;
        if tags.iter().any(|t| t.id == tag.id) {
            continue;
        }
        conn.execute(
            "INSERT OR IGNORE INTO post_tags (post_id, tag_id) VALUES (?1, ?2)",
            params![post_id, tag.id],
        )?;
        tags.push(tag);
    }

    Ok(tags)
}

/// Tags that appear on at least one published post
pub fn published_tags(conn: &Connection) -> Result<Vec<Tag>, TagDbError> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT t.id, t.name, t.slug
         FROM tags t
         INNER JOIN post_tags pt ON t.id = pt.tag_id
         INNER JOIN posts p ON p.id = pt.post_id
         WHERE p.published = TRUE
         ORDER BY t.name",
    )?;

    let tags = stmt
        .query_map([], row_to_tag)?
        .filter_map(Result::ok)
        .collect();

    Ok(tags)
}

/// Normalize every tag name and merge duplicates that end up sharing a slug.
/// Returns one record per tag that was renamed or merged.
pub fn cleanup_tags(conn: &Connection) -> Result<Vec<CleanedTag>, TagDbError> {
    let tags = get_all_tags(conn)?;
    let mut cleaned = Vec::new();

    for tag in tags {
        let new_name = clean_tag_name(&tag.name);
        let new_slug = slugify(&new_name);
        if new_name == tag.name && new_slug == tag.slug {
            continue;
        }

        match find_tag_by_slug(conn, &new_slug)? {
            Some(canonical) if canonical.id != tag.id => {
                // Another tag already owns this slug: move the links over,
                // drop the duplicate (post_tags rows cascade)
                conn.execute(
                    "INSERT OR IGNORE INTO post_tags (post_id, tag_id)
                     SELECT post_id, ?1 FROM post_tags WHERE tag_id = ?2",
                    params![canonical.id, tag.id],
                )?;
                conn.execute("DELETE FROM tags WHERE id = ?1", [&tag.id])?;
                cleaned.push(CleanedTag {
                    old_name: tag.name,
                    new_name: canonical.name,
                    merged: true,
                });
            }
            _ => {
                conn.execute(
                    "UPDATE tags SET name = ?1, slug = ?2 WHERE id = ?3",
                    params![new_name, new_slug, tag.id],
                )?;
                cleaned.push(CleanedTag {
                    old_name: tag.name,
                    new_name,
                    merged: false,
                });
            }
        }
    }

    log::info!("[tags] cleanup touched {} tags", cleaned.len());
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::init_test_pool;

    fn insert_post(conn: &Connection, id: &str, published: bool) {
        conn.execute(
            "INSERT INTO posts (id, title, slug, content, published) VALUES (?1, ?2, ?3, 'body', ?4)",
            params![id, format!("Post {}", id), format!("post-{}", id), published],
        )
        .unwrap();
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Machine Learning"), "machine-learning");
        assert_eq!(slugify("  rust_lang  "), "rust-lang");
        assert_eq!(slugify("C++"), "c");
        assert_eq!(slugify("rust & go"), "rust-go");
        assert_eq!(slugify("--already-sluggy--"), "already-sluggy");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_clean_tag_name() {
        assert_eq!(clean_tag_name("  rust  "), "rust");
        assert_eq!(clean_tag_name("\"quoted\""), "quoted");
        assert_eq!(clean_tag_name("''double''"), "double");
        assert_eq!(clean_tag_name("' padded '"), "padded");
        assert_eq!(clean_tag_name("plain"), "plain");
    }

    #[test]
    fn test_find_or_create_tag_is_slug_keyed() {
        let pool = init_test_pool().unwrap();
        let conn = pool.get().unwrap();

        let first = find_or_create_tag(&conn, "Machine Learning").unwrap();
        assert_eq!(first.slug, "machine-learning");
        assert_eq!(first.name, "Machine Learning");

        // Different spellings of the same slug resolve to the same tag
        let second = find_or_create_tag(&conn, "machine-learning").unwrap();
        assert_eq!(second.id, first.id);

        let third = find_or_create_tag(&conn, "\"machine learning\"").unwrap();
        assert_eq!(third.id, first.id);
    }

    #[test]
    fn test_set_post_tags_replaces_set() {
        let pool = init_test_pool().unwrap();
        let conn = pool.get().unwrap();
        insert_post(&conn, "p1", true);

        let tags = set_post_tags(
            &conn,
            "p1",
            &["rust".to_string(), "devops".to_string(), "rust".to_string()],
        )
        .unwrap();
        assert_eq!(tags.len(), 2);

        let current = tags_for_post(&conn, "p1").unwrap();
        assert_eq!(current.len(), 2);

        // Re-setting replaces, not appends
        let tags = set_post_tags(&conn, "p1", &["kubernetes".to_string()]).unwrap();
        assert_eq!(tags.len(), 1);
        let current = tags_for_post(&conn, "p1").unwrap();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].slug, "kubernetes");
    }

    #[test]
    fn test_set_post_tags_skips_empty_names() {
        let pool = init_test_pool().unwrap();
        let conn = pool.get().unwrap();
        insert_post(&conn, "p1", true);

        let tags = set_post_tags(
            &conn,
            "p1",
            &["  ".to_string(), "\"\"".to_string(), "real".to_string()],
        )
        .unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].slug, "real");
    }

    #[test]
    fn test_published_tags() {
        let pool = init_test_pool().unwrap();
        let conn = pool.get().unwrap();
        insert_post(&conn, "pub", true);
        insert_post(&conn, "draft", false);

        set_post_tags(&conn, "pub", &["visible".to_string()]).unwrap();
        set_post_tags(&conn, "draft", &["hidden".to_string()]).unwrap();

        let tags = published_tags(&conn).unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].slug, "visible");
    }

    #[test]
    fn test_cleanup_renames_dirty_tag() {
        let pool = init_test_pool().unwrap();
        let conn = pool.get().unwrap();

        // Simulate a tag that slipped in unclean
        conn.execute(
            "INSERT INTO tags (id, name, slug) VALUES ('t1', '\"Rust\"', 'dirty-rust')",
            [],
        )
        .unwrap();

        let cleaned = cleanup_tags(&conn).unwrap();
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].old_name, "\"Rust\"");
        assert_eq!(cleaned[0].new_name, "Rust");
        assert!(!cleaned[0].merged);

        let tag = get_tag(&conn, "t1").unwrap().unwrap();
        assert_eq!(tag.name, "Rust");
        assert_eq!(tag.slug, "rust");
    }

    #[test]
    fn test_cleanup_merges_duplicate_slugs() {
        let pool = init_test_pool().unwrap();
        let conn = pool.get().unwrap();
        insert_post(&conn, "p1", true);

        let canonical = find_or_create_tag(&conn, "rust").unwrap();
        conn.execute(
            "INSERT INTO tags (id, name, slug) VALUES ('dup', '\"rust\"', 'quoted-rust')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO post_tags (post_id, tag_id) VALUES ('p1', 'dup')",
            [],
        )
        .unwrap();

        let cleaned = cleanup_tags(&conn).unwrap();
        assert_eq!(cleaned.len(), 1);
        assert!(cleaned[0].merged);

        // Duplicate is gone, its post now points at the canonical tag
        assert!(get_tag(&conn, "dup").unwrap().is_none());
        let tags = tags_for_post(&conn, "p1").unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].id, canonical.id);

        // Second pass has nothing left to do
        assert!(cleanup_tags(&conn).unwrap().is_empty());
    }
}
