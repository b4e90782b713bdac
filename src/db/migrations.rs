use rusqlite::Connection;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
}

const MIGRATIONS: &[(&str, &str)] = &[
    ("001_initial_schema", MIGRATION_001_INITIAL_SCHEMA),
    ("002_indexes", MIGRATION_002_INDEXES),
    ("003_search_index", MIGRATION_003_SEARCH_INDEX),
];

/// Apply any migrations not yet recorded in the `_migrations` table.
pub fn run_migrations(conn: &Connection) -> Result<(), MigrationError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );",
    )?;

    for (name, sql) in MIGRATIONS {
        if applied(conn, name)? {
            continue;
        }
        conn.execute_batch(sql)?;
        conn.execute("INSERT INTO _migrations (name) VALUES (?1)", [name])?;
        log::info!("[migrations] applied {}", name);
    }

    Ok(())
}

fn applied(conn: &Connection, name: &str) -> Result<bool, MigrationError> {
    let count: i32 = conn.query_row(
        "SELECT COUNT(*) FROM _migrations WHERE name = ?1",
        [name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

const MIGRATION_001_INITIAL_SCHEMA: &str = r#"
-- Core post storage
CREATE TABLE posts (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    slug TEXT NOT NULL UNIQUE,
    description TEXT,
    content TEXT NOT NULL,
    published BOOLEAN DEFAULT FALSE,
    pinned BOOLEAN DEFAULT FALSE,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

-- Tags for categorization
CREATE TABLE tags (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    slug TEXT NOT NULL UNIQUE
);

-- Post-Tag relationship
CREATE TABLE post_tags (
    post_id TEXT REFERENCES posts(id) ON DELETE CASCADE,
    tag_id TEXT REFERENCES tags(id) ON DELETE CASCADE,
    PRIMARY KEY (post_id, tag_id)
);
"#;

const MIGRATION_002_INDEXES: &str = r#"
-- Indexes for common queries
CREATE INDEX idx_posts_published ON posts(published);
CREATE INDEX idx_posts_pinned ON posts(pinned);
CREATE INDEX idx_posts_created_at ON posts(created_at);
CREATE INDEX idx_post_tags_post_id ON post_tags(post_id);
CREATE INDEX idx_post_tags_tag_id ON post_tags(tag_id);
"#;

const MIGRATION_003_SEARCH_INDEX: &str = r#"
-- Full-text index over posts. content='posts' keeps the posts table as the
-- single source of truth; the triggers below keep the index in sync.
CREATE VIRTUAL TABLE posts_fts USING fts5(
    title,
    description,
    content,
    content='posts',
    tokenize='porter unicode61'
);

CREATE TRIGGER posts_fts_insert AFTER INSERT ON posts BEGIN
    INSERT INTO posts_fts(rowid, title, description, content)
    VALUES (new.rowid, new.title, new.description, new.content);
END;

CREATE TRIGGER posts_fts_delete AFTER DELETE ON posts BEGIN
    INSERT INTO posts_fts(posts_fts, rowid, title, description, content)
    VALUES ('delete', old.rowid, old.title, old.description, old.content);
END;

CREATE TRIGGER posts_fts_update AFTER UPDATE ON posts BEGIN
    INSERT INTO posts_fts(posts_fts, rowid, title, description, content)
    VALUES ('delete', old.rowid, old.title, old.description, old.content);
    INSERT INTO posts_fts(rowid, title, description, content)
    VALUES (new.rowid, new.title, new.description, new.content);
END;

-- Pick up any rows that existed before this migration
INSERT INTO posts_fts(posts_fts) VALUES ('rebuild');
"#;
