//! SQL schema for the Agora SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Populated by the external registration flow.
CREATE TABLE IF NOT EXISTS users (
    user_id      TEXT PRIMARY KEY,
    display_name TEXT NOT NULL,
    created_at   TEXT NOT NULL
);

-- Token -> user mapping written by the external login flow.
CREATE TABLE IF NOT EXISTS sessions (
    token      TEXT PRIMARY KEY,
    user_id    TEXT NOT NULL REFERENCES users(user_id),
    created_at TEXT NOT NULL,
    expires_at TEXT             -- NULL = never expires
);

CREATE TABLE IF NOT EXISTS posts (
    post_id    TEXT PRIMARY KEY,
    author_id  TEXT NOT NULL REFERENCES users(user_id),
    title      TEXT NOT NULL,
    body       TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- Owned by the post; a post always has at least one row here.
CREATE TABLE IF NOT EXISTS post_categories (
    post_id  TEXT NOT NULL REFERENCES posts(post_id) ON DELETE CASCADE,
    category TEXT NOT NULL,
    PRIMARY KEY (post_id, category)
);

-- Append-only. parent_id must name a comment on the same post; that is
-- checked by the writer inside the insert transaction.
CREATE TABLE IF NOT EXISTS comments (
    comment_id TEXT PRIMARY KEY,
    post_id    TEXT NOT NULL REFERENCES posts(post_id),
    author_id  TEXT NOT NULL REFERENCES users(user_id),
    content    TEXT NOT NULL,
    parent_id  TEXT REFERENCES comments(comment_id),
    created_at TEXT NOT NULL
);

-- At most one row per (user, target). The UNIQUE constraint turns a lost
-- race between two toggles into a loud insert failure.
CREATE TABLE IF NOT EXISTS reactions (
    reaction_id TEXT PRIMARY KEY,
    user_id     TEXT NOT NULL REFERENCES users(user_id),
    target_type TEXT NOT NULL CHECK (target_type IN ('post', 'comment')),
    target_id   TEXT NOT NULL,
    polarity    TEXT NOT NULL CHECK (polarity IN ('like', 'dislike')),
    updated_at  TEXT NOT NULL,
    UNIQUE (user_id, target_type, target_id)
);

CREATE INDEX IF NOT EXISTS posts_created_idx      ON posts(created_at);
CREATE INDEX IF NOT EXISTS categories_name_idx    ON post_categories(category);
CREATE INDEX IF NOT EXISTS comments_post_idx      ON comments(post_id, created_at);
CREATE INDEX IF NOT EXISTS comments_parent_idx    ON comments(parent_id);
CREATE INDEX IF NOT EXISTS reactions_target_idx   ON reactions(target_type, target_id);

PRAGMA user_version = 1;
";
