//! SQL schema for the Dramaturgy SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id     TEXT PRIMARY KEY,
    username    TEXT NOT NULL UNIQUE,
    name        TEXT,
    image       TEXT,
    role        TEXT NOT NULL DEFAULT 'REGULAR',  -- REGULAR | EXPERT | MODERATOR | ADMIN
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS questions (
    question_id TEXT PRIMARY KEY,
    author_id   TEXT NOT NULL REFERENCES users(user_id),
    title       TEXT NOT NULL,
    body        TEXT NOT NULL DEFAULT '',
    status      TEXT NOT NULL DEFAULT 'DRAFT',    -- DRAFT | PUBLISHED | CLOSED | ARCHIVED
    is_solved   INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS replies (
    reply_id    TEXT PRIMARY KEY,
    question_id TEXT NOT NULL REFERENCES questions(question_id),
    author_id   TEXT NOT NULL REFERENCES users(user_id),
    body        TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

-- Rows are never deleted here; the only update is is_read 0 -> 1.
CREATE TABLE IF NOT EXISTS notifications (
    notification_id TEXT PRIMARY KEY,
    user_id         TEXT NOT NULL REFERENCES users(user_id),
    kind            TEXT NOT NULL,
    message         TEXT NOT NULL DEFAULT '',
    is_read         INTEGER NOT NULL DEFAULT 0,
    read_at         TEXT,
    created_at      TEXT NOT NULL,
    question_id     TEXT REFERENCES questions(question_id),
    reply_id        TEXT REFERENCES replies(reply_id),
    actor_id        TEXT REFERENCES users(user_id)
);

-- Tokens are stored only as SHA-256 hex digests.
CREATE TABLE IF NOT EXISTS sessions (
    token_hash  TEXT PRIMARY KEY,
    user_id     TEXT NOT NULL REFERENCES users(user_id),
    created_at  TEXT NOT NULL,
    expires_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS questions_open_idx      ON questions(status, is_solved);
CREATE INDEX IF NOT EXISTS questions_author_idx    ON questions(author_id);
CREATE INDEX IF NOT EXISTS replies_question_idx    ON replies(question_id, created_at);
CREATE INDEX IF NOT EXISTS notifications_feed_idx  ON notifications(user_id, is_read, created_at);
CREATE INDEX IF NOT EXISTS sessions_user_idx       ON sessions(user_id);

PRAGMA user_version = 1;
";
