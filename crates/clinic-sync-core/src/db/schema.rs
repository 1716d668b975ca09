//! SQLite schema definition.

/// Schema for the persistent key-value store.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Key-Value Store (session token, serialized user identity)
-- ============================================================================

CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;
