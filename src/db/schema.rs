/// Tagging tables shared by every taggable kind.
///
/// Uses CREATE TABLE/INDEX IF NOT EXISTS for idempotent execution. Taggable
/// entity tables belong to the host application and are not created here.
pub const INITIAL_SCHEMA: &str = r#"
-- Tags table: unique names, compared case-insensitively
CREATE TABLE IF NOT EXISTS tags (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE COLLATE NOCASE
);

-- Taggings: polymorphic link from a tag to any taggable row
CREATE TABLE IF NOT EXISTS taggings (
    id INTEGER PRIMARY KEY,
    tag_id INTEGER NOT NULL,
    taggable_id INTEGER NOT NULL,
    taggable_type TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
);

-- At most one tagging per tag and taggable
CREATE UNIQUE INDEX IF NOT EXISTS idx_taggings_unique
    ON taggings(tag_id, taggable_type, taggable_id);

-- Lookup of a taggable's taggings
CREATE INDEX IF NOT EXISTS idx_taggings_taggable
    ON taggings(taggable_id, taggable_type);

-- Time-window counts
CREATE INDEX IF NOT EXISTS idx_taggings_created ON taggings(created_at);
"#;
