/// SQL DDL for the sortbin database.
/// WAL mode + foreign keys enabled at connection time.
pub const SCHEMA_VERSION: u32 = 1;

pub const PRAGMAS: &str = "PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA foreign_keys = ON;";

pub const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS dustbins (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    full INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS wastes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id),
    dustbin_id INTEGER NOT NULL REFERENCES dustbins(id),
    category TEXT NOT NULL,
    weight REAL NOT NULL,
    time TEXT NOT NULL,
    correctly_categorized INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX IF NOT EXISTS idx_wastes_dustbin ON wastes(dustbin_id);
CREATE INDEX IF NOT EXISTS idx_wastes_user ON wastes(user_id);
CREATE INDEX IF NOT EXISTS idx_wastes_time ON wastes(time);
"#;
