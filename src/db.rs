// ==========================================
// 涂料色号目录 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键 / busy_timeout）
// - 幂等建表（品牌 / 色号 / 配方组分 / 导入状态 / 配置）
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS brand (
    id   TEXT PRIMARY KEY,
    slug TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS color (
    id              TEXT PRIMARY KEY,
    brand_id        TEXT NOT NULL REFERENCES brand(id) ON DELETE RESTRICT,
    code            TEXT NOT NULL,
    name            TEXT NOT NULL,
    production_date TEXT,
    color_car       TEXT,
    notes           TEXT,
    UNIQUE (brand_id, code)
);

CREATE TABLE IF NOT EXISTS formula_component (
    id         TEXT PRIMARY KEY,
    color_id   TEXT NOT NULL REFERENCES color(id) ON DELETE RESTRICT,
    variant    TEXT NOT NULL CHECK (variant IN ('V1', 'V2')),
    toner_code TEXT NOT NULL,
    toner_name TEXT NOT NULL,
    parts      REAL NOT NULL CHECK (parts > 0),
    UNIQUE (color_id, variant, toner_code)
);

CREATE INDEX IF NOT EXISTS idx_color_brand ON color(brand_id);
CREATE INDEX IF NOT EXISTS idx_component_color ON formula_component(color_id, variant);

CREATE TABLE IF NOT EXISTS import_state (
    id              TEXT PRIMARY KEY,
    brands_done     INTEGER NOT NULL DEFAULT 0,
    colors_done     INTEGER NOT NULL DEFAULT 0,
    components_done INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id   TEXT NOT NULL DEFAULT 'global',
    key        TEXT NOT NULL,
    value      TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);
"#;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 幂等建表，并登记 schema_version
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, datetime('now'))",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 打开连接并确保表结构存在
pub fn open_and_init(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = open_sqlite_connection(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_color_delete_restricted_by_components() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        conn.execute_batch(
            r#"
            INSERT INTO brand (id, slug, name) VALUES ('b1', 'acme', 'Acme');
            INSERT INTO color (id, brand_id, code, name) VALUES ('c1', 'b1', 'R1', 'Red');
            INSERT INTO formula_component (id, color_id, variant, toner_code, toner_name, parts)
                VALUES ('f1', 'c1', 'V1', 'T1', 'Toner', 1.0);
            "#,
        )
        .unwrap();

        assert!(conn.execute("DELETE FROM color WHERE id = 'c1'", []).is_err());
        assert!(conn.execute("DELETE FROM brand WHERE id = 'b1'", []).is_err());
    }
}
