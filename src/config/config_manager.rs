// ==========================================
// 涂料色号目录 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::import_config_trait::ImportConfigReader;
use crate::db::open_sqlite_connection;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// 预览样例行数默认值
pub const DEFAULT_SAMPLE_SIZE: usize = 10;
/// 搜索候选集上限默认值
pub const DEFAULT_SEARCH_CANDIDATE_LIMIT: usize = 50;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let conn_guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入 global 配置（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at) VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 全部 global 配置快照
    pub fn get_config_snapshot(&self) -> RepositoryResult<BTreeMap<String, String>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        let mut snapshot = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            snapshot.insert(key, value);
        }
        Ok(snapshot)
    }

    /// 读取正整数配置，缺失或非法时返回默认值
    fn get_positive_usize(&self, key: &str, default: usize) -> RepositoryResult<usize> {
        let value = self.get_global_config_value(key)?;
        Ok(value
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(default))
    }
}

#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_sample_size(&self) -> RepositoryResult<usize> {
        self.get_positive_usize(config_keys::IMPORT_SAMPLE_SIZE, DEFAULT_SAMPLE_SIZE)
    }

    async fn get_search_candidate_limit(&self) -> RepositoryResult<usize> {
        self.get_positive_usize(config_keys::SEARCH_CANDIDATE_LIMIT, DEFAULT_SEARCH_CANDIDATE_LIMIT)
    }

    async fn get_admin_import_key(&self) -> RepositoryResult<Option<String>> {
        let value = self.get_global_config_value(config_keys::ADMIN_IMPORT_KEY)?;
        Ok(value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()))
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 管理入口
    pub const ADMIN_IMPORT_KEY: &str = "admin.import_key";

    // 检索
    pub const SEARCH_CANDIDATE_LIMIT: &str = "search.candidate_limit";

    // 导入
    pub const IMPORT_SAMPLE_SIZE: &str = "import.sample_size";
}
