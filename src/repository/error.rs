// ==========================================
// 涂料色号目录 - 仓储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 约束冲突按 SQLite 扩展错误码区分（唯一键 / 外键），
// 上层据此映射为 duplicate / hasDependents 冲突
// ==========================================

use rusqlite::ffi;
use thiserror::Error;

/// 仓储层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("记录未找到: {entity} with id={id}")]
    NotFound { entity: String, id: String },

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    /// 唯一键（含主键）冲突
    #[error("唯一约束违反: {0}")]
    UniqueConstraintViolation(String),

    /// 删除仍被引用的记录 / 引用不存在的父记录
    #[error("外键约束违反: {0}")]
    ForeignKeyViolation(String),
}

impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(failure, detail) => {
                let message = detail.clone().unwrap_or_else(|| err.to_string());
                match failure.extended_code {
                    ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                        RepositoryError::UniqueConstraintViolation(message)
                    }
                    ffi::SQLITE_CONSTRAINT_FOREIGNKEY => RepositoryError::ForeignKeyViolation(message),
                    ffi::SQLITE_BUSY | ffi::SQLITE_LOCKED => RepositoryError::LockError(message),
                    _ => RepositoryError::DatabaseQueryError(message),
                }
            }
            rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound {
                entity: "row".to_string(),
                id: "-".to_string(),
            },
            _ => RepositoryError::DatabaseQueryError(err.to_string()),
        }
    }
}

/// Result 类型别名
pub type RepositoryResult<T> = Result<T, RepositoryError>;
