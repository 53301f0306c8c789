// ==========================================
// 涂料色号目录 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，把导入层 / 仓储层错误转换为调用方可识别的错误
// 冲突与未授权错误携带消息键，由 i18n 渲染
// ==========================================

use crate::domain::FieldError;
use crate::i18n::t;
use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 唯一约束竞争（并发写入同一自然键）
pub const KEY_DUPLICATE: &str = "admin.errors.duplicate";
/// 外键约束竞争（删除时仍有下级记录）
pub const KEY_HAS_DEPENDENTS: &str = "admin.errors.hasDependents";

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 访问控制
    // ==========================================
    #[error("未授权")]
    Unauthorized,

    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    /// 单条写入的字段校验失败（与导入使用同一套规则）
    #[error("数据验证失败: {} 个字段", errors.len())]
    Validation { errors: Vec<FieldError> },

    #[error("资源未找到: {0}")]
    NotFound(String),

    /// 唯一键冲突 / 仍有下级记录
    #[error("冲突: {key}")]
    Conflict { key: String },

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 导入错误
    // ==========================================
    #[error("文件导入失败: {0}")]
    ImportError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),
}

impl ApiError {
    pub fn conflict(key: &str) -> Self {
        ApiError::Conflict {
            key: key.to_string(),
        }
    }

    /// 对应的消息键（仅未授权 / 未找到 / 冲突 / 字段校验）
    pub fn message_key(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized => Some("admin.errors.unauthorized"),
            ApiError::NotFound(_) => Some("admin.errors.notFound"),
            ApiError::Conflict { key } => Some(key.as_str()),
            ApiError::Validation { .. } | ApiError::InvalidInput(_) => {
                Some("admin.errors.invalidPayload")
            }
            _ => None,
        }
    }

    /// 面向用户的本地化消息；无消息键时退回错误描述
    pub fn localized_message(&self) -> String {
        match self.message_key() {
            Some(key) => t(key),
            None => self.to_string(),
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(_) => ApiError::conflict(KEY_DUPLICATE),
            RepositoryError::ForeignKeyViolation(_) => ApiError::conflict(KEY_HAS_DEPENDENTS),
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Repository(inner) => inner.into(),
            ImportError::Transaction(msg) => ApiError::DatabaseTransactionError(msg),
            other => ApiError::ImportError(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_conversion() {
        let api_err: ApiError = RepositoryError::NotFound {
            entity: "Color".to_string(),
            id: "c1".to_string(),
        }
        .into();
        match api_err {
            ApiError::NotFound(msg) => assert!(msg.contains("Color")),
            other => panic!("Expected NotFound, got {:?}", other),
        }

        let api_err: ApiError =
            RepositoryError::UniqueConstraintViolation("UNIQUE constraint failed".to_string()).into();
        assert_eq!(api_err.message_key(), Some(KEY_DUPLICATE));
    }

    #[test]
    fn test_import_error_conversion() {
        let api_err: ApiError = ImportError::IncompleteFileSet {
            missing: "colors".to_string(),
        }
        .into();
        assert!(matches!(api_err, ApiError::ImportError(_)));

        let api_err: ApiError = ImportError::Transaction("disk full".to_string()).into();
        assert!(matches!(api_err, ApiError::DatabaseTransactionError(_)));
    }

    #[test]
    fn test_conflict_keeps_message_key() {
        let err = ApiError::conflict("admin.errors.brandHasColors");
        assert_eq!(err.message_key(), Some("admin.errors.brandHasColors"));
    }
}
