// ==========================================
// 涂料色号目录 - 导入模块错误类型
// ==========================================
// 行级校验问题不走错误通道（收集为 ImportIssue）；
// 这里只放上传文件不可读与事务失败等硬错误
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 上传文件 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xls/.ods/.csv）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("请上传一个 Excel 文件，或同时上传 brands/colors/components 三个 CSV 文件（缺少: {missing}）")]
    IncompleteFileSet { missing: String },

    // ===== 写入阶段 =====
    /// 校验通过后，引用的品牌 / 色号在同一事务内查不到
    #[error("引用记录在事务中丢失: {entity} {key}")]
    ReferenceVanished { entity: String, key: String },

    #[error("数据库事务失败: {0}")]
    Transaction(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 事务内的语句失败统一视为事务失败
impl From<rusqlite::Error> for ImportError {
    fn from(err: rusqlite::Error) -> Self {
        ImportError::Transaction(err.to_string())
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

pub type ImportResult<T> = Result<T, ImportError>;
