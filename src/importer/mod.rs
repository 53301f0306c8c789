// ==========================================
// 涂料色号目录 - 导入层
// ==========================================
// 职责: 目录数据导入（品牌 / 色号 / 配方组分）
// 支持: Excel 工作簿, CSV 文件
// 模式: 整批导入（三表一次提交）, 分步导入（逐表预览与提交）
// ==========================================

// 模块声明
pub mod catalog_importer_impl;
pub mod catalog_importer_trait;
pub mod conflict_handler;
pub mod data_cleaner;
pub mod error;
pub mod file_parser;
pub mod reconcile;
pub mod reference_validator;
pub mod row_validator;
pub mod table_parser;

// 重导出核心类型
pub use catalog_importer_impl::CatalogImporterImpl;
pub use conflict_handler::ConflictHandler as ConflictHandlerImpl;
pub use data_cleaner::DataCleaner as DataCleanerImpl;
pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvParser, ExcelParser, UniversalFileParser};
pub use reconcile::WriteMode;

// 重导出 Trait 接口
pub use catalog_importer_trait::{
    BatchSource, CatalogImporter, ConflictHandler, DataCleaner, FileParser,
};
