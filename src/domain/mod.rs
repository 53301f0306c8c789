// ==========================================
// 涂料色号目录 - 领域模型层
// ==========================================
// 职责: 定义目录实体、导入记录、校验问题与结果类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod catalog;
pub mod import;
pub mod types;

// 重导出核心类型
pub use catalog::{
    Brand, CatalogCounts, Color, ColorListItem, ComponentListItem, FormulaComponent, ImportState,
    ImportStatus, ListQuery, Page, SortDirection, DEFAULT_COLOR_PAGE_SIZE, DEFAULT_PAGE,
    DEFAULT_PAGE_SIZE, IMPORT_STATE_ID, MAX_PAGE_SIZE,
};
pub use import::{
    count_invalid_rows, message_values, BatchCounts, BatchPreview, BrandRow, ColorRow,
    ComponentRow, FieldError, ImportData, ImportIssue, RawRecord, RawTable, SourceRow,
    StageCounts, StagePreview,
};
pub use types::{TableKind, Variant};
