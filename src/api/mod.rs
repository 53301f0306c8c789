// ==========================================
// 涂料色号目录 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供命令行调用
// ==========================================

pub mod auth;
pub mod catalog_admin_api;
pub mod catalog_lookup_api;
pub mod error;
pub mod import_api;

// 重导出核心类型
pub use auth::{AdminGate, AdminToken, ADMIN_KEY_ENV};
pub use catalog_admin_api::{BrandInput, BulkDeleteResult, CatalogAdminApi, ColorInput, ComponentInput};
pub use catalog_lookup_api::{CatalogLookupApi, ColorSummary, FormulaResponse};
pub use error::{ApiError, ApiResult};
pub use import_api::{ImportApi, StageOutcome};
