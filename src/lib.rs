// ==========================================
// 涂料色号目录 - 核心库
// ==========================================
// 职责: 涂料品牌 / 色号 / 配方目录的导入、维护、检索与配方计算
// 技术栈: Rust + SQLite
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "en");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 配方计算与搜索排序
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// SQL 性能观测
pub mod perf;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{TableKind, Variant};

// 领域实体
pub use domain::{Brand, Color, FormulaComponent, ImportState, ImportStatus};

// 引擎
pub use engine::{compute_formula, round2, FormulaResult};

// API
pub use api::{AdminGate, ApiError, CatalogAdminApi, CatalogLookupApi, ImportApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "涂料色号目录";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
