// ==========================================
// 涂料色号目录 - 配置层
// ==========================================
// 职责: 系统配置管理
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod import_config_trait;

// 重导出核心配置管理器
pub use config_manager::{
    config_keys, ConfigManager, DEFAULT_SAMPLE_SIZE, DEFAULT_SEARCH_CANDIDATE_LIMIT,
};
pub use import_config_trait::ImportConfigReader;
