// ==========================================
// 涂料色号目录 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::sync::Arc;

use crate::api::{AdminGate, ApiResult, CatalogAdminApi, CatalogLookupApi, ImportApi};
use crate::config::ConfigManager;
use crate::repository::CatalogRepository;

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "PAINT_MIX_DB_PATH";

/// 应用状态
///
/// 包含所有API实例和共享资源；各组件共用同一个数据库连接
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 目录仓储
    pub repo: Arc<CatalogRepository>,

    /// 配置管理器
    pub config: Arc<ConfigManager>,

    /// 管理入口门禁
    pub admin_gate: AdminGate,

    /// 导入API
    pub import_api: Arc<ImportApi>,

    /// 目录管理API
    pub admin_api: Arc<CatalogAdminApi>,

    /// 查询API
    pub lookup_api: Arc<CatalogLookupApi>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// 打开（必要时创建）数据库，读取管理密钥，组装各 API
    pub async fn new(db_path: String) -> ApiResult<Self> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let repo = Arc::new(CatalogRepository::new(&db_path)?);
        let config = Arc::new(ConfigManager::from_connection(repo.connection())?);
        let admin_gate = AdminGate::from_config(config.as_ref()).await?;
        if !admin_gate.is_configured() {
            tracing::warn!("未配置管理密钥，管理与导入操作将被拒绝");
        }

        let import_api = Arc::new(ImportApi::new(Arc::clone(&repo))?);
        let admin_api = Arc::new(CatalogAdminApi::new(Arc::clone(&repo)));
        let lookup_api = Arc::new(CatalogLookupApi::new(Arc::clone(&repo), Arc::clone(&config)));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            repo,
            config,
            admin_gate,
            import_api,
            admin_api,
            lookup_api,
        })
    }

    /// 获取数据库路径
    pub fn get_db_path(&self) -> &str {
        &self.db_path
    }
}

// ==========================================
// 默认数据库路径辅助函数
// ==========================================

/// 获取默认数据库路径
///
/// # 返回
/// - 环境变量 PAINT_MIX_DB_PATH（非空时）
/// - 否则: 用户数据目录/paint-mix/paint_mix.db
/// - 取不到用户数据目录时: ./paint_mix.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./paint_mix.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("paint-mix");
        // 目录创建失败时退回当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("paint_mix.db");
        }
    }

    path.to_string_lossy().to_string()
}
