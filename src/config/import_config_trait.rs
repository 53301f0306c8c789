// ==========================================
// 涂料色号目录 - 导入/检索配置读取 Trait
// ==========================================
// 职责: 定义导入与检索所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// 预览样例行数
    ///
    /// # 默认值
    /// - 10
    async fn get_sample_size(&self) -> RepositoryResult<usize>;

    /// 搜索候选集上限（排序前的库内预筛数量）
    ///
    /// # 默认值
    /// - 50
    async fn get_search_candidate_limit(&self) -> RepositoryResult<usize>;

    /// 管理入口共享密钥（未配置时为 None）
    async fn get_admin_import_key(&self) -> RepositoryResult<Option<String>>;
}
