// ==========================================
// 涂料色号目录 - 导入 API
// ==========================================
// 职责: 封装整批导入 / 分步导入 / 导入进度查询
// 访问控制: 所有操作都要求管理令牌
// ==========================================

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::api::auth::AdminToken;
use crate::api::error::ApiResult;
use crate::config::ConfigManager;
use crate::domain::{BatchPreview, BrandRow, ColorRow, ComponentRow, ImportStatus, StagePreview, TableKind};
use crate::importer::{
    BatchSource, CatalogImporter, CatalogImporterImpl, ConflictHandlerImpl, WriteMode,
};
use crate::repository::CatalogRepository;

/// 分步导入结果（按表类型区分样例行结构）
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum StageOutcome {
    Brands(StagePreview<BrandRow>),
    Colors(StagePreview<ColorRow>),
    Components(StagePreview<ComponentRow>),
}

impl StageOutcome {
    pub fn blocked(&self) -> bool {
        match self {
            StageOutcome::Brands(p) => p.blocked,
            StageOutcome::Colors(p) => p.blocked,
            StageOutcome::Components(p) => p.blocked,
        }
    }
}

/// 导入API
pub struct ImportApi {
    importer: CatalogImporterImpl<ConfigManager>,
}

impl ImportApi {
    /// 创建导入API（导入器与仓储共用同一连接）
    pub fn new(repo: Arc<CatalogRepository>) -> ApiResult<Self> {
        let config = ConfigManager::from_connection(repo.connection())?;
        let importer = CatalogImporterImpl::new(repo, config, Box::new(ConflictHandlerImpl));
        Ok(Self { importer })
    }

    /// 整批导入预览（不写库）
    pub async fn preview_batch(&self, _token: &AdminToken, source: &BatchSource) -> ApiResult<BatchPreview> {
        Ok(self.importer.preview_batch(source).await?)
    }

    /// 整批导入提交；dry_run 时只校验
    pub async fn commit_batch(
        &self,
        _token: &AdminToken,
        source: &BatchSource,
        dry_run: bool,
    ) -> ApiResult<BatchPreview> {
        let preview = self
            .importer
            .commit_batch(source, WriteMode::from_dry_run(dry_run))
            .await?;
        info!(blocked = preview.blocked, dry_run, "整批导入请求完成");
        Ok(preview)
    }

    /// 分步导入（按表类型分派）
    pub async fn import_stage(
        &self,
        _token: &AdminToken,
        kind: TableKind,
        file_path: &Path,
        dry_run: bool,
    ) -> ApiResult<StageOutcome> {
        let mode = WriteMode::from_dry_run(dry_run);
        let outcome = match kind {
            TableKind::Brands => StageOutcome::Brands(self.importer.import_brands(file_path, mode).await?),
            TableKind::Colors => StageOutcome::Colors(self.importer.import_colors(file_path, mode).await?),
            TableKind::Components => {
                StageOutcome::Components(self.importer.import_components(file_path, mode).await?)
            }
        };
        info!(table = %kind, blocked = outcome.blocked(), dry_run, "分步导入请求完成");
        Ok(outcome)
    }

    /// 导入进度
    pub async fn import_status(&self, _token: &AdminToken) -> ApiResult<ImportStatus> {
        Ok(self.importer.import_status().await?)
    }
}
