// ==========================================
// 涂料色号目录 - 导入接口 Trait
// ==========================================
// 职责: 定义目录导入接口（不包含实现）
// ==========================================

use crate::domain::{
    BatchPreview, BrandRow, ColorRow, ComponentRow, ImportStatus, RawTable, StagePreview,
};
use crate::importer::error::ImportResult;
use crate::importer::reconcile::WriteMode;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

// ==========================================
// BatchSource - 整批导入的上传来源
// ==========================================
#[derive(Debug, Clone)]
pub enum BatchSource {
    /// 单个工作簿（brands / colors / components 三个工作表）
    Workbook(PathBuf),
    /// 三个 CSV 文件（每类一个，缺一不可）
    CsvSet {
        brands: Option<PathBuf>,
        colors: Option<PathBuf>,
        components: Option<PathBuf>,
    },
}

impl BatchSource {
    pub fn csv_set(brands: impl Into<PathBuf>, colors: impl Into<PathBuf>, components: impl Into<PathBuf>) -> Self {
        BatchSource::CsvSet {
            brands: Some(brands.into()),
            colors: Some(colors.into()),
            components: Some(components.into()),
        }
    }
}

// ==========================================
// CatalogImporter Trait
// ==========================================
// 用途: 目录导入主接口
// 实现者: CatalogImporterImpl
#[async_trait]
pub trait CatalogImporter: Send + Sync {
    /// 整批导入预览（解析 + 校验，不写库）
    ///
    /// # 返回
    /// - Ok(BatchPreview): 通过校验的数据、问题列表、样例、是否阻断
    /// - Err: 上传格式错误（文件缺失 / 格式不支持 / 解析失败）
    async fn preview_batch(&self, source: &BatchSource) -> ImportResult<BatchPreview>;

    /// 整批导入提交
    ///
    /// # 导入流程
    /// 1. 解析并逐行校验三类记录
    /// 2. 批内重复键检测 + 跨表引用校验（已知集合 = 本批 ∪ 库内）
    /// 3. 存在任何问题 → blocked，不写库
    /// 4. 单事务写入: 品牌 upsert → 色号 upsert → 按 (色号, 版本) 整组替换配方组分
    async fn commit_batch(&self, source: &BatchSource, mode: WriteMode) -> ImportResult<BatchPreview>;

    /// 分步导入: 品牌
    ///
    /// 提交成功后置 brandsDone
    async fn import_brands<P: AsRef<Path> + Send>(
        &self,
        file_path: P,
        mode: WriteMode,
    ) -> ImportResult<StagePreview<BrandRow>>;

    /// 分步导入: 色号（品牌须已在库内）
    async fn import_colors<P: AsRef<Path> + Send>(
        &self,
        file_path: P,
        mode: WriteMode,
    ) -> ImportResult<StagePreview<ColorRow>>;

    /// 分步导入: 配方组分（色号须已在库内）
    async fn import_components<P: AsRef<Path> + Send>(
        &self,
        file_path: P,
        mode: WriteMode,
    ) -> ImportResult<StagePreview<ComponentRow>>;

    /// 导入进度（按记录数惰性推断并持久化完成标记）
    async fn import_status(&self) -> ImportResult<ImportStatus>;
}

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 文件解析接口（阶段 0）
// 实现者: CsvParser
pub trait FileParser: Send + Sync {
    /// 解析文件为原始表（表头 + 带行号的行记录）
    fn parse_table(&self, file_path: &Path) -> ImportResult<RawTable>;
}

// ==========================================
// DataCleaner Trait
// ==========================================
// 用途: 单元格清洗接口
// 实现者: DataCleanerImpl
pub trait DataCleaner: Send + Sync {
    /// 清洗文本字段（TRIM，可选 UPPER）
    fn clean_text(&self, value: &str, uppercase: bool) -> String;

    /// 标准化 NULL 值（空字符串/空白 → None）
    fn normalize_null(&self, value: Option<&str>) -> Option<String>;

    /// 解析日期: YYYY-MM-DD（UTC 零点）或 RFC 3339
    ///
    /// # 返回
    /// - None: 无法解析
    fn parse_date(&self, value: &str) -> Option<DateTime<Utc>>;

    /// 解析数值（拒绝 NaN / 无穷）
    fn parse_decimal(&self, value: &str) -> Option<f64>;
}

// ==========================================
// ConflictHandler Trait
// ==========================================
// 用途: 批内重复键检测
// 实现者: ConflictHandlerImpl
pub trait ConflictHandler: Send + Sync {
    /// 检测同批次内重复的自然键
    ///
    /// # 参数
    /// - keys: (行号, 自然键) 列表，按源文件顺序
    ///
    /// # 返回
    /// - Vec<(行号, 自然键, 首次出现行号)>: 重复记录（不包括第一次出现）
    fn detect_duplicates(&self, keys: &[(usize, String)]) -> Vec<(usize, String, usize)>;
}
