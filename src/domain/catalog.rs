// ==========================================
// 涂料色号目录 - 目录实体
// ==========================================
// 职责: Brand / Color / FormulaComponent / ImportState
// 红线: 删除不级联，存在子记录时由应用层拒绝
// ==========================================

use crate::domain::types::{TableKind, Variant};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// ImportState 单例主键
pub const IMPORT_STATE_ID: &str = "singleton";

// ==========================================
// Brand - 品牌
// ==========================================
// 唯一键: slug（小写短横线格式）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Brand {
    pub id: String,
    pub slug: String,
    pub name: String,
}

// ==========================================
// Color - 色号
// ==========================================
// 唯一键: (brand_id, code)，配方版本挂在组分上而不是色号上
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Color {
    pub id: String,
    pub brand_id: String,
    pub code: String,
    pub name: String,
    pub production_date: Option<DateTime<Utc>>, // 生产日期（不晚于当前时间）
    pub color_car: Option<String>,              // 适用车型（≤100 字符）
    pub notes: Option<String>,
}

// ==========================================
// FormulaComponent - 配方组分
// ==========================================
// 唯一键: (color_id, variant, toner_code)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormulaComponent {
    pub id: String,
    pub color_id: String,
    pub variant: Variant,
    pub toner_code: String,
    pub toner_name: String,
    pub parts: f64, // 相对份数（> 0）
}

/// 组分列表视图（带品牌/色号信息）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentListItem {
    pub id: String,
    pub brand_slug: String,
    pub brand_name: String,
    pub color_code: String,
    pub color_name: String,
    pub variant: Variant,
    pub toner_code: String,
    pub toner_name: String,
    pub parts: f64,
}

/// 色号列表视图（带品牌信息）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorListItem {
    #[serde(flatten)]
    pub color: Color,
    pub brand_slug: String,
    pub brand_name: String,
}

// ==========================================
// 分页查询（管理端列表）
// ==========================================

/// 默认页码 / 每页条数
pub const DEFAULT_PAGE: usize = 1;
pub const DEFAULT_PAGE_SIZE: usize = 10;
/// 色号列表默认每页条数
pub const DEFAULT_COLOR_PAGE_SIZE: usize = 25;
/// 每页条数上限（超出按上限截断）
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    /// 仅 "desc"（不区分大小写）视为降序
    pub fn parse_lenient(raw: Option<&str>) -> SortDirection {
        match raw.map(|s| s.trim().to_lowercase()) {
            Some(s) if s == "desc" => SortDirection::Desc,
            _ => SortDirection::Asc,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub query: Option<String>,
    pub brand_slug: Option<String>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
    pub sort: Option<String>,
    #[serde(default)]
    pub dir: SortDirection,
}

impl ListQuery {
    /// 页码（缺失或为 0 时取默认值）
    pub fn page(&self) -> usize {
        self.page.filter(|p| *p > 0).unwrap_or(DEFAULT_PAGE)
    }

    pub fn page_size(&self) -> usize {
        self.page_size
            .filter(|p| *p > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE)
    }

    /// 未指定每页条数时改用给定默认值（各列表默认值不同）
    pub fn with_default_page_size(&self, default: usize) -> ListQuery {
        ListQuery {
            page_size: self.page_size.filter(|p| *p > 0).or(Some(default)),
            ..self.clone()
        }
    }

    /// 跳过的行数；饱和到 SQLite 整数上限
    pub fn offset(&self) -> i64 {
        let skipped = (self.page() as u64 - 1).saturating_mul(self.page_size() as u64);
        skipped.min(i64::MAX as u64) as i64
    }

    pub fn limit(&self) -> i64 {
        self.page_size() as i64
    }

    /// 去空白后的检索词（空串视为无）
    pub fn search_term(&self) -> Option<&str> {
        self.query.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }

    pub fn brand_filter(&self) -> Option<&str> {
        self.brand_slug.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

// ==========================================
// ImportState - 导入进度（单例持久化记录）
// ==========================================
// 单调标记: 一旦为 true，导入流程永不重置
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportState {
    pub brands_done: bool,
    pub colors_done: bool,
    pub components_done: bool,
}

impl ImportState {
    pub fn is_done(&self, kind: TableKind) -> bool {
        match kind {
            TableKind::Brands => self.brands_done,
            TableKind::Colors => self.colors_done,
            TableKind::Components => self.components_done,
        }
    }

    /// 按记录数补推标记（只会 false → true）
    pub fn merged_with_counts(&self, counts: &CatalogCounts) -> ImportState {
        ImportState {
            brands_done: self.brands_done || counts.brands > 0,
            colors_done: self.colors_done || counts.colors > 0,
            components_done: self.components_done || counts.components > 0,
        }
    }
}

/// 各表记录数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogCounts {
    pub brands: usize,
    pub colors: usize,
    pub components: usize,
}

/// 导入状态查询结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportStatus {
    #[serde(flatten)]
    pub state: ImportState,
    pub counts: CatalogCounts,
}

impl ImportStatus {
    /// 分步导入的建议门控：上一阶段完成后才解锁（仅供界面提示，不是数据约束）
    pub fn stage_unlocked(&self, kind: TableKind) -> bool {
        match kind.predecessor() {
            None => true,
            Some(prev) => self.state.is_done(prev),
        }
    }
}
