// ==========================================
// 涂料色号目录 - 查询 API
// ==========================================
// 职责: 品牌列表、品牌内色号搜索、配方计算查询
// 只读: 不需要管理令牌
// ==========================================

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, ImportConfigReader};
use crate::domain::{Brand, Color, Variant};
use crate::engine::formula::{compute_formula, FormulaInput, FormulaItem, MAX_TOTAL_GRAMS, MIN_TOTAL_GRAMS};
use crate::engine::search_ranker;
use crate::repository::CatalogRepository;

// ==========================================
// 响应结构
// ==========================================

/// 配方查询中的色号摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorSummary {
    pub id: String,
    pub code: String,
    pub name: String,
    pub production_date: Option<DateTime<Utc>>,
    pub color_car: Option<String>,
    pub notes: Option<String>,
    pub brand: Brand,
}

/// 配方查询结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormulaResponse {
    pub color: ColorSummary,
    pub variant: Variant,
    pub total_grams: f64,
    pub total_parts: f64,
    pub components: Vec<FormulaItem>,
    /// 该色号已有配方的版本
    pub available_variants: Vec<Variant>,
}

// ==========================================
// CatalogLookupApi - 查询 API
// ==========================================
pub struct CatalogLookupApi {
    repo: Arc<CatalogRepository>,
    config: Arc<ConfigManager>,
}

impl CatalogLookupApi {
    pub fn new(repo: Arc<CatalogRepository>, config: Arc<ConfigManager>) -> Self {
        Self { repo, config }
    }

    /// 全部品牌（按名称排序）
    pub fn list_brands(&self) -> ApiResult<Vec<Brand>> {
        Ok(self.repo.with_read(|uow| uow.all_brands())?)
    }

    /// 品牌内色号搜索
    ///
    /// 空查询或未知品牌返回空列表；候选集先按包含匹配限量，再排序截取前 20 条
    #[instrument(skip(self))]
    pub async fn search_colors(&self, brand_slug: &str, query: &str) -> ApiResult<Vec<Color>> {
        let query = query.trim();
        let brand_slug = brand_slug.trim();
        if query.is_empty() || brand_slug.is_empty() {
            return Ok(Vec::new());
        }

        let candidate_limit = self.config.get_search_candidate_limit().await?;

        let candidates = self.repo.with_read(|uow| -> ApiResult<Vec<Color>> {
            match uow.find_brand_by_slug(brand_slug)? {
                Some(brand) => Ok(uow.search_colors(&brand.id, query, candidate_limit)?),
                None => Ok(Vec::new()),
            }
        })?;

        debug!(candidates = candidates.len(), "色号候选集已取得");
        Ok(search_ranker::rank(query, candidates))
    }

    /// 配方查询: 按目标总重计算某色号某版本的各组分克数与百分比
    #[instrument(skip(self))]
    pub fn get_formula(&self, color_id: &str, variant: Variant, total_grams: f64) -> ApiResult<FormulaResponse> {
        if !total_grams.is_finite() || !(MIN_TOTAL_GRAMS..=MAX_TOTAL_GRAMS).contains(&total_grams) {
            return Err(ApiError::InvalidInput(format!(
                "totalGrams 必须在 {} 到 {} 之间: {}",
                MIN_TOTAL_GRAMS, MAX_TOTAL_GRAMS, total_grams
            )));
        }

        let (color, brand, components, available_variants) = self.repo.with_read(|uow| -> ApiResult<_> {
            let color = uow
                .find_color(color_id)?
                .ok_or_else(|| ApiError::NotFound(format!("Color(id={})不存在", color_id)))?;
            let brand = uow
                .find_brand(&color.brand_id)?
                .ok_or_else(|| ApiError::InternalError(format!("色号 {} 的品牌缺失", color.id)))?;
            let components = uow.components_of_variant(&color.id, variant)?;
            let available_variants = uow.variants_of_color(&color.id)?;
            Ok((color, brand, components, available_variants))
        })?;

        let inputs: Vec<FormulaInput> = components
            .into_iter()
            .map(|c| FormulaInput {
                toner_code: c.toner_code,
                toner_name: c.toner_name,
                parts: c.parts,
            })
            .collect();
        let result = compute_formula(&inputs, total_grams);

        Ok(FormulaResponse {
            color: ColorSummary {
                id: color.id,
                code: color.code,
                name: color.name,
                production_date: color.production_date,
                color_car: color.color_car,
                notes: color.notes,
                brand,
            },
            variant,
            total_grams,
            total_parts: result.total_parts,
            components: result.items,
            available_variants,
        })
    }
}
