// ==========================================
// 涂料色号目录 - 目录管理 API
// ==========================================
// 职责: 品牌 / 色号 / 配方组分的单条增删改、批量删除、分页列表
// 校验: 与导入共用逐行校验规则（RowSchema）
// 删除保护: 品牌有色号、色号有组分时拒绝删除（不级联）
// ==========================================

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::api::auth::AdminToken;
use crate::api::error::{ApiError, ApiResult};
use crate::domain::{
    Brand, BrandRow, Color, ColorListItem, ColorRow, ComponentListItem, ComponentRow, FieldError,
    FormulaComponent, ListQuery, Page, RawRecord,
};
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::row_validator::RowSchema;
use crate::repository::{CatalogRepository, UnitOfWork};

// ==========================================
// 请求 / 响应结构
// ==========================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrandInput {
    pub slug: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColorInput {
    pub brand_slug: Option<String>,
    pub code: Option<String>,
    pub name: Option<String>,
    pub production_date: Option<String>,
    pub color_car: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComponentInput {
    pub brand_slug: Option<String>,
    pub color_code: Option<String>,
    pub variant: Option<String>,
    pub toner_code: Option<String>,
    pub toner_name: Option<String>,
    pub parts: Option<f64>,
}

impl BrandInput {
    fn to_record(&self) -> RawRecord {
        RawRecord::from_pairs(0, [("slug", self.slug.clone()), ("name", self.name.clone())])
    }
}

impl ColorInput {
    fn to_record(&self) -> RawRecord {
        RawRecord::from_pairs(
            0,
            [
                ("brandSlug", self.brand_slug.clone()),
                ("code", self.code.clone()),
                ("name", self.name.clone()),
                ("productionDate", self.production_date.clone()),
                ("colorCar", self.color_car.clone()),
                ("notes", self.notes.clone()),
            ],
        )
    }
}

impl ComponentInput {
    fn to_record(&self) -> RawRecord {
        RawRecord::from_pairs(
            0,
            [
                ("brandSlug", self.brand_slug.clone()),
                ("colorCode", self.color_code.clone()),
                ("variant", self.variant.clone()),
                ("tonerCode", self.toner_code.clone()),
                ("tonerName", self.toner_name.clone()),
                ("parts", self.parts.map(|p| p.to_string())),
            ],
        )
    }
}

/// 批量删除结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteResult {
    pub deleted_count: usize,
}

// ==========================================
// 辅助函数
// ==========================================

fn validate_row<T: RowSchema>(record: &RawRecord) -> ApiResult<T> {
    T::validate(record, &DataCleaner, Utc::now()).map_err(|errors| ApiError::Validation { errors })
}

fn not_found_field(field: &str) -> ApiError {
    ApiError::Validation {
        errors: vec![FieldError::new(field, "validation.notFound")],
    }
}

fn not_found(entity: &str, id: &str) -> ApiError {
    ApiError::NotFound(format!("{}(id={})不存在", entity, id))
}

/// 去掉空白 id；为空时拒绝
fn clean_ids(ids: &[String]) -> ApiResult<Vec<String>> {
    let ids: Vec<String> = ids
        .iter()
        .map(|id| id.trim())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();
    if ids.is_empty() {
        return Err(ApiError::InvalidInput("批量删除的 id 列表为空".to_string()));
    }
    Ok(ids)
}

fn resolve_brand(uow: &UnitOfWork<'_>, slug: &str) -> ApiResult<Brand> {
    uow.find_brand_by_slug(slug)?
        .ok_or_else(|| not_found_field("brandSlug"))
}

/// 组分引用的色号；品牌不存在时报 brandSlug，否则报 colorCode
fn resolve_color(uow: &UnitOfWork<'_>, brand_slug: &str, code: &str) -> ApiResult<Color> {
    let brand = resolve_brand(uow, brand_slug)?;
    uow.find_color_by_key(&brand.id, code)?
        .ok_or_else(|| not_found_field("colorCode"))
}

// ==========================================
// CatalogAdminApi - 目录管理 API
// ==========================================
pub struct CatalogAdminApi {
    repo: Arc<CatalogRepository>,
}

impl CatalogAdminApi {
    pub fn new(repo: Arc<CatalogRepository>) -> Self {
        Self { repo }
    }

    // ==========================================
    // 品牌
    // ==========================================

    #[instrument(skip(self, _token, input))]
    pub fn create_brand(&self, _token: &AdminToken, input: &BrandInput) -> ApiResult<Brand> {
        let row: BrandRow = validate_row(&input.to_record())?;

        let brand = self.repo.with_transaction(|uow| -> ApiResult<Brand> {
            if uow.find_brand_by_slug(&row.slug)?.is_some() {
                return Err(ApiError::conflict("admin.errors.duplicateBrand"));
            }
            Ok(uow.insert_brand(&row.slug, &row.name)?)
        })?;

        info!(brand_id = %brand.id, slug = %brand.slug, "品牌已创建");
        Ok(brand)
    }

    #[instrument(skip(self, _token, input))]
    pub fn update_brand(&self, _token: &AdminToken, id: &str, input: &BrandInput) -> ApiResult<Brand> {
        let row: BrandRow = validate_row(&input.to_record())?;

        self.repo.with_transaction(|uow| -> ApiResult<Brand> {
            let existing = uow.find_brand(id)?.ok_or_else(|| not_found("Brand", id))?;
            if let Some(other) = uow.find_brand_by_slug(&row.slug)? {
                if other.id != existing.id {
                    return Err(ApiError::conflict("admin.errors.duplicateBrand"));
                }
            }
            let updated = Brand {
                slug: row.slug.clone(),
                name: row.name.clone(),
                ..existing
            };
            uow.update_brand(&updated)?;
            Ok(updated)
        })
    }

    #[instrument(skip(self, _token))]
    pub fn delete_brand(&self, _token: &AdminToken, id: &str) -> ApiResult<()> {
        self.repo.with_transaction(|uow| -> ApiResult<()> {
            uow.find_brand(id)?.ok_or_else(|| not_found("Brand", id))?;
            if uow.count_colors_of_brand(id)? > 0 {
                warn!(brand_id = %id, "品牌下仍有色号，拒绝删除");
                return Err(ApiError::conflict("admin.errors.brandHasColors"));
            }
            uow.delete_brand(id)?;
            Ok(())
        })
    }

    /// 批量删除品牌：任一品牌仍有色号则整批拒绝
    #[instrument(skip(self, _token, ids), fields(count = ids.len()))]
    pub fn bulk_delete_brands(&self, _token: &AdminToken, ids: &[String]) -> ApiResult<BulkDeleteResult> {
        let ids = clean_ids(ids)?;

        let deleted_count = self.repo.with_transaction(|uow| -> ApiResult<usize> {
            for id in &ids {
                if uow.count_colors_of_brand(id)? > 0 {
                    return Err(ApiError::conflict("admin.errors.brandHasColors"));
                }
            }
            let mut deleted = 0;
            for id in &ids {
                deleted += uow.delete_brand(id)?;
            }
            Ok(deleted)
        })?;

        info!(deleted_count, "批量删除品牌完成");
        Ok(BulkDeleteResult { deleted_count })
    }

    pub fn list_brands(&self, _token: &AdminToken, query: &ListQuery) -> ApiResult<Page<Brand>> {
        Ok(self.repo.with_read(|uow| uow.list_brands(query))?)
    }

    // ==========================================
    // 色号
    // ==========================================

    #[instrument(skip(self, _token, input))]
    pub fn create_color(&self, _token: &AdminToken, input: &ColorInput) -> ApiResult<Color> {
        let row: ColorRow = validate_row(&input.to_record())?;

        let color = self.repo.with_transaction(|uow| -> ApiResult<Color> {
            let brand = resolve_brand(uow, &row.brand_slug)?;
            if uow.find_color_by_key(&brand.id, &row.code)?.is_some() {
                return Err(ApiError::conflict("admin.errors.duplicateColor"));
            }
            Ok(uow.insert_color(&brand.id, &row)?)
        })?;

        info!(color_id = %color.id, code = %color.code, "色号已创建");
        Ok(color)
    }

    #[instrument(skip(self, _token, input))]
    pub fn update_color(&self, _token: &AdminToken, id: &str, input: &ColorInput) -> ApiResult<Color> {
        let row: ColorRow = validate_row(&input.to_record())?;

        self.repo.with_transaction(|uow| -> ApiResult<Color> {
            let existing = uow.find_color(id)?.ok_or_else(|| not_found("Color", id))?;
            let brand = resolve_brand(uow, &row.brand_slug)?;
            if let Some(other) = uow.find_color_by_key(&brand.id, &row.code)? {
                if other.id != existing.id {
                    return Err(ApiError::conflict("admin.errors.duplicateColor"));
                }
            }
            let updated = Color {
                id: existing.id,
                brand_id: brand.id,
                code: row.code.clone(),
                name: row.name.clone(),
                production_date: row.production_date,
                color_car: row.color_car.clone(),
                notes: row.notes.clone(),
            };
            uow.update_color(&updated)?;
            Ok(updated)
        })
    }

    #[instrument(skip(self, _token))]
    pub fn delete_color(&self, _token: &AdminToken, id: &str) -> ApiResult<()> {
        self.repo.with_transaction(|uow| -> ApiResult<()> {
            uow.find_color(id)?.ok_or_else(|| not_found("Color", id))?;
            if uow.count_components_of_color(id)? > 0 {
                warn!(color_id = %id, "色号下仍有配方组分，拒绝删除");
                return Err(ApiError::conflict("admin.errors.colorHasComponents"));
            }
            uow.delete_color(id)?;
            Ok(())
        })
    }

    /// 批量删除色号：任一色号仍有组分则整批拒绝
    #[instrument(skip(self, _token, ids), fields(count = ids.len()))]
    pub fn bulk_delete_colors(&self, _token: &AdminToken, ids: &[String]) -> ApiResult<BulkDeleteResult> {
        let ids = clean_ids(ids)?;

        let deleted_count = self.repo.with_transaction(|uow| -> ApiResult<usize> {
            for id in &ids {
                if uow.count_components_of_color(id)? > 0 {
                    return Err(ApiError::conflict("admin.errors.colorHasComponents"));
                }
            }
            let mut deleted = 0;
            for id in &ids {
                deleted += uow.delete_color(id)?;
            }
            Ok(deleted)
        })?;

        info!(deleted_count, "批量删除色号完成");
        Ok(BulkDeleteResult { deleted_count })
    }

    pub fn list_colors(&self, _token: &AdminToken, query: &ListQuery) -> ApiResult<Page<ColorListItem>> {
        Ok(self.repo.with_read(|uow| uow.list_colors(query))?)
    }

    // ==========================================
    // 配方组分
    // ==========================================

    #[instrument(skip(self, _token, input))]
    pub fn create_component(&self, _token: &AdminToken, input: &ComponentInput) -> ApiResult<FormulaComponent> {
        let row: ComponentRow = validate_row(&input.to_record())?;

        self.repo.with_transaction(|uow| -> ApiResult<FormulaComponent> {
            let color = resolve_color(uow, &row.brand_slug, &row.color_code)?;
            if uow
                .find_component_by_key(&color.id, row.variant, &row.toner_code)?
                .is_some()
            {
                return Err(ApiError::conflict("admin.errors.duplicateComponent"));
            }
            Ok(uow.insert_component(&color.id, row.variant, &row.toner_code, &row.toner_name, row.parts)?)
        })
    }

    #[instrument(skip(self, _token, input))]
    pub fn update_component(
        &self,
        _token: &AdminToken,
        id: &str,
        input: &ComponentInput,
    ) -> ApiResult<FormulaComponent> {
        let row: ComponentRow = validate_row(&input.to_record())?;

        self.repo.with_transaction(|uow| -> ApiResult<FormulaComponent> {
            let existing = uow
                .find_component(id)?
                .ok_or_else(|| not_found("FormulaComponent", id))?;
            let color = resolve_color(uow, &row.brand_slug, &row.color_code)?;
            if let Some(other) = uow.find_component_by_key(&color.id, row.variant, &row.toner_code)? {
                if other.id != existing.id {
                    return Err(ApiError::conflict("admin.errors.duplicateComponent"));
                }
            }
            let updated = FormulaComponent {
                id: existing.id,
                color_id: color.id,
                variant: row.variant,
                toner_code: row.toner_code.clone(),
                toner_name: row.toner_name.clone(),
                parts: row.parts,
            };
            uow.update_component(&updated)?;
            Ok(updated)
        })
    }

    /// 组分没有下级记录，存在即可删除
    #[instrument(skip(self, _token))]
    pub fn delete_component(&self, _token: &AdminToken, id: &str) -> ApiResult<()> {
        self.repo.with_transaction(|uow| -> ApiResult<()> {
            if uow.delete_component(id)? == 0 {
                return Err(not_found("FormulaComponent", id));
            }
            Ok(())
        })
    }

    #[instrument(skip(self, _token, ids), fields(count = ids.len()))]
    pub fn bulk_delete_components(&self, _token: &AdminToken, ids: &[String]) -> ApiResult<BulkDeleteResult> {
        let ids = clean_ids(ids)?;

        let deleted_count = self.repo.with_transaction(|uow| -> ApiResult<usize> {
            let mut deleted = 0;
            for id in &ids {
                deleted += uow.delete_component(id)?;
            }
            Ok(deleted)
        })?;

        info!(deleted_count, "批量删除配方组分完成");
        Ok(BulkDeleteResult { deleted_count })
    }

    pub fn list_components(
        &self,
        _token: &AdminToken,
        query: &ListQuery,
    ) -> ApiResult<Page<ComponentListItem>> {
        Ok(self.repo.with_read(|uow| uow.list_components(query))?)
    }
}
