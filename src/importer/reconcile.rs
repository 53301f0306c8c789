// ==========================================
// 涂料色号目录 - 对账写入
// ==========================================
// 分步模式: 按自然键与库内比对 → 新增 / 更新 / 跳过（不删除）
// 整批模式: 品牌 upsert → 色号 upsert → 按 (品牌, 色号, 版本) 整组替换组分
// 约束: 所有写入经同一个 UnitOfWork（同一事务），任一失败整体回滚
// 试运行: 读取与正式提交完全一致，只跳过写入
// ==========================================

use crate::domain::{
    BatchCounts, Brand, BrandRow, Color, ColorRow, ComponentRow, FormulaComponent, ImportData, SourceRow,
    StageCounts, Variant,
};
use crate::importer::error::{ImportError, ImportResult};
use crate::repository::unit_of_work::UnitOfWork;
use std::collections::HashMap;
use tracing::debug;

/// 写入模式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteMode {
    #[default]
    Apply,
    DryRun,
}

impl WriteMode {
    pub fn from_dry_run(dry_run: bool) -> Self {
        if dry_run {
            WriteMode::DryRun
        } else {
            WriteMode::Apply
        }
    }

    pub fn is_dry_run(&self) -> bool {
        matches!(self, WriteMode::DryRun)
    }

    fn applies(&self) -> bool {
        !self.is_dry_run()
    }
}

fn vanished(entity: &str, key: impl Into<String>) -> ImportError {
    ImportError::ReferenceVanished {
        entity: entity.to_string(),
        key: key.into(),
    }
}

/// 品牌标识 → 品牌 id（带缓存，事务内查库）
struct BrandIdCache<'u, 'c> {
    uow: &'u UnitOfWork<'c>,
    ids: HashMap<String, String>,
}

impl<'u, 'c> BrandIdCache<'u, 'c> {
    fn new(uow: &'u UnitOfWork<'c>) -> Self {
        Self {
            uow,
            ids: HashMap::new(),
        }
    }

    fn remember(&mut self, slug: &str, id: &str) {
        self.ids.insert(slug.to_string(), id.to_string());
    }

    fn resolve(&mut self, slug: &str) -> ImportResult<String> {
        if let Some(id) = self.ids.get(slug) {
            return Ok(id.clone());
        }
        let brand = self
            .uow
            .find_brand_by_slug(slug)?
            .ok_or_else(|| vanished("brand", slug))?;
        self.ids.insert(slug.to_string(), brand.id.clone());
        Ok(brand.id)
    }
}

// ==========================================
// 可变字段比对
// ==========================================

fn color_changed(existing: &Color, row: &ColorRow) -> bool {
    existing.name != row.name
        || existing.color_car != row.color_car
        || existing.notes != row.notes
        || existing.production_date != row.production_date
}

fn component_changed(existing: &FormulaComponent, row: &ComponentRow) -> bool {
    existing.toner_name != row.toner_name || existing.parts != row.parts
}

fn apply_color_fields(existing: &Color, row: &ColorRow) -> Color {
    Color {
        name: row.name.clone(),
        production_date: row.production_date,
        color_car: row.color_car.clone(),
        notes: row.notes.clone(),
        ..existing.clone()
    }
}

// ==========================================
// 分步模式
// ==========================================

pub fn reconcile_brands(
    uow: &UnitOfWork<'_>,
    rows: &[SourceRow<BrandRow>],
    mode: WriteMode,
) -> ImportResult<StageCounts> {
    let mut counts = StageCounts::default();

    for row in rows {
        let data = &row.data;
        match uow.find_brand_by_slug(&data.slug)? {
            None => {
                if mode.applies() {
                    uow.insert_brand(&data.slug, &data.name)?;
                }
                counts.created += 1;
            }
            Some(existing) if existing.name != data.name => {
                if mode.applies() {
                    uow.update_brand(&Brand {
                        name: data.name.clone(),
                        ..existing
                    })?;
                }
                counts.updated += 1;
            }
            Some(_) => counts.skipped += 1,
        }
    }

    debug!(?counts, dry_run = mode.is_dry_run(), "品牌对账完成");
    Ok(counts)
}

pub fn reconcile_colors(
    uow: &UnitOfWork<'_>,
    rows: &[SourceRow<ColorRow>],
    mode: WriteMode,
) -> ImportResult<StageCounts> {
    let mut counts = StageCounts::default();
    let mut brands = BrandIdCache::new(uow);

    for row in rows {
        let data = &row.data;
        let brand_id = brands.resolve(&data.brand_slug)?;
        match uow.find_color_by_key(&brand_id, &data.code)? {
            None => {
                if mode.applies() {
                    uow.insert_color(&brand_id, data)?;
                }
                counts.created += 1;
            }
            Some(existing) if color_changed(&existing, data) => {
                if mode.applies() {
                    uow.update_color(&apply_color_fields(&existing, data))?;
                }
                counts.updated += 1;
            }
            Some(_) => counts.skipped += 1,
        }
    }

    debug!(?counts, dry_run = mode.is_dry_run(), "色号对账完成");
    Ok(counts)
}

pub fn reconcile_components(
    uow: &UnitOfWork<'_>,
    rows: &[SourceRow<ComponentRow>],
    mode: WriteMode,
) -> ImportResult<StageCounts> {
    let mut counts = StageCounts::default();
    let mut color_ids: HashMap<(String, String), String> = HashMap::new();

    for row in rows {
        let data = &row.data;
        let key = (data.brand_slug.clone(), data.color_code.clone());
        let color_id = match color_ids.get(&key) {
            Some(id) => id.clone(),
            None => {
                let color = uow
                    .find_color_by_slug_code(&data.brand_slug, &data.color_code)?
                    .ok_or_else(|| vanished("color", format!("{}::{}", data.brand_slug, data.color_code)))?;
                color_ids.insert(key, color.id.clone());
                color.id
            }
        };

        match uow.find_component_by_key(&color_id, data.variant, &data.toner_code)? {
            None => {
                if mode.applies() {
                    uow.insert_component(&color_id, data.variant, &data.toner_code, &data.toner_name, data.parts)?;
                }
                counts.created += 1;
            }
            Some(existing) if component_changed(&existing, data) => {
                if mode.applies() {
                    uow.update_component(&FormulaComponent {
                        toner_name: data.toner_name.clone(),
                        parts: data.parts,
                        ..existing
                    })?;
                }
                counts.updated += 1;
            }
            Some(_) => counts.skipped += 1,
        }
    }

    debug!(?counts, dry_run = mode.is_dry_run(), "配方组分对账完成");
    Ok(counts)
}

// ==========================================
// 整批模式
// ==========================================

/// 整批写入（调用方负责事务边界；任一步失败由事务整体回滚）
pub fn commit_whole_batch(uow: &UnitOfWork<'_>, data: &ImportData) -> ImportResult<BatchCounts> {
    // 1. 品牌 upsert
    let mut brands = BrandIdCache::new(uow);
    for row in &data.brands {
        let id = match uow.find_brand_by_slug(&row.slug)? {
            Some(existing) => {
                if existing.name != row.name {
                    uow.update_brand(&Brand {
                        name: row.name.clone(),
                        ..existing.clone()
                    })?;
                }
                existing.id
            }
            None => uow.insert_brand(&row.slug, &row.name)?.id,
        };
        brands.remember(&row.slug, &id);
    }

    // 2. 色号 upsert（品牌 id 先取本批写入结果，再回退到库内查找）
    let mut color_ids: HashMap<(String, String), String> = HashMap::new();
    for row in &data.colors {
        let brand_id = brands.resolve(&row.brand_slug)?;
        let id = match uow.find_color_by_key(&brand_id, &row.code)? {
            Some(existing) => {
                if color_changed(&existing, row) {
                    uow.update_color(&apply_color_fields(&existing, row))?;
                }
                existing.id
            }
            None => uow.insert_color(&brand_id, row)?.id,
        };
        color_ids.insert((row.brand_slug.clone(), row.code.clone()), id);
    }

    // 3. 按 (品牌, 色号, 版本) 分组，整组替换（保持首次出现顺序）
    let mut group_order: Vec<(String, String, Variant)> = Vec::new();
    let mut groups: HashMap<(String, String, Variant), Vec<&ComponentRow>> = HashMap::new();
    for row in &data.components {
        let key = (row.brand_slug.clone(), row.color_code.clone(), row.variant);
        groups
            .entry(key.clone())
            .or_insert_with(|| {
                group_order.push(key);
                Vec::new()
            })
            .push(row);
    }

    for key in &group_order {
        let (brand_slug, color_code, variant) = key;
        let color_key = (brand_slug.clone(), color_code.clone());
        let color_id = match color_ids.get(&color_key) {
            Some(id) => id.clone(),
            None => {
                let color = uow
                    .find_color_by_slug_code(brand_slug, color_code)?
                    .ok_or_else(|| vanished("color", format!("{}::{}", brand_slug, color_code)))?;
                color_ids.insert(color_key, color.id.clone());
                color.id
            }
        };

        let removed = uow.delete_components_of_variant(&color_id, *variant)?;
        let rows = groups.get(key).map(Vec::as_slice).unwrap_or_default();
        for row in rows {
            uow.insert_component(&color_id, row.variant, &row.toner_code, &row.toner_name, row.parts)?;
        }
        debug!(
            brand_slug = %brand_slug,
            color_code = %color_code,
            variant = %variant,
            removed,
            inserted = rows.len(),
            "配方组整组替换"
        );
    }

    Ok(BatchCounts {
        brands: data.brands.len(),
        colors: data.colors.len(),
        components: data.components.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_and_init;

    fn brand(slug: &str, name: &str) -> SourceRow<BrandRow> {
        SourceRow {
            row_number: 2,
            data: BrandRow {
                slug: slug.to_string(),
                name: name.to_string(),
            },
        }
    }

    fn component(code: &str, toner: &str, parts: f64) -> ComponentRow {
        ComponentRow {
            brand_slug: "acme".to_string(),
            color_code: code.to_string(),
            variant: Variant::V1,
            toner_code: toner.to_string(),
            toner_name: format!("Toner {}", toner),
            parts,
        }
    }

    fn color(code: &str) -> ColorRow {
        ColorRow {
            brand_slug: "acme".to_string(),
            code: code.to_string(),
            name: "Red".to_string(),
            production_date: None,
            color_car: None,
            notes: None,
        }
    }

    #[test]
    fn test_reconcile_brands_classifies_and_dry_run_skips_writes() {
        let conn = open_and_init(":memory:").unwrap();
        let uow = UnitOfWork::new(&conn);
        uow.insert_brand("acme", "Acme").unwrap();
        uow.insert_brand("zeta", "Zeta").unwrap();

        let rows = vec![brand("acme", "Acme"), brand("zeta", "Zeta Paints"), brand("nova", "Nova")];

        let projected = reconcile_brands(&uow, &rows, WriteMode::DryRun).unwrap();
        assert_eq!(projected, StageCounts { created: 1, updated: 1, skipped: 1 });
        assert_eq!(uow.catalog_counts().unwrap().brands, 2);

        let applied = reconcile_brands(&uow, &rows, WriteMode::Apply).unwrap();
        assert_eq!(applied, projected);
        assert_eq!(uow.find_brand_by_slug("zeta").unwrap().unwrap().name, "Zeta Paints");

        let again = reconcile_brands(&uow, &rows, WriteMode::Apply).unwrap();
        assert_eq!(again, StageCounts { created: 0, updated: 0, skipped: 3 });
    }

    #[test]
    fn test_reconcile_colors_reports_vanished_brand() {
        let conn = open_and_init(":memory:").unwrap();
        let uow = UnitOfWork::new(&conn);
        let rows = vec![SourceRow { row_number: 2, data: color("R1") }];

        let err = reconcile_colors(&uow, &rows, WriteMode::Apply).unwrap_err();
        assert!(matches!(err, ImportError::ReferenceVanished { .. }));
    }

    #[test]
    fn test_whole_batch_replaces_variant_group() {
        let conn = open_and_init(":memory:").unwrap();
        let uow = UnitOfWork::new(&conn);

        let first = ImportData {
            brands: vec![brand("acme", "Acme").data],
            colors: vec![color("R1")],
            components: vec![component("R1", "T1", 1.0), component("R1", "T2", 2.0)],
        };
        commit_whole_batch(&uow, &first).unwrap();

        let second = ImportData {
            brands: vec![],
            colors: vec![],
            components: vec![component("R1", "T3", 5.0)],
        };
        let counts = commit_whole_batch(&uow, &second).unwrap();
        assert_eq!(counts, BatchCounts { brands: 0, colors: 0, components: 1 });

        let color = uow.find_color_by_slug_code("acme", "R1").unwrap().unwrap();
        let remaining = uow.components_of_variant(&color.id, Variant::V1).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].toner_code, "T3");
    }
}
