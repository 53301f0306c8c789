// ==========================================
// 涂料色号目录 - 跨表引用校验
// ==========================================
// 规则:
// - 色号.brandSlug 必须在已知品牌集合内
// - 组分.(brandSlug, colorCode) 必须解析到已知色号；品牌未知时只报 unknownBrand
// 已知集合: 整批导入 = 本批 ∪ 库内；分步导入 = 仅库内
// 无副作用
// ==========================================

use crate::domain::{message_values, BrandRow, ColorRow, ComponentRow, ImportIssue, SourceRow, TableKind};
use crate::repository::error::RepositoryResult;
use crate::repository::unit_of_work::UnitOfWork;
use std::collections::{BTreeSet, HashSet};

/// 已知的品牌标识与 (品牌标识, 色号) 集合
#[derive(Debug, Clone, Default)]
pub struct KnownKeys {
    brands: HashSet<String>,
    colors: HashSet<(String, String)>,
}

impl KnownKeys {
    pub fn add_brand(&mut self, slug: &str) {
        self.brands.insert(slug.to_string());
    }

    pub fn add_color(&mut self, brand_slug: &str, code: &str) {
        self.colors.insert((brand_slug.to_string(), code.to_string()));
    }

    pub fn has_brand(&self, slug: &str) -> bool {
        self.brands.contains(slug)
    }

    pub fn has_color(&self, brand_slug: &str, code: &str) -> bool {
        self.colors.contains(&(brand_slug.to_string(), code.to_string()))
    }

    /// 本批次中通过校验的品牌与色号
    pub fn from_batch(brands: &[SourceRow<BrandRow>], colors: &[SourceRow<ColorRow>]) -> Self {
        let mut known = KnownKeys::default();
        for row in brands {
            known.add_brand(&row.data.slug);
        }
        for row in colors {
            known.add_color(&row.data.brand_slug, &row.data.code);
        }
        known
    }

    /// 补充库内存在的品牌（仅查询被引用的标识）
    pub fn load_store_brands<'s, I>(&mut self, uow: &UnitOfWork<'_>, slugs: I) -> RepositoryResult<()>
    where
        I: IntoIterator<Item = &'s str>,
    {
        let wanted: BTreeSet<&str> = slugs.into_iter().collect();
        for slug in wanted {
            if !self.has_brand(slug) && uow.find_brand_by_slug(slug)?.is_some() {
                self.add_brand(slug);
            }
        }
        Ok(())
    }

    /// 补充库内存在的色号（仅查询被引用的键）
    pub fn load_store_colors<'s, I>(&mut self, uow: &UnitOfWork<'_>, keys: I) -> RepositoryResult<()>
    where
        I: IntoIterator<Item = (&'s str, &'s str)>,
    {
        let wanted: BTreeSet<(&str, &str)> = keys.into_iter().collect();
        for (slug, code) in wanted {
            if !self.has_color(slug, code) && uow.find_color_by_slug_code(slug, code)?.is_some() {
                self.add_color(slug, code);
            }
        }
        Ok(())
    }
}

/// 色号 → 品牌引用校验
pub fn validate_color_refs(rows: &[SourceRow<ColorRow>], known: &KnownKeys) -> Vec<ImportIssue> {
    rows.iter()
        .filter(|row| !known.has_brand(&row.data.brand_slug))
        .map(|row| unknown_brand(TableKind::Colors, row.row_number, &row.data.brand_slug))
        .collect()
}

/// 组分 → 色号引用校验（每行至多一个问题）
pub fn validate_component_refs(rows: &[SourceRow<ComponentRow>], known: &KnownKeys) -> Vec<ImportIssue> {
    let mut issues = Vec::new();
    for row in rows {
        let data = &row.data;
        if !known.has_brand(&data.brand_slug) {
            issues.push(unknown_brand(TableKind::Components, row.row_number, &data.brand_slug));
            continue;
        }
        if !known.has_color(&data.brand_slug, &data.color_code) {
            issues.push(
                ImportIssue::keyed(
                    TableKind::Components,
                    row.row_number,
                    "import.unknownColorReference",
                    message_values([
                        ("colorCode", data.color_code.clone()),
                        ("variant", data.variant.to_string()),
                    ]),
                )
                .with_field("colorCode"),
            );
        }
    }
    issues
}

fn unknown_brand(table: TableKind, row: usize, slug: &str) -> ImportIssue {
    ImportIssue::keyed(table, row, "import.unknownBrand", message_values([("brandSlug", slug)]))
        .with_field("brandSlug")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Variant;

    fn component(row_number: usize, slug: &str, code: &str) -> SourceRow<ComponentRow> {
        SourceRow {
            row_number,
            data: ComponentRow {
                brand_slug: slug.to_string(),
                color_code: code.to_string(),
                variant: Variant::V1,
                toner_code: "T1".to_string(),
                toner_name: "Toner".to_string(),
                parts: 1.0,
            },
        }
    }

    #[test]
    fn test_unknown_brand_suppresses_color_reference_error() {
        let mut known = KnownKeys::default();
        known.add_brand("acme");
        known.add_color("acme", "R1");

        let issues = validate_component_refs(
            &[component(2, "acme", "R1"), component(3, "ghost", "R1"), component(4, "acme", "R9")],
            &known,
        );

        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].row, 3);
        assert_eq!(issues[0].message_key.as_deref(), Some("import.unknownBrand"));
        assert_eq!(issues[1].row, 4);
        assert_eq!(issues[1].message_key.as_deref(), Some("import.unknownColorReference"));
        assert_eq!(issues[1].message_values.get("variant").map(String::as_str), Some("V1"));
    }

    #[test]
    fn test_color_refs_against_batch_brands() {
        let brands = vec![SourceRow {
            row_number: 2,
            data: BrandRow { slug: "acme".into(), name: "Acme".into() },
        }];
        let known = KnownKeys::from_batch(&brands, &[]);

        let colors = vec![SourceRow {
            row_number: 5,
            data: ColorRow {
                brand_slug: "zeta".into(),
                code: "Z1".into(),
                name: "Zinc".into(),
                production_date: None,
                color_car: None,
                notes: None,
            },
        }];
        let issues = validate_color_refs(&colors, &known);

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].table, TableKind::Colors);
        assert_eq!(issues[0].message_values.get("brandSlug").map(String::as_str), Some("zeta"));
    }
}
