// ==========================================
// 涂料色号目录 - 工作单元 (UnitOfWork)
// ==========================================
// 职责: 在一个连接/事务上执行全部目录 SQL（查找 / 新增 / 更新 / 删除 / 计数 / 列表 / 检索）
// 红线: 不含业务逻辑，只负责数据访问；事务边界由 CatalogRepository 决定
// ==========================================

use crate::domain::{
    Brand, CatalogCounts, Color, ColorListItem, ColorRow, ComponentListItem, FormulaComponent,
    ListQuery, Page, Variant, DEFAULT_COLOR_PAGE_SIZE,
};
use crate::repository::error::RepositoryResult;
use chrono::{DateTime, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use uuid::Uuid;

/// 绑定在单个连接（或事务）上的数据访问对象
///
/// 由 `CatalogRepository::with_read` / `with_transaction` 创建，按引用传递给调用方
pub struct UnitOfWork<'a> {
    pub(crate) conn: &'a Connection,
}

const BRAND_COLUMNS: &str = "b.id, b.slug, b.name";
const COLOR_COLUMNS: &str = "c.id, c.brand_id, c.code, c.name, c.production_date, c.color_car, c.notes";
const COMPONENT_COLUMNS: &str = "f.id, f.color_id, f.variant, f.toner_code, f.toner_name, f.parts";

// ==========================================
// 行映射
// ==========================================

fn parse_variant(idx: usize, raw: String) -> rusqlite::Result<Variant> {
    Variant::parse_normalized(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("无效的配方版本: {}", raw).into(),
        )
    })
}

fn parse_timestamp(idx: usize, raw: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn map_brand(row: &Row, offset: usize) -> rusqlite::Result<Brand> {
    Ok(Brand {
        id: row.get(offset)?,
        slug: row.get(offset + 1)?,
        name: row.get(offset + 2)?,
    })
}

fn map_color(row: &Row, offset: usize) -> rusqlite::Result<Color> {
    Ok(Color {
        id: row.get(offset)?,
        brand_id: row.get(offset + 1)?,
        code: row.get(offset + 2)?,
        name: row.get(offset + 3)?,
        production_date: parse_timestamp(offset + 4, row.get(offset + 4)?)?,
        color_car: row.get(offset + 5)?,
        notes: row.get(offset + 6)?,
    })
}

fn map_component(row: &Row, offset: usize) -> rusqlite::Result<FormulaComponent> {
    Ok(FormulaComponent {
        id: row.get(offset)?,
        color_id: row.get(offset + 1)?,
        variant: parse_variant(offset + 2, row.get(offset + 2)?)?,
        toner_code: row.get(offset + 3)?,
        toner_name: row.get(offset + 4)?,
        parts: row.get(offset + 5)?,
    })
}

fn format_timestamp(value: &Option<DateTime<Utc>>) -> Option<String> {
    value.map(|dt| dt.to_rfc3339())
}

/// LIKE 模式（包含匹配，转义通配符）
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// 组装列表查询 SQL
///
/// 过滤条件占用 ?1..?n，LIMIT / OFFSET 依次绑定在其后（见 paged_params）
fn build_list_sql(select: &str, from: &str, filters: &[&str], order_by: &str, bound: usize) -> (String, String) {
    let where_clause = if filters.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", filters.join(" AND "))
    };
    let list_sql = format!(
        "SELECT {} FROM {}{} ORDER BY {} LIMIT ?{} OFFSET ?{}",
        select,
        from,
        where_clause,
        order_by,
        bound + 1,
        bound + 2
    );
    let count_sql = format!("SELECT COUNT(*) FROM {}{}", from, where_clause);
    (list_sql, count_sql)
}

/// 列表查询参数：过滤值 + LIMIT + OFFSET
fn paged_params(values: &[String], query: &ListQuery) -> Vec<Value> {
    values
        .iter()
        .cloned()
        .map(Value::Text)
        .chain([Value::Integer(query.limit()), Value::Integer(query.offset())])
        .collect()
}

impl<'a> UnitOfWork<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn new_id() -> String {
        Uuid::new_v4().to_string()
    }

    // ==========================================
    // 品牌
    // ==========================================

    pub fn find_brand(&self, id: &str) -> RepositoryResult<Option<Brand>> {
        let brand = self
            .conn
            .query_row(
                &format!("SELECT {} FROM brand b WHERE b.id = ?1", BRAND_COLUMNS),
                params![id],
                |row| map_brand(row, 0),
            )
            .optional()?;
        Ok(brand)
    }

    pub fn find_brand_by_slug(&self, slug: &str) -> RepositoryResult<Option<Brand>> {
        let brand = self
            .conn
            .query_row(
                &format!("SELECT {} FROM brand b WHERE b.slug = ?1", BRAND_COLUMNS),
                params![slug],
                |row| map_brand(row, 0),
            )
            .optional()?;
        Ok(brand)
    }

    pub fn insert_brand(&self, slug: &str, name: &str) -> RepositoryResult<Brand> {
        let brand = Brand {
            id: Self::new_id(),
            slug: slug.to_string(),
            name: name.to_string(),
        };
        self.conn.execute(
            "INSERT INTO brand (id, slug, name) VALUES (?1, ?2, ?3)",
            params![brand.id, brand.slug, brand.name],
        )?;
        Ok(brand)
    }

    pub fn update_brand(&self, brand: &Brand) -> RepositoryResult<usize> {
        let affected = self.conn.execute(
            "UPDATE brand SET slug = ?2, name = ?3 WHERE id = ?1",
            params![brand.id, brand.slug, brand.name],
        )?;
        Ok(affected)
    }

    pub fn delete_brand(&self, id: &str) -> RepositoryResult<usize> {
        let affected = self.conn.execute("DELETE FROM brand WHERE id = ?1", params![id])?;
        Ok(affected)
    }

    pub fn count_colors_of_brand(&self, brand_id: &str) -> RepositoryResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM color WHERE brand_id = ?1",
            params![brand_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// 全部品牌（按名称排序）
    pub fn all_brands(&self) -> RepositoryResult<Vec<Brand>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM brand b ORDER BY b.name, b.slug", BRAND_COLUMNS))?;
        let brands = stmt
            .query_map([], |row| map_brand(row, 0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(brands)
    }

    pub fn list_brands(&self, query: &ListQuery) -> RepositoryResult<Page<Brand>> {
        let mut filters = Vec::new();
        let mut values = Vec::new();
        if let Some(term) = query.search_term() {
            filters.push("(b.slug LIKE ?1 ESCAPE '\\' OR b.name LIKE ?1 ESCAPE '\\')");
            values.push(like_pattern(term));
        }

        let column = match query.sort.as_deref() {
            Some("slug") => "b.slug",
            _ => "b.name",
        };
        let order_by = format!("{} {}, b.id", column, query.dir.as_sql());

        let (list_sql, count_sql) = build_list_sql(BRAND_COLUMNS, "brand b", &filters, &order_by, values.len());
        let mut stmt = self.conn.prepare(&list_sql)?;
        let data = stmt
            .query_map(params_from_iter(paged_params(&values, query)), |row| map_brand(row, 0))?
            .collect::<Result<Vec<_>, _>>()?;
        let total: i64 = self
            .conn
            .query_row(&count_sql, params_from_iter(values.iter()), |row| row.get(0))?;

        Ok(Page {
            data,
            total: total as usize,
            page: query.page(),
            page_size: query.page_size(),
        })
    }

    // ==========================================
    // 色号
    // ==========================================

    pub fn find_color(&self, id: &str) -> RepositoryResult<Option<Color>> {
        let color = self
            .conn
            .query_row(
                &format!("SELECT {} FROM color c WHERE c.id = ?1", COLOR_COLUMNS),
                params![id],
                |row| map_color(row, 0),
            )
            .optional()?;
        Ok(color)
    }

    pub fn find_color_by_key(&self, brand_id: &str, code: &str) -> RepositoryResult<Option<Color>> {
        let color = self
            .conn
            .query_row(
                &format!("SELECT {} FROM color c WHERE c.brand_id = ?1 AND c.code = ?2", COLOR_COLUMNS),
                params![brand_id, code],
                |row| map_color(row, 0),
            )
            .optional()?;
        Ok(color)
    }

    /// 按 (品牌标识, 色号) 查找
    pub fn find_color_by_slug_code(&self, brand_slug: &str, code: &str) -> RepositoryResult<Option<Color>> {
        let color = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM color c JOIN brand b ON b.id = c.brand_id WHERE b.slug = ?1 AND c.code = ?2",
                    COLOR_COLUMNS
                ),
                params![brand_slug, code],
                |row| map_color(row, 0),
            )
            .optional()?;
        Ok(color)
    }

    pub fn insert_color(&self, brand_id: &str, row: &ColorRow) -> RepositoryResult<Color> {
        let color = Color {
            id: Self::new_id(),
            brand_id: brand_id.to_string(),
            code: row.code.clone(),
            name: row.name.clone(),
            production_date: row.production_date,
            color_car: row.color_car.clone(),
            notes: row.notes.clone(),
        };
        self.conn.execute(
            r#"
            INSERT INTO color (id, brand_id, code, name, production_date, color_car, notes)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                color.id,
                color.brand_id,
                color.code,
                color.name,
                format_timestamp(&color.production_date),
                color.color_car,
                color.notes,
            ],
        )?;
        Ok(color)
    }

    pub fn update_color(&self, color: &Color) -> RepositoryResult<usize> {
        let affected = self.conn.execute(
            r#"
            UPDATE color
            SET brand_id = ?2, code = ?3, name = ?4, production_date = ?5, color_car = ?6, notes = ?7
            WHERE id = ?1
            "#,
            params![
                color.id,
                color.brand_id,
                color.code,
                color.name,
                format_timestamp(&color.production_date),
                color.color_car,
                color.notes,
            ],
        )?;
        Ok(affected)
    }

    pub fn delete_color(&self, id: &str) -> RepositoryResult<usize> {
        let affected = self.conn.execute("DELETE FROM color WHERE id = ?1", params![id])?;
        Ok(affected)
    }

    pub fn count_components_of_color(&self, color_id: &str) -> RepositoryResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM formula_component WHERE color_id = ?1",
            params![color_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// 品牌内按色号/名称包含匹配取候选（按色号排序，最多 limit 条）
    pub fn search_colors(&self, brand_id: &str, term: &str, limit: usize) -> RepositoryResult<Vec<Color>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {} FROM color c
            WHERE c.brand_id = ?1 AND (c.code LIKE ?2 ESCAPE '\' OR c.name LIKE ?2 ESCAPE '\')
            ORDER BY c.code
            LIMIT ?3
            "#,
            COLOR_COLUMNS
        ))?;
        let colors = stmt
            .query_map(params![brand_id, like_pattern(term), limit as i64], |row| map_color(row, 0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(colors)
    }

    pub fn list_colors(&self, query: &ListQuery) -> RepositoryResult<Page<ColorListItem>> {
        let query = &query.with_default_page_size(DEFAULT_COLOR_PAGE_SIZE);
        let mut filters = Vec::new();
        let mut values = Vec::new();
        if let Some(slug) = query.brand_filter() {
            values.push(slug.to_string());
            filters.push(if values.len() == 1 { "b.slug = ?1" } else { "b.slug = ?2" });
        }
        if let Some(term) = query.search_term() {
            values.push(like_pattern(term));
            filters.push(if values.len() == 1 {
                "(c.code LIKE ?1 ESCAPE '\\' OR c.name LIKE ?1 ESCAPE '\\' OR c.color_car LIKE ?1 ESCAPE '\\')"
            } else {
                "(c.code LIKE ?2 ESCAPE '\\' OR c.name LIKE ?2 ESCAPE '\\' OR c.color_car LIKE ?2 ESCAPE '\\')"
            });
        }

        let column = match query.sort.as_deref() {
            Some("name") => "c.name",
            Some("productionDate") => "c.production_date",
            _ => "c.code",
        };
        let order_by = format!("{} {}, c.id", column, query.dir.as_sql());

        let select = format!("{}, b.slug, b.name", COLOR_COLUMNS);
        let (list_sql, count_sql) = build_list_sql(
            &select,
            "color c JOIN brand b ON b.id = c.brand_id",
            &filters,
            &order_by,
            values.len(),
        );
        let mut stmt = self.conn.prepare(&list_sql)?;
        let data = stmt
            .query_map(params_from_iter(paged_params(&values, query)), |row| {
                Ok(ColorListItem {
                    color: map_color(row, 0)?,
                    brand_slug: row.get(7)?,
                    brand_name: row.get(8)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        let total: i64 = self
            .conn
            .query_row(&count_sql, params_from_iter(values.iter()), |row| row.get(0))?;

        Ok(Page {
            data,
            total: total as usize,
            page: query.page(),
            page_size: query.page_size(),
        })
    }

    // ==========================================
    // 配方组分
    // ==========================================

    pub fn find_component(&self, id: &str) -> RepositoryResult<Option<FormulaComponent>> {
        let component = self
            .conn
            .query_row(
                &format!("SELECT {} FROM formula_component f WHERE f.id = ?1", COMPONENT_COLUMNS),
                params![id],
                |row| map_component(row, 0),
            )
            .optional()?;
        Ok(component)
    }

    pub fn find_component_by_key(
        &self,
        color_id: &str,
        variant: Variant,
        toner_code: &str,
    ) -> RepositoryResult<Option<FormulaComponent>> {
        let component = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM formula_component f WHERE f.color_id = ?1 AND f.variant = ?2 AND f.toner_code = ?3",
                    COMPONENT_COLUMNS
                ),
                params![color_id, variant.as_str(), toner_code],
                |row| map_component(row, 0),
            )
            .optional()?;
        Ok(component)
    }

    pub fn insert_component(
        &self,
        color_id: &str,
        variant: Variant,
        toner_code: &str,
        toner_name: &str,
        parts: f64,
    ) -> RepositoryResult<FormulaComponent> {
        let component = FormulaComponent {
            id: Self::new_id(),
            color_id: color_id.to_string(),
            variant,
            toner_code: toner_code.to_string(),
            toner_name: toner_name.to_string(),
            parts,
        };
        self.conn.execute(
            r#"
            INSERT INTO formula_component (id, color_id, variant, toner_code, toner_name, parts)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                component.id,
                component.color_id,
                component.variant.as_str(),
                component.toner_code,
                component.toner_name,
                component.parts,
            ],
        )?;
        Ok(component)
    }

    pub fn update_component(&self, component: &FormulaComponent) -> RepositoryResult<usize> {
        let affected = self.conn.execute(
            r#"
            UPDATE formula_component
            SET color_id = ?2, variant = ?3, toner_code = ?4, toner_name = ?5, parts = ?6
            WHERE id = ?1
            "#,
            params![
                component.id,
                component.color_id,
                component.variant.as_str(),
                component.toner_code,
                component.toner_name,
                component.parts,
            ],
        )?;
        Ok(affected)
    }

    pub fn delete_component(&self, id: &str) -> RepositoryResult<usize> {
        let affected = self
            .conn
            .execute("DELETE FROM formula_component WHERE id = ?1", params![id])?;
        Ok(affected)
    }

    /// 删除某色号某版本的全部组分（整组替换的第一步）
    pub fn delete_components_of_variant(&self, color_id: &str, variant: Variant) -> RepositoryResult<usize> {
        let affected = self.conn.execute(
            "DELETE FROM formula_component WHERE color_id = ?1 AND variant = ?2",
            params![color_id, variant.as_str()],
        )?;
        Ok(affected)
    }

    /// 某色号某版本的组分（按写入顺序）
    pub fn components_of_variant(&self, color_id: &str, variant: Variant) -> RepositoryResult<Vec<FormulaComponent>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM formula_component f WHERE f.color_id = ?1 AND f.variant = ?2 ORDER BY f.rowid",
            COMPONENT_COLUMNS
        ))?;
        let components = stmt
            .query_map(params![color_id, variant.as_str()], |row| map_component(row, 0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(components)
    }

    /// 某色号已有配方的版本（升序）
    pub fn variants_of_color(&self, color_id: &str) -> RepositoryResult<Vec<Variant>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT variant FROM formula_component WHERE color_id = ?1 ORDER BY variant",
        )?;
        let variants = stmt
            .query_map(params![color_id], |row| parse_variant(0, row.get(0)?))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(variants)
    }

    pub fn list_components(&self, query: &ListQuery) -> RepositoryResult<Page<ComponentListItem>> {
        let mut filters = Vec::new();
        let mut values = Vec::new();
        if let Some(slug) = query.brand_filter() {
            values.push(slug.to_string());
            filters.push(if values.len() == 1 { "b.slug = ?1" } else { "b.slug = ?2" });
        }
        if let Some(term) = query.search_term() {
            values.push(like_pattern(term));
            filters.push(if values.len() == 1 {
                "(f.toner_code LIKE ?1 ESCAPE '\\' OR f.toner_name LIKE ?1 ESCAPE '\\' OR c.code LIKE ?1 ESCAPE '\\')"
            } else {
                "(f.toner_code LIKE ?2 ESCAPE '\\' OR f.toner_name LIKE ?2 ESCAPE '\\' OR c.code LIKE ?2 ESCAPE '\\')"
            });
        }

        let dir = query.dir.as_sql();
        let order_by = match query.sort.as_deref() {
            Some("tonerCode") => format!("f.toner_code {}, f.rowid", dir),
            Some("parts") => format!("f.parts {}, f.rowid", dir),
            Some("variant") => format!("f.variant {}, c.code, f.rowid", dir),
            _ => format!("c.code {}, f.variant, f.rowid", dir),
        };

        let select = "f.id, b.slug, b.name, c.code, c.name, f.variant, f.toner_code, f.toner_name, f.parts";
        let (list_sql, count_sql) = build_list_sql(
            select,
            "formula_component f JOIN color c ON c.id = f.color_id JOIN brand b ON b.id = c.brand_id",
            &filters,
            &order_by,
            values.len(),
        );
        let mut stmt = self.conn.prepare(&list_sql)?;
        let data = stmt
            .query_map(params_from_iter(paged_params(&values, query)), |row| {
                Ok(ComponentListItem {
                    id: row.get(0)?,
                    brand_slug: row.get(1)?,
                    brand_name: row.get(2)?,
                    color_code: row.get(3)?,
                    color_name: row.get(4)?,
                    variant: parse_variant(5, row.get(5)?)?,
                    toner_code: row.get(6)?,
                    toner_name: row.get(7)?,
                    parts: row.get(8)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        let total: i64 = self
            .conn
            .query_row(&count_sql, params_from_iter(values.iter()), |row| row.get(0))?;

        Ok(Page {
            data,
            total: total as usize,
            page: query.page(),
            page_size: query.page_size(),
        })
    }

    // ==========================================
    // 计数
    // ==========================================

    pub fn catalog_counts(&self) -> RepositoryResult<CatalogCounts> {
        let (brands, colors, components): (i64, i64, i64) = self.conn.query_row(
            r#"
            SELECT
                (SELECT COUNT(*) FROM brand),
                (SELECT COUNT(*) FROM color),
                (SELECT COUNT(*) FROM formula_component)
            "#,
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        Ok(CatalogCounts {
            brands: brands as usize,
            colors: colors as usize,
            components: components as usize,
        })
    }
}
