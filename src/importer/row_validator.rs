// ==========================================
// 涂料色号目录 - 行级校验器
// ==========================================
// 职责: 原始行记录 → 已校验行记录（或字段错误列表）
// 规则: 每类记录一个实现，按 TableKind 静态分派
//       一行可产生多个字段错误；单行失败不影响后续行
// ==========================================

use crate::domain::{BrandRow, ColorRow, ComponentRow, FieldError, RawRecord, TableKind, Variant};
use crate::importer::catalog_importer_trait::DataCleaner as DataCleanerTrait;
use crate::importer::data_cleaner::DataCleaner;
use chrono::{DateTime, Utc};

/// colorCar 最大长度（字符数）
pub const MAX_COLOR_CAR_LEN: usize = 100;

// ==========================================
// RowSchema Trait
// ==========================================
pub trait RowSchema: Sized + Clone + Send + Sync {
    /// 所属导入表
    const TABLE: TableKind;

    /// 校验一行原始记录
    ///
    /// # 参数
    /// - record: 原始行记录
    /// - cleaner: 清洗器
    /// - now: 当前时间（生产日期不得晚于此时刻）
    fn validate(
        record: &RawRecord,
        cleaner: &DataCleaner,
        now: DateTime<Utc>,
    ) -> Result<Self, Vec<FieldError>>;

    /// 自然键（批内重复检测 / 日志）
    fn natural_key(&self) -> String;
}

// ==========================================
// 字段级工具
// ==========================================

fn required_text(
    record: &RawRecord,
    cleaner: &DataCleaner,
    field: &str,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    match record.get(field) {
        Some(value) => Some(cleaner.clean_text(value, false)),
        None => {
            errors.push(FieldError::new(field, "validation.required"));
            None
        }
    }
}

fn required_slug(
    record: &RawRecord,
    cleaner: &DataCleaner,
    field: &str,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    let value = required_text(record, cleaner, field, errors)?;
    if !cleaner.is_valid_slug(&value) {
        errors.push(FieldError::new(field, "validation.slug.invalid"));
        return None;
    }
    Some(value)
}

fn optional_date(
    record: &RawRecord,
    cleaner: &DataCleaner,
    field: &str,
    now: DateTime<Utc>,
    errors: &mut Vec<FieldError>,
) -> Option<DateTime<Utc>> {
    let raw = record.get(field)?;
    match cleaner.parse_date(raw) {
        Some(date) if date > now => {
            errors.push(FieldError::new(field, "validation.productionDate.future"));
            None
        }
        Some(date) => Some(date),
        None => {
            errors.push(FieldError::new(field, "validation.productionDate.invalid"));
            None
        }
    }
}

fn finish<T>(value: Option<T>, errors: Vec<FieldError>) -> Result<T, Vec<FieldError>> {
    match value {
        Some(value) if errors.is_empty() => Ok(value),
        _ => Err(errors),
    }
}

// ==========================================
// 品牌
// ==========================================
impl RowSchema for BrandRow {
    const TABLE: TableKind = TableKind::Brands;

    fn validate(
        record: &RawRecord,
        cleaner: &DataCleaner,
        _now: DateTime<Utc>,
    ) -> Result<Self, Vec<FieldError>> {
        let mut errors = Vec::new();
        let slug = required_slug(record, cleaner, "slug", &mut errors);
        let name = required_text(record, cleaner, "name", &mut errors);

        let row = slug.zip(name).map(|(slug, name)| BrandRow { slug, name });
        finish(row, errors)
    }

    fn natural_key(&self) -> String {
        self.slug.clone()
    }
}

// ==========================================
// 色号
// ==========================================
impl RowSchema for ColorRow {
    const TABLE: TableKind = TableKind::Colors;

    fn validate(
        record: &RawRecord,
        cleaner: &DataCleaner,
        now: DateTime<Utc>,
    ) -> Result<Self, Vec<FieldError>> {
        let mut errors = Vec::new();
        let brand_slug = required_slug(record, cleaner, "brandSlug", &mut errors);
        let code = required_text(record, cleaner, "code", &mut errors);
        let name = required_text(record, cleaner, "name", &mut errors);
        let production_date = optional_date(record, cleaner, "productionDate", now, &mut errors);

        let color_car = cleaner.normalize_null(record.get("colorCar"));
        if let Some(car) = &color_car {
            if car.chars().count() > MAX_COLOR_CAR_LEN {
                errors.push(
                    FieldError::new("colorCar", "validation.colorCar.tooLong")
                        .with_value("max", MAX_COLOR_CAR_LEN),
                );
            }
        }
        let notes = cleaner.normalize_null(record.get("notes"));

        let row = match (brand_slug, code, name) {
            (Some(brand_slug), Some(code), Some(name)) => Some(ColorRow {
                brand_slug,
                code,
                name,
                production_date,
                color_car,
                notes,
            }),
            _ => None,
        };
        finish(row, errors)
    }

    fn natural_key(&self) -> String {
        format!("{}::{}", self.brand_slug, self.code)
    }
}

// ==========================================
// 配方组分
// ==========================================
impl RowSchema for ComponentRow {
    const TABLE: TableKind = TableKind::Components;

    fn validate(
        record: &RawRecord,
        cleaner: &DataCleaner,
        _now: DateTime<Utc>,
    ) -> Result<Self, Vec<FieldError>> {
        let mut errors = Vec::new();
        let brand_slug = required_slug(record, cleaner, "brandSlug", &mut errors);
        let color_code = required_text(record, cleaner, "colorCode", &mut errors);

        let variant = match record.get("variant") {
            Some(raw) => {
                let parsed = Variant::parse_normalized(&cleaner.clean_text(raw, true));
                if parsed.is_none() {
                    errors.push(FieldError::new("variant", "validation.variant.invalid"));
                }
                parsed
            }
            None => {
                errors.push(FieldError::new("variant", "validation.required"));
                None
            }
        };

        let toner_code = required_text(record, cleaner, "tonerCode", &mut errors);
        let toner_name = required_text(record, cleaner, "tonerName", &mut errors);

        let parts = match record.get("parts") {
            Some(raw) => match cleaner.parse_decimal(raw) {
                Some(value) if value > 0.0 => Some(value),
                Some(_) => {
                    errors.push(FieldError::new("parts", "validation.parts.positive"));
                    None
                }
                None => {
                    errors.push(FieldError::new("parts", "validation.parts.invalid"));
                    None
                }
            },
            None => {
                errors.push(FieldError::new("parts", "validation.required"));
                None
            }
        };

        let row = match (brand_slug, color_code, variant, toner_code, toner_name, parts) {
            (
                Some(brand_slug),
                Some(color_code),
                Some(variant),
                Some(toner_code),
                Some(toner_name),
                Some(parts),
            ) => Some(ComponentRow {
                brand_slug,
                color_code,
                variant,
                toner_code,
                toner_name,
                parts,
            }),
            _ => None,
        };
        finish(row, errors)
    }

    fn natural_key(&self) -> String {
        format!(
            "{}::{}::{}::{}",
            self.brand_slug, self.color_code, self.variant, self.toner_code
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(pairs: &[(&str, &str)]) -> RawRecord {
        RawRecord::new(
            2,
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn keys(errors: &[FieldError]) -> Vec<(&str, &str)> {
        errors
            .iter()
            .map(|e| (e.field.as_str(), e.message_key.as_str()))
            .collect()
    }

    #[test]
    fn test_brand_valid() {
        let row = BrandRow::validate(&record(&[("slug", "acme"), ("name", " Acme ")]), &DataCleaner, now())
            .unwrap();
        assert_eq!(row, BrandRow { slug: "acme".into(), name: "Acme".into() });
    }

    #[test]
    fn test_brand_collects_every_field_error() {
        let errors = BrandRow::validate(&record(&[("slug", "Acme Paints")]), &DataCleaner, now())
            .unwrap_err();
        assert_eq!(
            keys(&errors),
            vec![("slug", "validation.slug.invalid"), ("name", "validation.required")]
        );
    }

    #[test]
    fn test_color_optional_fields() {
        let row = ColorRow::validate(
            &record(&[
                ("brandSlug", "acme"),
                ("code", "R-01"),
                ("name", "Red"),
                ("productionDate", "2024-03-15"),
                ("notes", "   "),
            ]),
            &DataCleaner,
            now(),
        )
        .unwrap();

        assert_eq!(row.production_date, Some(Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap()));
        assert_eq!(row.notes, None);
        assert_eq!(row.color_car, None);
        assert_eq!(row.natural_key(), "acme::R-01");
    }

    #[test]
    fn test_color_date_and_car_rules() {
        let long_car = "x".repeat(MAX_COLOR_CAR_LEN + 1);
        let errors = ColorRow::validate(
            &record(&[
                ("brandSlug", "acme"),
                ("code", "R-01"),
                ("name", "Red"),
                ("productionDate", "2030-01-01"),
                ("colorCar", long_car.as_str()),
            ]),
            &DataCleaner,
            now(),
        )
        .unwrap_err();
        assert_eq!(
            keys(&errors),
            vec![
                ("productionDate", "validation.productionDate.future"),
                ("colorCar", "validation.colorCar.tooLong"),
            ]
        );
        assert_eq!(errors[1].message_values.get("max").map(String::as_str), Some("100"));

        let errors = ColorRow::validate(
            &record(&[("brandSlug", "acme"), ("code", "R-01"), ("name", "Red"), ("productionDate", "15/03/2024")]),
            &DataCleaner,
            now(),
        )
        .unwrap_err();
        assert_eq!(keys(&errors), vec![("productionDate", "validation.productionDate.invalid")]);
    }

    #[test]
    fn test_component_normalizes_variant() {
        let row = ComponentRow::validate(
            &record(&[
                ("brandSlug", "acme"),
                ("colorCode", "R-01"),
                ("variant", " v2 "),
                ("tonerCode", "T1"),
                ("tonerName", "Oxide Red"),
                ("parts", "2.5"),
            ]),
            &DataCleaner,
            now(),
        )
        .unwrap();
        assert_eq!(row.variant, Variant::V2);
        assert_eq!(row.parts, 2.5);
        assert_eq!(row.natural_key(), "acme::R-01::V2::T1");
    }

    #[test]
    fn test_component_parts_rules() {
        let base = [
            ("brandSlug", "acme"),
            ("colorCode", "R-01"),
            ("variant", "V3"),
            ("tonerCode", "T1"),
            ("tonerName", "Oxide Red"),
        ];

        let mut pairs = base.to_vec();
        pairs.push(("parts", "abc"));
        let errors = ComponentRow::validate(&record(&pairs), &DataCleaner, now()).unwrap_err();
        assert_eq!(
            keys(&errors),
            vec![("variant", "validation.variant.invalid"), ("parts", "validation.parts.invalid")]
        );

        let mut pairs = base.to_vec();
        pairs[2] = ("variant", "V1");
        pairs.push(("parts", "0"));
        let errors = ComponentRow::validate(&record(&pairs), &DataCleaner, now()).unwrap_err();
        assert_eq!(keys(&errors), vec![("parts", "validation.parts.positive")]);

        let errors = ComponentRow::validate(&record(&base[..4]), &DataCleaner, now()).unwrap_err();
        assert_eq!(
            keys(&errors),
            vec![
                ("variant", "validation.variant.invalid"),
                ("tonerName", "validation.required"),
                ("parts", "validation.required"),
            ]
        );
    }
}
