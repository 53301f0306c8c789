// ==========================================
// 涂料色号目录 - 表级解析
// ==========================================
// 职责: 列存在性检查 + 逐行校验，汇总为 ParsedTable
// 说明: 缺列问题（row = 0）不会抑制逐行问题，两者一并返回
// ==========================================

use crate::domain::{message_values, ImportIssue, RawTable, SourceRow, TableKind};
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::row_validator::RowSchema;
use chrono::{DateTime, Utc};

/// 单表解析结果
#[derive(Debug, Clone)]
pub struct ParsedTable<T> {
    /// 通过校验的行（按源文件顺序）
    pub rows: Vec<SourceRow<T>>,
    pub issues: Vec<ImportIssue>,
    /// 非空数据行总数
    pub total_rows: usize,
}

impl<T> Default for ParsedTable<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            issues: Vec::new(),
            total_rows: 0,
        }
    }
}

impl<T: Clone> ParsedTable<T> {
    pub fn data(&self) -> Vec<T> {
        self.rows.iter().map(|row| row.data.clone()).collect()
    }
}

/// 检查表头是否包含全部必填列
pub fn check_columns(kind: TableKind, headers: &[String]) -> Option<ImportIssue> {
    let missing: Vec<&str> = kind
        .required_columns()
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h == col))
        .collect();

    if missing.is_empty() {
        return None;
    }

    Some(ImportIssue::keyed(
        kind,
        0,
        "import.missingColumns",
        message_values([("columns", missing.join(", "))]),
    ))
}

/// 解析并校验一张原始表
pub fn parse_table<T: RowSchema>(table: &RawTable, now: DateTime<Utc>) -> ParsedTable<T> {
    let cleaner = DataCleaner;
    let mut parsed = ParsedTable {
        total_rows: table.records.len(),
        ..ParsedTable::default()
    };

    if let Some(issue) = check_columns(T::TABLE, &table.headers) {
        parsed.issues.push(issue);
    }

    for record in &table.records {
        match T::validate(record, &cleaner, now) {
            Ok(data) => parsed.rows.push(SourceRow {
                row_number: record.row_number,
                data,
            }),
            Err(errors) => parsed.issues.extend(
                errors
                    .into_iter()
                    .map(|error| ImportIssue::from_field_error(T::TABLE, record.row_number, error)),
            ),
        }
    }

    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BrandRow, ColorRow, RawRecord};

    fn table(headers: &[&str], rows: &[&[(&str, &str)]]) -> RawTable {
        RawTable {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            records: rows
                .iter()
                .enumerate()
                .map(|(i, pairs)| {
                    RawRecord::new(
                        i + 2,
                        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
                    )
                })
                .collect(),
        }
    }

    #[test]
    fn test_parse_table_keeps_valid_rows_after_invalid_ones() {
        let raw = table(
            &["slug", "name"],
            &[&[("slug", "BAD SLUG"), ("name", "x")], &[("slug", "acme"), ("name", "Acme")]],
        );

        let parsed: ParsedTable<BrandRow> = parse_table(&raw, Utc::now());

        assert_eq!(parsed.total_rows, 2);
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].row_number, 3);
        assert_eq!(parsed.issues.len(), 1);
        assert_eq!(parsed.issues[0].row, 2);
    }

    #[test]
    fn test_missing_columns_reported_with_row_errors() {
        let raw = table(&["brandSlug", "name"], &[&[("brandSlug", "acme"), ("name", "Red")]]);

        let parsed: ParsedTable<ColorRow> = parse_table(&raw, Utc::now());

        assert_eq!(parsed.issues.len(), 2);
        assert_eq!(parsed.issues[0].row, 0);
        assert_eq!(parsed.issues[0].message_key.as_deref(), Some("import.missingColumns"));
        assert_eq!(
            parsed.issues[0].message_values.get("columns").map(String::as_str),
            Some("code")
        );
        assert_eq!(parsed.issues[1].row, 2);
        assert_eq!(parsed.issues[1].field.as_deref(), Some("code"));
    }
}
