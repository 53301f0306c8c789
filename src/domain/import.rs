// ==========================================
// 涂料色号目录 - 导入领域模型
// ==========================================
// 职责: 原始行记录 / 校验后行记录 / 校验问题 / 预览与提交结果
// 约定: 对外 JSON 使用 camelCase
// ==========================================

use crate::domain::types::{TableKind, Variant};
use crate::i18n::render;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

// ==========================================
// RawRecord - 原始行记录（解析阶段输出）
// ==========================================
// row_number: 源文件行号（表头 = 1，首个数据行 = 2，空行不计）
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub row_number: usize,
    pub values: HashMap<String, String>,
}

impl RawRecord {
    pub fn new(row_number: usize, values: HashMap<String, String>) -> Self {
        Self { row_number, values }
    }

    /// 由 (列名, 值) 构造记录；值为 None 的列视为缺失
    pub fn from_pairs<'a, I>(row_number: usize, pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Option<String>)>,
    {
        let values = pairs
            .into_iter()
            .filter_map(|(column, value)| value.map(|v| (column.to_string(), v)))
            .collect();
        Self { row_number, values }
    }

    /// 读取单元格（已去除首尾空白；空串视为缺失）
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values
            .get(column)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// 原始表（表头 + 行记录）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub records: Vec<RawRecord>,
}

// ==========================================
// 校验后的行记录
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandRow {
    pub slug: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorRow {
    pub brand_slug: String,
    pub code: String,
    pub name: String,
    pub production_date: Option<DateTime<Utc>>,
    pub color_car: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentRow {
    pub brand_slug: String,
    pub color_code: String,
    pub variant: Variant,
    pub toner_code: String,
    pub toner_name: String,
    pub parts: f64,
}

/// 带源行号的已校验记录
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow<T> {
    pub row_number: usize,
    pub data: T,
}

// ==========================================
// FieldError - 字段级校验错误
// ==========================================
// 保留字段名 + 消息键 + 消息参数，调用方可自行本地化
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    pub field: String,
    pub message_key: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub message_values: BTreeMap<String, String>,
}

impl FieldError {
    pub fn new(field: &str, message_key: &str) -> Self {
        Self {
            field: field.to_string(),
            message_key: message_key.to_string(),
            message_values: BTreeMap::new(),
        }
    }

    pub fn with_value(mut self, name: &str, value: impl ToString) -> Self {
        self.message_values.insert(name.to_string(), value.to_string());
        self
    }

    /// 按当前语言渲染消息
    pub fn render(&self) -> String {
        render(&self.message_key, &self.message_values)
    }
}

// ==========================================
// ImportIssue - 导入问题（预览/提交响应中的 errors 项）
// ==========================================
// row = 0: 结构性问题（缺列/缺表）
// row > 0: 行级问题（字段校验 / 引用校验 / 批内重复）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportIssue {
    pub table: TableKind,
    pub row: usize,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message_key: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub message_values: BTreeMap<String, String>,
}

impl ImportIssue {
    /// 行级字段错误
    pub fn from_field_error(table: TableKind, row: usize, error: FieldError) -> Self {
        Self {
            table,
            row,
            message: error.render(),
            field: Some(error.field),
            message_key: Some(error.message_key),
            message_values: error.message_values,
        }
    }

    /// 不关联具体字段的问题（结构性问题或引用问题）
    pub fn keyed(
        table: TableKind,
        row: usize,
        message_key: &str,
        message_values: BTreeMap<String, String>,
    ) -> Self {
        Self {
            table,
            row,
            message: render(message_key, &message_values),
            field: None,
            message_key: Some(message_key.to_string()),
            message_values,
        }
    }

    pub fn with_field(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }

    pub fn is_row_level(&self) -> bool {
        self.row > 0
    }
}

/// 构造消息参数表
pub fn message_values<I, K, V>(pairs: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: ToString,
    V: ToString,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// 统计存在问题的不同行数（不含 row = 0 的结构性问题）
pub fn count_invalid_rows(issues: &[ImportIssue]) -> usize {
    issues
        .iter()
        .filter(|issue| issue.is_row_level())
        .map(|issue| (issue.table, issue.row))
        .collect::<BTreeSet<_>>()
        .len()
}

// ==========================================
// 提交结果
// ==========================================

/// 分步导入结果（新增 / 更新 / 跳过）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageCounts {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

impl StageCounts {
    pub fn total(&self) -> usize {
        self.created + self.updated + self.skipped
    }
}

/// 整批导入结果（各表写入行数）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCounts {
    pub brands: usize,
    pub colors: usize,
    pub components: usize,
}

// ==========================================
// 预览响应
// ==========================================

/// 分步导入预览 / 提交响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagePreview<T> {
    pub total_rows: usize,
    pub valid_rows: usize,
    pub invalid_rows: usize,
    pub errors: Vec<ImportIssue>,
    pub samples: Vec<T>,
    pub blocked: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub result: Option<StageCounts>,
    /// 试运行时的预计分类结果
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub projected: Option<StageCounts>,
}

/// 整批导入的数据（仅通过校验的行）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportData {
    pub brands: Vec<BrandRow>,
    pub colors: Vec<ColorRow>,
    pub components: Vec<ComponentRow>,
}

impl ImportData {
    /// 各表取前 n 行作为样例
    pub fn samples(&self, n: usize) -> ImportData {
        ImportData {
            brands: self.brands.iter().take(n).cloned().collect(),
            colors: self.colors.iter().take(n).cloned().collect(),
            components: self.components.iter().take(n).cloned().collect(),
        }
    }
}

/// 整批导入预览 / 提交响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchPreview {
    pub data: ImportData,
    pub errors: Vec<ImportIssue>,
    pub samples: ImportData,
    pub blocked: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub result: Option<BatchCounts>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_record_get_treats_blank_as_missing() {
        let mut values = HashMap::new();
        values.insert("slug".to_string(), "  ".to_string());
        values.insert("name".to_string(), " Acme ".to_string());
        let record = RawRecord::new(2, values);

        assert_eq!(record.get("slug"), None);
        assert_eq!(record.get("name"), Some("Acme"));
        assert_eq!(record.get("missing"), None);
    }

    #[test]
    fn test_count_invalid_rows_ignores_structural_issues() {
        let issues = vec![
            ImportIssue::keyed(TableKind::Colors, 0, "import.missingColumns", BTreeMap::new()),
            ImportIssue::from_field_error(TableKind::Colors, 3, FieldError::new("code", "validation.required")),
            ImportIssue::from_field_error(TableKind::Colors, 3, FieldError::new("name", "validation.required")),
            ImportIssue::keyed(TableKind::Colors, 5, "import.unknownBrand", BTreeMap::new()),
        ];
        assert_eq!(count_invalid_rows(&issues), 2);
    }

    #[test]
    fn test_issue_serialization_shape() {
        let issue = ImportIssue::from_field_error(
            TableKind::Components,
            7,
            FieldError::new("parts", "validation.parts.positive"),
        );
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["table"], "components");
        assert_eq!(json["row"], 7);
        assert_eq!(json["field"], "parts");
        assert_eq!(json["messageKey"], "validation.parts.positive");
        assert!(json.get("messageValues").is_none());
    }
}
