// ==========================================
// 涂料色号目录 - 冲突处理器实现
// ==========================================
// 职责: 检测同批次内重复的自然键（品牌标识 / 品牌+色号 / 品牌+色号+版本+色粉）
// ==========================================

use crate::domain::{message_values, ImportIssue, SourceRow};
use crate::importer::catalog_importer_trait::ConflictHandler as ConflictHandlerTrait;
use crate::importer::row_validator::RowSchema;
use std::collections::HashMap;

pub struct ConflictHandler;

impl ConflictHandlerTrait for ConflictHandler {
    fn detect_duplicates(&self, keys: &[(usize, String)]) -> Vec<(usize, String, usize)> {
        let mut first_occurrence: HashMap<&str, usize> = HashMap::new();
        let mut duplicates = Vec::new();

        for (row_number, key) in keys {
            if let Some(first_row) = first_occurrence.get(key.as_str()) {
                duplicates.push((*row_number, key.clone(), *first_row));
            } else {
                first_occurrence.insert(key.as_str(), *row_number);
            }
        }

        duplicates
    }
}

/// 把重复键转换为导入问题（每个重复行一条，指向首次出现的行）
pub fn duplicate_issues<T: RowSchema>(
    handler: &dyn ConflictHandlerTrait,
    rows: &[SourceRow<T>],
) -> Vec<ImportIssue> {
    let keys: Vec<(usize, String)> = rows
        .iter()
        .map(|row| (row.row_number, row.data.natural_key()))
        .collect();

    handler
        .detect_duplicates(&keys)
        .into_iter()
        .map(|(row, key, first_row)| {
            ImportIssue::keyed(
                T::TABLE,
                row,
                "import.duplicateKey",
                message_values([("key", key), ("firstRow", first_row.to_string())]),
            )
        })
        .collect()
}
