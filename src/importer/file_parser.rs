// ==========================================
// 涂料色号目录 - 文件解析器实现
// ==========================================
// 阶段 0: 文件读取与解析
// 支持: Excel (.xlsx/.xls/.ods，按工作表名取表) / CSV (.csv，每表一个文件)
// 输出: RawTable（表头 + 带行号的原始行记录）
// ==========================================

use crate::domain::{RawRecord, RawTable, TableKind};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::catalog_importer_trait::FileParser;
use calamine::{open_workbook_auto, Data, DataType, Range, Reader};
use csv::ReaderBuilder;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

const EXCEL_EXTENSIONS: [&str; 4] = ["xlsx", "xlsm", "xls", "ods"];

fn file_extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

fn ensure_exists(path: &Path) -> ImportResult<()> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    Ok(())
}

fn clean_header(raw: &str) -> String {
    // 去掉 UTF-8 BOM（Excel 另存 CSV 时常见）
    raw.trim_start_matches('\u{feff}').trim().to_string()
}

/// 把一行单元格按表头组装为 RawRecord；整行为空时返回 None
///
/// 行号 = 已收集的数据行数 + 2（表头占第 1 行，空行不计入编号）
fn build_record<I>(headers: &[String], cells: I, collected: usize) -> Option<RawRecord>
where
    I: IntoIterator<Item = String>,
{
    let mut row_map = HashMap::new();
    for (col_idx, value) in cells.into_iter().enumerate() {
        if let Some(header) = headers.get(col_idx) {
            if header.is_empty() {
                continue;
            }
            row_map.insert(header.clone(), value.trim().to_string());
        }
    }

    // 跳过完全空白的行
    if row_map.values().all(|v| v.is_empty()) {
        return None;
    }

    Some(RawRecord::new(collected + 2, row_map))
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl CsvParser {
    /// 从任意 Reader 解析 CSV（逗号分隔，首行为表头）
    pub fn parse_reader<R: Read>(&self, reader: R) -> ImportResult<RawTable> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(reader);

        // 读取表头
        let headers: Vec<String> = reader.headers()?.iter().map(clean_header).collect();

        // 读取所有行
        let mut records = Vec::new();
        for result in reader.records() {
            let record = result?;
            let cells = record.iter().map(|v| v.to_string());
            if let Some(raw) = build_record(&headers, cells, records.len()) {
                records.push(raw);
            }
        }

        Ok(RawTable { headers, records })
    }
}

impl FileParser for CsvParser {
    fn parse_table(&self, file_path: &Path) -> ImportResult<RawTable> {
        ensure_exists(file_path)?;

        let ext = file_extension(file_path);
        if ext != "csv" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let file = File::open(file_path)?;
        let table = self.parse_reader(file)?;
        debug!(path = %file_path.display(), rows = table.records.len(), "CSV 解析完成");
        Ok(table)
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

/// 工作簿解析结果：按表类型取出的工作表 + 缺失的工作表
#[derive(Debug, Default)]
pub struct WorkbookTables {
    pub tables: BTreeMap<TableKind, RawTable>,
    pub missing: Vec<TableKind>,
}

impl WorkbookTables {
    /// 取出某表（缺失时为空表）
    pub fn take(&mut self, kind: TableKind) -> RawTable {
        self.tables.remove(&kind).unwrap_or_default()
    }
}

impl ExcelParser {
    /// 解析包含 brands / colors / components 三个工作表的工作簿
    ///
    /// 缺少某个工作表不会中断其余工作表的解析，由调用方逐个报告
    pub fn parse_workbook(&self, file_path: &Path) -> ImportResult<WorkbookTables> {
        ensure_exists(file_path)?;
        let ext = file_extension(file_path);
        if !EXCEL_EXTENSIONS.contains(&ext.as_str()) {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let mut workbook = open_workbook_auto(file_path)?;
        let sheet_names = workbook.sheet_names();

        let mut result = WorkbookTables::default();
        for kind in TableKind::ALL {
            let Some(sheet_name) = sheet_names
                .iter()
                .find(|name| name.trim() == kind.sheet_name())
            else {
                result.missing.push(kind);
                continue;
            };
            let range = workbook.worksheet_range(sheet_name)?;
            result.tables.insert(kind, Self::range_to_table(&range));
        }

        debug!(
            path = %file_path.display(),
            sheets = sheet_names.len(),
            missing = result.missing.len(),
            "Excel 工作簿解析完成"
        );
        Ok(result)
    }

    /// 解析单表工作簿：优先取与表类型同名的工作表，否则取第一个工作表
    pub fn parse_sheet_for(&self, file_path: &Path, kind: TableKind) -> ImportResult<RawTable> {
        ensure_exists(file_path)?;
        let ext = file_extension(file_path);
        if !EXCEL_EXTENSIONS.contains(&ext.as_str()) {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let mut workbook = open_workbook_auto(file_path)?;
        let sheet_names = workbook.sheet_names();
        let sheet_name = sheet_names
            .iter()
            .find(|name| name.trim() == kind.sheet_name())
            .or_else(|| sheet_names.first())
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;

        let range = workbook.worksheet_range(&sheet_name)?;
        Ok(Self::range_to_table(&range))
    }

    fn range_to_table(range: &Range<Data>) -> RawTable {
        let mut rows = range.rows();

        // 提取表头（第一行）；空工作表返回空表，由列校验报告缺列
        let headers: Vec<String> = match rows.next() {
            Some(header_row) => header_row
                .iter()
                .map(|cell| clean_header(&cell_to_string(cell)))
                .collect(),
            None => return RawTable::default(),
        };

        let mut records = Vec::new();
        for data_row in rows {
            let cells = data_row.iter().map(cell_to_string);
            if let Some(raw) = build_record(&headers, cells, records.len()) {
                records.push(raw);
            }
        }

        RawTable { headers, records }
    }
}

/// 单元格转字符串：日期单元格统一输出 YYYY-MM-DD
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_date()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| cell.to_string()),
        other => other.to_string(),
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    /// 解析单个表文件（分步导入使用）
    pub fn parse_for<P: AsRef<Path>>(&self, file_path: P, kind: TableKind) -> ImportResult<RawTable> {
        let path = file_path.as_ref();
        let ext = file_extension(path);

        match ext.as_str() {
            "csv" => CsvParser.parse_table(path),
            e if EXCEL_EXTENSIONS.contains(&e) => ExcelParser.parse_sheet_for(path, kind),
            _ => Err(ImportError::UnsupportedFormat(ext)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn csv_file(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut temp_file = Builder::new().suffix(".csv").tempfile().unwrap();
        for line in lines {
            writeln!(temp_file, "{}", line).unwrap();
        }
        temp_file
    }

    #[test]
    fn test_csv_parser_valid_file() {
        let temp_file = csv_file(&["slug,name", "acme,Acme Paints", "zeta,Zeta"]);

        let table = CsvParser.parse_table(temp_file.path()).unwrap();

        assert_eq!(table.headers, vec!["slug", "name"]);
        assert_eq!(table.records.len(), 2);
        assert_eq!(table.records[0].row_number, 2);
        assert_eq!(table.records[0].get("slug"), Some("acme"));
        assert_eq!(table.records[1].get("name"), Some("Zeta"));
    }

    #[test]
    fn test_csv_parser_file_not_found() {
        let result = CsvParser.parse_table(Path::new("non_existent.csv"));
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }

    #[test]
    fn test_csv_parser_skips_blank_rows_before_numbering() {
        let temp_file = csv_file(&["slug,name", "acme,Acme", "", ",", "zeta,Zeta"]);

        let table = CsvParser.parse_table(temp_file.path()).unwrap();

        assert_eq!(table.records.len(), 2);
        assert_eq!(table.records[1].row_number, 3);
        assert_eq!(table.records[1].get("slug"), Some("zeta"));
    }

    #[test]
    fn test_csv_parser_strips_bom_and_tolerates_short_rows() {
        let table = CsvParser
            .parse_reader("\u{feff}brandSlug,code,name,notes\nacme,R1,Red\n".as_bytes())
            .unwrap();

        assert_eq!(table.headers[0], "brandSlug");
        assert_eq!(table.records[0].get("name"), Some("Red"));
        assert_eq!(table.records[0].get("notes"), None);
    }

    #[test]
    fn test_universal_parser_rejects_unknown_extension() {
        let temp_file = Builder::new().suffix(".txt").tempfile().unwrap();
        let result = UniversalFileParser.parse_for(temp_file.path(), TableKind::Brands);
        assert!(matches!(result, Err(ImportError::UnsupportedFormat(_))));
    }
}
