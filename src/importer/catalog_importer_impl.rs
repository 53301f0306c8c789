// ==========================================
// 涂料色号目录 - 目录导入器实现
// ==========================================
// 职责: 整合导入流程，从文件到数据库
// 流程: 解析 → 逐行校验 → 批内重复检测 → 跨表引用校验 → 预览 / 对账写入
// 红线: 存在任何问题即 blocked，不写库；提交在同一 IMMEDIATE 事务内重跑校验
// ==========================================

use crate::config::ImportConfigReader;
use crate::domain::{
    count_invalid_rows, message_values, BatchPreview, BrandRow, ColorRow, ComponentRow,
    ImportData, ImportIssue, ImportStatus, RawTable, SourceRow, StageCounts, StagePreview,
    TableKind,
};
use crate::importer::catalog_importer_trait::{BatchSource, CatalogImporter, ConflictHandler, FileParser};
use crate::importer::conflict_handler::duplicate_issues;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{CsvParser, ExcelParser, UniversalFileParser};
use crate::importer::reconcile::{
    commit_whole_batch, reconcile_brands, reconcile_colors, reconcile_components, WriteMode,
};
use crate::importer::reference_validator::{validate_color_refs, validate_component_refs, KnownKeys};
use crate::importer::row_validator::RowSchema;
use crate::importer::table_parser::{parse_table, ParsedTable};
use crate::perf::PerfGuard;
use crate::repository::error::RepositoryResult;
use crate::repository::{CatalogRepository, UnitOfWork};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// 整批导入的三张已解析表
struct ParsedBatch {
    brands: ParsedTable<BrandRow>,
    colors: ParsedTable<ColorRow>,
    components: ParsedTable<ComponentRow>,
    /// 结构性问题（缺工作表）
    structural: Vec<ImportIssue>,
}

fn parse_optional<T: RowSchema>(table: Option<&RawTable>) -> ParsedTable<T> {
    let now = Utc::now();
    table.map(|t| parse_table(t, now)).unwrap_or_default()
}

fn build_stage_preview<T: Clone>(
    parsed: &ParsedTable<T>,
    errors: Vec<ImportIssue>,
    sample_size: usize,
) -> StagePreview<T> {
    let invalid_rows = count_invalid_rows(&errors);
    StagePreview {
        total_rows: parsed.total_rows,
        valid_rows: parsed.total_rows.saturating_sub(invalid_rows),
        invalid_rows,
        samples: parsed.rows.iter().take(sample_size).map(|r| r.data.clone()).collect(),
        blocked: !errors.is_empty(),
        errors,
        result: None,
        projected: None,
    }
}

/// 事务失败统一归入 Transaction
fn as_transaction_failure(err: ImportError) -> ImportError {
    match err {
        ImportError::Repository(inner) => ImportError::Transaction(inner.to_string()),
        other => other,
    }
}

// ==========================================
// CatalogImporterImpl - 目录导入器实现
// ==========================================
pub struct CatalogImporterImpl<C>
where
    C: ImportConfigReader,
{
    // 数据访问层
    repo: Arc<CatalogRepository>,

    // 配置读取器
    config: C,

    // 导入组件
    file_parser: UniversalFileParser,
    conflict_handler: Box<dyn ConflictHandler>,
}

impl<C> CatalogImporterImpl<C>
where
    C: ImportConfigReader,
{
    pub fn new(repo: Arc<CatalogRepository>, config: C, conflict_handler: Box<dyn ConflictHandler>) -> Self {
        Self {
            repo,
            config,
            file_parser: UniversalFileParser,
            conflict_handler,
        }
    }

    // ===== 整批导入 =====

    /// 读取上传来源为原始表；缺工作表记为结构性问题
    fn load_batch(&self, source: &BatchSource) -> ImportResult<ParsedBatch> {
        let mut tables: BTreeMap<TableKind, RawTable> = BTreeMap::new();
        let mut structural = Vec::new();

        match source {
            BatchSource::Workbook(path) => {
                let mut workbook = ExcelParser.parse_workbook(path)?;
                for kind in &workbook.missing {
                    structural.push(ImportIssue::keyed(
                        *kind,
                        0,
                        "import.missingSheet",
                        message_values([("sheet", kind.sheet_name())]),
                    ));
                }
                for kind in TableKind::ALL {
                    if !workbook.missing.contains(&kind) {
                        tables.insert(kind, workbook.take(kind));
                    }
                }
            }
            BatchSource::CsvSet {
                brands,
                colors,
                components,
            } => {
                let files = [
                    (TableKind::Brands, brands),
                    (TableKind::Colors, colors),
                    (TableKind::Components, components),
                ];
                let missing: Vec<&str> = files
                    .iter()
                    .filter(|(_, path)| path.is_none())
                    .map(|(kind, _)| kind.sheet_name())
                    .collect();
                if !missing.is_empty() {
                    return Err(ImportError::IncompleteFileSet {
                        missing: missing.join(", "),
                    });
                }
                for (kind, path) in files {
                    if let Some(path) = path {
                        tables.insert(kind, CsvParser.parse_table(path)?);
                    }
                }
            }
        }

        Ok(ParsedBatch {
            brands: parse_optional(tables.get(&TableKind::Brands)),
            colors: parse_optional(tables.get(&TableKind::Colors)),
            components: parse_optional(tables.get(&TableKind::Components)),
            structural,
        })
    }

    /// 汇总整批问题（已知集合 = 本批 ∪ 库内）
    fn batch_issues(&self, uow: &UnitOfWork<'_>, batch: &ParsedBatch) -> RepositoryResult<Vec<ImportIssue>> {
        let mut issues = batch.structural.clone();
        issues.extend(batch.brands.issues.iter().cloned());
        issues.extend(duplicate_issues(self.conflict_handler.as_ref(), &batch.brands.rows));
        issues.extend(batch.colors.issues.iter().cloned());
        issues.extend(duplicate_issues(self.conflict_handler.as_ref(), &batch.colors.rows));
        issues.extend(batch.components.issues.iter().cloned());
        issues.extend(duplicate_issues(self.conflict_handler.as_ref(), &batch.components.rows));

        let mut known = KnownKeys::from_batch(&batch.brands.rows, &batch.colors.rows);
        known.load_store_brands(
            uow,
            batch
                .colors
                .rows
                .iter()
                .map(|r| r.data.brand_slug.as_str())
                .chain(batch.components.rows.iter().map(|r| r.data.brand_slug.as_str())),
        )?;
        known.load_store_colors(
            uow,
            batch
                .components
                .rows
                .iter()
                .map(|r| (r.data.brand_slug.as_str(), r.data.color_code.as_str())),
        )?;

        issues.extend(validate_color_refs(&batch.colors.rows, &known));
        issues.extend(validate_component_refs(&batch.components.rows, &known));
        Ok(issues)
    }

    fn batch_preview(
        &self,
        uow: &UnitOfWork<'_>,
        batch: &ParsedBatch,
        sample_size: usize,
    ) -> RepositoryResult<BatchPreview> {
        let errors = self.batch_issues(uow, batch)?;
        let data = ImportData {
            brands: batch.brands.data(),
            colors: batch.colors.data(),
            components: batch.components.data(),
        };
        Ok(BatchPreview {
            samples: data.samples(sample_size),
            data,
            blocked: !errors.is_empty(),
            errors,
            result: None,
        })
    }

    // ===== 分步导入 =====

    /// 分步导入的通用执行体
    ///
    /// 问题列表 = 行级问题 + 批内重复 + 引用问题；blocked 时不对账
    fn stage_body<T, R, W>(
        &self,
        uow: &UnitOfWork<'_>,
        parsed: &ParsedTable<T>,
        sample_size: usize,
        mode: WriteMode,
        ref_check: R,
        reconcile: W,
    ) -> ImportResult<StagePreview<T>>
    where
        T: RowSchema,
        R: FnOnce(&UnitOfWork<'_>, &[SourceRow<T>]) -> RepositoryResult<Vec<ImportIssue>>,
        W: FnOnce(&UnitOfWork<'_>, &[SourceRow<T>], WriteMode) -> ImportResult<StageCounts>,
    {
        let mut errors = parsed.issues.clone();
        errors.extend(duplicate_issues(self.conflict_handler.as_ref(), &parsed.rows));
        errors.extend(ref_check(uow, &parsed.rows)?);

        let kind = T::TABLE;
        let mut preview = build_stage_preview(parsed, errors, sample_size);
        if preview.blocked {
            warn!(
                table = %kind,
                errors = preview.errors.len(),
                invalid_rows = preview.invalid_rows,
                "分步导入存在问题，已阻止写入"
            );
            return Ok(preview);
        }

        let counts = reconcile(uow, &parsed.rows, mode)?;
        if mode.is_dry_run() {
            preview.projected = Some(counts);
        } else {
            if kind == TableKind::Brands {
                uow.mark_stage_done(TableKind::Brands)?;
            }
            preview.result = Some(counts);
        }
        Ok(preview)
    }

    fn run_stage<T, R, W>(
        &self,
        file_path: &Path,
        sample_size: usize,
        mode: WriteMode,
        ref_check: R,
        reconcile: W,
    ) -> ImportResult<StagePreview<T>>
    where
        T: RowSchema,
        R: FnOnce(&UnitOfWork<'_>, &[SourceRow<T>]) -> RepositoryResult<Vec<ImportIssue>>,
        W: FnOnce(&UnitOfWork<'_>, &[SourceRow<T>], WriteMode) -> ImportResult<StageCounts>,
    {
        let kind = T::TABLE;
        self.warn_if_locked(kind)?;

        let table = self.file_parser.parse_for(file_path, kind)?;
        let parsed: ParsedTable<T> = parse_table(&table, Utc::now());
        info!(
            table = %kind,
            total_rows = parsed.total_rows,
            valid_rows = parsed.rows.len(),
            dry_run = mode.is_dry_run(),
            "分步导入解析完成"
        );

        let preview = if mode.is_dry_run() {
            self.repo
                .with_read(|uow| self.stage_body(uow, &parsed, sample_size, mode, ref_check, reconcile))?
        } else {
            self.repo
                .with_transaction(|uow| self.stage_body(uow, &parsed, sample_size, mode, ref_check, reconcile))
                .map_err(as_transaction_failure)?
        };

        info!(
            table = %kind,
            blocked = preview.blocked,
            result = ?preview.result,
            projected = ?preview.projected,
            "分步导入完成"
        );
        Ok(preview)
    }

    /// 阶段门控仅作提示：上一阶段未完成时记录告警，不阻止执行
    fn warn_if_locked(&self, kind: TableKind) -> ImportResult<()> {
        let status = self.repo.with_read(|uow| uow.peek_import_status())?;
        if !status.stage_unlocked(kind) {
            warn!(
                table = %kind,
                predecessor = ?kind.predecessor(),
                "上一导入阶段尚未完成，继续执行"
            );
        }
        Ok(())
    }
}

#[async_trait]
impl<C> CatalogImporter for CatalogImporterImpl<C>
where
    C: ImportConfigReader + Send + Sync,
{
    #[instrument(skip(self, source))]
    async fn preview_batch(&self, source: &BatchSource) -> ImportResult<BatchPreview> {
        self.commit_batch(source, WriteMode::DryRun).await
    }

    #[instrument(skip(self, source), fields(dry_run = mode.is_dry_run()))]
    async fn commit_batch(&self, source: &BatchSource, mode: WriteMode) -> ImportResult<BatchPreview> {
        let sample_size = self.config.get_sample_size().await?;
        let _perf = PerfGuard::new("commit_batch");

        let batch = self.load_batch(source)?;
        info!(
            brands = batch.brands.total_rows,
            colors = batch.colors.total_rows,
            components = batch.components.total_rows,
            "整批导入解析完成"
        );

        let preview = if mode.is_dry_run() {
            self.repo
                .with_read(|uow| self.batch_preview(uow, &batch, sample_size))?
        } else {
            self.repo
                .with_transaction(|uow| -> ImportResult<BatchPreview> {
                    let mut preview = self.batch_preview(uow, &batch, sample_size)?;
                    if preview.blocked {
                        return Ok(preview);
                    }
                    preview.result = Some(commit_whole_batch(uow, &preview.data)?);
                    Ok(preview)
                })
                .map_err(as_transaction_failure)?
        };

        if preview.blocked {
            warn!(errors = preview.errors.len(), "整批导入存在问题，已阻止写入");
        } else {
            info!(result = ?preview.result, "整批导入完成");
        }
        Ok(preview)
    }

    #[instrument(skip(self, file_path), fields(dry_run = mode.is_dry_run()))]
    async fn import_brands<P: AsRef<Path> + Send>(
        &self,
        file_path: P,
        mode: WriteMode,
    ) -> ImportResult<StagePreview<BrandRow>> {
        let sample_size = self.config.get_sample_size().await?;
        let _perf = PerfGuard::new("import_brands");
        self.run_stage(
            file_path.as_ref(),
            sample_size,
            mode,
            |_uow, _rows| Ok(Vec::new()),
            reconcile_brands,
        )
    }

    #[instrument(skip(self, file_path), fields(dry_run = mode.is_dry_run()))]
    async fn import_colors<P: AsRef<Path> + Send>(
        &self,
        file_path: P,
        mode: WriteMode,
    ) -> ImportResult<StagePreview<ColorRow>> {
        let sample_size = self.config.get_sample_size().await?;
        let _perf = PerfGuard::new("import_colors");
        self.run_stage(
            file_path.as_ref(),
            sample_size,
            mode,
            |uow, rows| {
                let mut known = KnownKeys::default();
                known.load_store_brands(uow, rows.iter().map(|r| r.data.brand_slug.as_str()))?;
                Ok(validate_color_refs(rows, &known))
            },
            reconcile_colors,
        )
    }

    #[instrument(skip(self, file_path), fields(dry_run = mode.is_dry_run()))]
    async fn import_components<P: AsRef<Path> + Send>(
        &self,
        file_path: P,
        mode: WriteMode,
    ) -> ImportResult<StagePreview<ComponentRow>> {
        let sample_size = self.config.get_sample_size().await?;
        let _perf = PerfGuard::new("import_components");
        self.run_stage(
            file_path.as_ref(),
            sample_size,
            mode,
            |uow, rows| {
                let mut known = KnownKeys::default();
                known.load_store_brands(uow, rows.iter().map(|r| r.data.brand_slug.as_str()))?;
                known.load_store_colors(
                    uow,
                    rows.iter()
                        .map(|r| (r.data.brand_slug.as_str(), r.data.color_code.as_str())),
                )?;
                Ok(validate_component_refs(rows, &known))
            },
            reconcile_components,
        )
    }

    async fn import_status(&self) -> ImportResult<ImportStatus> {
        let status = self.repo.with_transaction(|uow| uow.import_status())?;
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigManager;
    use crate::importer::conflict_handler::ConflictHandler as ConflictHandlerImpl;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn setup() -> (CatalogImporterImpl<ConfigManager>, Arc<CatalogRepository>) {
        let repo = Arc::new(CatalogRepository::new(":memory:").unwrap());
        let config = ConfigManager::from_connection(repo.connection()).unwrap();
        let importer = CatalogImporterImpl::new(Arc::clone(&repo), config, Box::new(ConflictHandlerImpl));
        (importer, repo)
    }

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn csv_batch(dir: &TempDir, components: &str) -> BatchSource {
        BatchSource::csv_set(
            write(dir, "brands.csv", "slug,name\nacme,Acme\n"),
            write(dir, "colors.csv", "brandSlug,code,name\nacme,R1,Red\n"),
            write(dir, "components.csv", components),
        )
    }

    #[tokio::test]
    async fn test_commit_batch_writes_all_tables() {
        let (importer, repo) = setup();
        let dir = TempDir::new().unwrap();
        let source = csv_batch(
            &dir,
            "brandSlug,colorCode,variant,tonerCode,tonerName,parts\nacme,R1,v1,T1,White,2\nacme,R1,V1,T2,Black,1\n",
        );

        let preview = importer.commit_batch(&source, WriteMode::Apply).await.unwrap();

        assert!(!preview.blocked);
        assert_eq!(
            preview.result,
            Some(crate::domain::BatchCounts { brands: 1, colors: 1, components: 2 })
        );
        let counts = repo.with_read(|uow| uow.catalog_counts()).unwrap();
        assert_eq!((counts.brands, counts.colors, counts.components), (1, 1, 2));
    }

    #[tokio::test]
    async fn test_commit_batch_blocked_by_unknown_reference() {
        let (importer, repo) = setup();
        let dir = TempDir::new().unwrap();
        let source = csv_batch(
            &dir,
            "brandSlug,colorCode,variant,tonerCode,tonerName,parts\nacme,R9,V1,T1,White,2\n",
        );

        let preview = importer.commit_batch(&source, WriteMode::Apply).await.unwrap();

        assert!(preview.blocked);
        assert!(preview.result.is_none());
        assert_eq!(preview.errors.len(), 1);
        assert_eq!(
            preview.errors[0].message_key.as_deref(),
            Some("import.unknownColorReference")
        );
        let counts = repo.with_read(|uow| uow.catalog_counts()).unwrap();
        assert_eq!(counts.brands, 0);
    }

    #[tokio::test]
    async fn test_incomplete_csv_set_is_rejected() {
        let (importer, _repo) = setup();
        let dir = TempDir::new().unwrap();
        let source = BatchSource::CsvSet {
            brands: Some(write(&dir, "brands.csv", "slug,name\nacme,Acme\n")),
            colors: None,
            components: None,
        };

        let err = importer.preview_batch(&source).await.unwrap_err();
        assert!(matches!(err, ImportError::IncompleteFileSet { .. }));
    }

    #[tokio::test]
    async fn test_staged_brands_dry_run_projects_without_writing() {
        let (importer, repo) = setup();
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "brands.csv", "slug,name\nacme,Acme\nzeta,Zeta\n");

        let preview = importer.import_brands(&path, WriteMode::DryRun).await.unwrap();
        assert_eq!(preview.projected, Some(StageCounts { created: 2, updated: 0, skipped: 0 }));
        assert!(preview.result.is_none());
        assert_eq!(repo.with_read(|uow| uow.catalog_counts()).unwrap().brands, 0);

        let preview = importer.import_brands(&path, WriteMode::Apply).await.unwrap();
        assert_eq!(preview.result, Some(StageCounts { created: 2, updated: 0, skipped: 0 }));
        let status = importer.import_status().await.unwrap();
        assert!(status.state.brands_done);
    }

    #[tokio::test]
    async fn test_staged_colors_require_stored_brand() {
        let (importer, _repo) = setup();
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "colors.csv", "brandSlug,code,name\nacme,R1,Red\n");

        let preview = importer.import_colors(&path, WriteMode::Apply).await.unwrap();

        assert!(preview.blocked);
        assert_eq!(preview.invalid_rows, 1);
        assert_eq!(preview.valid_rows, 0);
        assert_eq!(preview.errors[0].message_key.as_deref(), Some("import.unknownBrand"));
    }
}
