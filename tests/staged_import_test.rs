// ==========================================
// 分步导入集成测试
// ==========================================
// 覆盖: 新增/更新/跳过分类、幂等重放、试运行、引用校验、导入进度
// ==========================================


use paint_mix::api::{BrandInput, StageOutcome};
use paint_mix::domain::{StageCounts, StagePreview, TableKind};
use test_helpers::{create_test_env, write_workbook, TestEnv, BRANDS_CSV, COLORS_CSV, COMPONENTS_CSV};

async fn stage(env: &TestEnv, kind: TableKind, name: &str, content: &str, dry_run: bool) -> StageOutcome {
    let path = env.write_file(name, content);
    env.import_api
        .import_stage(&env.token(), kind, &path, dry_run)
        .await
        .expect("分步导入不应返回硬错误")
}

fn counts_of(outcome: &StageOutcome) -> (Option<StageCounts>, Option<StageCounts>) {
    match outcome {
        StageOutcome::Brands(p) => (p.result, p.projected),
        StageOutcome::Colors(p) => (p.result, p.projected),
        StageOutcome::Components(p) => (p.result, p.projected),
    }
}

fn counts(created: usize, updated: usize, skipped: usize) -> StageCounts {
    StageCounts { created, updated, skipped }
}

#[tokio::test]
async fn test_full_staged_flow() {
    let env = create_test_env().expect("创建测试环境失败");

    let brands = stage(&env, TableKind::Brands, "brands.csv", BRANDS_CSV, false).await;
    assert_eq!(counts_of(&brands).0, Some(counts(2, 0, 0)));

    let colors = stage(&env, TableKind::Colors, "colors.csv", COLORS_CSV, false).await;
    assert_eq!(counts_of(&colors).0, Some(counts(3, 0, 0)));

    let components = stage(&env, TableKind::Components, "components.csv", COMPONENTS_CSV, false).await;
    assert_eq!(counts_of(&components).0, Some(counts(5, 0, 0)));

    assert_eq!(env.counts(), (2, 3, 5));

    let status = env.import_api.import_status(&env.token()).await.unwrap();
    assert!(status.state.brands_done);
    assert!(status.state.colors_done);
    assert!(status.state.components_done);
    assert_eq!(status.counts.components, 5);
}

#[tokio::test]
async fn test_restaging_same_file_is_idempotent() {
    let env = create_test_env().expect("创建测试环境失败");
    stage(&env, TableKind::Brands, "brands.csv", BRANDS_CSV, false).await;
    stage(&env, TableKind::Colors, "colors.csv", COLORS_CSV, false).await;

    let again = stage(&env, TableKind::Colors, "colors.csv", COLORS_CSV, false).await;

    assert_eq!(counts_of(&again).0, Some(counts(0, 0, 3)));
    assert_eq!(env.counts(), (2, 3, 0));
}

#[tokio::test]
async fn test_changed_rows_are_updated_and_new_rows_created() {
    let env = create_test_env().expect("创建测试环境失败");
    stage(&env, TableKind::Brands, "brands.csv", BRANDS_CSV, false).await;

    let changed = "slug,name\nacme,Acme Paints Ltd\nzeta,Zeta Coatings\nnova,Nova\n";
    let outcome = stage(&env, TableKind::Brands, "brands_v2.csv", changed, false).await;

    assert_eq!(counts_of(&outcome).0, Some(counts(1, 1, 1)));
    let acme = env
        .repo
        .with_read(|uow| uow.find_brand_by_slug("acme"))
        .unwrap()
        .expect("品牌应存在");
    assert_eq!(acme.name, "Acme Paints Ltd");
}

#[tokio::test]
async fn test_dry_run_projects_counts_without_writes() {
    let env = create_test_env().expect("创建测试环境失败");

    let outcome = stage(&env, TableKind::Brands, "brands.csv", BRANDS_CSV, true).await;

    let (result, projected) = counts_of(&outcome);
    assert!(result.is_none());
    assert_eq!(projected, Some(counts(2, 0, 0)));
    assert_eq!(env.counts(), (0, 0, 0));

    let status = env.import_api.import_status(&env.token()).await.unwrap();
    assert!(!status.state.brands_done);
}

#[tokio::test]
async fn test_dry_run_leaves_import_state_unpersisted() {
    let env = create_test_env().expect("创建测试环境失败");
    env.admin_api
        .create_brand(
            &env.token(),
            &BrandInput {
                slug: Some("acme".to_string()),
                name: Some("Acme".to_string()),
            },
        )
        .unwrap();

    let content = "brandSlug,code,name\nacme,R-1,Red\n";
    let outcome = stage(&env, TableKind::Colors, "colors.csv", content, true).await;
    assert!(!outcome.blocked());
    assert_eq!(env.counts(), (1, 0, 0));

    let persisted = env.repo.with_read(|uow| uow.read_import_state()).unwrap();
    assert_eq!(persisted, None);
}

#[tokio::test]
async fn test_colors_stage_accepts_brand_created_out_of_band() {
    let env = create_test_env().expect("创建测试环境失败");
    env.admin_api
        .create_brand(
            &env.token(),
            &BrandInput {
                slug: Some("acme".to_string()),
                name: Some("Acme".to_string()),
            },
        )
        .unwrap();

    let content = "brandSlug,code,name\nacme,R-1,Red\n";
    let outcome = stage(&env, TableKind::Colors, "colors.csv", content, false).await;

    assert!(!outcome.blocked());
    assert_eq!(counts_of(&outcome).0, Some(counts(1, 0, 0)));
}

#[tokio::test]
async fn test_unknown_brand_row_counted_invalid() {
    let env = create_test_env().expect("创建测试环境失败");
    stage(&env, TableKind::Brands, "brands.csv", "slug,name\nacme,Acme\n", false).await;

    let content = "brandSlug,code,name\nacme,R-1,Red\nghost,G-1,Ghost Grey\n";
    let outcome = stage(&env, TableKind::Colors, "colors.csv", content, false).await;

    let StageOutcome::Colors(preview) = outcome else {
        panic!("应返回色号分步结果");
    };
    let preview: StagePreview<_> = preview;
    assert!(preview.blocked);
    assert_eq!(preview.total_rows, 2);
    assert_eq!(preview.invalid_rows, 1);
    assert_eq!(preview.valid_rows, 1);
    let unknown: Vec<_> = preview
        .errors
        .iter()
        .filter(|e| e.message_key.as_deref() == Some("import.unknownBrand"))
        .collect();
    assert_eq!(unknown.len(), 1);
    assert_eq!(unknown[0].row, 3);
    // 阻断时不写任何一行
    assert_eq!(env.counts(), (1, 0, 0));
}

#[tokio::test]
async fn test_components_stage_requires_stored_color() {
    let env = create_test_env().expect("创建测试环境失败");
    stage(&env, TableKind::Brands, "brands.csv", BRANDS_CSV, false).await;

    let outcome = stage(&env, TableKind::Components, "components.csv", COMPONENTS_CSV, false).await;

    assert!(outcome.blocked());
    let StageOutcome::Components(preview) = outcome else {
        panic!("应返回组分分步结果");
    };
    assert!(preview
        .errors
        .iter()
        .all(|e| e.message_key.as_deref() == Some("import.unknownColorReference")));
    assert_eq!(preview.invalid_rows, 5);
}

#[tokio::test]
async fn test_missing_columns_reported_as_structural_issue() {
    let env = create_test_env().expect("创建测试环境失败");

    let outcome = stage(&env, TableKind::Brands, "brands.csv", "slug\nacme\n", false).await;

    let StageOutcome::Brands(preview) = outcome else {
        panic!("应返回品牌分步结果");
    };
    assert!(preview.blocked);
    let structural = preview
        .errors
        .iter()
        .find(|e| e.row == 0)
        .expect("应有结构性问题");
    assert_eq!(structural.message_key.as_deref(), Some("import.missingColumns"));
}

#[tokio::test]
async fn test_stage_from_single_sheet_workbook() {
    let env = create_test_env().expect("创建测试环境失败");
    let path = write_workbook(
        &env.dir,
        "brands.xlsx",
        &[("Sheet1", &[&["slug", "name"], &["acme", "Acme"], &["zeta", "Zeta"]])],
    );

    let outcome = env
        .import_api
        .import_stage(&env.token(), TableKind::Brands, &path, false)
        .await
        .unwrap();

    assert_eq!(counts_of(&outcome).0, Some(counts(2, 0, 0)));
}
