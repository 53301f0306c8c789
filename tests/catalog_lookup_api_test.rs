// ==========================================
// 检索与配方查询 API 集成测试
// ==========================================
// 覆盖: 品牌内搜索排序、候选集限量、配方计算、参数边界
// ==========================================


use paint_mix::api::{ApiError, BrandInput, ColorInput, ComponentInput};
use paint_mix::config::config_keys;
use paint_mix::domain::{Color, Variant};
use test_helpers::{create_test_env, TestEnv};

fn add_brand(env: &TestEnv, slug: &str) {
    env.admin_api
        .create_brand(
            &env.token(),
            &BrandInput {
                slug: Some(slug.to_string()),
                name: Some(slug.to_uppercase()),
            },
        )
        .unwrap();
}

fn add_color(env: &TestEnv, brand_slug: &str, code: &str, name: &str) -> Color {
    env.admin_api
        .create_color(
            &env.token(),
            &ColorInput {
                brand_slug: Some(brand_slug.to_string()),
                code: Some(code.to_string()),
                name: Some(name.to_string()),
                ..Default::default()
            },
        )
        .unwrap()
}

fn add_component(env: &TestEnv, code: &str, variant: &str, toner: &str, parts: f64) {
    env.admin_api
        .create_component(
            &env.token(),
            &ComponentInput {
                brand_slug: Some("acme".to_string()),
                color_code: Some(code.to_string()),
                variant: Some(variant.to_string()),
                toner_code: Some(toner.to_string()),
                toner_name: Some(format!("{} Toner", toner)),
                parts: Some(parts),
            },
        )
        .unwrap();
}

fn codes(colors: &[Color]) -> Vec<&str> {
    colors.iter().map(|c| c.code.as_str()).collect()
}

// ==========================================
// 搜索
// ==========================================

#[tokio::test]
async fn test_search_ranks_exact_then_prefix_then_name() {
    let env = create_test_env().unwrap();
    add_brand(&env, "acme");
    add_color(&env, "acme", "A-9", "Red Oxide");
    add_color(&env, "acme", "RED-2", "Cherry");
    add_color(&env, "acme", "red", "Plain Red");
    add_color(&env, "acme", "RED-10", "Ruby");
    add_color(&env, "acme", "X-RED", "Blue");
    add_color(&env, "acme", "B-1", "Navy");

    let results = env.lookup_api.search_colors("acme", "Red").await.unwrap();

    // 前缀同级按序数比较："RED-10" < "RED-2"
    assert_eq!(codes(&results), vec!["red", "RED-10", "RED-2", "A-9", "X-RED"]);
}

#[tokio::test]
async fn test_search_is_scoped_to_brand() {
    let env = create_test_env().unwrap();
    add_brand(&env, "acme");
    add_brand(&env, "zeta");
    add_color(&env, "acme", "R-1", "Red");
    add_color(&env, "zeta", "R-1", "Red");

    let results = env.lookup_api.search_colors("zeta", "r-1").await.unwrap();

    assert_eq!(results.len(), 1);
    let zeta_id = env
        .repo
        .with_read(|uow| uow.find_brand_by_slug("zeta"))
        .unwrap()
        .unwrap()
        .id;
    assert_eq!(results[0].brand_id, zeta_id);
}

#[tokio::test]
async fn test_search_blank_query_or_unknown_brand_is_empty() {
    let env = create_test_env().unwrap();
    add_brand(&env, "acme");
    add_color(&env, "acme", "R-1", "Red");

    assert!(env.lookup_api.search_colors("acme", "   ").await.unwrap().is_empty());
    assert!(env.lookup_api.search_colors("ghost", "R").await.unwrap().is_empty());
    assert!(env.lookup_api.search_colors("", "R").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_search_treats_wildcards_literally() {
    let env = create_test_env().unwrap();
    add_brand(&env, "acme");
    add_color(&env, "acme", "R-1", "Red");
    add_color(&env, "acme", "G_1", "Green");

    let results = env.lookup_api.search_colors("acme", "_").await.unwrap();

    assert_eq!(codes(&results), vec!["G_1"]);
}

#[tokio::test]
async fn test_search_truncates_to_twenty() {
    let env = create_test_env().unwrap();
    add_brand(&env, "acme");
    for i in 0..25 {
        add_color(&env, "acme", &format!("C-{:02}", i), "Grey");
    }

    let results = env.lookup_api.search_colors("acme", "grey").await.unwrap();

    assert_eq!(results.len(), 20);
    assert_eq!(results[0].code, "C-00");
    assert_eq!(results[19].code, "C-19");
}

#[tokio::test]
async fn test_search_candidate_limit_from_config() {
    let env = create_test_env().unwrap();
    env.config
        .set_global_config_value(config_keys::SEARCH_CANDIDATE_LIMIT, "3")
        .unwrap();
    add_brand(&env, "acme");
    for code in ["C-1", "C-2", "C-3", "C-4", "C-5"] {
        add_color(&env, "acme", code, "Grey");
    }

    let results = env.lookup_api.search_colors("acme", "c-").await.unwrap();

    assert_eq!(codes(&results), vec!["C-1", "C-2", "C-3"]);
}

// ==========================================
// 配方
// ==========================================

#[test]
fn test_formula_scales_to_total_grams() {
    let env = create_test_env().unwrap();
    add_brand(&env, "acme");
    let color = add_color(&env, "acme", "R-1", "Red");
    add_component(&env, "R-1", "V1", "T-RED", 1.0);
    add_component(&env, "R-1", "V1", "T-WHT", 2.0);
    add_component(&env, "R-1", "V1", "T-BLK", 2.0);
    add_component(&env, "R-1", "V1", "T-YEL", 2.0);
    add_component(&env, "R-1", "v2", "T-RED", 1.0);

    let formula = env.lookup_api.get_formula(&color.id, Variant::V1, 10.0).unwrap();

    assert_eq!(formula.total_parts, 7.0);
    assert_eq!(formula.total_grams, 10.0);
    let grams: Vec<f64> = formula.components.iter().map(|c| c.grams).collect();
    // 余数补到份数最大者中的第一个
    assert_eq!(grams, vec![1.43, 2.85, 2.86, 2.86]);
    let sum: f64 = grams.iter().sum();
    assert!((sum - 10.0).abs() < 1e-9);
    assert_eq!(formula.available_variants, vec![Variant::V1, Variant::V2]);
    assert_eq!(formula.color.brand.slug, "acme");
}

#[test]
fn test_formula_for_variant_without_components() {
    let env = create_test_env().unwrap();
    add_brand(&env, "acme");
    let color = add_color(&env, "acme", "R-1", "Red");
    add_component(&env, "R-1", "V1", "T-RED", 1.0);

    let formula = env.lookup_api.get_formula(&color.id, Variant::V2, 100.0).unwrap();

    assert_eq!(formula.total_parts, 0.0);
    assert!(formula.components.is_empty());
    assert_eq!(formula.available_variants, vec![Variant::V1]);
}

#[test]
fn test_formula_total_grams_bounds() {
    let env = create_test_env().unwrap();
    add_brand(&env, "acme");
    let color = add_color(&env, "acme", "R-1", "Red");
    add_component(&env, "R-1", "V1", "T-RED", 1.0);

    for grams in [0.5, 50000.5, f64::NAN] {
        let err = env.lookup_api.get_formula(&color.id, Variant::V1, grams).unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)), "{} 应被拒绝", grams);
    }
    for grams in [1.0, 50000.0] {
        let formula = env.lookup_api.get_formula(&color.id, Variant::V1, grams).unwrap();
        assert_eq!(formula.components[0].grams, grams);
        assert_eq!(formula.components[0].percent, 100.0);
    }
}

#[test]
fn test_formula_unknown_color_is_not_found() {
    let env = create_test_env().unwrap();

    let err = env.lookup_api.get_formula("missing", Variant::V1, 100.0).unwrap_err();

    assert!(matches!(err, ApiError::NotFound(_)));
    assert_eq!(err.message_key(), Some("admin.errors.notFound"));
}

#[test]
fn test_list_brands_sorted_by_name() {
    let env = create_test_env().unwrap();
    add_brand(&env, "zeta");
    add_brand(&env, "acme");

    let brands = env.lookup_api.list_brands().unwrap();

    let slugs: Vec<&str> = brands.iter().map(|b| b.slug.as_str()).collect();
    assert_eq!(slugs, vec!["acme", "zeta"]);
}
