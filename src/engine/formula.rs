// ==========================================
// 涂料色号目录 - 配方计算引擎
// ==========================================
// 职责: 把一个版本的配方组分（相对份数）换算为目标总重下的克数与百分比
// 守恒: Σ grams == totalGrams（两位小数精度）；舍入差额补到份数最大的首个组分
// 百分比不参与差额再分配
// ==========================================

use serde::{Deserialize, Serialize};

/// 目标总重上下限（克）
pub const MIN_TOTAL_GRAMS: f64 = 1.0;
pub const MAX_TOTAL_GRAMS: f64 = 50_000.0;

/// 计算输入: 单个组分
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormulaInput {
    pub toner_code: String,
    pub toner_name: String,
    pub parts: f64,
}

/// 计算结果: 单个组分
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormulaItem {
    pub toner_code: String,
    pub toner_name: String,
    pub parts: f64,
    pub grams: f64,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormulaResult {
    pub total_parts: f64,
    pub items: Vec<FormulaItem>,
}

impl FormulaResult {
    fn degenerate() -> Self {
        Self {
            total_parts: 0.0,
            items: Vec::new(),
        }
    }
}

/// 两位小数四舍五入（半数向上）
pub fn round2(value: f64) -> f64 {
    ((value + f64::EPSILON) / 0.01 + 0.5).floor() / 100.0
}

/// 配方计算
///
/// 空列表或总份数 ≤ 0 返回 `{totalParts: 0, items: []}`
pub fn compute_formula(components: &[FormulaInput], total_grams: f64) -> FormulaResult {
    let total_parts: f64 = components.iter().map(|c| c.parts).sum();
    if components.is_empty() || total_parts <= 0.0 {
        return FormulaResult::degenerate();
    }

    let mut items: Vec<FormulaItem> = components
        .iter()
        .map(|c| {
            let ratio = c.parts / total_parts;
            FormulaItem {
                toner_code: c.toner_code.clone(),
                toner_name: c.toner_name.clone(),
                parts: c.parts,
                grams: round2(ratio * total_grams),
                percent: round2(ratio * 100.0),
            }
        })
        .collect();

    let grams_sum = round2(items.iter().map(|i| i.grams).sum());
    let diff = round2(total_grams - grams_sum);

    if diff != 0.0 {
        // 份数最大者中的第一个
        let mut max_index = 0;
        for (idx, item) in items.iter().enumerate() {
            if item.parts > items[max_index].parts {
                max_index = idx;
            }
        }
        let target = &mut items[max_index];
        target.grams = round2(target.grams + diff);
    }

    FormulaResult { total_parts, items }
}
