// ==========================================
// 涂料色号目录 - 领域类型定义
// ==========================================
// 职责: 导入表类型 / 配方版本 等基础枚举
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 导入表类型 (Table Kind)
// ==========================================
// 三类记录各有一套列定义与校验函数，按枚举显式分派
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    Brands,
    Colors,
    Components,
}

impl TableKind {
    /// 全部表类型（按导入顺序: 品牌 → 色号 → 配方组分）
    pub const ALL: [TableKind; 3] = [TableKind::Brands, TableKind::Colors, TableKind::Components];

    /// 工作表名 / 文件用途名
    pub fn sheet_name(&self) -> &'static str {
        match self {
            TableKind::Brands => "brands",
            TableKind::Colors => "colors",
            TableKind::Components => "components",
        }
    }

    /// 必填列
    pub fn required_columns(&self) -> &'static [&'static str] {
        match self {
            TableKind::Brands => &["slug", "name"],
            TableKind::Colors => &["brandSlug", "code", "name"],
            TableKind::Components => &[
                "brandSlug",
                "colorCode",
                "variant",
                "tonerCode",
                "tonerName",
                "parts",
            ],
        }
    }

    /// 可选列
    pub fn optional_columns(&self) -> &'static [&'static str] {
        match self {
            TableKind::Brands => &[],
            TableKind::Colors => &["productionDate", "colorCar", "notes"],
            TableKind::Components => &[],
        }
    }

    /// 上一阶段（分步导入的建议顺序，仅用于界面提示）
    pub fn predecessor(&self) -> Option<TableKind> {
        match self {
            TableKind::Brands => None,
            TableKind::Colors => Some(TableKind::Brands),
            TableKind::Components => Some(TableKind::Colors),
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sheet_name())
    }
}

impl FromStr for TableKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "brands" | "brand" => Ok(TableKind::Brands),
            "colors" | "color" => Ok(TableKind::Colors),
            "components" | "component" => Ok(TableKind::Components),
            other => Err(format!("未知的导入表类型: {}", other)),
        }
    }
}

// ==========================================
// 配方版本 (Variant)
// ==========================================
// 同一色号可有 V1/V2 两套互不相交的配方
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Variant {
    V1,
    V2,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::V1 => "V1",
            Variant::V2 => "V2",
        }
    }

    /// 宽松解析: 去空白 + 转大写后必须严格等于 V1 / V2
    pub fn parse_normalized(raw: &str) -> Option<Variant> {
        match raw.trim().to_uppercase().as_str() {
            "V1" => Some(Variant::V1),
            "V2" => Some(Variant::V2),
            _ => None,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Variant::parse_normalized(s).ok_or_else(|| format!("无效的配方版本: {}", s))
    }
}
