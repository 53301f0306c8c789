// ==========================================
// 涂料色号目录 - 引擎层
// ==========================================
// 职责: 纯计算规则（配方换算、搜索排序）
// 红线: 引擎不拼 SQL, 不访问仓储
// ==========================================

pub mod formula;
pub mod search_ranker;

// 重导出核心引擎
pub use formula::{compute_formula, round2, FormulaInput, FormulaItem, FormulaResult};
pub use search_ranker::{rank, SearchCandidate, MAX_SEARCH_RESULTS};
