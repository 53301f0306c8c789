// ==========================================
// 涂料色号目录 - 色号搜索排序
// ==========================================
// 排序规则（不区分大小写）:
//   0 色号完全相等 > 1 色号前缀 > 2 名称包含 > 3 其他
// 同级按色号升序（序数比较），排序后截取前 20 条
// 候选集由库内查询预先限量，不属于排序规则
// ==========================================

use crate::domain::Color;
use std::cmp::Ordering;

/// 排序后返回的最大条数
pub const MAX_SEARCH_RESULTS: usize = 20;

/// 可参与排序的候选项
pub trait SearchCandidate {
    fn code(&self) -> &str;
    fn name(&self) -> &str;
}

impl SearchCandidate for Color {
    fn code(&self) -> &str {
        &self.code
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// 计算单个候选的等级
pub fn rank_of(query: &str, code: &str, name: &str) -> u8 {
    let q = query.to_lowercase();
    let code = code.to_lowercase();
    if code == q {
        0
    } else if code.starts_with(&q) {
        1
    } else if name.to_lowercase().contains(&q) {
        2
    } else {
        3
    }
}

/// 对完整候选集排序并截断
pub fn rank<T: SearchCandidate>(query: &str, candidates: Vec<T>) -> Vec<T> {
    let query = query.trim();
    let mut ranked: Vec<(u8, T)> = candidates
        .into_iter()
        .map(|c| (rank_of(query, c.code(), c.name()), c))
        .collect();

    ranked.sort_by(|(rank_a, a), (rank_b, b)| match rank_a.cmp(rank_b) {
        Ordering::Equal => a.code().cmp(b.code()),
        other => other,
    });

    ranked
        .into_iter()
        .take(MAX_SEARCH_RESULTS)
        .map(|(_, c)| c)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Candidate(&'static str, &'static str);

    impl SearchCandidate for Candidate {
        fn code(&self) -> &str {
            self.0
        }

        fn name(&self) -> &str {
            self.1
        }
    }

    fn codes(ranked: &[Candidate]) -> Vec<&str> {
        ranked.iter().map(|c| c.0).collect()
    }

    #[test]
    fn test_exact_then_prefix_then_name() {
        let ranked = rank(
            "Red",
            vec![
                Candidate("RED-01", "Crimson"),
                Candidate("X1", "Bright Red"),
                Candidate("red", "Redwood"),
            ],
        );
        assert_eq!(codes(&ranked), vec!["red", "RED-01", "X1"]);
    }

    #[test]
    fn test_ties_by_code_ordinal() {
        let ranked = rank(
            "blue",
            vec![
                Candidate("B2", "Sky Blue"),
                Candidate("A9", "Navy blue"),
                Candidate("b1", "Blue Steel"),
                Candidate("Z0", "Green"),
            ],
        );
        // 序数比较: 大写字母排在小写之前
        assert_eq!(codes(&ranked), vec!["A9", "B2", "b1", "Z0"]);
    }

    #[test]
    fn test_truncates_after_ranking() {
        let mut candidates: Vec<Candidate> = (0..30)
            .map(|i| Candidate(Box::leak(format!("C{:02}", i).into_boxed_str()), "Grey"))
            .collect();
        candidates.push(Candidate("grey", "Exact"));

        let ranked = rank("grey", candidates);

        assert_eq!(ranked.len(), MAX_SEARCH_RESULTS);
        assert_eq!(ranked[0].0, "grey");
        assert_eq!(ranked[1].0, "C00");
    }
}
