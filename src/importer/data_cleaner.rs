// ==========================================
// 涂料色号目录 - 数据清洗器实现
// ==========================================
// 职责: TRIM / UPPER / NULL 标准化 / 日期与数值解析
// ==========================================

use crate::importer::catalog_importer_trait::DataCleaner as DataCleanerTrait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

pub struct DataCleaner;

impl DataCleanerTrait for DataCleaner {
    fn clean_text(&self, value: &str, uppercase: bool) -> String {
        let trimmed = value.trim();
        if uppercase {
            trimmed.to_uppercase()
        } else {
            trimmed.to_string()
        }
    }

    fn normalize_null(&self, value: Option<&str>) -> Option<String> {
        value.and_then(|v| {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
    }

    fn parse_date(&self, value: &str) -> Option<DateTime<Utc>> {
        let trimmed = value.trim();

        // 纯日期按 UTC 零点处理
        for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
            if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
                return date.and_hms_opt(0, 0, 0).map(|dt| Utc.from_utc_datetime(&dt));
            }
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Some(dt.with_timezone(&Utc));
        }

        for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
                return Some(Utc.from_utc_datetime(&dt));
            }
        }

        None
    }

    fn parse_decimal(&self, value: &str) -> Option<f64> {
        value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    }
}

impl DataCleaner {
    /// 品牌标识格式: ^[a-z0-9-]+$
    pub fn is_valid_slug(&self, value: &str) -> bool {
        !value.is_empty()
            && value
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    }
}
