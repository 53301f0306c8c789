// ==========================================
// 涂料色号目录 - 性能统计
// ==========================================
// 职责: SQLite 语句计数 / 慢语句告警 / 导入操作耗时
// 计数为进程级原子量，并发操作之间会互相计入
// ==========================================

use rusqlite::Connection;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// 开关环境变量（1 / true / on 开启）
pub const PERF_SQL_ENV: &str = "PAINT_MIX_PERF_SQL";
/// 慢语句阈值环境变量（毫秒）
pub const SLOW_SQL_MS_ENV: &str = "PAINT_MIX_SLOW_SQL_MS";

const SLOW_SQL_DEFAULT_MS: u64 = 100;
const SQL_LOG_MAX_CHARS: usize = 300;

static ENABLED: AtomicBool = AtomicBool::new(false);
static SLOW_THRESHOLD_MS: AtomicU64 = AtomicU64::new(SLOW_SQL_DEFAULT_MS);
static STATEMENTS: AtomicU64 = AtomicU64::new(0);
static SLOW_STATEMENTS: AtomicU64 = AtomicU64::new(0);

/// 统计开关与阈值
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerfSettings {
    pub enabled: bool,
    pub slow_ms: u64,
}

impl PerfSettings {
    /// 从环境变量读取；未设置开关时仅 debug 构建开启
    pub fn from_env() -> Self {
        Self::parse(
            std::env::var(PERF_SQL_ENV).ok().as_deref(),
            std::env::var(SLOW_SQL_MS_ENV).ok().as_deref(),
        )
    }

    fn parse(enabled: Option<&str>, slow_ms: Option<&str>) -> Self {
        let enabled = match enabled {
            Some(raw) => matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "on"),
            None => cfg!(debug_assertions),
        };
        let slow_ms = slow_ms
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .unwrap_or(SLOW_SQL_DEFAULT_MS);
        Self { enabled, slow_ms }
    }
}

/// 单行化并截断 SQL（按字符截断）
fn compact_sql(sql: &str) -> String {
    let single_line = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.chars().count() <= SQL_LOG_MAX_CHARS {
        return single_line;
    }
    let head: String = single_line.chars().take(SQL_LOG_MAX_CHARS).collect();
    format!("{}...", head)
}

/// 在连接上挂载语句回调（关闭时清除回调）
pub fn install_sqlite_tracing(conn: &mut Connection) {
    let settings = PerfSettings::from_env();
    ENABLED.store(settings.enabled, Ordering::Relaxed);
    SLOW_THRESHOLD_MS.store(settings.slow_ms, Ordering::Relaxed);

    if settings.enabled {
        conn.profile(Some(on_statement));
    } else {
        conn.profile(None);
    }
}

fn on_statement(sql: &str, duration: Duration) {
    if !ENABLED.load(Ordering::Relaxed) {
        return;
    }
    STATEMENTS.fetch_add(1, Ordering::Relaxed);

    let ms = duration.as_millis() as u64;
    let threshold = SLOW_THRESHOLD_MS.load(Ordering::Relaxed);
    if threshold > 0 && ms >= threshold {
        SLOW_STATEMENTS.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(target: "slow_sql", duration_ms = ms, sql = %compact_sql(sql), "慢 SQL");
    }
}

// ==========================================
// PerfGuard - 操作耗时
// ==========================================
// 构造时记下计数快照，析构时输出本次操作的耗时与语句数
pub struct PerfGuard {
    op: &'static str,
    start: Instant,
    statements_at_start: u64,
    slow_at_start: u64,
}

impl PerfGuard {
    pub fn new(op: &'static str) -> Self {
        Self {
            op,
            start: Instant::now(),
            statements_at_start: STATEMENTS.load(Ordering::Relaxed),
            slow_at_start: SLOW_STATEMENTS.load(Ordering::Relaxed),
        }
    }
}

impl Drop for PerfGuard {
    fn drop(&mut self) {
        let statements = STATEMENTS
            .load(Ordering::Relaxed)
            .saturating_sub(self.statements_at_start);
        let slow_statements = SLOW_STATEMENTS
            .load(Ordering::Relaxed)
            .saturating_sub(self.slow_at_start);

        tracing::info!(
            target: "perf",
            op = self.op,
            elapsed_ms = self.start.elapsed().as_millis() as u64,
            statements,
            slow_statements,
            "操作完成"
        );
    }
}
