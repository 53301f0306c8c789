// ==========================================
// 日志系统初始化
// ==========================================
// 使用 tracing 和 tracing-subscriber
// 日志一律写 stderr，stdout 只留给命令输出的 JSON
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// 默认过滤器（RUST_LOG 未设置或无法解析时）
const DEFAULT_FILTER: &str = "info";

/// 日志输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// 人读格式（带 target 与行号）
    Text,
    /// JSON 行，便于采集
    Json,
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// 按格式初始化全局订阅者
///
/// # 环境变量
/// - RUST_LOG: 日志级别过滤器（默认: info）
///   例如: RUST_LOG=debug 或 RUST_LOG=paint_mix::importer=trace,slow_sql=warn
///
/// # 示例
/// ```no_run
/// use paint_mix::logging::{self, LogFormat};
/// logging::init_with(LogFormat::Json);
/// ```
pub fn init_with(format: LogFormat) {
    let builder = fmt().with_env_filter(env_filter()).with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.with_target(true).with_line_number(true).init(),
        LogFormat::Json => builder.json().with_current_span(true).init(),
    }
}

pub fn init() {
    init_with(LogFormat::Text);
}

pub fn init_json() {
    init_with(LogFormat::Json);
}

/// 测试用：debug 级别，输出交给测试框架捕获；重复调用无副作用
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
