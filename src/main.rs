// ==========================================
// 涂料色号目录 - 命令行入口
// ==========================================
// 子命令: import / import-stage / status / formula / search / brands
// 输出: stdout 为格式化 JSON；日志写 stderr
// ==========================================

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use serde_json::json;

use paint_mix::api::{ApiError, ApiResult, ADMIN_KEY_ENV};
use paint_mix::app::{get_default_db_path, AppState, DB_PATH_ENV};
use paint_mix::importer::BatchSource;
use paint_mix::{i18n, logging, TableKind, Variant};

#[derive(Parser, Debug)]
#[command(name = "paint-mix", version = paint_mix::VERSION, about = "涂料色号目录: 导入、检索与配方计算")]
struct Cli {
    /// 数据库文件路径
    #[arg(long, global = true, env = DB_PATH_ENV)]
    db: Option<String>,

    /// 管理密钥（导入与状态查询需要）
    #[arg(long = "admin-key", global = true, env = ADMIN_KEY_ENV, hide_env_values = true)]
    admin_key: Option<String>,

    /// 界面语言（en / zh-CN）
    #[arg(long, global = true)]
    locale: Option<String>,

    /// 以 JSON 行格式输出日志
    #[arg(long = "json-log", global = true, action = ArgAction::SetTrue)]
    json_log: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 整批导入（一个工作簿，或三个 CSV 文件）
    Import {
        /// 含 brands / colors / components 三个工作表的工作簿
        #[arg(long, conflicts_with_all = ["brands", "colors", "components"])]
        workbook: Option<PathBuf>,
        #[arg(long)]
        brands: Option<PathBuf>,
        #[arg(long)]
        colors: Option<PathBuf>,
        #[arg(long)]
        components: Option<PathBuf>,
        /// 只校验，不写库
        #[arg(long = "dry-run", action = ArgAction::SetTrue)]
        dry_run: bool,
    },
    /// 分步导入单张表
    ImportStage {
        /// brands / colors / components
        kind: TableKind,
        file: PathBuf,
        #[arg(long = "dry-run", action = ArgAction::SetTrue)]
        dry_run: bool,
    },
    /// 导入进度
    Status,
    /// 配方计算
    Formula {
        color_id: String,
        #[arg(long, default_value = "V1")]
        variant: Variant,
        #[arg(long, default_value_t = 100.0)]
        grams: f64,
    },
    /// 品牌内色号搜索
    Search { brand: String, query: String },
    /// 品牌列表
    Brands,
}

fn emit<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("序列化输出失败")?);
    Ok(())
}

fn emit_error(err: &ApiError) -> Result<()> {
    let field_errors = match err {
        ApiError::Validation { errors } => serde_json::to_value(errors)?,
        _ => serde_json::Value::Null,
    };
    emit(&json!({
        "error": err.localized_message(),
        "messageKey": err.message_key(),
        "detail": err.to_string(),
        "errors": field_errors,
    }))
}

async fn run(state: &AppState, cli: Cli) -> ApiResult<(serde_json::Value, bool)> {
    let admin_key = cli.admin_key.as_deref();

    let output = match cli.command {
        Commands::Import {
            workbook,
            brands,
            colors,
            components,
            dry_run,
        } => {
            let token = state.admin_gate.authorize(admin_key)?;
            let source = match workbook {
                Some(path) => BatchSource::Workbook(path),
                None => BatchSource::CsvSet {
                    brands,
                    colors,
                    components,
                },
            };
            let preview = state.import_api.commit_batch(&token, &source, dry_run).await?;
            let blocked = preview.blocked;
            (to_value(&preview)?, blocked)
        }
        Commands::ImportStage { kind, file, dry_run } => {
            let token = state.admin_gate.authorize(admin_key)?;
            let outcome = state.import_api.import_stage(&token, kind, &file, dry_run).await?;
            let blocked = outcome.blocked();
            (to_value(&outcome)?, blocked)
        }
        Commands::Status => {
            let token = state.admin_gate.authorize(admin_key)?;
            (to_value(&state.import_api.import_status(&token).await?)?, false)
        }
        Commands::Formula {
            color_id,
            variant,
            grams,
        } => (to_value(&state.lookup_api.get_formula(&color_id, variant, grams)?)?, false),
        Commands::Search { brand, query } => {
            let results = state.lookup_api.search_colors(&brand, &query).await?;
            (json!({ "results": results }), false)
        }
        Commands::Brands => (json!({ "brands": state.lookup_api.list_brands()? }), false),
    };

    Ok(output)
}

fn to_value<T: Serialize>(value: &T) -> ApiResult<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| ApiError::InternalError(format!("序列化失败: {}", e)))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    if cli.json_log {
        logging::init_json();
    } else {
        logging::init();
    }
    if let Some(locale) = cli.locale.as_deref() {
        if !i18n::set_locale(locale) {
            tracing::warn!(locale, supported = ?i18n::SUPPORTED_LOCALES, "不支持的语言，沿用默认语言");
        }
    }

    let db_path = cli.db.clone().unwrap_or_else(get_default_db_path);
    tracing::info!(version = paint_mix::VERSION, db_path = %db_path, "涂料色号目录启动");

    let state = match AppState::new(db_path).await {
        Ok(state) => state,
        Err(err) => {
            emit_error(&err)?;
            return Ok(ExitCode::FAILURE);
        }
    };

    match run(&state, cli).await {
        Ok((output, blocked)) => {
            emit(&output)?;
            // 导入被阻断时以退出码 2 提示调用方
            Ok(if blocked { ExitCode::from(2) } else { ExitCode::SUCCESS })
        }
        Err(err) => {
            tracing::error!(error = %err, "命令执行失败");
            emit_error(&err)?;
            Ok(ExitCode::FAILURE)
        }
    }
}
