// ==========================================
// 涂料色号目录 - 管理入口门禁
// ==========================================
// 职责: 共享密钥比对，签发管理令牌
// 密钥来源: 环境变量 PAINT_MIX_ADMIN_KEY 优先，其次 config_kv 中的 admin.import_key
// 未配置密钥时一律拒绝
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::ImportConfigReader;
use std::env;
use tracing::warn;

/// 管理密钥环境变量
pub const ADMIN_KEY_ENV: &str = "PAINT_MIX_ADMIN_KEY";

/// 管理令牌
///
/// 只能由 [`AdminGate::authorize`] 签发；所有管理 / 导入操作都要求持有
#[derive(Debug, Clone, Copy)]
pub struct AdminToken {
    _private: (),
}

#[derive(Debug, Clone, Default)]
pub struct AdminGate {
    configured_key: Option<String>,
}

impl AdminGate {
    pub fn new(configured_key: Option<String>) -> Self {
        Self {
            configured_key: configured_key.filter(|k| !k.trim().is_empty()),
        }
    }

    /// 按 环境变量 → 配置表 的顺序解析密钥
    pub async fn from_config<C: ImportConfigReader + ?Sized>(config: &C) -> ApiResult<Self> {
        if let Ok(key) = env::var(ADMIN_KEY_ENV) {
            if !key.trim().is_empty() {
                return Ok(Self::new(Some(key)));
            }
        }
        Ok(Self::new(config.get_admin_import_key().await?))
    }

    pub fn is_configured(&self) -> bool {
        self.configured_key.is_some()
    }

    /// 比对调用方提供的密钥
    pub fn authorize(&self, provided: Option<&str>) -> ApiResult<AdminToken> {
        match (&self.configured_key, provided) {
            (Some(expected), Some(given)) if expected == given => Ok(AdminToken { _private: () }),
            (None, _) => {
                warn!("管理密钥未配置，拒绝访问");
                Err(ApiError::Unauthorized)
            }
            _ => {
                warn!("管理密钥不匹配");
                Err(ApiError::Unauthorized)
            }
        }
    }
}
