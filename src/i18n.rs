// ==========================================
// 国际化 (i18n) 模块
// ==========================================
// 语言包位于 locales/（en / zh-CN），未知语言回退到 en
// 导入问题与管理端错误都以 消息键 + 参数 表达，在这里渲染
// rust_i18n::i18n! 宏已在 lib.rs 中初始化
// ==========================================

use std::collections::BTreeMap;

/// 支持的语言
pub const SUPPORTED_LOCALES: [&str; 2] = ["en", "zh-CN"];

pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// 设置语言；不支持的语言代码返回 false 且保持当前语言
pub fn set_locale(locale: &str) -> bool {
    let locale = locale.trim();
    match SUPPORTED_LOCALES.iter().find(|l| l.eq_ignore_ascii_case(locale)) {
        Some(supported) => {
            rust_i18n::set_locale(supported);
            true
        }
        None => false,
    }
}

/// 翻译消息（无参数）
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// 翻译消息（带参数，占位符格式 `%{name}`）
///
/// # 示例
/// ```no_run
/// use paint_mix::i18n::t_with_args;
/// let msg = t_with_args("import.unknownBrand", &[("brandSlug", "acme")]);
/// ```
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    args.iter().fold(t(key), |message, (name, value)| {
        message.replace(&format!("%{{{}}}", name), value)
    })
}

/// 按消息键与参数表渲染（ImportIssue / FieldError 的存储形式）
pub fn render(key: &str, values: &BTreeMap<String, String>) -> String {
    let args: Vec<(&str, &str)> = values
        .iter()
        .map(|(name, value)| (name.as_str(), value.as_str()))
        .collect();
    t_with_args(key, &args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // locale 为全局状态，测试并行执行时需串行化
    static LOCALE_TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_set_locale() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        assert!(set_locale("zh-cn"));
        assert_eq!(current_locale(), "zh-CN");

        assert!(!set_locale("fr"));
        assert_eq!(current_locale(), "zh-CN");

        set_locale("en");
    }

    #[test]
    fn test_translate_simple() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("zh-CN");
        assert_eq!(t("validation.required"), "该字段为必填项");

        set_locale("en");
        assert_eq!(t("validation.required"), "This field is required");
    }

    #[test]
    fn test_translate_with_args() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("en");
        let msg = t_with_args("import.missingColumns", &[("columns", "code, name")]);
        assert_eq!(msg, "Missing columns: code, name");

        set_locale("zh-CN");
        let values = BTreeMap::from([("brandSlug".to_string(), "acme".to_string())]);
        let msg = render("import.unknownBrand", &values);
        assert!(msg.contains("acme"));
        assert!(msg.contains("未知品牌"));

        set_locale("en");
    }
}
