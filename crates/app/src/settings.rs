use config::{Config, ConfigError, Environment, File};
use zeshi_core::config::AppConfig;

/// 默认配置文件名（不含扩展名，支持 toml/json/yaml）
pub const DEFAULT_CONFIG_NAME: &str = "zeshi";
/// 环境变量前缀，例如 `ZESHI__MONITOR__INDEX_SYMBOL=sz399006`
pub const ENV_PREFIX: &str = "ZESHI";

/// # Summary
/// 加载应用配置。
///
/// # Logic
/// 1. 以 `AppConfig::default()` 的值作为基础。
/// 2. 叠加可选的配置文件，文件不存在时忽略。
/// 3. 叠加 `ZESHI__` 前缀的环境变量，`__` 分隔层级。
///
/// # Arguments
/// * `file`: 配置文件路径或名称。
pub fn load(file: &str) -> Result<AppConfig, ConfigError> {
    Config::builder()
        .add_source(File::with_name(file).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}
