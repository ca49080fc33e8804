use std::error::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use zeshi_core::config::LogConfig;

const LOG_FILE_PREFIX: &str = "zeshi.log";
// HTTP 客户端内部日志过于嘈杂
const NOISY_MODULES: &[&str] = &["hyper", "hyper_util", "reqwest", "rustls"];

fn build_filter(level: &str) -> Result<EnvFilter, Box<dyn Error>> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let mut directives = level.to_string();
    for module in NOISY_MODULES {
        directives.push_str(&format!(",{}=warn", module));
    }
    Ok(EnvFilter::try_new(&directives)?)
}

/// # Summary
/// 初始化全局日志。
///
/// # Logic
/// 1. `RUST_LOG` 优先，否则使用配置中的级别。
/// 2. 始终输出到终端。
/// 3. 配置了 `log.dir` 时额外按天滚动写入文件。
///
/// # Returns
/// 写文件时返回后台写线程的守卫，调用方需持有到进程结束。
pub fn init(config: &LogConfig) -> Result<Option<WorkerGuard>, Box<dyn Error>> {
    let filter = build_filter(&config.level)?;
    let console = fmt::layer().with_target(true);

    match &config.dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file = fmt::layer().with_ansi(false).with_writer(writer);
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .with(file)
                .try_init()?;
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .try_init()?;
            Ok(None)
        }
    }
}
