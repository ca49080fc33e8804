mod logging;
mod settings;

use std::sync::Arc;

use tracing::{error, info};
use zeshi_core::common::time::ShanghaiClock;
use zeshi_core::market::port::MarketDataSource;
use zeshi_engine::system::MarketEnvironmentSystem;
use zeshi_feed::csv_cache::NorthboundCsvCache;
use zeshi_feed::eastmoney::EastmoneyProvider;
use zeshi_feed::fallback::FallbackSource;
use zeshi_feed::sina::SinaProvider;
use zeshi_store::record::CsvRunRecordStore;

/// # Summary
/// 应用启动入口，纯粹的 DI 容器。
/// 负责实例化所有具体实现组件并通过 Arc<dyn Trait> 注入到编排器。
///
/// # Logic
/// 1. 加载并校验配置，初始化全局日志。
/// 2. 实例化基础设施层（行情回退链、北向缓存、结果存储、时钟）。
/// 3. 构造编排器并执行一次完整监测。
/// 4. 打印报告并追加保存本次结果。
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. 配置与日志
    let config_file = std::env::args()
        .nth(1)
        .unwrap_or_else(|| settings::DEFAULT_CONFIG_NAME.to_string());
    let config = settings::load(&config_file)?;
    config.validate()?;
    let _log_guard = logging::init(&config.log)?;
    info!(index = %config.monitor.index_symbol, days = config.monitor.days, "Zeshi monitor starting...");

    // 2. 实例化基础设施层
    let primary = Arc::new(EastmoneyProvider::new(&config.feed)?);
    let secondary = Arc::new(SinaProvider::new(&config.feed)?);
    let providers: Vec<Arc<dyn MarketDataSource>> = vec![primary, secondary];
    let source = Arc::new(
        FallbackSource::new(providers)
            .with_north_cache(NorthboundCsvCache::new(&config.monitor.north_csv_path)),
    );
    let store = Arc::new(CsvRunRecordStore::new(&config.monitor.output_path));

    // 3. 构造编排器
    let mut system = MarketEnvironmentSystem::new(
        config.monitor.index_code()?,
        config.monitor.days,
        source,
        store,
        Arc::new(ShanghaiClock),
    )
    .with_fallback_policy(config.fallback.policy());

    // 4. 执行监测
    match system.run().await {
        Ok(label) => info!(%label, "market environment classified"),
        Err(e) => {
            error!(error = %e, "market environment run aborted");
            return Err(e.into());
        }
    }

    system.print_results()?;
    let record = system.save_results()?;
    info!(
        path = %config.monitor.output_path.display(),
        date = %record.date,
        "result appended"
    );

    Ok(())
}
