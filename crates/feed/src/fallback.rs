use crate::csv_cache::NorthboundCsvCache;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};
use zeshi_core::common::IndexCode;
use zeshi_core::market::entity::{IndexBar, LimitStats, NorthFlowDay};
use zeshi_core::market::error::MarketError;
use zeshi_core::market::port::MarketDataSource;

/// # Summary
/// 多数据源回退链，按注册顺序依次尝试。
///
/// # Invariants
/// - 对外表现为单一 `MarketDataSource`，编排器无需感知具体数据源。
/// - 北向资金在所有在线数据源失败后读取本地 CSV 缓存。
/// - 在线抓取到非零北向资金时写回缓存，写入失败只记录日志。
pub struct FallbackSource {
    providers: Vec<Arc<dyn MarketDataSource>>,
    north_cache: Option<NorthboundCsvCache>,
}

impl FallbackSource {
    pub fn new(providers: Vec<Arc<dyn MarketDataSource>>) -> Self {
        Self {
            providers,
            north_cache: None,
        }
    }

    /// 配置北向资金本地缓存
    pub fn with_north_cache(mut self, cache: NorthboundCsvCache) -> Self {
        self.north_cache = Some(cache);
        self
    }

    /// # Summary
    /// 按顺序执行请求直到某个数据源成功。
    ///
    /// # Logic
    /// 1. 依次调用每个数据源，成功立即返回。
    /// 2. 失败记录 warn 日志并尝试下一个。
    /// 3. 全部失败时返回最后一个错误。
    async fn execute_with_failover<T, F, Fut>(&self, what: &str, request_fn: F) -> Result<T, MarketError>
    where
        F: Fn(Arc<dyn MarketDataSource>) -> Fut,
        Fut: Future<Output = Result<T, MarketError>>,
    {
        let mut last_error = MarketError::Unsupported("no data source registered".to_string());

        for provider in &self.providers {
            let name = provider.name().to_string();
            debug!(provider = %name, what, "trying data source");
            match request_fn(Arc::clone(provider)).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    warn!(provider = %name, what, error = %e, "data source failed, trying next");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}

#[async_trait]
impl MarketDataSource for FallbackSource {
    fn name(&self) -> &str {
        "fallback"
    }

    async fn fetch_index_bars(
        &self,
        index: &IndexCode,
        days: usize,
    ) -> Result<Vec<IndexBar>, MarketError> {
        self.execute_with_failover("index bars", |provider| async move {
            let bars = provider.fetch_index_bars(index, days).await?;
            if bars.is_empty() {
                return Err(MarketError::NotFound);
            }
            Ok(bars)
        })
        .await
    }

    /// # Summary
    /// 获取北向资金逐日净流入。
    ///
    /// # Logic
    /// 1. 依次尝试在线数据源。
    /// 2. 成功且合计非零时写回缓存。
    /// 3. 在线全部失败时读取缓存中最近 `days` 条。
    async fn fetch_north_flows(&self, days: usize) -> Result<Vec<NorthFlowDay>, MarketError> {
        let online = self
            .execute_with_failover("north flows", |provider| async move {
                provider.fetch_north_flows(days).await
            })
            .await;

        match online {
            Ok(flows) => {
                let total: f64 = flows.iter().map(|f| f.net_inflow).sum();
                if let Some(cache) = &self.north_cache {
                    if total != 0.0 && total.is_finite() {
                        if let Err(e) = cache.save(&flows) {
                            warn!(error = %e, "failed to update northbound cache");
                        }
                    }
                }
                Ok(flows)
            }
            Err(online_error) => {
                let Some(cache) = &self.north_cache else {
                    return Err(online_error);
                };
                warn!(error = %online_error, path = %cache.path().display(), "reading northbound flows from cache");
                let flows = cache.recent(days)?;
                info!(rows = flows.len(), "northbound flows loaded from cache");
                Ok(flows)
            }
        }
    }

    async fn fetch_limit_stats(&self, date: NaiveDate) -> Result<LimitStats, MarketError> {
        self.execute_with_failover("limit stats", |provider| async move {
            provider.fetch_limit_stats(date).await
        })
        .await
    }
}
