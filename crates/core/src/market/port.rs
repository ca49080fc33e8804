use crate::common::IndexCode;
use crate::market::entity::{IndexBar, LimitStats, NorthFlowDay};
use crate::market::error::MarketError;
use async_trait::async_trait;
use chrono::NaiveDate;

/// # Summary
/// 市场数据源接口（外部协作者）。
///
/// # Invariants
/// - 三类子抓取彼此独立，任一失败不影响其他调用。
/// - 实现者不得在内部把失败吞成零值，失败必须以 `MarketError` 返回。
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// # Summary
    /// 数据源名称，用于日志。
    fn name(&self) -> &str;

    /// # Summary
    /// 获取指数最近若干个交易日的日线。
    ///
    /// # Logic
    /// 1. 构建数据源请求并抓取日线。
    /// 2. 按日期升序排列后截取最近 `days` 根。
    ///
    /// # Arguments
    /// * `index`: 指数标的。
    /// * `days`: 需要的交易日数量。
    ///
    /// # Returns
    /// 成功返回升序日线列表，最多 `days` 根。
    async fn fetch_index_bars(
        &self,
        index: &IndexCode,
        days: usize,
    ) -> Result<Vec<IndexBar>, MarketError>;

    /// # Summary
    /// 获取最近 `days` 个交易日的逐日北向资金净流入，最新在前。
    ///
    /// # Returns
    /// 默认实现返回 `Unsupported`，不提供资金流数据的数据源无需覆盖。
    async fn fetch_north_flows(&self, _days: usize) -> Result<Vec<NorthFlowDay>, MarketError> {
        Err(MarketError::Unsupported(format!(
            "{} 不提供北向资金数据",
            self.name()
        )))
    }

    /// # Summary
    /// 获取最近 `days` 个交易日的北向资金净流入合计。
    ///
    /// # Logic
    /// 1. 调用 `fetch_north_flows` 获取逐日数据。
    /// 2. 空结果视为 `NotFound`，否则求和。
    ///
    /// # Arguments
    /// * `days`: 回溯的交易日数量。
    ///
    /// # Returns
    /// 成功返回净流入合计（亿元，正数为流入）。
    async fn fetch_north_inflow(&self, days: usize) -> Result<f64, MarketError> {
        let flows = self.fetch_north_flows(days).await?;
        if flows.is_empty() {
            return Err(MarketError::NotFound);
        }
        Ok(flows.iter().take(days).map(|f| f.net_inflow).sum())
    }

    /// # Summary
    /// 获取指定交易日的全市场涨跌停统计。
    ///
    /// # Arguments
    /// * `date`: 交易日，部分接口（涨停池/炸板池）按日期查询。
    ///
    /// # Returns
    /// 成功返回 `LimitStats`。
    async fn fetch_limit_stats(&self, date: NaiveDate) -> Result<LimitStats, MarketError>;
}
