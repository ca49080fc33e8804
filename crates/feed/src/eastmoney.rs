use crate::client::{build_client, parse_volume, value_as_f64};
use crate::limits::{bust_rate, count_limits};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use zeshi_core::common::{Exchange, IndexCode};
use zeshi_core::config::FeedConfig;
use zeshi_core::market::entity::{IndexBar, LimitStats, NorthFlowDay};
use zeshi_core::market::error::MarketError;
use zeshi_core::market::port::MarketDataSource;

const KLINE_URL: &str = "https://push2his.eastmoney.com/api/qt/stock/kline/get";
const CLIST_URL: &str = "https://push2.eastmoney.com/api/qt/clist/get";
const DATACENTER_URL: &str = "https://datacenter-web.eastmoney.com/api/data/v1/get";
const ZT_POOL_URL: &str = "https://push2ex.eastmoney.com/getTopicZTPool";
const ZB_POOL_URL: &str = "https://push2ex.eastmoney.com/getTopicZBPool";

// 沪深京 A 股全部板块
const A_SHARE_FS: &str = "m:0+t:6,m:0+t:80,m:1+t:2,m:1+t:23,m:0+t:81+s:2048";
const PUSH2EX_UT: &str = "7eea3edcaed734bea9cbfc24409ed989";
// 北向资金（沪股通 + 深股通）
const NORTHBOUND_FILTER: &str = "(MUTUAL_TYPE=\"005\")";
// 全市场分页上限，防止接口异常时无限翻页
const MAX_PAGES: usize = 200;

/// # Summary
/// 东方财富行情提供者，作为主数据源。
///
/// # Invariants
/// - 日线来自 push2his，北向资金来自 datacenter，涨跌停来自 push2 全市场快照。
/// - 炸板率来自 push2ex 涨停池与炸板池，查询失败时只降级该字段。
#[derive(Clone)]
pub struct EastmoneyProvider {
    client: Client,
    page_size: usize,
    limit_threshold_pct: f64,
}

impl EastmoneyProvider {
    /// # Summary
    /// 根据行情配置创建提供者。
    ///
    /// # Arguments
    /// * `config`: 超时、分页大小与涨跌停阈值。
    ///
    /// # Returns
    /// 成功返回提供者，HTTP 客户端构建失败返回 `MarketError`。
    pub fn new(config: &FeedConfig) -> Result<Self, MarketError> {
        Ok(Self {
            client: build_client(Duration::from_secs(config.timeout_secs))?,
            page_size: config.page_size.max(1),
            limit_threshold_pct: config.limit_threshold_pct,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, MarketError> {
        let resp = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| MarketError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(MarketError::Network(format!("HTTP {}", resp.status())));
        }

        resp.json()
            .await
            .map_err(|e| MarketError::Parse(e.to_string()))
    }

    /// # Summary
    /// 分页抓取全市场 A 股涨跌幅。
    ///
    /// # Logic
    /// 1. 按 `page_size` 逐页请求 clist 接口，只取 f3 (涨跌幅)。
    /// 2. 已取满 `total` 或遇到空页时停止。
    async fn fetch_spot_changes(&self) -> Result<Vec<f64>, MarketError> {
        let mut changes = Vec::new();
        let mut seen = 0usize;

        for page in 1..=MAX_PAGES {
            let query = [
                ("pn", page.to_string()),
                ("pz", self.page_size.to_string()),
                ("po", "1".to_string()),
                ("np", "1".to_string()),
                ("fltt", "2".to_string()),
                ("invt", "2".to_string()),
                ("fid", "f3".to_string()),
                ("fs", A_SHARE_FS.to_string()),
                ("fields", "f3".to_string()),
            ];
            let resp: ClistResponse = self.get_json(CLIST_URL, &query).await?;
            let Some(data) = resp.data else {
                break;
            };
            if data.diff.is_empty() {
                break;
            }

            seen += data.diff.len();
            changes.extend(data.diff.iter().filter_map(|row| value_as_f64(&row.f3)));
            if seen >= data.total {
                break;
            }
        }

        if changes.is_empty() {
            return Err(MarketError::NotFound);
        }
        debug!(stocks = changes.len(), "fetched eastmoney spot changes");
        Ok(changes)
    }

    /// 查询涨停池或炸板池在某日的家数
    async fn fetch_pool_size(&self, url: &str, date: NaiveDate) -> Result<u32, MarketError> {
        let query = [
            ("ut", PUSH2EX_UT.to_string()),
            ("dpt", "wz.ztzt".to_string()),
            ("Pageindex", "0".to_string()),
            ("pagesize", "1".to_string()),
            ("sort", "fbt:asc".to_string()),
            ("date", date.format("%Y%m%d").to_string()),
        ];
        let resp: PoolResponse = self.get_json(url, &query).await?;
        Ok(resp.data.map(|d| d.tc).unwrap_or(0))
    }

    /// # Summary
    /// 计算指定交易日的炸板率。
    ///
    /// # Returns
    /// 任一池查询失败或两池皆空时返回 None。
    async fn fetch_bust_rate(&self, date: NaiveDate) -> Option<f64> {
        let limit_up_pool = match self.fetch_pool_size(ZT_POOL_URL, date).await {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "limit-up pool unavailable, bust rate skipped");
                return None;
            }
        };
        let broken_pool = match self.fetch_pool_size(ZB_POOL_URL, date).await {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "broken-limit pool unavailable, bust rate skipped");
                return None;
            }
        };
        bust_rate(limit_up_pool, broken_pool)
    }
}

/// 指数代码转换为 secid（上证 1.，深证 0.）
fn secid(index: &IndexCode) -> String {
    let market = match index.exchange {
        Exchange::Sh => "1",
        Exchange::Sz => "0",
    };
    format!("{}.{}", market, index.code)
}

/// # Summary
/// 解析 push2his 返回的 K 线字符串。
///
/// # Logic
/// 1. 每行格式为 `日期,开盘,收盘,最高,最低,成交量,成交额,...`。
/// 2. 任一字段解析失败即整体返回 `MarketError::Parse`。
/// 3. 结果按日期升序。
pub fn parse_klines(lines: &[String]) -> Result<Vec<IndexBar>, MarketError> {
    let mut bars = Vec::with_capacity(lines.len());
    for line in lines {
        let parts: Vec<&str> = line.split(',').collect();
        if parts.len() < 6 {
            return Err(MarketError::Parse(format!("Malformed kline: {}", line)));
        }
        let date = NaiveDate::parse_from_str(parts[0], "%Y-%m-%d")
            .map_err(|e| MarketError::Parse(format!("{}: {}", parts[0], e)))?;
        let price = |raw: &str| {
            raw.parse::<f64>()
                .map_err(|e| MarketError::Parse(format!("{}: {}", raw, e)))
        };
        bars.push(IndexBar {
            date,
            open: price(parts[1])?,
            close: price(parts[2])?,
            high: price(parts[3])?,
            low: price(parts[4])?,
            volume: parse_volume(parts[5])
                .ok_or_else(|| MarketError::Parse(format!("Bad volume: {}", parts[5])))?,
        });
    }
    bars.sort_by_key(|b| b.date);
    Ok(bars)
}

/// # Summary
/// 解析 datacenter 北向资金历史记录。
///
/// # Logic
/// 1. `NET_DEAL_AMT` 单位为百万元，除以 100 转换为亿元。
/// 2. 接口在停止披露后返回空值，此类行被跳过。
/// 3. 结果按日期降序。
fn parse_north_rows(rows: Vec<NorthRow>) -> Result<Vec<NorthFlowDay>, MarketError> {
    let mut flows = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(amount) = row.net_deal_amt.filter(|v| v.is_finite()) else {
            continue;
        };
        let day = row.trade_date.get(..10).unwrap_or(&row.trade_date);
        let date = NaiveDate::parse_from_str(day, "%Y-%m-%d")
            .map_err(|e| MarketError::Parse(format!("{}: {}", row.trade_date, e)))?;
        flows.push(NorthFlowDay {
            date,
            net_inflow: amount / 100.0,
        });
    }
    flows.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(flows)
}

#[derive(Deserialize, Debug)]
struct KlineResponse {
    data: Option<KlineData>,
}

#[derive(Deserialize, Debug)]
struct KlineData {
    klines: Option<Vec<String>>,
}

#[derive(Deserialize, Debug)]
struct ClistResponse {
    data: Option<ClistData>,
}

#[derive(Deserialize, Debug)]
struct ClistData {
    #[serde(default)]
    total: usize,
    #[serde(default)]
    diff: Vec<ClistRow>,
}

#[derive(Deserialize, Debug)]
struct ClistRow {
    // 涨跌幅（百分比），停牌时为 "-"
    #[serde(default)]
    f3: Value,
}

#[derive(Deserialize, Debug)]
struct DatacenterResponse {
    #[serde(default)]
    success: bool,
    message: Option<String>,
    result: Option<DatacenterResult>,
}

#[derive(Deserialize, Debug)]
struct DatacenterResult {
    #[serde(default)]
    data: Vec<NorthRow>,
}

#[derive(Deserialize, Debug)]
struct NorthRow {
    #[serde(rename = "TRADE_DATE")]
    trade_date: String,
    #[serde(rename = "NET_DEAL_AMT")]
    net_deal_amt: Option<f64>,
}

#[derive(Deserialize, Debug)]
struct PoolResponse {
    data: Option<PoolData>,
}

#[derive(Deserialize, Debug)]
struct PoolData {
    #[serde(default)]
    tc: u32,
}

#[async_trait]
impl MarketDataSource for EastmoneyProvider {
    fn name(&self) -> &str {
        "eastmoney"
    }

    /// # Summary
    /// 从 push2his 抓取指数日线。
    ///
    /// # Logic
    /// 1. 按 secid 请求不复权日线，`lmt` 限制条数。
    /// 2. 解析 K 线字符串并截取最近 `days` 根。
    async fn fetch_index_bars(
        &self,
        index: &IndexCode,
        days: usize,
    ) -> Result<Vec<IndexBar>, MarketError> {
        let query = [
            ("secid", secid(index)),
            ("klt", "101".to_string()),
            ("fqt", "0".to_string()),
            ("lmt", days.to_string()),
            ("end", "20500101".to_string()),
            ("fields1", "f1,f2,f3,f4,f5,f6".to_string()),
            ("fields2", "f51,f52,f53,f54,f55,f56,f57".to_string()),
        ];
        let resp: KlineResponse = self.get_json(KLINE_URL, &query).await?;
        let lines = resp
            .data
            .and_then(|d| d.klines)
            .ok_or(MarketError::NotFound)?;

        let bars = parse_klines(&lines)?;
        let start = bars.len().saturating_sub(days);
        debug!(index = %index, bars = bars.len() - start, "fetched eastmoney klines");
        Ok(bars[start..].to_vec())
    }

    /// # Summary
    /// 从 datacenter 抓取北向资金逐日净买额。
    ///
    /// # Returns
    /// 全部为空值时返回 `NotFound`，交由回退链读取本地缓存。
    async fn fetch_north_flows(&self, days: usize) -> Result<Vec<NorthFlowDay>, MarketError> {
        let query = [
            ("reportName", "RPT_MUTUAL_DEAL_HISTORY".to_string()),
            ("columns", "ALL".to_string()),
            ("filter", NORTHBOUND_FILTER.to_string()),
            ("sortColumns", "TRADE_DATE".to_string()),
            ("sortTypes", "-1".to_string()),
            ("pageSize", days.to_string()),
            ("pageNumber", "1".to_string()),
            ("source", "WEB".to_string()),
            ("client", "WEB".to_string()),
        ];
        let resp: DatacenterResponse = self.get_json(DATACENTER_URL, &query).await?;
        if !resp.success {
            return Err(MarketError::Unknown(
                resp.message.unwrap_or_else(|| "datacenter request failed".to_string()),
            ));
        }

        let rows = resp.result.map(|r| r.data).unwrap_or_default();
        let mut flows = parse_north_rows(rows)?;
        flows.truncate(days);
        if flows.is_empty() {
            return Err(MarketError::NotFound);
        }
        Ok(flows)
    }

    /// # Summary
    /// 统计全市场涨跌停家数与炸板率。
    ///
    /// # Logic
    /// 1. 分页抓取全市场涨跌幅并按阈值计数。
    /// 2. 查询涨停池与炸板池计算炸板率，失败时为 None。
    async fn fetch_limit_stats(&self, date: NaiveDate) -> Result<LimitStats, MarketError> {
        let changes = self.fetch_spot_changes().await?;
        let (limit_up, limit_down) = count_limits(&changes, self.limit_threshold_pct);
        let bust_rate = self.fetch_bust_rate(date).await;
        Ok(LimitStats {
            limit_up,
            limit_down,
            bust_rate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secid_mapping() {
        assert_eq!(secid(&"sh000300".parse().unwrap()), "1.000300");
        assert_eq!(secid(&"sz399006".parse().unwrap()), "0.399006");
    }

    #[test]
    fn test_parse_klines_field_order() {
        let lines = vec![
            "2026-10-16,3990.10,4001.55,4010.00,3980.20,152345678,3.2e11".to_string(),
            "2026-10-15,3970.00,3989.00,3995.50,3960.00,140000000,3.0e11".to_string(),
        ];
        let bars = parse_klines(&lines).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2026, 10, 15).unwrap());
        assert_eq!(bars[1].open, 3990.10);
        assert_eq!(bars[1].close, 4001.55);
        assert_eq!(bars[1].high, 4010.00);
        assert_eq!(bars[1].low, 3980.20);
        assert_eq!(bars[1].volume, 152_345_678);
    }

    #[test]
    fn test_parse_klines_rejects_garbage() {
        let lines = vec!["2026-10-16,abc,1,1,1,1".to_string()];
        assert!(matches!(parse_klines(&lines), Err(MarketError::Parse(_))));
        let short = vec!["2026-10-16,1,2".to_string()];
        assert!(parse_klines(&short).is_err());
    }

    #[test]
    fn test_parse_north_rows_converts_units_and_skips_nulls() {
        let payload = r#"[
            {"TRADE_DATE": "2024-08-15 00:00:00", "NET_DEAL_AMT": 1234.0},
            {"TRADE_DATE": "2024-08-16 00:00:00", "NET_DEAL_AMT": null},
            {"TRADE_DATE": "2024-08-14 00:00:00", "NET_DEAL_AMT": -500.0}
        ]"#;
        let rows: Vec<NorthRow> = serde_json::from_str(payload).unwrap();
        let flows = parse_north_rows(rows).unwrap();
        assert_eq!(flows.len(), 2);
        assert_eq!(flows[0].date, NaiveDate::from_ymd_opt(2024, 8, 15).unwrap());
        assert!((flows[0].net_inflow - 12.34).abs() < 1e-9);
        assert!((flows[1].net_inflow + 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_clist_payload_with_suspended_stock() {
        let payload = r#"{"data": {"total": 3, "diff": [{"f3": 10.02}, {"f3": "-"}, {"f3": -9.95}]}}"#;
        let resp: ClistResponse = serde_json::from_str(payload).unwrap();
        let data = resp.data.unwrap();
        let changes: Vec<f64> = data.diff.iter().filter_map(|r| value_as_f64(&r.f3)).collect();
        assert_eq!(changes, vec![10.02, -9.95]);
        assert_eq!(count_limits(&changes, 9.9), (1, 1));
    }
}
