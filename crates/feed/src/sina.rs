use crate::client::{build_client, parse_volume, value_as_f64};
use crate::limits::count_limits;
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use reqwest::header::REFERER;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use zeshi_core::common::IndexCode;
use zeshi_core::config::FeedConfig;
use zeshi_core::market::entity::{IndexBar, LimitStats};
use zeshi_core::market::error::MarketError;
use zeshi_core::market::port::MarketDataSource;

const KLINE_URL: &str = "https://money.finance.sina.com.cn/quotes_service/api/json_v2.php/CN_MarketData.getKLineData";
const HQ_NODE_URL: &str = "https://vip.stock.finance.sina.com.cn/quotes_service/api/json_v2.php/Market_Center.getHQNodeData";
const SINA_REFERER: &str = "https://finance.sina.com.cn/";
const MAX_PAGES: usize = 200;

/// # Summary
/// 新浪财经行情提供者，作为备用数据源。
///
/// # Invariants
/// - 不提供北向资金与炸板率，对应请求返回 `Unsupported` / None。
#[derive(Clone)]
pub struct SinaProvider {
    client: Client,
    page_size: usize,
    limit_threshold_pct: f64,
}

impl SinaProvider {
    pub fn new(config: &FeedConfig) -> Result<Self, MarketError> {
        Ok(Self {
            client: build_client(Duration::from_secs(config.timeout_secs))?,
            page_size: config.page_size.max(1),
            limit_threshold_pct: config.limit_threshold_pct,
        })
    }

    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, MarketError> {
        let resp = self
            .client
            .get(url)
            .header(REFERER, SINA_REFERER)
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
}

/// 新浪日线，数值字段均为字符串
#[derive(Deserialize, Debug)]
struct SinaKline {
    day: String,
    open: String,
    high: String,
    low: String,
    close: String,
    volume: String,
}

/// # Summary
/// 解析新浪 K 线 JSON 数组。
///
/// # Logic
/// 1. 接口无数据时返回 `null`，视为 `NotFound`。
/// 2. `day` 可能带时间部分，只取日期。
/// 3. 结果按日期升序。
pub fn parse_klines(payload: Value) -> Result<Vec<IndexBar>, MarketError> {
    if payload.is_null() {
        return Err(MarketError::NotFound);
    }
    let rows: Vec<SinaKline> =
        serde_json::from_value(payload).map_err(|e| MarketError::Parse(e.to_string()))?;

    let price = |raw: &str| {
        raw.trim()
            .parse::<f64>()
            .map_err(|e| MarketError::Parse(format!("{}: {}", raw, e)))
    };

    let mut bars = Vec::with_capacity(rows.len());
    for row in rows {
        let day = row.day.get(..10).unwrap_or(&row.day);
        let date = NaiveDate::parse_from_str(day, "%Y-%m-%d")
            .map_err(|e| MarketError::Parse(format!("{}: {}", row.day, e)))?;
        bars.push(IndexBar {
            date,
            open: price(&row.open)?,
            high: price(&row.high)?,
            low: price(&row.low)?,
            close: price(&row.close)?,
            volume: parse_volume(&row.volume)
                .ok_or_else(|| MarketError::Parse(format!("Bad volume: {}", row.volume)))?,
        });
    }
    bars.sort_by_key(|b| b.date);
    Ok(bars)
}

/// 从一页行情节点数据中提取涨跌幅
fn page_changes(payload: &Value) -> Vec<f64> {
    payload
        .as_array()
        .map(|rows| {
            rows.iter()
                .filter_map(|row| row.get("changepercent").and_then(value_as_f64))
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl MarketDataSource for SinaProvider {
    fn name(&self) -> &str {
        "sina"
    }

    async fn fetch_index_bars(
        &self,
        index: &IndexCode,
        days: usize,
    ) -> Result<Vec<IndexBar>, MarketError> {
        let query = [
            ("symbol", index.to_string()),
            ("scale", "240".to_string()),
            ("ma", "no".to_string()),
            ("datalen", days.to_string()),
        ];
        let payload = self.get_json(KLINE_URL, &query).await?;
        let bars = parse_klines(payload)?;
        let start = bars.len().saturating_sub(days);
        debug!(index = %index, bars = bars.len() - start, "fetched sina klines");
        Ok(bars[start..].to_vec())
    }

    /// # Summary
    /// 分页抓取沪深 A 股涨跌幅并统计涨跌停家数。
    ///
    /// # Logic
    /// 1. 逐页请求 `hs_a` 节点，遇到空页停止。
    /// 2. 按阈值计数，炸板率不可得。
    async fn fetch_limit_stats(&self, _date: NaiveDate) -> Result<LimitStats, MarketError> {
        let mut changes = Vec::new();
        for page in 1..=MAX_PAGES {
            let query = [
                ("page", page.to_string()),
                ("num", self.page_size.to_string()),
                ("sort", "symbol".to_string()),
                ("asc", "1".to_string()),
                ("node", "hs_a".to_string()),
                ("symbol", String::new()),
                ("_s_r_a", "page".to_string()),
            ];
            let payload = self.get_json(HQ_NODE_URL, &query).await?;
            let rows = payload.as_array().map(Vec::len).unwrap_or(0);
            if rows == 0 {
                break;
            }
            changes.extend(page_changes(&payload));
            if rows < self.page_size {
                break;
            }
        }

        if changes.is_empty() {
            return Err(MarketError::NotFound);
        }
        let (limit_up, limit_down) = count_limits(&changes, self.limit_threshold_pct);
        Ok(LimitStats {
            limit_up,
            limit_down,
            bust_rate: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_klines_string_fields() {
        let payload = json!([
            {"day": "2026-10-15", "open": "3970.0", "high": "3995.5", "low": "3960.0", "close": "3989.0", "volume": "14000000000"},
            {"day": "2026-10-16 15:00:00", "open": "3990.1", "high": "4010.0", "low": "3980.2", "close": "4001.55", "volume": "15234567800"}
        ]);
        let bars = parse_klines(payload).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].date, NaiveDate::from_ymd_opt(2026, 10, 16).unwrap());
        assert_eq!(bars[1].close, 4001.55);
        assert_eq!(bars[0].volume, 14_000_000_000);
    }

    #[test]
    fn test_parse_klines_null_is_not_found() {
        assert!(matches!(parse_klines(Value::Null), Err(MarketError::NotFound)));
    }

    #[test]
    fn test_page_changes_skips_missing_values() {
        let payload = json!([
            {"symbol": "sh600000", "changepercent": 10.01},
            {"symbol": "sz000001", "changepercent": "-9.92"},
            {"symbol": "sz000002"}
        ]);
        assert_eq!(page_changes(&payload), vec![10.01, -9.92]);
    }
}
