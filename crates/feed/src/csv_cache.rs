use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use zeshi_core::market::entity::NorthFlowDay;
use zeshi_core::market::error::MarketError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const DATE_COLUMN: &str = "日期";
const INFLOW_COLUMN: &str = "当日资金流入";
const NET_BUY_COLUMN: &str = "当日成交净买额";
const BUY_COLUMN: &str = "买入成交额";
const SELL_COLUMN: &str = "卖出成交额";
// 净买额与买卖成交额以万元记账
const WAN_PER_YI: f64 = 10_000.0;

/// 缓存文件中净流入的记账方式
enum InflowLayout {
    // 当日资金流入，亿元
    Yi(usize),
    // 当日成交净买额，万元
    NetBuyWan(usize),
    // 买入成交额 - 卖出成交额，万元
    BuySellWan(usize, usize),
}

/// # Summary
/// 北向资金本地 CSV 缓存。
///
/// # Invariants
/// - 写出的文件为 UTF-8 BOM 编码，表头固定为 `日期,当日资金流入`（亿元），按日期降序。
/// - 同一日期只保留一行，合并时以新数据为准。
/// - 读取兼容 `当日成交净买额` 或 `买入成交额/卖出成交额`（万元）格式的历史文件。
#[derive(Debug, Clone)]
pub struct NorthboundCsvCache {
    path: PathBuf,
}

impl NorthboundCsvCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// # Summary
    /// 读取缓存中的全部记录。
    ///
    /// # Logic
    /// 1. 文件不存在返回 `NotFound`，缺少日期列返回 `Cache`。
    /// 2. 按表头识别净流入记账方式并统一换算为亿元。
    /// 3. 数值无法解析的行跳过，同日期保留文件中靠后的一行。
    ///
    /// # Returns
    /// 按日期降序的逐日净流入。
    pub fn load(&self) -> Result<Vec<NorthFlowDay>, MarketError> {
        if !self.path.exists() {
            return Err(MarketError::NotFound);
        }
        let bytes = fs::read(&self.path).map_err(|e| MarketError::Cache(e.to_string()))?;
        let content = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes);

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(content);
        let headers = reader
            .headers()
            .map_err(|e| MarketError::Cache(e.to_string()))?
            .clone();

        let date_idx = column(&headers, DATE_COLUMN).ok_or_else(|| {
            MarketError::Cache(format!("{} 缺少 {} 列", self.path.display(), DATE_COLUMN))
        })?;
        let layout = detect_layout(&headers).ok_or_else(|| {
            MarketError::Cache(format!("{} 缺少资金流入列", self.path.display()))
        })?;

        let mut by_date = BTreeMap::new();
        for record in reader.records() {
            let record = record.map_err(|e| MarketError::Cache(e.to_string()))?;
            let Some(date) = record.get(date_idx).and_then(parse_date) else {
                warn!(row = ?record, "skipping northbound row with bad date");
                continue;
            };
            match inflow_of(&record, &layout) {
                Some(net_inflow) => {
                    by_date.insert(date, net_inflow);
                }
                None => debug!(%date, "skipping northbound row without inflow"),
            }
        }

        Ok(by_date
            .into_iter()
            .rev()
            .map(|(date, net_inflow)| NorthFlowDay { date, net_inflow })
            .collect())
    }

    /// # Summary
    /// 读取最近 `days` 条记录。
    ///
    /// # Returns
    /// 缓存为空时返回 `NotFound`。
    pub fn recent(&self, days: usize) -> Result<Vec<NorthFlowDay>, MarketError> {
        let mut flows = self.load()?;
        flows.truncate(days);
        if flows.is_empty() {
            return Err(MarketError::NotFound);
        }
        Ok(flows)
    }

    /// # Summary
    /// 将新抓取的记录合并写入缓存。
    ///
    /// # Logic
    /// 1. 读取已有记录（文件不存在视为空）。
    /// 2. 按日期去重，新记录覆盖旧记录。
    /// 3. 按日期降序整体重写，带 BOM 与标准表头。
    pub fn save(&self, flows: &[NorthFlowDay]) -> Result<(), MarketError> {
        let existing = match self.load() {
            Ok(rows) => rows,
            Err(MarketError::NotFound) => Vec::new(),
            Err(e) => return Err(e),
        };

        let mut by_date: BTreeMap<NaiveDate, f64> =
            existing.iter().map(|f| (f.date, f.net_inflow)).collect();
        for flow in flows.iter().filter(|f| f.net_inflow.is_finite()) {
            by_date.insert(flow.date, flow.net_inflow);
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| MarketError::Cache(e.to_string()))?;
        }
        let mut file = File::create(&self.path).map_err(|e| MarketError::Cache(e.to_string()))?;
        file.write_all(UTF8_BOM)
            .map_err(|e| MarketError::Cache(e.to_string()))?;

        let mut writer = WriterBuilder::new().from_writer(file);
        writer
            .write_record([DATE_COLUMN, INFLOW_COLUMN])
            .map_err(|e| MarketError::Cache(e.to_string()))?;
        for (date, inflow) in by_date.iter().rev() {
            writer
                .write_record([date.format("%Y-%m-%d").to_string(), inflow.to_string()])
                .map_err(|e| MarketError::Cache(e.to_string()))?;
        }
        writer
            .flush()
            .map_err(|e| MarketError::Cache(e.to_string()))?;

        info!(
            path = %self.path.display(),
            rows = by_date.len(),
            "northbound cache saved"
        );
        Ok(())
    }
}

fn column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim() == name)
}

fn detect_layout(headers: &StringRecord) -> Option<InflowLayout> {
    if let Some(idx) = column(headers, INFLOW_COLUMN) {
        return Some(InflowLayout::Yi(idx));
    }
    if let Some(idx) = column(headers, NET_BUY_COLUMN) {
        return Some(InflowLayout::NetBuyWan(idx));
    }
    match (column(headers, BUY_COLUMN), column(headers, SELL_COLUMN)) {
        (Some(buy), Some(sell)) => Some(InflowLayout::BuySellWan(buy, sell)),
        _ => None,
    }
}

fn number(record: &StringRecord, idx: usize) -> Option<f64> {
    record
        .get(idx)
        .and_then(|raw| raw.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

fn inflow_of(record: &StringRecord, layout: &InflowLayout) -> Option<f64> {
    match *layout {
        InflowLayout::Yi(idx) => number(record, idx),
        InflowLayout::NetBuyWan(idx) => number(record, idx).map(|v| v / WAN_PER_YI),
        InflowLayout::BuySellWan(buy, sell) => {
            Some((number(record, buy)? - number(record, sell)?) / WAN_PER_YI)
        }
    }
}

/// 兼容 `2024-08-16`、`2024/08/16` 与带时间部分的日期
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.trim();
    let day = day.get(..10).unwrap_or(day);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(day, "%Y/%m/%d"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 8, 16);
        assert_eq!(parse_date("2024-08-16"), expected);
        assert_eq!(parse_date("2024/08/16"), expected);
        assert_eq!(parse_date("2024-08-16 00:00:00"), expected);
        assert_eq!(parse_date("16/08/2024"), None);
    }
}
