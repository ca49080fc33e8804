use chrono::NaiveDate;
use tracing::debug;
use zeshi_core::engine::error::EngineError;
use zeshi_core::market::entity::IndexBar;

/// 短期均线窗口
pub const MA_SHORT: usize = 5;
/// 中期均线窗口，同时用于均量与波动率
pub const MA_MID: usize = 20;
/// 长期均线窗口，也是最长的滚动窗口
pub const MA_LONG: usize = 60;

/// # Summary
/// 与单根日线对齐的派生指标行。
///
/// # Invariants
/// - 窗口未填满之前对应字段为 `None`，不做前向填充或插值。
/// - 只有 `is_fully_populated()` 为真的行才能进入评分。
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedRow {
    pub date: NaiveDate,
    pub close: f64,
    pub volume: u64,
    pub ma5: Option<f64>,
    pub ma20: Option<f64>,
    pub ma60: Option<f64>,
    pub ma5_slope: Option<f64>,
    pub ma20_slope: Option<f64>,
    pub vol_ma5: Option<f64>,
    pub vol_ma20: Option<f64>,
    // 量比 = 当日成交量 / 20 日均量
    pub volume_ratio: Option<f64>,
    // 20 日收盘价样本标准差
    pub volatility: Option<f64>,
    // 收盘价涨跌幅
    pub pct_change: Option<f64>,
}

impl DerivedRow {
    /// 所有派生字段是否均已就绪
    pub fn is_fully_populated(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// 列出尚未就绪的字段名
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("MA5", self.ma5),
            ("MA20", self.ma20),
            ("MA60", self.ma60),
            ("MA5_slope", self.ma5_slope),
            ("MA20_slope", self.ma20_slope),
            ("VOL_MA5", self.vol_ma5),
            ("VOL_MA20", self.vol_ma20),
            ("volume_ratio", self.volume_ratio),
            ("volatility", self.volatility),
            ("pct_change", self.pct_change),
        ]
        .into_iter()
        .filter(|(_, v)| !v.is_some_and(f64::is_finite))
        .map(|(name, _)| name)
        .collect()
    }
}

/// # Summary
/// 与输入日线等长、按日期对齐的派生指标序列。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DerivedSeries {
    rows: Vec<DerivedRow>,
}

impl DerivedSeries {
    pub fn rows(&self) -> &[DerivedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// # Summary
    /// 取最新一行，且要求其所有字段均已就绪。
    ///
    /// # Logic
    /// 1. 序列短于最长窗口时返回 `InsufficientHistory`。
    /// 2. 最新一行仍有未就绪字段（例如 20 日均量为 0 导致量比无定义）时返回 `DegenerateData`。
    ///
    /// # Returns
    /// 最新的完整行引用。
    pub fn latest_populated(&self) -> Result<&DerivedRow, EngineError> {
        let insufficient = EngineError::InsufficientHistory {
            required: MA_LONG,
            available: self.rows.len(),
        };
        if self.rows.len() < MA_LONG {
            return Err(insufficient);
        }
        let latest = self.rows.last().ok_or(insufficient)?;
        let missing = latest.missing_fields();
        if !missing.is_empty() {
            return Err(EngineError::DegenerateData(format!(
                "latest row {} has undefined fields: {}",
                latest.date,
                missing.join(", ")
            )));
        }
        Ok(latest)
    }

    /// 窗口内已就绪波动率的均值，跳过未就绪的行
    pub fn mean_volatility(&self) -> Option<f64> {
        let values: Vec<f64> = self.rows.iter().filter_map(|r| r.volatility).collect();
        if values.is_empty() {
            return None;
        }
        Some(values.iter().sum::<f64>() / len_f64(values.len()))
    }
}

/// # Summary
/// 截取最近 `days` 根日线，保持升序。
pub fn trailing(bars: &[IndexBar], days: usize) -> &[IndexBar] {
    let start = bars.len().saturating_sub(days);
    &bars[start..]
}

/// # Summary
/// 由升序日线计算派生指标序列（纯函数）。
///
/// # Logic
/// 1. 对收盘价计算 5/20/60 日右对齐简单均线，并取一阶差分得到斜率。
/// 2. 对成交量计算 5/20 日均量及量比。
/// 3. 计算 20 日收盘价样本标准差作为波动率。
/// 4. 计算逐日涨跌幅。
///
/// # Arguments
/// * `bars`: 按日期升序的指数日线。
///
/// # Returns
/// 与输入等长的 `DerivedSeries`。
pub fn compute(bars: &[IndexBar]) -> DerivedSeries {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volumes: Vec<f64> = bars.iter().map(|b| volume_f64(b.volume)).collect();

    let ma5 = rolling_mean(&closes, MA_SHORT);
    let ma20 = rolling_mean(&closes, MA_MID);
    let ma60 = rolling_mean(&closes, MA_LONG);
    let ma5_slope = diff(&ma5);
    let ma20_slope = diff(&ma20);
    let vol_ma5 = rolling_mean(&volumes, MA_SHORT);
    let vol_ma20 = rolling_mean(&volumes, MA_MID);
    let volatility = rolling_std(&closes, MA_MID);

    let rows = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let volume_ratio = vol_ma20[i]
                .filter(|avg| *avg != 0.0)
                .map(|avg| volumes[i] / avg);
            let pct_change = if i == 0 {
                None
            } else {
                let prev = closes[i - 1];
                (prev != 0.0).then(|| bar.close / prev - 1.0)
            };

            DerivedRow {
                date: bar.date,
                close: bar.close,
                volume: bar.volume,
                ma5: ma5[i],
                ma20: ma20[i],
                ma60: ma60[i],
                ma5_slope: ma5_slope[i],
                ma20_slope: ma20_slope[i],
                vol_ma5: vol_ma5[i],
                vol_ma20: vol_ma20[i],
                volume_ratio,
                volatility: volatility[i],
                pct_change,
            }
        })
        .collect();

    let series = DerivedSeries { rows };
    if let Some(last) = series.rows.last() {
        debug!(
            date = %last.date,
            ma5 = ?last.ma5,
            ma20 = ?last.ma20,
            ma60 = ?last.ma60,
            volume_ratio = ?last.volume_ratio,
            volatility = ?last.volatility,
            "Computed indicator series of {} rows",
            series.rows.len()
        );
    }
    series
}

/// 右对齐滚动均值，前 `window - 1` 个位置为 None
fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            let slice = &values[i + 1 - window..=i];
            Some(slice.iter().sum::<f64>() / len_f64(window))
        })
        .collect()
}

/// 右对齐滚动样本标准差 (分母 n - 1)
fn rolling_std(values: &[f64], window: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if window < 2 || i + 1 < window {
                return None;
            }
            let slice = &values[i + 1 - window..=i];
            let mean = slice.iter().sum::<f64>() / len_f64(window);
            let var = slice.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / len_f64(window - 1);
            Some(var.sqrt())
        })
        .collect()
}

/// 一阶差分，任一侧缺失则为 None
fn diff(values: &[Option<f64>]) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if i == 0 {
                return None;
            }
            match (values[i], values[i - 1]) {
                (Some(cur), Some(prev)) => Some(cur - prev),
                _ => None,
            }
        })
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn len_f64(n: usize) -> f64 {
    n as f64
}

#[allow(clippy::cast_precision_loss)]
fn volume_f64(volume: u64) -> f64 {
    volume as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_mean_alignment() {
        let out = rolling_mean(&[1.0, 2.0, 3.0, 4.0], 3);
        assert_eq!(out, vec![None, None, Some(2.0), Some(3.0)]);
    }

    #[test]
    fn test_rolling_std_uses_sample_denominator() {
        let out = rolling_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0], 8);
        let std = out[7].unwrap();
        // 样本标准差 sqrt(32 / 7)
        assert!((std - (32.0_f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_diff_propagates_missing() {
        let out = diff(&[None, Some(1.0), Some(3.0)]);
        assert_eq!(out, vec![None, None, Some(2.0)]);
    }
}
