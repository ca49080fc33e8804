use crate::common::IndexCode;
use crate::engine::entity::FallbackPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 最长滚动窗口 (MA60) 所需的最少交易日
pub const MIN_HISTORY_DAYS: usize = 60;

/// 全局应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub monitor: MonitorConfig,
    pub feed: FeedConfig,
    pub fallback: FallbackConfig,
    pub log: LogConfig,
}

/// 编排器的三个构造参数与输出文件位置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub index_symbol: String,
    pub days: usize,
    pub north_csv_path: PathBuf,
    pub output_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub timeout_secs: u64,
    // 涨跌停判定阈值（百分比）
    pub limit_threshold_pct: f64,
    // 全市场行情分页大小
    pub page_size: usize,
}

/// 外部字段不可用时的回退值
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FallbackConfig {
    pub north_inflow: f64,
    pub limit_up: u32,
    pub limit_down: u32,
    pub bust_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    // 日志目录，为空时只输出到终端
    pub dir: Option<PathBuf>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            index_symbol: "sh000300".to_string(),
            days: MIN_HISTORY_DAYS,
            north_csv_path: PathBuf::from("beixiangzijin.csv"),
            output_path: PathBuf::from("A股指数环境每日监测.csv"),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            limit_threshold_pct: 9.9,
            page_size: 100,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
        }
    }
}

impl MonitorConfig {
    /// 解析配置中的指数代码
    pub fn index_code(&self) -> Result<IndexCode, String> {
        self.index_symbol.parse()
    }
}

impl FallbackConfig {
    /// # Summary
    /// 转换为评分阶段使用的回退策略。
    ///
    /// # Logic
    /// 全部为零时等价于 `FallbackPolicy::Zero`。
    pub fn policy(&self) -> FallbackPolicy {
        if self.north_inflow == 0.0
            && self.limit_up == 0
            && self.limit_down == 0
            && self.bust_rate == 0.0
        {
            FallbackPolicy::Zero
        } else {
            FallbackPolicy::Values {
                north_inflow: self.north_inflow,
                limit_up: self.limit_up,
                limit_down: self.limit_down,
                bust_rate: self.bust_rate,
            }
        }
    }
}

impl AppConfig {
    /// # Summary
    /// 校验配置的合法性。
    ///
    /// # Logic
    /// 1. 指数代码必须可解析。
    /// 2. `days` 不得小于最长滚动窗口，否则最新一行永远无法填满。
    /// 3. 回退炸板率必须落在 [0, 1]。
    pub fn validate(&self) -> Result<(), String> {
        self.monitor.index_code()?;
        if self.monitor.days < MIN_HISTORY_DAYS {
            return Err(format!(
                "monitor.days must be at least {}, got {}",
                MIN_HISTORY_DAYS, self.monitor.days
            ));
        }
        if !(0.0..=1.0).contains(&self.fallback.bust_rate) {
            return Err(format!(
                "fallback.bust_rate must be within [0, 1], got {}",
                self.fallback.bust_rate
            ));
        }
        if self.feed.page_size == 0 {
            return Err("feed.page_size must be positive".to_string());
        }
        Ok(())
    }
}
