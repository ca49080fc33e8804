use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// # Summary
/// 单个交易日的指数日线数据实体。
///
/// # Invariants
/// - 序列按 `date` 升序排列（最旧在前），停牌/休市日直接缺失，不做零填充。
/// - 抓取后不可变。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexBar {
    // 交易日
    pub date: NaiveDate,
    // 开盘价
    pub open: f64,
    // 最高价
    pub high: f64,
    // 最低价
    pub low: f64,
    // 收盘价
    pub close: f64,
    // 成交量
    pub volume: u64,
}

/// # Summary
/// 外部数据字段的显式可用性标记。
///
/// # Invariants
/// - `Unavailable` 与真实的零值必须可区分，直到评分阶段才按回退策略转换。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum Field<T> {
    // 数据源成功提供的值
    Present(T),
    // 所有数据源都未能提供
    #[default]
    Unavailable,
}

impl<T: Copy> Field<T> {
    /// 若字段可用则返回其值
    pub fn value(&self) -> Option<T> {
        match self {
            Field::Present(v) => Some(*v),
            Field::Unavailable => None,
        }
    }

    /// 字段是否可用
    pub fn is_present(&self) -> bool {
        matches!(self, Field::Present(_))
    }

    /// 字段不可用时使用给定的回退值
    pub fn or(&self, fallback: T) -> T {
        self.value().unwrap_or(fallback)
    }
}

impl<T> From<Option<T>> for Field<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Field::Present(v),
            None => Field::Unavailable,
        }
    }
}

/// # Summary
/// 单个交易日的北向资金净流入。
///
/// # Invariants
/// - `net_inflow` 单位为亿元，正数表示净流入。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NorthFlowDay {
    // 交易日
    pub date: NaiveDate,
    // 当日净流入（亿元）
    pub net_inflow: f64,
}

/// # Summary
/// 全市场涨跌停统计，由数据源一次性返回。
///
/// # Invariants
/// - `bust_rate` 若存在必须落在 [0, 1]；实时行情接口无法提供时为 None。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LimitStats {
    // 涨停家数
    pub limit_up: u32,
    // 跌停家数
    pub limit_down: u32,
    // 炸板率
    pub bust_rate: Option<f64>,
}

/// # Summary
/// 某一时刻的全市场宽度快照。
///
/// # Invariants
/// - 每个字段独立降级：任一子抓取失败只影响对应字段。
/// - `north_inflow_5d` 单位为亿元，正数表示净流入。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct MarketSnapshot {
    // 近 5 个交易日北向资金净流入合计（亿元）
    pub north_inflow_5d: Field<f64>,
    // 涨停家数
    pub limit_up_count: Field<u32>,
    // 跌停家数
    pub limit_down_count: Field<u32>,
    // 炸板率
    pub bust_rate: Field<f64>,
}

impl MarketSnapshot {
    /// 将一次涨跌停统计写入快照
    pub fn apply_limit_stats(&mut self, stats: LimitStats) {
        self.limit_up_count = Field::Present(stats.limit_up);
        self.limit_down_count = Field::Present(stats.limit_down);
        self.bust_rate = stats.bust_rate.into();
    }
}
