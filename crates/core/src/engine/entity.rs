use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// # Summary
/// 四个因子族的得分，每次运行由最新一行指标与市场快照推导，不单独持久化。
///
/// # Invariants
/// - `funding` 落在 [1, 5]，`sentiment` 落在 [0, 5]。
/// - `technical` 只取 {1, 2, 3, 4, 5}，`volatility` 只取 {2, 4, 5}。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorScores {
    // 资金面得分
    pub funding: f64,
    // 情绪面得分
    pub sentiment: f64,
    // 技术面得分
    pub technical: f64,
    // 波动率得分
    pub volatility: f64,
}

/// # Summary
/// 市场环境等级，由综合得分按阈值带映射。
///
/// # Invariants
/// - 六个等级穷尽实数轴，不存在"无法分类"的结果。
/// - 序列化形式为中文名称，与监测文件中的取值一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegimeLabel {
    #[serde(rename = "主升浪")]
    PrimaryUptrend,
    #[serde(rename = "震荡向上")]
    OscillatingUp,
    #[serde(rename = "震荡")]
    Oscillating,
    #[serde(rename = "弱势震荡")]
    WeakOscillating,
    #[serde(rename = "震荡向下")]
    OscillatingDown,
    #[serde(rename = "单边下跌")]
    OneSidedDecline,
}

impl RegimeLabel {
    /// 中文名称
    pub fn name(&self) -> &'static str {
        match self {
            RegimeLabel::PrimaryUptrend => "主升浪",
            RegimeLabel::OscillatingUp => "震荡向上",
            RegimeLabel::Oscillating => "震荡",
            RegimeLabel::WeakOscillating => "弱势震荡",
            RegimeLabel::OscillatingDown => "震荡向下",
            RegimeLabel::OneSidedDecline => "单边下跌",
        }
    }

    /// # Summary
    /// 该环境下的建议仓位区间。
    ///
    /// # Returns
    /// 面向人的仓位建议文本，仅用于控制台报告。
    pub fn position_advice(&self) -> &'static str {
        match self {
            RegimeLabel::PrimaryUptrend => "建议 仓位 80%-100%",
            RegimeLabel::OscillatingUp => "建议 仓位 60%-80%",
            RegimeLabel::Oscillating => "建议 仓位 30%-60%",
            RegimeLabel::WeakOscillating => "建议 仓位 10%-30%",
            RegimeLabel::OscillatingDown => "建议 仓位 0%-20%，以防守为主",
            RegimeLabel::OneSidedDecline => "建议 空仓或极低仓位，等待右侧信号",
        }
    }
}

impl std::fmt::Display for RegimeLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// # Summary
/// 持久化单元：一次监测运行的完整结果。
///
/// # Invariants
/// - 每次运行只产生一条，追加写入后不再修改或删除。
/// - 字段顺序即监测文件的列顺序。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    // 运行日期
    pub date: NaiveDate,
    // 资金面得分
    pub funding_score: f64,
    // 情绪面得分
    pub sentiment_score: f64,
    // 技术面得分
    pub technical_score: f64,
    // 波动率得分
    pub volatility_score: f64,
    // 综合得分
    pub composite_score: f64,
    // 市场环境
    pub regime_label: RegimeLabel,
}

impl RunRecord {
    /// 由得分、综合分与环境等级组装记录
    pub fn new(date: NaiveDate, scores: FactorScores, composite: f64, label: RegimeLabel) -> Self {
        Self {
            date,
            funding_score: scores.funding,
            sentiment_score: scores.sentiment,
            technical_score: scores.technical,
            volatility_score: scores.volatility,
            composite_score: composite,
            regime_label: label,
        }
    }
}

/// # Summary
/// 编排器的运行阶段，只能单向推进。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RunStage {
    Created,
    DataFetched,
    Scored,
    Classified,
}

impl std::fmt::Display for RunStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunStage::Created => "Created",
            RunStage::DataFetched => "DataFetched",
            RunStage::Scored => "Scored",
            RunStage::Classified => "Classified",
        };
        f.write_str(name)
    }
}

/// # Summary
/// 外部字段不可用时的显式回退策略。
///
/// # Invariants
/// - `Zero` 与原有行为一致：所有不可用字段按 0 计分。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum FallbackPolicy {
    #[default]
    Zero,
    Values {
        north_inflow: f64,
        limit_up: u32,
        limit_down: u32,
        bust_rate: f64,
    },
}

impl FallbackPolicy {
    /// 北向资金不可用时的取值
    pub fn north_inflow(&self) -> f64 {
        match self {
            FallbackPolicy::Zero => 0.0,
            FallbackPolicy::Values { north_inflow, .. } => *north_inflow,
        }
    }

    /// 涨停家数不可用时的取值
    pub fn limit_up(&self) -> u32 {
        match self {
            FallbackPolicy::Zero => 0,
            FallbackPolicy::Values { limit_up, .. } => *limit_up,
        }
    }

    /// 跌停家数不可用时的取值
    pub fn limit_down(&self) -> u32 {
        match self {
            FallbackPolicy::Zero => 0,
            FallbackPolicy::Values { limit_down, .. } => *limit_down,
        }
    }

    /// 炸板率不可用时的取值
    pub fn bust_rate(&self) -> f64 {
        match self {
            FallbackPolicy::Zero => 0.0,
            FallbackPolicy::Values { bust_rate, .. } => *bust_rate,
        }
    }
}
