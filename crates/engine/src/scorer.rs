//! 四个因子族的评分规则与加权综合分。
//!
//! 注意：四个权重之和为 0.70 而非 1.0，综合分因此最高只有 3.5。
//! 该口径沿用至今，尚未确认是有意压缩还是遗漏，未做归一化。

use crate::indicator::DerivedRow;
use tracing::warn;
use zeshi_core::engine::entity::{FactorScores, FallbackPolicy};
use zeshi_core::engine::error::EngineError;
use zeshi_core::market::entity::MarketSnapshot;

/// 资金面权重
pub const WEIGHT_FUNDING: f64 = 0.20;
/// 情绪面权重
pub const WEIGHT_SENTIMENT: f64 = 0.15;
/// 技术面权重
pub const WEIGHT_TECHNICAL: f64 = 0.25;
/// 波动率权重
pub const WEIGHT_VOLATILITY: f64 = 0.10;
/// 权重之和（0.70，未归一化）
pub const WEIGHT_SUM: f64 = WEIGHT_FUNDING + WEIGHT_SENTIMENT + WEIGHT_TECHNICAL + WEIGHT_VOLATILITY;

/// 北向资金强流入阈值（亿元）
const STRONG_INFLOW: f64 = 50.0;
/// 放量阈值
const HIGH_VOLUME_RATIO: f64 = 1.2;
/// 缩量阈值
const LOW_VOLUME_RATIO: f64 = 0.8;
/// 涨跌停差值的缩放分母
const SENTIMENT_SPREAD_DIVISOR: f64 = 50.0;
/// MA20 与 MA60 视为粘合的相对距离
const MA_CONVERGENCE: f64 = 0.02;
/// 波动率偏高的倍数
const ELEVATED_VOLATILITY: f64 = 1.2;

/// # Summary
/// 按回退策略解析后的市场快照数值。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapshotInputs {
    pub north_inflow: f64,
    pub limit_up: u32,
    pub limit_down: u32,
    pub bust_rate: f64,
}

/// # Summary
/// 把快照中不可用的字段按回退策略转为数值。
///
/// # Logic
/// 1. 可用字段原样取值。
/// 2. 不可用字段取策略给定的回退值，并逐字段记录 warn 日志。
pub fn resolve_snapshot(snapshot: &MarketSnapshot, policy: &FallbackPolicy) -> SnapshotInputs {
    let north_inflow = snapshot.north_inflow_5d.value().unwrap_or_else(|| {
        warn!(fallback = policy.north_inflow(), "north_inflow_5d unavailable, using fallback");
        policy.north_inflow()
    });
    let limit_up = snapshot.limit_up_count.value().unwrap_or_else(|| {
        warn!(fallback = policy.limit_up(), "limit_up_count unavailable, using fallback");
        policy.limit_up()
    });
    let limit_down = snapshot.limit_down_count.value().unwrap_or_else(|| {
        warn!(fallback = policy.limit_down(), "limit_down_count unavailable, using fallback");
        policy.limit_down()
    });
    let bust_rate = snapshot.bust_rate.value().unwrap_or_else(|| {
        warn!(fallback = policy.bust_rate(), "bust_rate unavailable, using fallback");
        policy.bust_rate()
    });

    SnapshotInputs {
        north_inflow,
        limit_up,
        limit_down,
        bust_rate,
    }
}

/// # Summary
/// 资金面评分：北向资金与量比各计 1/3/5 分，取平均。
///
/// # Returns
/// [1, 5] 之间的得分。
pub fn score_funding(north_inflow: f64, volume_ratio: f64) -> f64 {
    let inflow_points = if north_inflow > STRONG_INFLOW {
        5.0
    } else if north_inflow > 0.0 {
        3.0
    } else {
        1.0
    };
    let volume_points = if volume_ratio > HIGH_VOLUME_RATIO {
        5.0
    } else if volume_ratio > LOW_VOLUME_RATIO {
        3.0
    } else {
        1.0
    };
    (inflow_points + volume_points) / 2.0
}

/// # Summary
/// 情绪面评分：以 5 分为基准，加上涨跌停差值的 1/50，减去炸板率的 5 倍。
///
/// # Returns
/// 截断到 [0, 5] 的得分。
pub fn score_sentiment(limit_up: u32, limit_down: u32, bust_rate: f64) -> f64 {
    let spread = f64::from(limit_up) - f64::from(limit_down);
    let score = 5.0 + spread / SENTIMENT_SPREAD_DIVISOR - bust_rate * 5.0;
    if score.is_nan() {
        return 0.0;
    }
    score.clamp(0.0, 5.0)
}

/// # Summary
/// 技术面评分：按均线排列与斜率自上而下匹配，首个命中的规则生效。
///
/// # Logic
/// 1. MA5 > MA20 > MA60 且两条斜率均为正 → 5。
/// 2. MA20 > MA60 且 MA20 斜率为正 → 4。
/// 3. |MA20 − MA60| / MA60 < 0.02 → 3。
/// 4. MA20 < MA60 且 MA20 斜率为负 → 2。
/// 5. 其他 → 1。
///
/// # Returns
/// {1, 2, 3, 4, 5} 之一；MA60 为 0 或输入非有限值时返回 `DegenerateData`。
pub fn score_technical(
    ma5: f64,
    ma20: f64,
    ma60: f64,
    ma5_slope: f64,
    ma20_slope: f64,
) -> Result<f64, EngineError> {
    if ![ma5, ma20, ma60, ma5_slope, ma20_slope]
        .iter()
        .all(|v| v.is_finite())
    {
        return Err(EngineError::DegenerateData(
            "technical inputs must be finite".to_string(),
        ));
    }
    if ma60 == 0.0 {
        return Err(EngineError::DegenerateData("MA60 is zero".to_string()));
    }

    let score = if ma5 > ma20 && ma20 > ma60 && ma5_slope > 0.0 && ma20_slope > 0.0 {
        5.0
    } else if ma20 > ma60 && ma20_slope > 0.0 {
        4.0
    } else if (ma20 - ma60).abs() / ma60 < MA_CONVERGENCE {
        3.0
    } else if ma20 < ma60 && ma20_slope < 0.0 {
        2.0
    } else {
        1.0
    };
    Ok(score)
}

/// # Summary
/// 波动率评分：低于均值 5 分，低于均值 1.2 倍 4 分，否则 2 分。
///
/// # Returns
/// {2, 4, 5} 之一；均值为 0 或非有限值时返回 `DegenerateData`。
pub fn score_volatility(current: f64, mean: f64) -> Result<f64, EngineError> {
    if !current.is_finite() || !mean.is_finite() {
        return Err(EngineError::DegenerateData(
            "volatility inputs must be finite".to_string(),
        ));
    }
    if mean == 0.0 {
        return Err(EngineError::DegenerateData(
            "mean volatility is zero".to_string(),
        ));
    }

    let score = if current < mean {
        5.0
    } else if current < mean * ELEVATED_VOLATILITY {
        4.0
    } else {
        2.0
    };
    Ok(score)
}

/// 按固定权重计算综合分
pub fn composite(scores: &FactorScores) -> f64 {
    scores.funding * WEIGHT_FUNDING
        + scores.sentiment * WEIGHT_SENTIMENT
        + scores.technical * WEIGHT_TECHNICAL
        + scores.volatility * WEIGHT_VOLATILITY
}

/// # Summary
/// 对最新指标行与快照数值运行全部四个评分函数。
///
/// # Arguments
/// * `row`: 已通过 `is_fully_populated` 校验的最新行。
/// * `mean_volatility`: 窗口内的平均波动率。
/// * `inputs`: 已解析的快照数值。
///
/// # Returns
/// 四项得分；行内字段缺失或数据退化时返回错误。
pub fn score_all(
    row: &DerivedRow,
    mean_volatility: f64,
    inputs: &SnapshotInputs,
) -> Result<FactorScores, EngineError> {
    let missing = |name: &str| EngineError::DegenerateData(format!("{} undefined on {}", name, row.date));

    let volume_ratio = row.volume_ratio.ok_or_else(|| missing("volume_ratio"))?;
    let ma5 = row.ma5.ok_or_else(|| missing("MA5"))?;
    let ma20 = row.ma20.ok_or_else(|| missing("MA20"))?;
    let ma60 = row.ma60.ok_or_else(|| missing("MA60"))?;
    let ma5_slope = row.ma5_slope.ok_or_else(|| missing("MA5_slope"))?;
    let ma20_slope = row.ma20_slope.ok_or_else(|| missing("MA20_slope"))?;
    let volatility = row.volatility.ok_or_else(|| missing("volatility"))?;

    Ok(FactorScores {
        funding: score_funding(inputs.north_inflow, volume_ratio),
        sentiment: score_sentiment(inputs.limit_up, inputs.limit_down, inputs.bust_rate),
        technical: score_technical(ma5, ma20, ma60, ma5_slope, ma20_slope)?,
        volatility: score_volatility(volatility, mean_volatility)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_are_not_normalized() {
        assert!((WEIGHT_SUM - 0.70).abs() < 1e-12);
    }

    #[test]
    fn test_composite_of_max_scores() {
        let scores = FactorScores {
            funding: 5.0,
            sentiment: 5.0,
            technical: 5.0,
            volatility: 5.0,
        };
        assert!((composite(&scores) - 3.5).abs() < 1e-12);
    }
}
