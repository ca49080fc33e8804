use zeshi_core::engine::entity::RegimeLabel;

/// 阈值带下界，自高向低匹配，下界闭合
const BANDS: [(f64, RegimeLabel); 5] = [
    (4.5, RegimeLabel::PrimaryUptrend),
    (4.0, RegimeLabel::OscillatingUp),
    (3.0, RegimeLabel::Oscillating),
    (2.5, RegimeLabel::WeakOscillating),
    (2.0, RegimeLabel::OscillatingDown),
];

/// # Summary
/// 将综合分映射为市场环境等级。
///
/// # Logic
/// 1. 自最高阈值带开始比较，首个满足 `score >= 下界` 的带生效。
/// 2. 全部不满足（含 NaN）时归为单边下跌。
///
/// # Arguments
/// * `score`: 综合分。
///
/// # Returns
/// 六个等级之一，全实数轴有定义。
pub fn classify(score: f64) -> RegimeLabel {
    BANDS
        .iter()
        .find(|(lower, _)| score >= *lower)
        .map(|(_, label)| *label)
        .unwrap_or(RegimeLabel::OneSidedDecline)
}
