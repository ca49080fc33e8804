use tracing::debug;

/// # Summary
/// 根据全市场涨跌幅统计涨停与跌停家数。
///
/// # Logic
/// 1. 涨跌幅 >= `threshold_pct` 计为涨停。
/// 2. 涨跌幅 <= `-threshold_pct` 计为跌停。
/// 3. 非有限值（停牌占位等）忽略。
///
/// # Arguments
/// * `changes`: 各股票涨跌幅，单位为百分比。
/// * `threshold_pct`: 判定阈值，例如 9.9。
///
/// # Returns
/// `(涨停家数, 跌停家数)`。
pub fn count_limits(changes: &[f64], threshold_pct: f64) -> (u32, u32) {
    let mut up: u32 = 0;
    let mut down: u32 = 0;
    for &pct in changes.iter().filter(|v| v.is_finite()) {
        if pct >= threshold_pct {
            up = up.saturating_add(1);
        } else if pct <= -threshold_pct {
            down = down.saturating_add(1);
        }
    }
    debug!(total = changes.len(), up, down, "counted limit moves");
    (up, down)
}

/// # Summary
/// 由涨停池与炸板池家数计算炸板率。
///
/// # Returns
/// 两者皆为 0（非交易日或盘前）时返回 None。
pub fn bust_rate(limit_up_pool: u32, broken_pool: u32) -> Option<f64> {
    if limit_up_pool == 0 && broken_pool == 0 {
        return None;
    }
    let broken = f64::from(broken_pool);
    Some(broken / (f64::from(limit_up_pool) + broken))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_limits_uses_inclusive_threshold() {
        let changes = [9.9, 10.01, 9.89, -9.9, -10.0, -9.5, 0.0, f64::NAN, 19.99];
        assert_eq!(count_limits(&changes, 9.9), (3, 2));
    }

    #[test]
    fn test_count_limits_empty() {
        assert_eq!(count_limits(&[], 9.9), (0, 0));
    }

    #[test]
    fn test_bust_rate() {
        assert_eq!(bust_rate(0, 0), None);
        assert_eq!(bust_rate(30, 10), Some(0.25));
        assert_eq!(bust_rate(0, 4), Some(1.0));
    }
}
