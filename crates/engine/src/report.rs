use zeshi_core::engine::entity::RunRecord;

/// # Summary
/// 渲染控制台报告：七个字段各占一行，末尾附仓位建议。
///
/// # Arguments
/// * `record`: 本次运行的记录。
///
/// # Returns
/// 多行文本，以换行结尾。
pub fn render(record: &RunRecord) -> String {
    let lines = [
        format!("{} 指数环境监测结果：", record.date),
        format!("资金面得分: {:.2}", record.funding_score),
        format!("情绪面得分: {:.2}", record.sentiment_score),
        format!("技术面得分: {:.2}", record.technical_score),
        format!("波动率得分: {:.2}", record.volatility_score),
        format!("总分: {:.2}", record.composite_score),
        format!("环境判断: {}", record.regime_label),
        format!("仓位建议: {}", record.regime_label.position_advice()),
    ];
    let mut out = lines.join("\n");
    out.push('\n');
    out
}
