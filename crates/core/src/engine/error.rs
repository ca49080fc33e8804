use crate::engine::entity::RunStage;
use thiserror::Error;

/// # Summary
/// 评分引擎域错误枚举。
///
/// # Invariants
/// - 涵盖历史数据不足、退化数据（除零）以及阶段顺序错误。
/// - 外部数据缺失不属于此类，它在抓取阶段已被降级处理。
#[derive(Error, Debug)]
pub enum EngineError {
    // 历史日线不足以填满最长滚动窗口
    #[error("Insufficient history: need {required} bars, got {available}")]
    InsufficientHistory { required: usize, available: usize },
    // 上游数据退化，例如 MA60 或平均波动率为 0
    #[error("Degenerate data: {0}")]
    DegenerateData(String),
    // 阶段调用顺序错误
    #[error("Stage order error: expected {expected}, current {actual}")]
    StageOrder { expected: RunStage, actual: RunStage },
    // 结果持久化失败
    #[error("Store error: {0}")]
    Store(String),
}
