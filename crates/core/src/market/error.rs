use thiserror::Error;

/// # Summary
/// 市场数据域错误枚举，处理网络、解析、缓存及数据缺失等问题。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
/// - 该类错误只在数据抓取阶段出现，编排器捕获后降级为字段不可用。
#[derive(Error, Debug)]
pub enum MarketError {
    // 网络层错误，包含底层 HTTP 客户端错误信息
    #[error("Network error: {0}")]
    Network(String),
    // 数据解析错误，如 JSON 格式不匹配
    #[error("Parse error: {0}")]
    Parse(String),
    // 请求的数据未找到 (404 或内容为空)
    #[error("Data not found")]
    NotFound,
    // 数据源不提供该类数据
    #[error("Unsupported by provider {0}")]
    Unsupported(String),
    // 本地 CSV 缓存读写失败
    #[error("Cache error: {0}")]
    Cache(String),
    // 未知或未分类的错误
    #[error("Unknown error: {0}")]
    Unknown(String),
}
