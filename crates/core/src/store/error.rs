use thiserror::Error;

/// # Summary
/// 存储层错误枚举，处理监测文件的读写失败。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
#[derive(Error, Debug)]
pub enum StoreError {
    /// 文件系统操作失败
    #[error("IO error: {0}")]
    Io(String),
    /// CSV 编码或解码失败
    #[error("CSV error: {0}")]
    Csv(String),
    /// 记录内容无法解析
    #[error("Parse error: {0}")]
    Parse(String),
}
