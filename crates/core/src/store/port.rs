use super::error::StoreError;
use crate::engine::entity::RunRecord;

/// # Summary
/// 监测结果存储接口。
///
/// # Invariants
/// - 只追加：实现者不得改写或删除已有记录。
/// - 表头只写一次。
pub trait RunRecordStore: Send + Sync {
    /// # Summary
    /// 追加一条运行记录。
    ///
    /// # Logic
    /// 1. 若存储尚不存在，先写入表头。
    /// 2. 在末尾追加一行。
    ///
    /// # Arguments
    /// * `record`: 待追加的运行记录。
    ///
    /// # Returns
    /// 成功返回 `()`，失败返回 `StoreError`。
    fn append(&self, record: &RunRecord) -> Result<(), StoreError>;

    /// # Summary
    /// 按写入顺序读取全部历史记录。
    ///
    /// # Returns
    /// 存储不存在时返回空列表。
    fn load_all(&self) -> Result<Vec<RunRecord>, StoreError>;
}
