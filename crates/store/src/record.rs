use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;
use zeshi_core::engine::entity::RunRecord;
use zeshi_core::store::error::StoreError;
use zeshi_core::store::port::RunRecordStore;

/// UTF-8 BOM，便于表格软件正确识别中文环境标签
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// RunRecordStore 的 CSV 实现，一次部署对应一个监测文件。
///
/// # Summary
/// 以追加方式写入运行记录，文件不存在（或为空）时先写 BOM 与表头。
///
/// # Invariants
/// * 列顺序固定：date, funding_score, sentiment_score, technical_score,
///   volatility_score, composite_score, regime_label。
/// * 从不改写已有行。
pub struct CsvRunRecordStore {
    path: PathBuf,
}

impl CsvRunRecordStore {
    /// 创建指向指定文件的存储实例，文件在首次追加时创建。
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 监测文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn needs_header(&self) -> bool {
        fs::metadata(&self.path)
            .map(|meta| meta.len() == 0)
            .unwrap_or(true)
    }
}

impl RunRecordStore for CsvRunRecordStore {
    /// # Summary
    /// 追加一条运行记录。
    ///
    /// # Logic
    /// 1. 按需创建父目录。
    /// 2. 以 append 模式打开文件；新文件先写入 BOM，并由 CSV 写入器输出表头。
    /// 3. 序列化记录并 flush。
    ///
    /// # Arguments
    /// * `record` - 待追加的记录。
    ///
    /// # Returns
    /// * `Result<(), StoreError>`
    fn append(&self, record: &RunRecord) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
            }
        }

        let needs_header = self.needs_header();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StoreError::Io(e.to_string()))?;

        if needs_header {
            file.write_all(UTF8_BOM)
                .map_err(|e| StoreError::Io(e.to_string()))?;
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer
            .serialize(record)
            .map_err(|e| StoreError::Csv(e.to_string()))?;
        writer.flush().map_err(|e| StoreError::Io(e.to_string()))?;

        debug!(path = %self.path.display(), header = needs_header, "Appended run record");
        Ok(())
    }

    /// # Summary
    /// 读取全部历史记录。
    ///
    /// # Logic
    /// 1. 文件不存在时返回空列表。
    /// 2. 去掉 BOM 后逐行反序列化。
    ///
    /// # Returns
    /// * `Result<Vec<RunRecord>, StoreError>`
    fn load_all(&self) -> Result<Vec<RunRecord>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let bytes = fs::read(&self.path).map_err(|e| StoreError::Io(e.to_string()))?;
        let content = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes);

        csv::Reader::from_reader(content)
            .deserialize::<RunRecord>()
            .map(|row| row.map_err(|e| StoreError::Parse(e.to_string())))
            .collect()
    }
}
