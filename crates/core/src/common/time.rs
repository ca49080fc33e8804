use chrono::{FixedOffset, NaiveDate, Utc};

/// # Summary
/// 日期供给器接口，用于隔离物理系统时钟。
/// 监测记录的日期必须通过此接口获取，以便测试固定运行日期。
pub trait TimeProvider: Send + Sync {
    /// 获取当前的交易日历日期
    fn today(&self) -> NaiveDate;
}

/// # Summary
/// 实盘运行使用的真实时钟，返回北京时间 (UTC+8) 下的当日日期。
pub struct ShanghaiClock;

impl TimeProvider for ShanghaiClock {
    fn today(&self) -> NaiveDate {
        match FixedOffset::east_opt(8 * 3600) {
            Some(offset) => Utc::now().with_timezone(&offset).date_naive(),
            None => Utc::now().date_naive(),
        }
    }
}

/// # Summary
/// 测试专用的固定时钟，永远返回构造时给定的日期。
pub struct FixedClock {
    date: NaiveDate,
}

impl FixedClock {
    /// 使用指定日期创建固定时钟
    pub fn new(date: NaiveDate) -> Self {
        Self { date }
    }
}

impl TimeProvider for FixedClock {
    fn today(&self) -> NaiveDate {
        self.date
    }
}
