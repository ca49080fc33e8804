use crate::indicator::{self, DerivedSeries};
use crate::{classifier, report, scorer};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{info, warn};
use zeshi_core::common::IndexCode;
use zeshi_core::common::time::TimeProvider;
use zeshi_core::engine::entity::{FactorScores, FallbackPolicy, RegimeLabel, RunRecord, RunStage};
use zeshi_core::engine::error::EngineError;
use zeshi_core::market::entity::{Field, IndexBar, MarketSnapshot};
use zeshi_core::market::port::MarketDataSource;
use zeshi_core::store::port::RunRecordStore;

/// 北向资金回溯的交易日数
pub const NORTH_INFLOW_DAYS: usize = 5;

/// # Summary
/// 市场环境监测编排器：抓取 → 评分 → 分类 → 报告/持久化。
///
/// # Invariants
/// - 独占本次运行的全部可变状态（日线、快照、得分、等级）。
/// - 阶段只能按 `Created → DataFetched → Scored → Classified` 单向推进。
/// - `fetch_data` 永不返回错误，子抓取失败只降级对应字段。
pub struct MarketEnvironmentSystem {
    index: IndexCode,
    days: usize,
    source: Arc<dyn MarketDataSource>,
    store: Arc<dyn RunRecordStore>,
    clock: Arc<dyn TimeProvider>,
    policy: FallbackPolicy,

    stage: RunStage,
    today: NaiveDate,
    bars: Vec<IndexBar>,
    snapshot: MarketSnapshot,
    series: Option<DerivedSeries>,
    scores: Option<FactorScores>,
    composite: Option<f64>,
    label: Option<RegimeLabel>,
}

impl MarketEnvironmentSystem {
    /// # Summary
    /// 创建编排器实例。
    ///
    /// # Arguments
    /// * `index`: 监测的指数。
    /// * `days`: 回溯的交易日数量。
    /// * `source`: 市场数据源（北向资金 CSV 缓存路径在其内部配置）。
    /// * `store`: 结果存储。
    /// * `clock`: 日期供给器。
    pub fn new(
        index: IndexCode,
        days: usize,
        source: Arc<dyn MarketDataSource>,
        store: Arc<dyn RunRecordStore>,
        clock: Arc<dyn TimeProvider>,
    ) -> Self {
        let today = clock.today();
        Self {
            index,
            days,
            source,
            store,
            clock,
            policy: FallbackPolicy::default(),
            stage: RunStage::Created,
            today,
            bars: Vec::new(),
            snapshot: MarketSnapshot::default(),
            series: None,
            scores: None,
            composite: None,
            label: None,
        }
    }

    /// 指定外部字段不可用时的回退策略
    pub fn with_fallback_policy(mut self, policy: FallbackPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// # Summary
    /// 依次抓取指数日线、北向资金与涨跌停统计。
    ///
    /// # Logic
    /// 1. 重置上一轮的全部结果。
    /// 2. 三个子抓取严格串行，每个失败都只记录日志并保留默认值。
    /// 3. 推进到 `DataFetched`。
    pub async fn fetch_data(&mut self) {
        self.today = self.clock.today();
        self.bars.clear();
        self.snapshot = MarketSnapshot::default();
        self.series = None;
        self.scores = None;
        self.composite = None;
        self.label = None;

        info!(
            index = %self.index,
            days = self.days,
            source = self.source.name(),
            "Fetching market data for {}",
            self.today
        );

        match self.source.fetch_index_bars(&self.index, self.days).await {
            Ok(bars) => {
                info!("Fetched {} index bars for {}", bars.len(), self.index);
                self.bars = bars;
            }
            Err(e) => warn!("Index bars unavailable for {}: {}", self.index, e),
        }

        match self.source.fetch_north_inflow(NORTH_INFLOW_DAYS).await {
            Ok(inflow) => {
                info!("North-bound net inflow over {} days: {:.2} 亿元", NORTH_INFLOW_DAYS, inflow);
                self.snapshot.north_inflow_5d = Field::Present(inflow);
            }
            Err(e) => warn!("North-bound inflow unavailable: {}", e),
        }

        match self.source.fetch_limit_stats(self.today).await {
            Ok(stats) => {
                info!(
                    limit_up = stats.limit_up,
                    limit_down = stats.limit_down,
                    bust_rate = ?stats.bust_rate,
                    "Fetched limit statistics"
                );
                self.snapshot.apply_limit_stats(stats);
            }
            Err(e) => warn!("Limit statistics unavailable: {}", e),
        }

        self.stage = RunStage::DataFetched;
    }

    /// # Summary
    /// 计算四项因子得分与综合分。
    ///
    /// # Logic
    /// 1. 要求已完成数据抓取。
    /// 2. 截取最近 `days` 根日线计算指标，并以最新完整行作为唯一评分输入。
    /// 3. 按回退策略解析快照，运行四个评分函数并加权。
    ///
    /// # Returns
    /// 历史不足时返回 `InsufficientHistory`，数据退化时返回 `DegenerateData`。
    pub fn calculate_scores(&mut self) -> Result<FactorScores, EngineError> {
        self.require_at_least(RunStage::DataFetched)?;

        let series = indicator::compute(indicator::trailing(&self.bars, self.days));
        let latest = series.latest_populated()?;
        let mean_volatility = series.mean_volatility().ok_or_else(|| {
            EngineError::DegenerateData("no populated volatility in window".to_string())
        })?;

        let inputs = scorer::resolve_snapshot(&self.snapshot, &self.policy);
        let scores = scorer::score_all(latest, mean_volatility, &inputs)?;
        let composite = scorer::composite(&scores);

        info!(
            funding = scores.funding,
            sentiment = scores.sentiment,
            technical = scores.technical,
            volatility = scores.volatility,
            "Composite score {:.4}",
            composite
        );

        self.series = Some(series);
        self.scores = Some(scores);
        self.composite = Some(composite);
        self.label = None;
        self.stage = RunStage::Scored;
        Ok(scores)
    }

    /// # Summary
    /// 将综合分分类为市场环境等级。
    ///
    /// # Returns
    /// 尚未评分时返回 `StageOrder`。
    pub fn classify_environment(&mut self) -> Result<RegimeLabel, EngineError> {
        self.require_at_least(RunStage::Scored)?;
        let composite = self.composite.ok_or(EngineError::StageOrder {
            expected: RunStage::Scored,
            actual: self.stage,
        })?;

        let label = classifier::classify(composite);
        info!("Market environment classified as {}", label);
        self.label = Some(label);
        self.stage = RunStage::Classified;
        Ok(label)
    }

    /// # Summary
    /// 依次执行抓取、评分、分类，不重试、不回滚。
    pub async fn run(&mut self) -> Result<RegimeLabel, EngineError> {
        self.fetch_data().await;
        self.calculate_scores()?;
        self.classify_environment()
    }

    /// 本次运行结果的只读投影，分类完成前为 None
    pub fn get_results_dict(&self) -> Option<RunRecord> {
        match (self.scores, self.composite, self.label) {
            (Some(scores), Some(composite), Some(label)) => {
                Some(RunRecord::new(self.today, scores, composite, label))
            }
            _ => None,
        }
    }

    /// 渲染控制台报告文本
    pub fn render_report(&self) -> Result<String, EngineError> {
        Ok(report::render(&self.classified_record()?))
    }

    /// 打印控制台报告
    pub fn print_results(&self) -> Result<(), EngineError> {
        println!("\n{}", self.render_report()?);
        Ok(())
    }

    /// # Summary
    /// 追加一条运行记录到存储。
    ///
    /// # Returns
    /// 成功返回写入的记录。
    pub fn save_results(&self) -> Result<RunRecord, EngineError> {
        let record = self.classified_record()?;
        self.store
            .append(&record)
            .map_err(|e| EngineError::Store(e.to_string()))?;
        info!("Saved run record for {}", record.date);
        Ok(record)
    }

    pub fn stage(&self) -> RunStage {
        self.stage
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn bars(&self) -> &[IndexBar] {
        &self.bars
    }

    pub fn snapshot(&self) -> &MarketSnapshot {
        &self.snapshot
    }

    pub fn series(&self) -> Option<&DerivedSeries> {
        self.series.as_ref()
    }

    pub fn scores(&self) -> Option<FactorScores> {
        self.scores
    }

    pub fn composite(&self) -> Option<f64> {
        self.composite
    }

    pub fn label(&self) -> Option<RegimeLabel> {
        self.label
    }

    fn classified_record(&self) -> Result<RunRecord, EngineError> {
        self.get_results_dict().ok_or(EngineError::StageOrder {
            expected: RunStage::Classified,
            actual: self.stage,
        })
    }

    fn require_at_least(&self, expected: RunStage) -> Result<(), EngineError> {
        if self.stage < expected {
            return Err(EngineError::StageOrder {
                expected,
                actual: self.stage,
            });
        }
        Ok(())
    }
}
