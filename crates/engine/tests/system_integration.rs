use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use std::sync::{Arc, Mutex};
use tempfile::tempdir;
use zeshi_core::common::IndexCode;
use zeshi_core::common::time::FixedClock;
use zeshi_core::engine::entity::{FactorScores, FallbackPolicy, RegimeLabel, RunRecord, RunStage};
use zeshi_core::engine::error::EngineError;
use zeshi_core::market::entity::{Field, IndexBar, LimitStats};
use zeshi_core::market::error::MarketError;
use zeshi_core::market::port::MarketDataSource;
use zeshi_core::store::error::StoreError;
use zeshi_core::store::port::RunRecordStore;
use zeshi_engine::classifier::classify;
use zeshi_engine::scorer::{composite, WEIGHT_SUM};
use zeshi_engine::system::MarketEnvironmentSystem;
use zeshi_store::record::CsvRunRecordStore;

/// # Summary
/// 按脚本返回数据的模拟数据源，`None` 表示该子抓取失败。
struct ScriptedSource {
    bars: Option<Vec<IndexBar>>,
    inflow: Option<f64>,
    limits: Option<LimitStats>,
    calls: Mutex<Vec<&'static str>>,
}

impl ScriptedSource {
    fn new(bars: Option<Vec<IndexBar>>, inflow: Option<f64>, limits: Option<LimitStats>) -> Self {
        Self {
            bars,
            inflow,
            limits,
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl MarketDataSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch_index_bars(
        &self,
        _index: &IndexCode,
        days: usize,
    ) -> Result<Vec<IndexBar>, MarketError> {
        self.calls.lock().unwrap().push("bars");
        let bars = self.bars.clone().ok_or(MarketError::Network("timeout".into()))?;
        let start = bars.len().saturating_sub(days);
        Ok(bars[start..].to_vec())
    }

    async fn fetch_north_inflow(&self, days: usize) -> Result<f64, MarketError> {
        assert_eq!(days, 5);
        self.calls.lock().unwrap().push("inflow");
        self.inflow.ok_or(MarketError::NotFound)
    }

    async fn fetch_limit_stats(&self, _date: NaiveDate) -> Result<LimitStats, MarketError> {
        self.calls.lock().unwrap().push("limits");
        self.limits.ok_or(MarketError::Parse("bad payload".into()))
    }
}

/// 内存存储，记录追加次数
#[derive(Default)]
struct MemoryStore {
    records: Mutex<Vec<RunRecord>>,
}

impl RunRecordStore for MemoryStore {
    fn append(&self, record: &RunRecord) -> Result<(), StoreError> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<RunRecord>, StoreError> {
        Ok(self.records.lock().unwrap().clone())
    }
}

fn run_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

/// 严格递增收盘价、恒定成交量的合成日线
fn rising_bars(n: u32) -> Vec<IndexBar> {
    let start = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
    (0..n)
        .map(|i| {
            let close = 3800.0 + 12.5 * f64::from(i);
            IndexBar {
                date: start.checked_add_days(Days::new(u64::from(i))).unwrap(),
                open: close - 5.0,
                high: close + 8.0,
                low: close - 9.0,
                close,
                volume: 120_000_000,
            }
        })
        .collect()
}

fn build_system(source: Arc<dyn MarketDataSource>, store: Arc<dyn RunRecordStore>) -> MarketEnvironmentSystem {
    MarketEnvironmentSystem::new(
        "sh000300".parse().unwrap(),
        60,
        source,
        store,
        Arc::new(FixedClock::new(run_date())),
    )
}

#[tokio::test]
async fn test_full_run_on_rising_market() {
    let source = Arc::new(ScriptedSource::new(
        Some(rising_bars(60)),
        Some(80.0),
        Some(LimitStats {
            limit_up: 120,
            limit_down: 5,
            bust_rate: Some(0.1),
        }),
    ));
    let mut system = build_system(source.clone(), Arc::new(MemoryStore::default()));

    let label = system.run().await.unwrap();
    assert_eq!(system.stage(), RunStage::Classified);
    assert_eq!(*source.calls.lock().unwrap(), vec!["bars", "inflow", "limits"]);

    let scores = system.scores().unwrap();
    assert_eq!(scores.technical, 5.0);
    // 恒定成交量量比为 1，北向强流入：(5 + 3) / 2
    assert_eq!(scores.funding, 4.0);
    // 5 + 115/50 - 0.5，截断到 5
    assert_eq!(scores.sentiment, 5.0);
    assert_eq!(label, classify(system.composite().unwrap()));

    let record = system.get_results_dict().unwrap();
    assert_eq!(record.date, run_date());
    assert_eq!(record.regime_label, label);
    assert_eq!(record.technical_score, 5.0);
}

#[tokio::test]
async fn test_rising_market_with_maximal_factors() {
    let source = Arc::new(ScriptedSource::new(Some(rising_bars(60)), None, None));
    let mut system = build_system(source, Arc::new(MemoryStore::default()));
    system.run().await.unwrap();

    let technical = system.scores().unwrap().technical;
    assert_eq!(technical, 5.0);

    let maximal = FactorScores {
        funding: 5.0,
        sentiment: 5.0,
        technical,
        volatility: 5.0,
    };
    let score = composite(&maximal);
    // 权重和为 0.70，字面权重下满分综合分为 3.5
    assert!((score - 3.5).abs() < 1e-12);
    assert_eq!(classify(score), RegimeLabel::Oscillating);
    // 按权重和折算回 5 分制后为主升浪
    assert_eq!(classify(score / WEIGHT_SUM), RegimeLabel::PrimaryUptrend);
}

#[tokio::test]
async fn test_unavailable_snapshot_degrades_to_defaults() {
    let source = Arc::new(ScriptedSource::new(Some(rising_bars(60)), None, None));
    let mut system = build_system(source, Arc::new(MemoryStore::default()));

    system.fetch_data().await;
    assert_eq!(system.stage(), RunStage::DataFetched);
    assert_eq!(system.snapshot().north_inflow_5d, Field::Unavailable);
    assert_eq!(system.snapshot().limit_up_count, Field::Unavailable);
    assert_eq!(system.snapshot().limit_down_count, Field::Unavailable);
    assert_eq!(system.snapshot().bust_rate, Field::Unavailable);

    let scores = system.calculate_scores().unwrap();
    // 北向资金按 0 计 1 分，量比 1 计 3 分
    assert_eq!(scores.funding, 2.0);
    // 涨跌停与炸板率均按 0 计
    assert_eq!(scores.sentiment, 5.0);

    system.classify_environment().unwrap();
    assert_eq!(system.stage(), RunStage::Classified);
}

#[tokio::test]
async fn test_custom_fallback_policy_is_applied() {
    let source = Arc::new(ScriptedSource::new(Some(rising_bars(60)), None, None));
    let mut system = build_system(source, Arc::new(MemoryStore::default())).with_fallback_policy(
        FallbackPolicy::Values {
            north_inflow: 60.0,
            limit_up: 0,
            limit_down: 100,
            bust_rate: 0.0,
        },
    );
    system.run().await.unwrap();

    let scores = system.scores().unwrap();
    assert_eq!(scores.funding, 4.0);
    assert_eq!(scores.sentiment, 3.0);
}

#[tokio::test]
async fn test_all_fetches_failing_never_raises_but_cannot_score() {
    let source = Arc::new(ScriptedSource::new(None, None, None));
    let mut system = build_system(source.clone(), Arc::new(MemoryStore::default()));

    system.fetch_data().await;
    assert_eq!(system.stage(), RunStage::DataFetched);
    assert!(system.bars().is_empty());
    assert_eq!(*source.calls.lock().unwrap(), vec!["bars", "inflow", "limits"]);

    let err = system.calculate_scores().unwrap_err();
    assert!(matches!(
        err,
        EngineError::InsufficientHistory {
            required: 60,
            available: 0
        }
    ));
    assert_eq!(system.stage(), RunStage::DataFetched);
}

#[tokio::test]
async fn test_short_history_aborts_run() {
    let source = Arc::new(ScriptedSource::new(Some(rising_bars(45)), Some(10.0), None));
    let mut system = build_system(source, Arc::new(MemoryStore::default()));

    let err = system.run().await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::InsufficientHistory {
            available: 45,
            ..
        }
    ));
    assert!(system.get_results_dict().is_none());
}

#[tokio::test]
async fn test_only_trailing_window_is_scored() {
    let source = Arc::new(ScriptedSource::new(Some(rising_bars(90)), None, None));
    let mut system = build_system(source, Arc::new(MemoryStore::default()));
    system.run().await.unwrap();

    assert_eq!(system.series().unwrap().len(), 60);
}

#[tokio::test]
async fn test_stages_must_run_in_order() {
    let source = Arc::new(ScriptedSource::new(Some(rising_bars(60)), None, None));
    let mut system = build_system(source, Arc::new(MemoryStore::default()));

    assert!(matches!(
        system.calculate_scores(),
        Err(EngineError::StageOrder {
            expected: RunStage::DataFetched,
            actual: RunStage::Created
        })
    ));
    assert!(matches!(
        system.classify_environment(),
        Err(EngineError::StageOrder { .. })
    ));
    assert!(system.save_results().is_err());
    assert!(system.render_report().is_err());

    system.fetch_data().await;
    assert!(matches!(
        system.classify_environment(),
        Err(EngineError::StageOrder {
            expected: RunStage::Scored,
            actual: RunStage::DataFetched
        })
    ));
}

#[tokio::test]
async fn test_report_lists_all_fields() {
    let source = Arc::new(ScriptedSource::new(Some(rising_bars(60)), Some(5.0), None));
    let mut system = build_system(source, Arc::new(MemoryStore::default()));
    let label = system.run().await.unwrap();

    let report = system.render_report().unwrap();
    assert!(report.starts_with("2026-10-19 指数环境监测结果："));
    assert!(report.contains("技术面得分: 5.00"));
    assert!(report.contains(&format!("环境判断: {}", label)));
    assert!(report.contains(label.position_advice()));
    assert_eq!(report.lines().count(), 8);
}

#[tokio::test]
async fn test_save_results_twice_appends_rows() -> anyhow::Result<()> {
    let tmp_dir = tempdir()?;
    let path = tmp_dir.path().join("A股指数环境每日监测.csv");
    let store = Arc::new(CsvRunRecordStore::new(&path));
    let source = Arc::new(ScriptedSource::new(Some(rising_bars(60)), Some(20.0), None));

    let mut system = build_system(source, store.clone());
    system.run().await?;
    system.save_results()?;
    system.run().await?;
    system.save_results()?;

    let text = std::fs::read_to_string(&path)?;
    let lines: Vec<&str> = text.trim_start_matches('\u{feff}').lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("date,"));
    assert_eq!(store.load_all()?.len(), 2);
    Ok(())
}
