use chrono::NaiveDate;
use zeshi_core::engine::entity::{FactorScores, RegimeLabel, RunRecord};
use zeshi_core::store::port::RunRecordStore;
use zeshi_store::record::CsvRunRecordStore;
use tempfile::tempdir;

fn sample_record(day: u32, label: RegimeLabel) -> RunRecord {
    RunRecord::new(
        NaiveDate::from_ymd_opt(2026, 10, day).unwrap(),
        FactorScores {
            funding: 3.0,
            sentiment: 4.5,
            technical: 4.0,
            volatility: 5.0,
        },
        2.775,
        label,
    )
}

#[test]
fn test_append_writes_header_once() {
    // 1. 准备一个全新的文件路径
    let tmp_dir = tempdir().expect("Failed to create temp dir");
    let path = tmp_dir.path().join("monitor.csv");
    let store = CsvRunRecordStore::new(&path);

    // 2. 连续追加两次
    store.append(&sample_record(16, RegimeLabel::WeakOscillating)).unwrap();
    store.append(&sample_record(19, RegimeLabel::Oscillating)).unwrap();

    // 3. 文件中应当只有一行表头和两行数据
    let bytes = std::fs::read(&path).unwrap();
    assert!(bytes.starts_with(b"\xEF\xBB\xBF"), "新文件应以 BOM 开头");
    let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[0],
        "date,funding_score,sentiment_score,technical_score,volatility_score,composite_score,regime_label"
    );
    assert!(lines[1].starts_with("2026-10-16,"));
    assert!(lines[1].ends_with(",弱势震荡"));
    assert!(lines[2].ends_with(",震荡"));
    assert_eq!(text.matches("date,").count(), 1);
}

#[test]
fn test_append_never_rewrites_existing_rows() {
    let tmp_dir = tempdir().unwrap();
    let path = tmp_dir.path().join("monitor.csv");

    // 模拟上一次部署留下的记录
    CsvRunRecordStore::new(&path)
        .append(&sample_record(15, RegimeLabel::OneSidedDecline))
        .unwrap();
    let before = std::fs::read(&path).unwrap();

    // 新实例继续追加
    CsvRunRecordStore::new(&path)
        .append(&sample_record(16, RegimeLabel::OscillatingDown))
        .unwrap();
    let after = std::fs::read(&path).unwrap();

    assert!(after.starts_with(&before));
    assert!(after.len() > before.len());
}

#[test]
fn test_load_all_round_trips_in_order() {
    let tmp_dir = tempdir().unwrap();
    let store = CsvRunRecordStore::new(tmp_dir.path().join("nested").join("monitor.csv"));

    assert!(store.load_all().unwrap().is_empty());

    let first = sample_record(16, RegimeLabel::PrimaryUptrend);
    let second = sample_record(17, RegimeLabel::OscillatingUp);
    store.append(&first).unwrap();
    store.append(&second).unwrap();

    let loaded = store.load_all().unwrap();
    assert_eq!(loaded, vec![first, second]);
}

#[test]
fn test_empty_existing_file_gets_header() {
    let tmp_dir = tempdir().unwrap();
    let path = tmp_dir.path().join("monitor.csv");
    std::fs::write(&path, b"").unwrap();

    let store = CsvRunRecordStore::new(&path);
    store.append(&sample_record(16, RegimeLabel::Oscillating)).unwrap();

    let loaded = store.load_all().unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].regime_label, RegimeLabel::Oscillating);
}
