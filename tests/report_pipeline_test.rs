//! End-to-end test of the report pipeline
//!
//! Writes a small rating history in the club's export format, pastes a noisy
//! roster against it and checks every output the pipeline can write.

use rating_graph_toolkit::dataset::RatingDataset;
use rating_graph_toolkit::pipeline::{run_report, ReportRequest};
use rating_graph_toolkit::report::placeholder_date;
use std::fs;
use std::path::Path;

const RATING_CSV: &str = "\
,日付,場所,会員番号,氏名,レイティング
0,2019/06/02,羽曳野,1234567,山田太郎,1480
1,2020/01/12,奈良,1234567,山田太郎,1500
2,2020/07/05,神戸,1234567,山田太郎,1530
3,2021/03/14,羽曳野,1234567,山田太郎,1515
4,2021/03/14,羽曳野,7654321,佐藤花子,1602
5,2021-11-20,若葉,1234567,山田太郎,1541
6,bad date,若葉,1234567,山田太郎,1541
";

/// OCR output: full-width digits, a glued table index, a name on the next line
/// and a number that is not in the rating data.
const ROSTER: &str = "\
リーグA
１２３４５６７　山田太郎
37654321
佐藤花子
9123456 鈴木一郎
";

fn write_dataset(dir: &Path) -> RatingDataset {
    let path = dir.join("rating_data_all.csv");
    fs::write(&path, RATING_CSV).unwrap();
    RatingDataset::load(&path).unwrap()
}

#[test]
fn test_report_from_pasted_roster() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = write_dataset(dir.path());
    assert_eq!(dataset.len(), 6);
    assert_eq!(dataset.skipped_rows(), 1);

    let output = run_report(&ReportRequest::new(ROSTER, 2020, 2021), &dataset).unwrap();
    let report = &output.report;

    assert_eq!(report.player_ids(), vec![1234567, 7654321, 9123456]);
    assert_eq!(report.players[1].name, "佐藤花子");

    // 2020: (1500 + 1530) / 2, 2021: (1515 + 1541) / 2 truncated
    assert_eq!(report.yearly.years, vec![2020, 2021]);
    assert_eq!(report.yearly.rows[0].averages, vec![1515, 1528]);
    assert_eq!(report.yearly.rows[2].averages, vec![0, 0]);

    // statistics cover the whole history, including 2019
    let stats = &report.stats[0];
    assert_eq!(stats.appearances, 5);
    assert_eq!(stats.min_rating, 1480.0);
    assert_eq!(stats.max_gain, 30.0);
    assert_eq!(stats.max_drop, -15.0);
    assert_eq!(report.stats[1].max_gain_date, placeholder_date());

    let recent = &report.recent[0].records;
    assert_eq!(recent.len(), 5);
    assert_eq!(recent[0].venue, "若葉");
    assert_eq!(recent[4].venue, "羽曳野");

    assert!(output.summary.contains("2021-11-20"));
    assert!(output.summary.contains("鈴木一郎"));
}

#[test]
fn test_report_writes_all_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = write_dataset(dir.path());

    let out_dir = dir.path().join("out");
    let mut request = ReportRequest::new(ROSTER, 2019, 2021);
    request.chart_output = Some(dir.path().join("chart.png"));
    request.csv_dir = Some(out_dir.clone());
    request.xlsx_output = Some(out_dir.join("report.xlsx"));

    let output = run_report(&request, &dataset).unwrap();
    assert_eq!(output.written.len(), 5);
    assert!(output.summary.contains("Wrote:"));

    // chart
    let png_data = fs::read(dir.path().join("chart.png")).unwrap();
    assert_eq!(png_data, output.chart_png);
    let decoder = png::Decoder::new(std::io::Cursor::new(&png_data));
    let reader = decoder.read_info().unwrap();
    assert_eq!(reader.info().width, 1800);
    assert_eq!(reader.info().height, 1200);

    // yearly.csv: one column per year
    let mut yearly = csv::Reader::from_path(out_dir.join("yearly.csv")).unwrap();
    let headers = yearly.headers().unwrap().clone();
    assert_eq!(
        headers.iter().collect::<Vec<_>>(),
        vec!["player_id", "name", "2019", "2020", "2021"]
    );
    let first = yearly.records().next().unwrap().unwrap();
    assert_eq!(&first[0], "1234567");
    assert_eq!(&first[2], "1480");

    // stats.csv: one row per player
    let mut stats = csv::Reader::from_path(out_dir.join("stats.csv")).unwrap();
    assert_eq!(stats.records().count(), 3);

    // recent.csv: only players with history contribute rows
    let mut recent = csv::Reader::from_path(out_dir.join("recent.csv")).unwrap();
    assert_eq!(recent.records().count(), 6);

    // xlsx is a zip container
    let xlsx = fs::read(out_dir.join("report.xlsx")).unwrap();
    assert_eq!(&xlsx[..2], b"PK");
}

#[test]
fn test_report_with_no_member_numbers() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = write_dataset(dir.path());

    let output = run_report(&ReportRequest::new("Table 3\nRound 2\n", 2020, 2021), &dataset).unwrap();
    assert!(output.names.is_empty());
    assert!(output.report.players.is_empty());
    assert!(output.summary.contains("No member numbers found"));
    assert_eq!(&output.chart_png[..4], b"\x89PNG");
}
