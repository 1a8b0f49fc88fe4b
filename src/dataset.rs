//! Rating history dataset
//!
//! The rating CSV is loaded once into a date-sorted, read-only list of
//! records. Every report takes the dataset by reference.

use crate::extract::PlayerId;
use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use csv::{ReaderBuilder, StringRecord};
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

/// One rating entry: a player's rating after an event.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingRecord {
    pub date: NaiveDate,
    /// Event venue (`場所`)
    pub venue: String,
    pub player_id: PlayerId,
    /// Name as written in the rating file
    pub player_name: String,
    pub rating: f64,
}

// Header names accepted for each column. The first entry is the header used by
// the club's own export.
const DATE_HEADERS: &[&str] = &["日付", "date"];
const VENUE_HEADERS: &[&str] = &["場所", "venue", "place"];
const ID_HEADERS: &[&str] = &["会員番号", "player_id", "member_id", "id"];
const NAME_HEADERS: &[&str] = &["氏名", "name", "player_name"];
const RATING_HEADERS: &[&str] = &["レイティング", "レーティング", "rating"];

struct ColumnIndices {
    date: usize,
    venue: Option<usize>,
    player_id: usize,
    name: Option<usize>,
    rating: usize,
}

/// Index of the best-matching header. Candidates are tried in priority order,
/// so a generic alias such as `id` only wins when nothing better exists.
fn find_column(headers: &StringRecord, candidates: &[&str]) -> Option<usize> {
    candidates.iter().find_map(|c| {
        headers.iter().position(|h| {
            h.trim()
                .trim_start_matches('\u{feff}')
                .eq_ignore_ascii_case(c)
        })
    })
}

fn find_required_columns(headers: &StringRecord) -> Result<ColumnIndices> {
    let required = |candidates: &[&str]| {
        find_column(headers, candidates).ok_or_else(|| {
            anyhow::anyhow!(
                "Column '{}' not found (accepted headers: {})",
                candidates[0],
                candidates.join(", ")
            )
        })
    };

    Ok(ColumnIndices {
        date: required(DATE_HEADERS)?,
        venue: find_column(headers, VENUE_HEADERS),
        player_id: required(ID_HEADERS)?,
        name: find_column(headers, NAME_HEADERS),
        rating: required(RATING_HEADERS)?,
    })
}

// ============================================================================
// Field parsing
// ============================================================================

/// Parse `2023/4/1`, `2023-04-01` or `2023-04-01 10:00:00` as a date.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let date_part = s.trim().split([' ', 'T']).next()?;
    if date_part.is_empty() {
        return None;
    }
    let normalized = date_part.replace('/', "-");
    NaiveDate::parse_from_str(&normalized, "%Y-%m-%d").ok()
}

/// Parse a member number, accepting integral floats such as `1234567.0`.
pub fn parse_player_id(s: &str) -> Option<PlayerId> {
    let s = s.trim();
    if let Ok(id) = s.parse::<PlayerId>() {
        return Some(id);
    }
    let value: f64 = s.parse().ok()?;
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= PlayerId::MAX as f64
    {
        Some(value as PlayerId)
    } else {
        None
    }
}

pub fn parse_rating(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_row(record: &StringRecord, cols: &ColumnIndices) -> Option<RatingRecord> {
    let text = |idx: Option<usize>| {
        idx.and_then(|i| record.get(i))
            .unwrap_or("")
            .trim()
            .to_string()
    };

    Some(RatingRecord {
        date: parse_date(record.get(cols.date)?)?,
        venue: text(cols.venue),
        player_id: parse_player_id(record.get(cols.player_id)?)?,
        player_name: text(cols.name),
        rating: parse_rating(record.get(cols.rating)?)?,
    })
}

// ============================================================================
// Dataset
// ============================================================================

/// Immutable, date-sorted rating history.
#[derive(Debug, Clone, Default)]
pub struct RatingDataset {
    records: Vec<RatingRecord>,
    skipped_rows: usize,
}

impl RatingDataset {
    /// Load the rating CSV at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open rating data: {}", path.display()))?;
        let dataset = Self::from_reader(file)
            .with_context(|| format!("Failed to load rating data: {}", path.display()))?;
        log::info!(
            "Loaded {} rating records from {} ({} rows skipped)",
            dataset.len(),
            path.display(),
            dataset.skipped_rows
        );
        Ok(dataset)
    }

    /// Load from any CSV source. Rows that fail to parse are skipped.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers = reader.headers().context("Failed to read CSV header")?.clone();
        let cols = find_required_columns(&headers)?;

        let mut records = Vec::new();
        let mut skipped_rows = 0;

        for (row_idx, result) in reader.records().enumerate() {
            let record = match result {
                Ok(r) => r,
                Err(e) if e.is_io_error() => {
                    return Err(e).context("Failed to read CSV row");
                }
                Err(e) => {
                    log::debug!("Row {}: unreadable: {}", row_idx + 1, e);
                    skipped_rows += 1;
                    continue;
                }
            };

            match parse_row(&record, &cols) {
                Some(r) => records.push(r),
                None => {
                    log::debug!("Row {}: skipped malformed row {:?}", row_idx + 1, record);
                    skipped_rows += 1;
                }
            }
        }

        if skipped_rows > 0 {
            log::warn!("Skipped {} malformed rating rows", skipped_rows);
        }

        let mut dataset = Self::from_records(records);
        dataset.skipped_rows = skipped_rows;
        Ok(dataset)
    }

    /// Build a dataset from already-parsed records.
    pub fn from_records(mut records: Vec<RatingRecord>) -> Self {
        // Stable, so same-day rows keep their file order
        records.sort_by_key(|r| r.date);
        Self {
            records,
            skipped_rows: 0,
        }
    }

    pub fn records(&self) -> &[RatingRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of CSV rows dropped during loading.
    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }

    /// One player's records in date order.
    pub fn records_for(&self, player_id: PlayerId) -> Vec<&RatingRecord> {
        self.records
            .iter()
            .filter(|r| r.player_id == player_id)
            .collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.records.first().map(|r| r.date)
    }

    /// Date of the newest record, shown as the data's last-updated day.
    pub fn last_updated(&self) -> Option<NaiveDate> {
        self.records.last().map(|r| r.date)
    }

    pub fn latest_year(&self) -> Option<i32> {
        self.last_updated().map(|d| d.year())
    }

    pub fn player_count(&self) -> usize {
        self.records
            .iter()
            .map(|r| r.player_id)
            .collect::<HashSet<_>>()
            .len()
    }

    /// Distinct non-empty venues, in order of first appearance.
    pub fn venues(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.records
            .iter()
            .map(|r| r.venue.as_str())
            .filter(|v| !v.is_empty() && seen.insert(*v))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2023/04/01"), Some(date(2023, 4, 1)));
        assert_eq!(parse_date("2023-4-1"), Some(date(2023, 4, 1)));
        assert_eq!(parse_date(" 2023/4/1 10:30:00 "), Some(date(2023, 4, 1)));
        assert_eq!(parse_date("2023-04-01T00:00:00"), Some(date(2023, 4, 1)));
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date("2023/13/01"), None);
    }

    #[test]
    fn test_parse_player_id() {
        assert_eq!(parse_player_id("1234567"), Some(1234567));
        assert_eq!(parse_player_id(" 1234567.0 "), Some(1234567));
        assert_eq!(parse_player_id("1234567.5"), None);
        assert_eq!(parse_player_id("-1"), None);
        assert_eq!(parse_player_id(""), None);
    }

    #[test]
    fn test_parse_rating() {
        assert_eq!(parse_rating("1500"), Some(1500.0));
        assert_eq!(parse_rating("1523.5"), Some(1523.5));
        assert_eq!(parse_rating("NaN"), None);
        assert_eq!(parse_rating("-"), None);
    }

    #[test]
    fn test_load_japanese_headers_with_index_column() {
        let csv = ",日付,場所,会員番号,氏名,レイティング\n\
                   0,2023/05/01,羽曳野,1234567,山田,1520\n\
                   1,2022-03-01,奈良,1234567,山田,1490\n\
                   2,2023/05/01,羽曳野,7654321,佐藤,1610\n";
        let ds = RatingDataset::from_reader(csv.as_bytes()).unwrap();

        assert_eq!(ds.len(), 3);
        assert_eq!(ds.skipped_rows(), 0);
        assert_eq!(ds.records()[0].date, date(2022, 3, 1));
        assert_eq!(ds.records()[0].venue, "奈良");
        assert_eq!(ds.last_updated(), Some(date(2023, 5, 1)));
        assert_eq!(ds.latest_year(), Some(2023));
        assert_eq!(ds.player_count(), 2);
        assert_eq!(ds.records_for(1234567).len(), 2);
        assert_eq!(ds.venues(), vec!["奈良", "羽曳野"]);
    }

    #[test]
    fn test_load_english_headers_case_insensitive() {
        let csv = "Date,Venue,Player_ID,Name,Rating\n2021-01-09,Kobe,9123456,Kato,1400\n";
        let ds = RatingDataset::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.records()[0].player_id, 9123456);
        assert_eq!(ds.records()[0].player_name, "Kato");
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let csv = "date,player_id,rating\n\
                   2021-01-09,1234567,1400\n\
                   not-a-date,1234567,1400\n\
                   2021-01-10,abc,1400\n\
                   2021-01-11,1234567,\n\
                   2021-01-12\n\
                   2021-01-13,1234567,1410\n";
        let ds = RatingDataset::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.skipped_rows(), 4);
        assert_eq!(ds.records()[1].venue, "");
    }

    #[test]
    fn test_specific_header_beats_generic_alias() {
        let csv = "id,date,player_id,rating\n0,2021-01-09,1234567,1400\n";
        let ds = RatingDataset::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.records()[0].player_id, 1234567);

        // the generic alias still works on its own
        let csv = "date,id,rating\n2021-01-09,7654321,1400\n";
        let ds = RatingDataset::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(ds.records()[0].player_id, 7654321);
    }

    #[test]
    fn test_missing_required_column() {
        let csv = "date,name,rating\n2021-01-09,Kato,1400\n";
        let err = RatingDataset::from_reader(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("会員番号"));
    }

    #[test]
    fn test_same_day_rows_keep_file_order() {
        let csv = "date,player_id,rating\n\
                   2021-01-09,1,100\n\
                   2020-01-01,1,50\n\
                   2021-01-09,1,200\n";
        let ds = RatingDataset::from_reader(csv.as_bytes()).unwrap();
        let ratings: Vec<f64> = ds.records().iter().map(|r| r.rating).collect();
        assert_eq!(ratings, vec![50.0, 100.0, 200.0]);
    }
}
