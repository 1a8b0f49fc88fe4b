//! Per-player rating reports
//!
//! Given the member numbers pulled out of a roster, this module filters the
//! rating history and computes everything the report shows: chart series,
//! per-year averages, extremal statistics and the latest results.
//!
//! Nothing in here fails. A member with no rating history still gets a row,
//! filled with zeros and the placeholder date.

use crate::chart::{series_color, ChartSeries};
use crate::dataset::{RatingDataset, RatingRecord};
use crate::extract::{NameMap, PlayerId, MAX_REPORT_PLAYERS};
use chrono::{Datelike, NaiveDate};
use std::ops::RangeInclusive;

/// Number of latest results listed per player.
pub const RECENT_RECORD_LIMIT: usize = 10;

/// Shown when a member number has no name in the pasted text.
pub const UNKNOWN_NAME: &str = "unknown";

/// Date reported for statistics that never occurred.
pub fn placeholder_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default()
}

/// Year range and limits for one report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportConfig {
    /// First year shown (inclusive)
    pub year_start: i32,
    /// Last year shown (inclusive)
    pub year_end: i32,
    /// Maximum number of players in the report
    pub max_players: usize,
    /// Latest results listed per player
    pub recent_limit: usize,
}

impl ReportConfig {
    /// Config for `year_start..=year_end`. A reversed range is swapped.
    pub fn new(year_start: i32, year_end: i32) -> Self {
        let (year_start, year_end) = if year_start > year_end {
            log::warn!(
                "Start year {} is after end year {}; swapping",
                year_start,
                year_end
            );
            (year_end, year_start)
        } else {
            (year_start, year_end)
        };

        Self {
            year_start,
            year_end,
            max_players: MAX_REPORT_PLAYERS,
            recent_limit: RECENT_RECORD_LIMIT,
        }
    }

    pub fn years(&self) -> RangeInclusive<i32> {
        self.year_start..=self.year_end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.years().contains(&date.year())
    }
}

// ============================================================================
// Report types
// ============================================================================

/// A player's full rating history in date order.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerHistory {
    pub player_id: PlayerId,
    /// Name from the pasted roster
    pub name: String,
    pub records: Vec<RatingRecord>,
}

impl PlayerHistory {
    /// Collect `player_id`'s records, replacing the file's names with `name`.
    pub fn collect(dataset: &RatingDataset, player_id: PlayerId, name: &str) -> Self {
        let records = dataset
            .records_for(player_id)
            .into_iter()
            .map(|r| RatingRecord {
                player_name: name.to_string(),
                ..r.clone()
            })
            .collect();

        Self {
            player_id,
            name: name.to_string(),
            records,
        }
    }

    /// (date, rating) points that fall inside the report's year range.
    pub fn points_in_range(&self, config: &ReportConfig) -> Vec<(NaiveDate, f64)> {
        self.records
            .iter()
            .filter(|r| config.contains(r.date))
            .map(|r| (r.date, r.rating))
            .collect()
    }
}

/// Average rating per year, one row per player.
#[derive(Debug, Clone, PartialEq)]
pub struct YearlyAverages {
    pub years: Vec<i32>,
    pub rows: Vec<YearlyRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct YearlyRow {
    pub player_id: PlayerId,
    pub name: String,
    /// One entry per year in [`YearlyAverages::years`]; 0 where the player has no record
    pub averages: Vec<i64>,
}

/// Extremal statistics over a player's whole history.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerStats {
    pub player_id: PlayerId,
    pub name: String,
    /// Number of rated appearances
    pub appearances: usize,
    pub min_rating: f64,
    pub min_date: NaiveDate,
    pub max_rating: f64,
    pub max_date: NaiveDate,
    /// Largest rise between consecutive appearances (>= 0)
    pub max_gain: f64,
    pub max_gain_date: NaiveDate,
    /// Largest fall between consecutive appearances (<= 0)
    pub max_drop: f64,
    pub max_drop_date: NaiveDate,
}

impl PlayerStats {
    /// All-zero row for a player without enough history.
    pub fn empty(player_id: PlayerId, name: &str) -> Self {
        Self {
            player_id,
            name: name.to_string(),
            appearances: 0,
            min_rating: 0.0,
            min_date: placeholder_date(),
            max_rating: 0.0,
            max_date: placeholder_date(),
            max_gain: 0.0,
            max_gain_date: placeholder_date(),
            max_drop: 0.0,
            max_drop_date: placeholder_date(),
        }
    }

    /// Compute statistics from a date-sorted history.
    ///
    /// Fewer than two records yield [`PlayerStats::empty`]. Ties keep the
    /// earliest occurrence; gain/drop dates are those of the later record
    /// of the pair.
    pub fn from_history(history: &PlayerHistory) -> Self {
        let records = &history.records;
        if records.len() < 2 {
            return Self::empty(history.player_id, &history.name);
        }

        let mut stats = Self::empty(history.player_id, &history.name);
        stats.appearances = records.len();

        let mut min = &records[0];
        let mut max = &records[0];
        for r in &records[1..] {
            if r.rating < min.rating {
                min = r;
            }
            if r.rating > max.rating {
                max = r;
            }
        }
        stats.min_rating = min.rating;
        stats.min_date = min.date;
        stats.max_rating = max.rating;
        stats.max_date = max.date;

        for pair in records.windows(2) {
            let diff = pair[1].rating - pair[0].rating;
            if diff > stats.max_gain {
                stats.max_gain = diff;
                stats.max_gain_date = pair[1].date;
            } else if diff < stats.max_drop {
                stats.max_drop = diff;
                stats.max_drop_date = pair[1].date;
            }
        }

        stats
    }
}

/// Everything shown for one roster.
#[derive(Debug, Clone)]
pub struct Report {
    pub config: ReportConfig,
    /// Newest date in the rating data
    pub last_updated: Option<NaiveDate>,
    pub players: Vec<PlayerHistory>,
    pub yearly: YearlyAverages,
    pub stats: Vec<PlayerStats>,
    /// Latest results per player, newest first
    pub recent: Vec<PlayerHistory>,
}

impl Report {
    /// One chart series per player, colored by position and limited to the year range.
    pub fn chart_series(&self) -> Vec<ChartSeries> {
        self.players
            .iter()
            .enumerate()
            .map(|(i, p)| ChartSeries {
                label: p.player_id.to_string(),
                color: series_color(i),
                points: p.points_in_range(&self.config),
            })
            .collect()
    }

    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.players.iter().map(|p| p.player_id).collect()
    }
}

// ============================================================================
// Aggregation
// ============================================================================

/// Mean rating in `year`, fraction truncated. 0 when there are no records.
pub fn yearly_average(records: &[RatingRecord], year: i32) -> i64 {
    let (sum, count) = records
        .iter()
        .filter(|r| r.date.year() == year)
        .fold((0.0, 0u32), |(sum, count), r| (sum + r.rating, count + 1));

    if count == 0 {
        0
    } else {
        (sum / count as f64).trunc() as i64
    }
}

pub fn yearly_averages(players: &[PlayerHistory], config: &ReportConfig) -> YearlyAverages {
    let years: Vec<i32> = config.years().collect();
    let rows = players
        .iter()
        .map(|p| YearlyRow {
            player_id: p.player_id,
            name: p.name.clone(),
            averages: years
                .iter()
                .map(|&y| yearly_average(&p.records, y))
                .collect(),
        })
        .collect();

    YearlyAverages { years, rows }
}

/// The `limit` newest records, newest first. Same-day records keep file order.
pub fn recent_records(history: &PlayerHistory, limit: usize) -> PlayerHistory {
    let mut records = history.records.clone();
    records.sort_by(|a, b| b.date.cmp(&a.date));
    records.truncate(limit);

    PlayerHistory {
        player_id: history.player_id,
        name: history.name.clone(),
        records,
    }
}

/// Build the report for `ids` (capped at `config.max_players`).
pub fn build_report(
    dataset: &RatingDataset,
    ids: &[PlayerId],
    names: &NameMap,
    config: &ReportConfig,
) -> Report {
    if ids.len() > config.max_players {
        log::info!(
            "Reporting the first {} of {} players",
            config.max_players,
            ids.len()
        );
    }

    let players: Vec<PlayerHistory> = ids
        .iter()
        .take(config.max_players)
        .map(|&id| {
            let name = names.get(id).unwrap_or(UNKNOWN_NAME);
            let history = PlayerHistory::collect(dataset, id, name);
            if history.records.is_empty() {
                log::warn!("No rating history for member {} ({})", id, name);
            }
            history
        })
        .collect();

    let yearly = yearly_averages(&players, config);
    let stats = players.iter().map(PlayerStats::from_history).collect();
    let recent = players
        .iter()
        .map(|p| recent_records(p, config.recent_limit))
        .collect();

    Report {
        config: config.clone(),
        last_updated: dataset.last_updated(),
        players,
        yearly,
        stats,
        recent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(id: PlayerId, d: NaiveDate, rating: f64) -> RatingRecord {
        RatingRecord {
            date: d,
            venue: "Habikino".to_string(),
            player_id: id,
            player_name: "file name".to_string(),
            rating,
        }
    }

    fn history(records: Vec<RatingRecord>) -> PlayerHistory {
        PlayerHistory {
            player_id: 1234567,
            name: "Taro".to_string(),
            records,
        }
    }

    #[test]
    fn test_yearly_average_truncates_and_defaults_to_zero() {
        let records = vec![
            record(1, date(2021, 1, 1), 1500.0),
            record(1, date(2021, 6, 1), 1503.0),
            record(1, date(2022, 1, 1), 1600.0),
        ];
        assert_eq!(yearly_average(&records, 2021), 1501);
        assert_eq!(yearly_average(&records, 2022), 1600);
        assert_eq!(yearly_average(&records, 2020), 0);
    }

    #[test]
    fn test_stats_single_record_is_empty() {
        let stats = PlayerStats::from_history(&history(vec![record(
            1234567,
            date(2021, 3, 1),
            1500.0,
        )]));
        assert_eq!(stats.appearances, 0);
        assert_eq!(stats.max_gain, 0.0);
        assert_eq!(stats.max_drop, 0.0);
        assert_eq!(stats.max_gain_date, placeholder_date());
        assert_eq!(stats.max_drop_date, placeholder_date());
        assert_eq!(stats.min_date, placeholder_date());
    }

    #[test]
    fn test_stats_extremes_and_swings() {
        let stats = PlayerStats::from_history(&history(vec![
            record(1234567, date(2021, 1, 1), 1500.0),
            record(1234567, date(2021, 2, 1), 1540.0),
            record(1234567, date(2021, 3, 1), 1480.0),
            record(1234567, date(2021, 4, 1), 1520.0),
            record(1234567, date(2021, 5, 1), 1540.0),
        ]));
        assert_eq!(stats.appearances, 5);
        assert_eq!(stats.min_rating, 1480.0);
        assert_eq!(stats.min_date, date(2021, 3, 1));
        // tie at 1540: first occurrence kept
        assert_eq!(stats.max_rating, 1540.0);
        assert_eq!(stats.max_date, date(2021, 2, 1));
        // +40 twice: first kept
        assert_eq!(stats.max_gain, 40.0);
        assert_eq!(stats.max_gain_date, date(2021, 2, 1));
        assert_eq!(stats.max_drop, -60.0);
        assert_eq!(stats.max_drop_date, date(2021, 3, 1));
    }

    #[test]
    fn test_stats_monotonic_decline_has_no_gain() {
        let stats = PlayerStats::from_history(&history(vec![
            record(1234567, date(2021, 1, 1), 1500.0),
            record(1234567, date(2021, 2, 1), 1490.0),
        ]));
        assert_eq!(stats.max_gain, 0.0);
        assert_eq!(stats.max_gain_date, placeholder_date());
        assert_eq!(stats.max_drop, -10.0);
    }

    #[test]
    fn test_recent_records_newest_first() {
        let records: Vec<RatingRecord> = (1..=12)
            .map(|m| record(1234567, date(2021, m, 1), 1400.0 + m as f64))
            .collect();
        let recent = recent_records(&history(records), RECENT_RECORD_LIMIT);
        assert_eq!(recent.records.len(), 10);
        assert_eq!(recent.records[0].date, date(2021, 12, 1));
        assert_eq!(recent.records[9].date, date(2021, 3, 1));
    }

    #[test]
    fn test_report_config_swaps_reversed_range() {
        let config = ReportConfig::new(2024, 2019);
        assert_eq!(config.years(), 2019..=2024);
        assert!(config.contains(date(2019, 1, 1)));
        assert!(!config.contains(date(2025, 1, 1)));
    }

    #[test]
    fn test_build_report_handles_missing_player() {
        let dataset = RatingDataset::from_records(vec![
            record(1234567, date(2020, 5, 1), 1500.0),
            record(1234567, date(2021, 5, 1), 1550.0),
            record(7654321, date(2021, 5, 1), 1600.0),
        ]);
        let mut names = NameMap::new();
        names.insert(1234567, "Taro");
        names.insert(1111111, "Ghost");

        let config = ReportConfig::new(2020, 2021);
        let report = build_report(&dataset, &names.report_ids(), &names, &config);

        assert_eq!(report.player_ids(), vec![1234567, 1111111]);
        assert_eq!(report.yearly.years, vec![2020, 2021]);
        assert_eq!(report.yearly.rows[0].averages, vec![1500, 1550]);
        assert_eq!(report.yearly.rows[1].averages, vec![0, 0]);
        assert_eq!(report.stats[1], PlayerStats::empty(1111111, "Ghost"));
        assert!(report.recent[1].records.is_empty());
        // names come from the roster, not the rating file
        assert_eq!(report.recent[0].records[0].player_name, "Taro");
        assert_eq!(report.last_updated, Some(date(2021, 5, 1)));
    }

    #[test]
    fn test_build_report_caps_players_and_names_unknown() {
        let dataset = RatingDataset::default();
        let ids: Vec<PlayerId> = (0..9).map(|i| 1_000_000 + i).collect();
        let report = build_report(&dataset, &ids, &NameMap::new(), &ReportConfig::new(2020, 2020));
        assert_eq!(report.players.len(), MAX_REPORT_PLAYERS);
        assert_eq!(report.players[0].name, UNKNOWN_NAME);
    }

    #[test]
    fn test_chart_series_colors_and_labels() {
        let dataset = RatingDataset::from_records(vec![
            record(1234567, date(2019, 12, 31), 1480.0),
            record(1234567, date(2020, 5, 1), 1500.0),
            record(1234567, date(2022, 1, 1), 1510.0),
        ]);
        let mut names = NameMap::new();
        names.insert(1234567, "Taro");
        names.insert(7654321, "Jiro");
        let report = build_report(&dataset, &names.ids(), &names, &ReportConfig::new(2020, 2021));

        let series = report.chart_series();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].label, "1234567");
        assert_eq!(series[0].points, vec![(date(2020, 5, 1), 1500.0)]);
        assert_eq!(series[0].color, series_color(0));
        assert_ne!(series[0].color, series[1].color);
        assert!(series[1].points.is_empty());
    }
}
