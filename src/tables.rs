//! Report tables: fixed-width text, CSV and Excel output
//!
//! Names are mostly Japanese, so column padding counts display cells
//! (full-width characters take two) rather than bytes or chars.

use crate::extract::PlayerId;
use crate::report::{PlayerHistory, PlayerStats, Report, YearlyAverages};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt::Write;
use std::path::{Path, PathBuf};

const ID_WIDTH: usize = 9;
const NAME_WIDTH: usize = 16;
const VENUE_WIDTH: usize = 16;
const DATE_WIDTH: usize = 10;
const NUM_WIDTH: usize = 8;

// ============================================================================
// Display width
// ============================================================================

/// East Asian wide and full-width ranges.
fn is_wide(c: char) -> bool {
    matches!(
        c as u32,
        0x1100..=0x115F
            | 0x2E80..=0x303E
            | 0x3041..=0x33FF
            | 0x3400..=0x4DBF
            | 0x4E00..=0x9FFF
            | 0xA000..=0xA4CF
            | 0xAC00..=0xD7A3
            | 0xF900..=0xFAFF
            | 0xFE30..=0xFE4F
            | 0xFF00..=0xFF60
            | 0xFFE0..=0xFFE6
            | 0x20000..=0x2FFFD
            | 0x30000..=0x3FFFD
    )
}

fn char_width(c: char) -> usize {
    if c.is_control() {
        0
    } else if is_wide(c) {
        2
    } else {
        1
    }
}

/// Terminal cell width of `s`.
pub fn display_width(s: &str) -> usize {
    s.chars().map(char_width).sum()
}

/// Shorten `name` to at most `max_width` cells, ending in `...` when cut.
pub fn truncate_name(name: &str, max_width: usize) -> String {
    if display_width(name) <= max_width {
        return name.to_string();
    }

    let budget = max_width.saturating_sub(3);
    let mut out = String::new();
    let mut used = 0;
    for c in name.chars() {
        let w = char_width(c);
        if used + w > budget {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push_str("...");
    out
}

fn pad_right(s: &str, width: usize) -> String {
    let s = truncate_name(s, width);
    let fill = width.saturating_sub(display_width(&s));
    format!("{}{}", s, " ".repeat(fill))
}

/// Ratings print without decimals unless they have a fraction.
pub fn format_rating(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.1}", value)
    }
}

// ============================================================================
// Text tables
// ============================================================================

pub fn format_yearly_table(yearly: &YearlyAverages) -> Result<String> {
    let mut out = String::new();

    write!(out, "{:<ID_WIDTH$} {}", "ID", pad_right("Name", NAME_WIDTH))?;
    for year in &yearly.years {
        write!(out, " {:>6}", year)?;
    }
    writeln!(out)?;
    writeln!(
        out,
        "{:-<width$}",
        "",
        width = ID_WIDTH + 1 + NAME_WIDTH + 7 * yearly.years.len()
    )?;

    for row in &yearly.rows {
        write!(out, "{:<ID_WIDTH$} {}", row.player_id, pad_right(&row.name, NAME_WIDTH))?;
        for avg in &row.averages {
            write!(out, " {:>6}", avg)?;
        }
        writeln!(out)?;
    }

    Ok(out)
}

pub fn format_stats_table(stats: &[PlayerStats]) -> Result<String> {
    let mut out = String::new();

    writeln!(
        out,
        "{:<ID_WIDTH$} {} {:>5} {:>NUM_WIDTH$} {:<DATE_WIDTH$} {:>NUM_WIDTH$} {:<DATE_WIDTH$} {:>NUM_WIDTH$} {:<DATE_WIDTH$} {:>NUM_WIDTH$} {:<DATE_WIDTH$}",
        "ID",
        pad_right("Name", NAME_WIDTH),
        "Count",
        "Min",
        "Min date",
        "Max",
        "Max date",
        "Gain",
        "Gain date",
        "Drop",
        "Drop date",
    )?;
    writeln!(out, "{:-<width$}", "", width = ID_WIDTH + NAME_WIDTH + 8 + 4 * (NUM_WIDTH + DATE_WIDTH + 2))?;

    for s in stats {
        writeln!(
            out,
            "{:<ID_WIDTH$} {} {:>5} {:>NUM_WIDTH$} {:<DATE_WIDTH$} {:>NUM_WIDTH$} {:<DATE_WIDTH$} {:>NUM_WIDTH$} {:<DATE_WIDTH$} {:>NUM_WIDTH$} {:<DATE_WIDTH$}",
            s.player_id,
            pad_right(&s.name, NAME_WIDTH),
            s.appearances,
            format_rating(s.min_rating),
            s.min_date.to_string(),
            format_rating(s.max_rating),
            s.max_date.to_string(),
            format_rating(s.max_gain),
            s.max_gain_date.to_string(),
            format_rating(s.max_drop),
            s.max_drop_date.to_string(),
        )?;
    }

    Ok(out)
}

pub fn format_recent_tables(recent: &[PlayerHistory]) -> Result<String> {
    let mut out = String::new();

    for (i, player) in recent.iter().enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        writeln!(out, "{} {}", player.player_id, player.name)?;
        if player.records.is_empty() {
            writeln!(out, "  (no records)")?;
            continue;
        }

        writeln!(
            out,
            "  {:<DATE_WIDTH$} {} {:>NUM_WIDTH$}",
            "Date",
            pad_right("Venue", VENUE_WIDTH),
            "Rating"
        )?;
        for r in &player.records {
            writeln!(
                out,
                "  {:<DATE_WIDTH$} {} {:>NUM_WIDTH$}",
                r.date.to_string(),
                pad_right(&r.venue, VENUE_WIDTH),
                format_rating(r.rating)
            )?;
        }
    }

    Ok(out)
}

/// The full text report: header line plus the three tables.
pub fn format_report(report: &Report) -> Result<String> {
    let mut out = String::new();

    match report.last_updated {
        Some(date) => writeln!(out, "Rating data last updated: {}", date)?,
        None => writeln!(out, "Rating data is empty")?,
    }

    if report.players.is_empty() {
        writeln!(out, "No member numbers found in the pasted text.")?;
        return Ok(out);
    }

    writeln!(
        out,
        "Players: {}   Years: {}-{}",
        report.players.len(),
        report.config.year_start,
        report.config.year_end
    )?;

    writeln!(out, "\n{:=^80}", " YEARLY AVERAGE ")?;
    out.push_str(&format_yearly_table(&report.yearly)?);

    writeln!(out, "\n{:=^80}", " STATISTICS ")?;
    out.push_str(&format_stats_table(&report.stats)?);

    writeln!(out, "\n{:=^80}", " RECENT RESULTS ")?;
    out.push_str(&format_recent_tables(&report.recent)?);

    Ok(out)
}

// ============================================================================
// CSV export
// ============================================================================

#[derive(Serialize)]
struct StatsRow<'a> {
    player_id: PlayerId,
    name: &'a str,
    appearances: usize,
    min_rating: f64,
    min_date: String,
    max_rating: f64,
    max_date: String,
    max_gain: f64,
    max_gain_date: String,
    max_drop: f64,
    max_drop_date: String,
}

impl<'a> From<&'a PlayerStats> for StatsRow<'a> {
    fn from(s: &'a PlayerStats) -> Self {
        Self {
            player_id: s.player_id,
            name: &s.name,
            appearances: s.appearances,
            min_rating: s.min_rating,
            min_date: s.min_date.to_string(),
            max_rating: s.max_rating,
            max_date: s.max_date.to_string(),
            max_gain: s.max_gain,
            max_gain_date: s.max_gain_date.to_string(),
            max_drop: s.max_drop,
            max_drop_date: s.max_drop_date.to_string(),
        }
    }
}

#[derive(Serialize)]
struct RecentRow<'a> {
    player_id: PlayerId,
    name: &'a str,
    date: String,
    venue: &'a str,
    rating: f64,
}

/// Write `yearly.csv`, `stats.csv` and `recent.csv` into `dir`.
pub fn write_csv_tables(report: &Report, dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

    let yearly_path = dir.join("yearly.csv");
    {
        let mut writer = csv::Writer::from_path(&yearly_path)
            .with_context(|| format!("Failed to create {}", yearly_path.display()))?;
        let mut header = vec!["player_id".to_string(), "name".to_string()];
        header.extend(report.yearly.years.iter().map(|y| y.to_string()));
        writer.write_record(&header)?;
        for row in &report.yearly.rows {
            let mut fields = vec![row.player_id.to_string(), row.name.clone()];
            fields.extend(row.averages.iter().map(|a| a.to_string()));
            writer.write_record(&fields)?;
        }
        writer.flush()?;
    }

    let stats_path = dir.join("stats.csv");
    {
        let mut writer = csv::Writer::from_path(&stats_path)
            .with_context(|| format!("Failed to create {}", stats_path.display()))?;
        for s in &report.stats {
            writer.serialize(StatsRow::from(s))?;
        }
        writer.flush()?;
    }

    let recent_path = dir.join("recent.csv");
    {
        let mut writer = csv::Writer::from_path(&recent_path)
            .with_context(|| format!("Failed to create {}", recent_path.display()))?;
        for player in &report.recent {
            for r in &player.records {
                writer.serialize(RecentRow {
                    player_id: player.player_id,
                    name: &player.name,
                    date: r.date.to_string(),
                    venue: &r.venue,
                    rating: r.rating,
                })?;
            }
        }
        writer.flush()?;
    }

    log::info!("Wrote report tables to {}", dir.display());
    Ok(vec![yearly_path, stats_path, recent_path])
}

// ============================================================================
// Excel export
// ============================================================================

/// Write the report as an Excel workbook, with the chart on its own sheet.
pub fn write_workbook(report: &Report, chart_png: Option<&[u8]>, path: &Path) -> Result<()> {
    use rust_xlsxwriter::{Format, Image, Workbook};

    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    // ---------------------------------------------------------------
    // Yearly
    // ---------------------------------------------------------------
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Yearly")?;
        sheet.write_string_with_format(0, 0, "ID", &bold)?;
        sheet.write_string_with_format(0, 1, "Name", &bold)?;
        for (i, year) in report.yearly.years.iter().enumerate() {
            sheet.write_number_with_format(0, 2 + i as u16, *year as f64, &bold)?;
        }

        for (r, row) in report.yearly.rows.iter().enumerate() {
            let r = r as u32 + 1;
            sheet.write_number(r, 0, row.player_id)?;
            sheet.write_string(r, 1, &row.name)?;
            for (i, avg) in row.averages.iter().enumerate() {
                sheet.write_number(r, 2 + i as u16, *avg as f64)?;
            }
        }
        sheet.set_column_width(0, 10)?;
        sheet.set_column_width(1, 20)?;
        sheet.set_freeze_panes(1, 2)?;
    }

    // ---------------------------------------------------------------
    // Stats
    // ---------------------------------------------------------------
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Stats")?;
        let headers = [
            "ID", "Name", "Count", "Min", "Min date", "Max", "Max date", "Gain", "Gain date",
            "Drop", "Drop date",
        ];
        for (col, h) in headers.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, *h, &bold)?;
        }

        for (r, s) in report.stats.iter().enumerate() {
            let r = r as u32 + 1;
            sheet.write_number(r, 0, s.player_id)?;
            sheet.write_string(r, 1, &s.name)?;
            sheet.write_number(r, 2, s.appearances as f64)?;
            sheet.write_number(r, 3, s.min_rating)?;
            sheet.write_string(r, 4, s.min_date.to_string())?;
            sheet.write_number(r, 5, s.max_rating)?;
            sheet.write_string(r, 6, s.max_date.to_string())?;
            sheet.write_number(r, 7, s.max_gain)?;
            sheet.write_string(r, 8, s.max_gain_date.to_string())?;
            sheet.write_number(r, 9, s.max_drop)?;
            sheet.write_string(r, 10, s.max_drop_date.to_string())?;
        }
        sheet.set_column_width(0, 10)?;
        sheet.set_column_width(1, 20)?;
        for col in [4u16, 6, 8, 10] {
            sheet.set_column_width(col, 12)?;
        }
        sheet.set_freeze_panes(1, 2)?;
    }

    // ---------------------------------------------------------------
    // Recent
    // ---------------------------------------------------------------
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Recent")?;
        for (col, h) in ["ID", "Name", "Date", "Venue", "Rating"].iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, *h, &bold)?;
        }

        let mut row: u32 = 1;
        for player in &report.recent {
            for r in &player.records {
                sheet.write_number(row, 0, player.player_id)?;
                sheet.write_string(row, 1, &player.name)?;
                sheet.write_string(row, 2, r.date.to_string())?;
                sheet.write_string(row, 3, &r.venue)?;
                sheet.write_number(row, 4, r.rating)?;
                row += 1;
            }
        }
        sheet.set_column_width(0, 10)?;
        sheet.set_column_width(1, 20)?;
        sheet.set_column_width(2, 12)?;
        sheet.set_column_width(3, 20)?;
        sheet.set_freeze_panes(1, 0)?;
    }

    // ---------------------------------------------------------------
    // Chart
    // ---------------------------------------------------------------
    if let Some(png_data) = chart_png {
        let image = Image::new_from_buffer(png_data).context("Failed to read chart image")?;
        let sheet = workbook.add_worksheet();
        sheet.set_name("Chart")?;
        sheet.insert_image(0, 0, &image)?;
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    workbook
        .save(path)
        .map_err(|e| anyhow::anyhow!("Failed to save workbook: {}", e))?;

    log::info!("Wrote workbook {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{RatingDataset, RatingRecord};
    use crate::extract::NameMap;
    use crate::report::{build_report, ReportConfig};
    use chrono::NaiveDate;

    fn sample_report() -> Report {
        let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
        let record = |id, d, venue: &str, rating| RatingRecord {
            date: d,
            venue: venue.to_string(),
            player_id: id,
            player_name: String::new(),
            rating,
        };
        let dataset = RatingDataset::from_records(vec![
            record(1234567, date(2020, 5, 1), "羽曳野", 1500.0),
            record(1234567, date(2021, 5, 1), "奈良", 1550.5),
        ]);
        let mut names = NameMap::new();
        names.insert(1234567, "山田太郎");
        names.insert(7654321, "Jiro");
        build_report(&dataset, &names.ids(), &names, &ReportConfig::new(2020, 2021))
    }

    #[test]
    fn test_display_width_counts_wide_chars() {
        assert_eq!(display_width("Taro"), 4);
        assert_eq!(display_width("山田"), 4);
        assert_eq!(display_width("ﾔﾏﾀﾞ"), 4);
        assert_eq!(display_width("ＡＢ"), 4);
    }

    #[test]
    fn test_truncate_name() {
        assert_eq!(truncate_name("Taro", 10), "Taro");
        assert_eq!(truncate_name("Yamada Taro", 8), "Yamad...");
        // a wide char that would overflow the budget is dropped whole
        assert_eq!(truncate_name("山田太郎花子", 8), "山田...");
        assert_eq!(pad_right("山田", 6), "山田  ");
    }

    #[test]
    fn test_format_rating() {
        assert_eq!(format_rating(1500.0), "1500");
        assert_eq!(format_rating(1550.5), "1550.5");
        assert_eq!(format_rating(-40.0), "-40");
    }

    #[test]
    fn test_format_report_sections() {
        let text = format_report(&sample_report()).unwrap();
        assert!(text.contains("last updated: 2021-05-01"));
        assert!(text.contains("YEARLY AVERAGE"));
        assert!(text.contains("STATISTICS"));
        assert!(text.contains("RECENT RESULTS"));
        assert!(text.contains("山田太郎"));
        assert!(text.contains("2000-01-01"));
        assert!(text.contains("(no records)"));
    }

    #[test]
    fn test_yearly_table_aligns_cjk_names() {
        let table = format_yearly_table(&sample_report().yearly).unwrap();
        let widths: Vec<usize> = table.lines().map(display_width).collect();
        assert_eq!(widths[0], widths[2]);
        assert_eq!(widths[2], widths[3]);
        assert!(table.contains("  1500   1550"));
    }

    #[test]
    fn test_empty_report_mentions_no_ids() {
        let dataset = RatingDataset::default();
        let report = build_report(&dataset, &[], &NameMap::new(), &ReportConfig::new(2020, 2021));
        let text = format_report(&report).unwrap();
        assert!(text.contains("No member numbers found"));
    }
}
