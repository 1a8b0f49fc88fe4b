//! Pipeline functions for programmatic use by both CLI and GUI.
//!
//! Each operation takes its inputs explicitly (the loaded dataset is passed by
//! reference) and returns structured data plus a printable summary.

use crate::chart::{load_font, render_chart, ChartConfig};
use crate::dataset::RatingDataset;
use crate::extract::{extract_name_map, NameMap, MAX_REPORT_PLAYERS};
use crate::report::{build_report, Report, ReportConfig};
use crate::tables::{format_report, write_csv_tables, write_workbook};
use ab_glyph::FontVec;
use anyhow::{Context, Result};
use chrono::Datelike;
use std::fmt::Write;
use std::path::PathBuf;

// ============================================================================
// Report
// ============================================================================

/// Configuration for one report run.
#[derive(Debug, Clone)]
pub struct ReportRequest {
    /// Pasted roster text
    pub text: String,
    pub year_start: i32,
    pub year_end: i32,
    /// Write the chart PNG here
    pub chart_output: Option<PathBuf>,
    /// Write yearly/stats/recent CSV files into this directory
    pub csv_dir: Option<PathBuf>,
    /// Write an Excel workbook here
    pub xlsx_output: Option<PathBuf>,
    /// Font tried before the system fonts
    pub font_path: Option<PathBuf>,
}

impl ReportRequest {
    pub fn new(text: impl Into<String>, year_start: i32, year_end: i32) -> Self {
        Self {
            text: text.into(),
            year_start,
            year_end,
            chart_output: None,
            csv_dir: None,
            xlsx_output: None,
            font_path: None,
        }
    }
}

/// Result of a report run.
#[derive(Debug, Clone)]
pub struct ReportOutput {
    /// Everything extracted from the text, including ids beyond the report cap
    pub names: NameMap,
    pub report: Report,
    /// Rendered chart (PNG)
    pub chart_png: Vec<u8>,
    /// Text tables, followed by the list of written files
    pub summary: String,
    pub written: Vec<PathBuf>,
}

/// Load the chart font for `request`, or `None` (text-less chart) if none loads.
pub fn load_report_font(request: &ReportRequest) -> Option<FontVec> {
    match load_font(request.font_path.as_deref()) {
        Ok(font) => Some(font),
        Err(e) => {
            log::warn!("{}; drawing chart without text", e);
            None
        }
    }
}

/// Extract member numbers from the text, build the report and render the chart.
///
/// Optional outputs in the request are written to disk. Returns an error only
/// when rendering or writing fails; missing players and empty text still
/// produce a (possibly empty) report.
pub fn run_report(request: &ReportRequest, dataset: &RatingDataset) -> Result<ReportOutput> {
    let font = load_report_font(request);
    run_report_with_font(request, dataset, font.as_ref())
}

/// [`run_report`] with an already loaded font, for callers that report repeatedly.
/// `request.font_path` is ignored.
pub fn run_report_with_font(
    request: &ReportRequest,
    dataset: &RatingDataset,
    font: Option<&FontVec>,
) -> Result<ReportOutput> {
    let names = extract_name_map(&request.text);
    if names.is_empty() {
        log::warn!("No member numbers found in the pasted text");
    }

    let config = ReportConfig::new(request.year_start, request.year_end);
    let report = build_report(dataset, &names.report_ids(), &names, &config);

    let chart_config = ChartConfig::for_years(config.year_start, config.year_end);
    let chart_png = render_chart(&report.chart_series(), &chart_config, font)
        .context("Failed to render chart")?;

    let mut summary = format_report(&report)?;
    if names.len() > MAX_REPORT_PLAYERS {
        writeln!(
            summary,
            "\n{} more member numbers were found but only the first {} are reported.",
            names.len() - MAX_REPORT_PLAYERS,
            MAX_REPORT_PLAYERS
        )?;
    }

    let mut written = Vec::new();
    if let Some(path) = &request.chart_output {
        std::fs::write(path, &chart_png)
            .with_context(|| format!("Failed to write chart: {}", path.display()))?;
        written.push(path.clone());
    }
    if let Some(dir) = &request.csv_dir {
        written.extend(write_csv_tables(&report, dir)?);
    }
    if let Some(path) = &request.xlsx_output {
        write_workbook(&report, Some(&chart_png), path)?;
        written.push(path.clone());
    }

    if !written.is_empty() {
        writeln!(summary, "\nWrote:")?;
        for path in &written {
            writeln!(summary, "  {}", path.display())?;
        }
    }

    Ok(ReportOutput {
        names,
        report,
        chart_png,
        summary,
        written,
    })
}

// ============================================================================
// Extract
// ============================================================================

/// List the member numbers found in `text`, marking those past the report cap.
pub fn extract_summary(text: &str) -> Result<String> {
    let names = extract_name_map(text);
    let mut out = String::new();

    writeln!(out, "Found {} member numbers", names.len())?;
    for (i, (id, name)) in names.iter().enumerate() {
        if i < MAX_REPORT_PLAYERS {
            writeln!(out, "  {:<9} {}", id, name)?;
        } else {
            writeln!(out, "  {:<9} {}  (not reported)", id, name)?;
        }
    }

    Ok(out)
}

// ============================================================================
// Dataset info
// ============================================================================

pub fn dataset_info(dataset: &RatingDataset) -> Result<String> {
    let mut out = String::new();

    writeln!(out, "Records:       {}", dataset.len())?;
    writeln!(out, "Skipped rows:  {}", dataset.skipped_rows())?;
    writeln!(out, "Players:       {}", dataset.player_count())?;
    match (dataset.first_date(), dataset.last_updated()) {
        (Some(first), Some(last)) => writeln!(out, "Date range:    {} to {}", first, last)?,
        _ => writeln!(out, "Date range:    (no records)")?,
    }
    let venues = dataset.venues();
    if !venues.is_empty() {
        writeln!(out, "Venues:        {}", venues.join(", "))?;
    }

    Ok(out)
}

/// Last year to show by default: the newest year in the data, else this year.
pub fn default_year_end(dataset: &RatingDataset) -> i32 {
    dataset
        .latest_year()
        .unwrap_or_else(|| chrono::Local::now().year())
}
