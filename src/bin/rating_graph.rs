//! Rating Graph CLI - Report on the players of a pasted roster
//!
//! Reads roster text (OCR output) from a file or stdin, looks the member
//! numbers up in the rating history CSV and prints the report tables,
//! optionally writing the chart and table exports.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rating_graph_toolkit::dataset::RatingDataset;
use rating_graph_toolkit::pipeline::{
    dataset_info, default_year_end, extract_summary, run_report, ReportRequest,
};
use rating_graph_toolkit::settings::Settings;
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "rating-graph")]
#[command(about = "Chart rating history for the players on a tournament roster")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the member numbers and names found in roster text
    Extract {
        /// Roster text file ("-" for stdin)
        #[arg(short, long, default_value = "-")]
        text: PathBuf,
    },

    /// Build the rating report for the players in roster text
    Report {
        /// Rating history CSV (default: data_csv from ~/.rating-graph.conf)
        #[arg(short, long, env = "RATING_GRAPH_DATA")]
        data: Option<PathBuf>,

        /// Roster text file ("-" for stdin)
        #[arg(short, long, default_value = "-")]
        text: PathBuf,

        /// First year shown (default: start_year from settings)
        #[arg(long)]
        start_year: Option<i32>,

        /// Last year shown (default: newest year in the data)
        #[arg(long)]
        end_year: Option<i32>,

        /// Write the chart PNG here
        #[arg(long)]
        chart: Option<PathBuf>,

        /// Write yearly.csv, stats.csv and recent.csv into this directory
        #[arg(long)]
        csv_dir: Option<PathBuf>,

        /// Write an Excel workbook here
        #[arg(long)]
        xlsx: Option<PathBuf>,

        /// Font file for chart text
        #[arg(long)]
        font: Option<PathBuf>,
    },

    /// Summarize a rating history CSV
    Info {
        /// Rating history CSV (default: data_csv from ~/.rating-graph.conf)
        #[arg(short, long, env = "RATING_GRAPH_DATA")]
        data: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let settings = Settings::load();

    match cli.command {
        Commands::Extract { text } => {
            let text = read_text(&text)?;
            print!("{}", extract_summary(&text)?);
        }
        Commands::Report {
            data,
            text,
            start_year,
            end_year,
            chart,
            csv_dir,
            xlsx,
            font,
        } => {
            let dataset = load_dataset(data, &settings)?;
            let text = read_text(&text)?;

            let mut request = ReportRequest::new(
                text,
                start_year.unwrap_or(settings.start_year),
                end_year.unwrap_or_else(|| default_year_end(&dataset)),
            );
            request.chart_output = chart;
            request.csv_dir = csv_dir;
            request.xlsx_output = xlsx;
            request.font_path = font.or_else(|| settings.font_path.clone());

            let output = run_report(&request, &dataset)?;
            print!("{}", output.summary);
        }
        Commands::Info { data } => {
            let dataset = load_dataset(data, &settings)?;
            print!("{}", dataset_info(&dataset)?);
        }
    }

    Ok(())
}

/// Resolve the data path from the argument/env var, falling back to settings.
fn load_dataset(data: Option<PathBuf>, settings: &Settings) -> Result<RatingDataset> {
    let Some(path) = data.or_else(|| settings.data_csv.clone()) else {
        anyhow::bail!(
            "No rating data given. Use --data, set RATING_GRAPH_DATA, or set data_csv in ~/.rating-graph.conf"
        );
    };
    RatingDataset::load(&path)
}

fn read_text(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read roster text from stdin")?;
        Ok(text)
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read roster text: {}", path.display()))
    }
}
