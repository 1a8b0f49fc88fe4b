//! Rating Graph Toolkit
//!
//! Links an OCR'd tournament roster to the club's rating history and reports on
//! the players in it: a rating-over-time chart plus yearly averages, extremal
//! statistics and the latest results.
//!
//! This library provides:
//! - `extract`: member number -> name extraction from pasted OCR text
//! - `dataset`: rating history CSV loading
//! - `report`: per-player aggregation
//! - `chart`: PNG chart rendering
//! - `tables`: text tables, CSV and Excel export
//! - `pipeline`: end-to-end operations shared by the binaries
//! - `settings`: persisted user settings
//!
//! Binaries:
//! - `rating-graph`: command-line reports
//! - `rating-graph-ui`: desktop app

pub mod chart;
pub mod dataset;
pub mod extract;
pub mod pipeline;
pub mod report;
pub mod settings;
pub mod tables;

pub use dataset::{RatingDataset, RatingRecord};
pub use extract::{extract_name_map, NameMap, PlayerId};
pub use report::{build_report, Report, ReportConfig};
