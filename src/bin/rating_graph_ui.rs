//! Rating Graph - Graphical User Interface
//!
//! Paste the OCR'd roster, pick the year range and draw the chart and tables
//! for everyone on it.

use iced::widget::{
    button, column, container, image, row, rule, scrollable, text, text_editor, text_input,
};
use ab_glyph::FontVec;
use iced::{Center, Element, Fill, Task, Theme};
use rating_graph_toolkit::dataset::RatingDataset;
use rating_graph_toolkit::pipeline::{self, ReportOutput, ReportRequest};
use rating_graph_toolkit::settings::Settings;
use rating_graph_toolkit::tables;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Range accepted by the year inputs.
const YEAR_MIN: i32 = 2000;
const YEAR_MAX: i32 = 2040;

const USAGE_NOTES: [&str; 3] = [
    "Use a photo of your own league's roster only.",
    "Run the photo through Google Lens and paste the recognized text below.",
    "Change the start year to widen or narrow the chart.",
];

/// Chart font loaded on the first draw and reused after that.
/// `None` inside means no font could be loaded.
#[derive(Clone)]
struct ChartFont(Option<Arc<FontVec>>);

impl fmt::Debug for ChartFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ChartFont").field(&self.0.is_some()).finish()
    }
}

fn main() -> iced::Result {
    env_logger::init();
    iced::application(App::new, App::update, App::view)
        .theme(App::theme)
        .centered()
        .run()
}

// ============================================================================
// App State
// ============================================================================

struct App {
    settings: Settings,

    // Rating data
    data_path: String,
    dataset: Option<Arc<RatingDataset>>,
    data_status: String,

    // Inputs
    roster: text_editor::Content,
    start_year: String,
    end_year: String,

    // Results
    is_running: bool,
    status_text: String,
    output: Option<Arc<ReportOutput>>,
    chart: Option<image::Handle>,
    font: Option<ChartFont>,
}

#[derive(Debug, Clone)]
enum Message {
    // Rating data
    DataPathChanged(String),
    BrowseData,
    DataSelected(Option<PathBuf>),
    LoadData,
    DataLoaded(Result<Arc<RatingDataset>, String>),

    // Inputs
    RosterEdited(text_editor::Action),
    StartYearChanged(String),
    EndYearChanged(String),

    // Report
    Draw,
    ReportCompleted(ChartFont, Result<Arc<ReportOutput>, String>),

    // Export
    BrowseWorkbook,
    WorkbookSelected(Option<PathBuf>),
    WorkbookSaved(Result<String, String>),
}

impl App {
    fn theme(&self) -> Theme {
        Theme::Light
    }

    fn new() -> (Self, Task<Message>) {
        let settings = Settings::load();
        let data_path = settings
            .data_csv
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();

        let app = App {
            start_year: settings.start_year.to_string(),
            settings,
            data_path,
            dataset: None,
            data_status: String::new(),
            roster: text_editor::Content::new(),
            end_year: String::new(),
            is_running: false,
            status_text: String::new(),
            output: None,
            chart: None,
            font: None,
        };

        let task = if app.data_path.is_empty() {
            Task::none()
        } else {
            Task::done(Message::LoadData)
        };
        (app, task)
    }

    fn save_settings(&self) {
        if let Err(e) = self.settings.save() {
            log::warn!("{:#}", e);
        }
    }

    fn last_updated_line(&self) -> String {
        match self.dataset.as_ref().and_then(|d| d.last_updated()) {
            Some(date) => format!("Last updated: {}", date),
            None => String::new(),
        }
    }

    fn coverage_note(&self) -> String {
        let venues = self
            .dataset
            .as_ref()
            .map(|d| d.venues())
            .unwrap_or_default();
        if venues.is_empty() {
            "Only events covered by the rating data file are included.".to_string()
        } else {
            format!("Only events at {} are included.", venues.join("・"))
        }
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            // -- Rating data --
            Message::DataPathChanged(v) => {
                self.data_path = v;
                Task::none()
            }
            Message::BrowseData => Task::perform(
                async {
                    let file = rfd::AsyncFileDialog::new()
                        .set_title("Select rating data")
                        .add_filter("CSV files", &["csv"])
                        .pick_file()
                        .await;
                    file.map(|f| f.path().to_path_buf())
                },
                Message::DataSelected,
            ),
            Message::DataSelected(path) => match path {
                Some(p) => {
                    self.data_path = p.display().to_string();
                    Task::done(Message::LoadData)
                }
                None => Task::none(),
            },
            Message::LoadData => {
                let path = PathBuf::from(&self.data_path);
                self.data_status = "Loading rating data...".to_string();
                Task::perform(
                    async move {
                        RatingDataset::load(&path)
                            .map(Arc::new)
                            .map_err(|e| format!("{:#}", e))
                    },
                    Message::DataLoaded,
                )
            }
            Message::DataLoaded(result) => {
                match result {
                    Ok(dataset) => {
                        self.data_status = format!(
                            "{} records, {} players",
                            dataset.len(),
                            dataset.player_count()
                        );
                        if self.end_year.is_empty() {
                            self.end_year = pipeline::default_year_end(&dataset).to_string();
                        }
                        self.dataset = Some(dataset);
                        self.settings.data_csv = Some(PathBuf::from(&self.data_path));
                        self.save_settings();
                    }
                    Err(e) => {
                        self.dataset = None;
                        self.data_status = format!("Error: {}", e);
                    }
                }
                Task::none()
            }

            // -- Inputs --
            Message::RosterEdited(action) => {
                self.roster.perform(action);
                Task::none()
            }
            Message::StartYearChanged(v) => {
                if let Ok(year) = parse_year(&v) {
                    self.settings.start_year = year;
                    self.save_settings();
                }
                self.start_year = v;
                Task::none()
            }
            Message::EndYearChanged(v) => {
                self.end_year = v;
                Task::none()
            }

            // -- Report --
            Message::Draw => {
                let Some(dataset) = self.dataset.clone() else {
                    self.status_text = "Load the rating data first.".to_string();
                    return Task::none();
                };
                let years = parse_year(&self.start_year)
                    .and_then(|s| parse_year(&self.end_year).map(|e| (s, e)));
                let (year_start, year_end) = match years {
                    Ok(y) => y,
                    Err(e) => {
                        self.status_text = format!("Error: {}", e);
                        return Task::none();
                    }
                };

                let mut request = ReportRequest::new(self.roster.text(), year_start, year_end);
                request.font_path = self.settings.font_path.clone();
                let cached = self.font.clone();

                self.is_running = true;
                self.status_text = "Drawing...".to_string();
                Task::perform(
                    async move {
                        let font = cached.unwrap_or_else(|| {
                            ChartFont(pipeline::load_report_font(&request).map(Arc::new))
                        });
                        let result =
                            pipeline::run_report_with_font(&request, &dataset, font.0.as_deref())
                                .map(Arc::new)
                                .map_err(|e| format!("{:#}", e));
                        (font, result)
                    },
                    |(font, result)| Message::ReportCompleted(font, result),
                )
            }
            Message::ReportCompleted(font, result) => {
                self.is_running = false;
                self.font = Some(font);
                match result {
                    Ok(output) => {
                        self.status_text = format!(
                            "Found {} member numbers; {} shown.",
                            output.names.len(),
                            output.report.players.len()
                        );
                        self.chart = Some(image::Handle::from_bytes(output.chart_png.clone()));
                        self.output = Some(output);
                    }
                    Err(e) => {
                        self.status_text = format!("Error: {}", e);
                    }
                }
                Task::none()
            }

            // -- Export --
            Message::BrowseWorkbook => Task::perform(
                async {
                    let file = rfd::AsyncFileDialog::new()
                        .add_filter("Excel workbook", &["xlsx"])
                        .set_file_name("rating report.xlsx")
                        .save_file()
                        .await;
                    file.map(|f| f.path().to_path_buf())
                },
                Message::WorkbookSelected,
            ),
            Message::WorkbookSelected(path) => {
                let (Some(path), Some(output)) = (path, self.output.clone()) else {
                    return Task::none();
                };
                Task::perform(
                    async move {
                        tables::write_workbook(&output.report, Some(&output.chart_png), &path)
                            .map(|_| format!("Saved {}", path.display()))
                            .map_err(|e| format!("{:#}", e))
                    },
                    Message::WorkbookSaved,
                )
            }
            Message::WorkbookSaved(result) => {
                self.status_text = match result {
                    Ok(s) => s,
                    Err(e) => format!("Error: {}", e),
                };
                Task::none()
            }
        }
    }
}

fn parse_year(s: &str) -> Result<i32, String> {
    let year: i32 = s
        .trim()
        .parse()
        .map_err(|_| format!("Invalid year: '{}'", s))?;
    if (YEAR_MIN..=YEAR_MAX).contains(&year) {
        Ok(year)
    } else {
        Err(format!("Year must be between {} and {}", YEAR_MIN, YEAR_MAX))
    }
}

// ============================================================================
// View
// ============================================================================

impl App {
    fn view(&self) -> Element<'_, Message> {
        let disabled = self.is_running;

        let header = column![
            text("Rating Graph").size(28),
            text(self.last_updated_line()).size(14),
        ]
        .spacing(4);

        let notes = column(
            USAGE_NOTES
                .iter()
                .map(|note| text(*note).size(13).into())
                .chain(std::iter::once(text(self.coverage_note()).size(13).into()))
                .collect::<Vec<Element<'_, Message>>>(),
        )
        .spacing(2);

        let mut browse = button(text("Browse").size(13));
        if !disabled {
            browse = browse.on_press(Message::BrowseData);
        }
        let data_row = row![
            text("Rating data:").width(130),
            text_input("Select file...", &self.data_path)
                .on_input_maybe(if disabled {
                    None
                } else {
                    Some(Message::DataPathChanged)
                })
                .on_submit(Message::LoadData)
                .width(Fill),
            browse,
        ]
        .spacing(10)
        .align_y(Center);

        let years = row![
            text("Start year:").width(130),
            text_input("2019", &self.start_year)
                .on_input_maybe(if disabled {
                    None
                } else {
                    Some(Message::StartYearChanged)
                })
                .width(80),
            text("End year:"),
            text_input("", &self.end_year)
                .on_input_maybe(if disabled {
                    None
                } else {
                    Some(Message::EndYearChanged)
                })
                .width(80),
        ]
        .spacing(10)
        .align_y(Center);

        let roster = column![
            text("Paste the roster text:").size(13),
            text_editor(&self.roster)
                .placeholder("1234567 Yamada Taro")
                .on_action(Message::RosterEdited)
                .height(200),
        ]
        .spacing(4);

        let can_draw = !disabled && self.dataset.is_some();
        let draw_btn = button(text("Draw graph")).on_press_maybe(can_draw.then_some(Message::Draw));
        let save_btn = button(text("Save Excel..."))
            .on_press_maybe((!disabled && self.output.is_some()).then_some(Message::BrowseWorkbook));

        let status = column![
            text(&self.data_status)
                .size(13)
                .color(iced::Color::from_rgb(0.4, 0.4, 0.4)),
            text(&self.status_text).size(13),
        ]
        .spacing(2);

        let mut results = column![].spacing(12);
        if let Some(handle) = &self.chart {
            results = results.push(image(handle.clone()).width(Fill));
        }
        if let Some(output) = &self.output {
            results = results.push(
                container(
                    text(&output.summary)
                        .size(12)
                        .font(iced::Font::MONOSPACE),
                )
                .padding(8),
            );
        }

        let content = column![
            header,
            notes,
            rule::horizontal(1),
            data_row,
            years,
            roster,
            row![draw_btn, save_btn].spacing(10),
            status,
            rule::horizontal(1),
            results,
        ]
        .spacing(14);

        scrollable(container(content).padding(20).width(Fill)).into()
    }
}
