//! Rating chart rendering
//!
//! Rasterizes the rating-vs-date line chart onto an RGB pixel buffer and
//! encodes it as PNG. The look follows the graphs the club already shares (ggplot
//! style): grey plot area, green dashed grid, one colored line with round markers
//! per player, yearly ticks on the date axis and a legend in the upper-left
//! corner.
//!
//! Text is drawn with a TrueType font through `ab_glyph`. Without a font the
//! chart is still drawn, just without any labels.

use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::Path;

pub type Rgb = (u8, u8, u8);

/// Series colors in player order (matplotlib's r, g, b, c, m, y, k).
pub const SERIES_COLORS: [Rgb; 7] = [
    (255, 0, 0),
    (0, 128, 0),
    (0, 0, 255),
    (0, 191, 191),
    (191, 0, 191),
    (191, 191, 0),
    (0, 0, 0),
];

pub fn series_color(index: usize) -> Rgb {
    SERIES_COLORS[index % SERIES_COLORS.len()]
}

const BACKGROUND: Rgb = (255, 255, 255);
const PLOT_BACKGROUND: Rgb = (229, 229, 229);
const GRID: Rgb = (0, 128, 0);
const TEXT: Rgb = (30, 30, 30);
const TICK_TEXT: Rgb = (77, 77, 77);
const LEGEND_BORDER: Rgb = (204, 204, 204);

/// Value axis used when no point falls inside the date range.
const DEFAULT_VALUE_RANGE: (f64, f64) = (0.0, 1.0);

/// Upper bound on value-axis ticks.
const MAX_TICKS: usize = 100;

/// Layout constants assume a 1200 px tall chart and scale from there.
const REFERENCE_HEIGHT: f32 = 1200.0;

/// One player's line.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    /// Legend text (the member number)
    pub label: String,
    pub color: Rgb,
    /// Date-sorted (date, rating) points
    pub points: Vec<(NaiveDate, f64)>,
}

/// Chart size, date range and captions.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartConfig {
    pub width: u32,
    pub height: u32,
    /// The date axis runs from Jan 1 of `year_start`...
    pub year_start: i32,
    /// ...to Dec 31 of `year_end`
    pub year_end: i32,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    /// Line width at reference size
    pub line_width: f32,
    /// Marker radius at reference size
    pub marker_radius: f32,
}

impl ChartConfig {
    pub fn for_years(year_start: i32, year_end: i32) -> Self {
        Self {
            width: 1800,
            height: 1200,
            year_start,
            year_end,
            title: "Rating Graph".to_string(),
            x_label: "date".to_string(),
            y_label: "Rating".to_string(),
            line_width: 3.0,
            marker_radius: 7.0,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

// ============================================================================
// Fonts
// ============================================================================

/// Font files tried in order. CJK-capable fonts come first since roster names
/// are usually Japanese.
const FONT_CANDIDATES: &[&str] = &[
    "/System/Library/Fonts/ヒラギノ角ゴシック W3.ttc",
    "/System/Library/Fonts/Hiragino Sans GB.ttc",
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/google-noto-cjk/NotoSansCJK-Regular.ttc",
    "C:\\Windows\\Fonts\\meiryo.ttc",
    "C:\\Windows\\Fonts\\msgothic.ttc",
    "/System/Library/Fonts/Helvetica.ttc",
    "/Library/Fonts/Arial.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
];

fn font_from_file(path: &Path) -> Option<FontVec> {
    let data = std::fs::read(path).ok()?;
    FontVec::try_from_vec_and_index(data.clone(), 0)
        .or_else(|_| FontVec::try_from_vec(data))
        .ok()
}

/// Load `preferred` if given, otherwise the first system font that parses.
pub fn load_font(preferred: Option<&Path>) -> Result<FontVec> {
    if let Some(path) = preferred {
        match font_from_file(path) {
            Some(font) => {
                log::info!("Loaded font: {}", path.display());
                return Ok(font);
            }
            None => log::warn!("Could not load font {}, trying system fonts", path.display()),
        }
    }

    for candidate in FONT_CANDIDATES {
        if let Some(font) = font_from_file(Path::new(candidate)) {
            log::info!("Loaded font: {}", candidate);
            return Ok(font);
        }
    }
    anyhow::bail!("No system font found. Tried: {}", FONT_CANDIDATES.join(", "))
}

/// Measure the width of a string at a given font height (in pixels).
pub fn measure_text_width(font: &FontVec, text: &str, font_height: f32) -> f32 {
    let scale = PxScale::from(font_height);
    let scaled = font.as_scaled(scale);
    text.chars()
        .map(|ch| scaled.h_advance(scaled.glyph_id(ch)))
        .sum()
}

// ============================================================================
// Canvas
// ============================================================================

/// Pixel rectangle, `x0..x1` by `y0..y1` (end exclusive).
#[derive(Debug, Clone, Copy, PartialEq)]
struct Rect {
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
}

impl Rect {
    fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    fn height(&self) -> f32 {
        self.y1 - self.y0
    }
}

/// Row-major RGB buffer.
struct Canvas {
    pixels: Vec<u8>,
    width: usize,
    height: usize,
}

impl Canvas {
    fn new(width: usize, height: usize, background: Rgb) -> Self {
        let mut pixels = Vec::with_capacity(width * height * 3);
        for _ in 0..width * height {
            pixels.extend_from_slice(&[background.0, background.1, background.2]);
        }
        Self {
            pixels,
            width,
            height,
        }
    }

    fn full(&self) -> Rect {
        Rect {
            x0: 0.0,
            y0: 0.0,
            x1: self.width as f32,
            y1: self.height as f32,
        }
    }

    /// Alpha-blend `color` over one pixel. Out-of-bounds writes are dropped.
    fn blend(&mut self, x: i64, y: i64, color: Rgb, alpha: f32) {
        if alpha.is_nan()
            || alpha <= 0.0
            || x < 0
            || y < 0
            || x as usize >= self.width
            || y as usize >= self.height
        {
            return;
        }
        let alpha = alpha.min(1.0);
        let inv = 1.0 - alpha;
        let idx = (y as usize * self.width + x as usize) * 3;
        self.pixels[idx] = (color.0 as f32 * alpha + self.pixels[idx] as f32 * inv) as u8;
        self.pixels[idx + 1] = (color.1 as f32 * alpha + self.pixels[idx + 1] as f32 * inv) as u8;
        self.pixels[idx + 2] = (color.2 as f32 * alpha + self.pixels[idx + 2] as f32 * inv) as u8;
    }

    fn fill_rect(&mut self, rect: Rect, color: Rgb, alpha: f32) {
        let y_range = (rect.y0.round() as i64).max(0)..(rect.y1.round() as i64).min(self.height as i64);
        let x_range = (rect.x0.round() as i64).max(0)..(rect.x1.round() as i64).min(self.width as i64);
        for y in y_range {
            for x in x_range.clone() {
                self.blend(x, y, color, alpha);
            }
        }
    }

    fn stroke_rect(&mut self, rect: Rect, color: Rgb) {
        let (x0, y0, x1, y1) = (rect.x0, rect.y0, rect.x1, rect.y1);
        self.fill_rect(Rect { x0, y0, x1, y1: y0 + 1.0 }, color, 1.0);
        self.fill_rect(Rect { x0, y0: y1 - 1.0, x1, y1 }, color, 1.0);
        self.fill_rect(Rect { x0, y0, x1: x0 + 1.0, y1 }, color, 1.0);
        self.fill_rect(Rect { x0: x1 - 1.0, y0, x1, y1 }, color, 1.0);
    }

    /// Anti-aliased filled circle, clipped to `clip`.
    fn disc(&mut self, cx: f32, cy: f32, radius: f32, color: Rgb, clip: Rect) {
        let reach = radius + 1.0;
        let x_min = ((cx - reach).floor() as i64).max(clip.x0 as i64);
        let x_max = ((cx + reach).ceil() as i64).min(clip.x1 as i64 - 1);
        let y_min = ((cy - reach).floor() as i64).max(clip.y0 as i64);
        let y_max = ((cy + reach).ceil() as i64).min(clip.y1 as i64 - 1);

        for y in y_min..=y_max {
            for x in x_min..=x_max {
                let dist = (x as f32 + 0.5 - cx).hypot(y as f32 + 0.5 - cy);
                self.blend(x, y, color, radius + 0.5 - dist);
            }
        }
    }

    /// Anti-aliased line segment with round caps, clipped to `clip`.
    fn segment(&mut self, a: (f32, f32), b: (f32, f32), half_width: f32, color: Rgb, clip: Rect) {
        let (dx, dy) = (b.0 - a.0, b.1 - a.1);
        if dx == 0.0 && dy == 0.0 {
            self.disc(a.0, a.1, half_width, color, clip);
            return;
        }

        let reach = half_width + 1.0;
        let x_min = ((a.0.min(b.0) - reach).floor() as i64).max(clip.x0 as i64);
        let x_max = ((a.0.max(b.0) + reach).ceil() as i64).min(clip.x1 as i64 - 1);
        let y_min = ((a.1.min(b.1) - reach).floor() as i64).max(clip.y0 as i64);
        let y_max = ((a.1.max(b.1) + reach).ceil() as i64).min(clip.y1 as i64 - 1);
        if x_min > x_max || y_min > y_max {
            return;
        }

        // Walk the major axis and only visit a narrow band around the line.
        let cover = |canvas: &mut Self, x: i64, y: i64| {
            let dist = distance_to_segment((x as f32 + 0.5, y as f32 + 0.5), a, b);
            canvas.blend(x, y, color, half_width + 0.5 - dist);
        };

        if dx.abs() >= dy.abs() {
            let band = reach * (1.0 + (dy / dx).powi(2)).sqrt() + 1.0;
            for x in x_min..=x_max {
                let t = ((x as f32 + 0.5 - a.0) / dx).clamp(0.0, 1.0);
                let cy = a.1 + t * dy;
                let ys = ((cy - band).floor() as i64).max(y_min);
                let ye = ((cy + band).ceil() as i64).min(y_max);
                for y in ys..=ye {
                    cover(self, x, y);
                }
            }
        } else {
            let band = reach * (1.0 + (dx / dy).powi(2)).sqrt() + 1.0;
            for y in y_min..=y_max {
                let t = ((y as f32 + 0.5 - a.1) / dy).clamp(0.0, 1.0);
                let cx = a.0 + t * dx;
                let xs = ((cx - band).floor() as i64).max(x_min);
                let xe = ((cx + band).ceil() as i64).min(x_max);
                for x in xs..=xe {
                    cover(self, x, y);
                }
            }
        }
    }

    /// Straight dashed line made of `dash`-long segments separated by `gap`.
    #[allow(clippy::too_many_arguments)]
    fn dashed_line(
        &mut self,
        a: (f32, f32),
        b: (f32, f32),
        half_width: f32,
        dash: f32,
        gap: f32,
        color: Rgb,
        clip: Rect,
    ) {
        let length = (b.0 - a.0).hypot(b.1 - a.1);
        if !length.is_finite() || length == 0.0 {
            return;
        }
        let (ux, uy) = ((b.0 - a.0) / length, (b.1 - a.1) / length);
        let period = (dash + gap).max(1.0);

        let mut t = 0.0;
        while t < length {
            let end = (t + dash).min(length);
            self.segment(
                (a.0 + ux * t, a.1 + uy * t),
                (a.0 + ux * end, a.1 + uy * end),
                half_width,
                color,
                clip,
            );
            t += period;
        }
    }

    /// Draw anti-aliased text with its top-left corner at (`x`, `y`).
    fn text(&mut self, font: &FontVec, text: &str, x: f32, y: f32, font_height: f32, fg: Rgb) {
        let scale = PxScale::from(font_height);
        let scaled_font = font.as_scaled(scale);

        let mut cursor_x = x;
        for ch in text.chars() {
            let glyph_id = scaled_font.glyph_id(ch);
            let glyph = glyph_id.with_scale_and_position(
                scale,
                ab_glyph::point(cursor_x, y + scaled_font.ascent()),
            );

            if let Some(outlined) = font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                outlined.draw(|gx, gy, coverage| {
                    self.blend(
                        bounds.min.x as i64 + gx as i64,
                        bounds.min.y as i64 + gy as i64,
                        fg,
                        coverage,
                    );
                });
            }

            cursor_x += scaled_font.h_advance(glyph_id);
        }
    }

    /// Draw text rotated 90° counter-clockwise (reading bottom to top), with
    /// the rotated box's top-left corner at (`x`, `y`).
    fn text_vertical(&mut self, font: &FontVec, text: &str, x: f32, y: f32, font_height: f32, fg: Rgb) {
        let scale = PxScale::from(font_height);
        let scaled_font = font.as_scaled(scale);
        let mask_w = measure_text_width(font, text, font_height).ceil() as usize + 1;
        let mask_h = scaled_font.height().ceil() as usize + 1;
        let mut mask = vec![0f32; mask_w * mask_h];

        let mut cursor_x = 0.0;
        for ch in text.chars() {
            let glyph_id = scaled_font.glyph_id(ch);
            let glyph = glyph_id
                .with_scale_and_position(scale, ab_glyph::point(cursor_x, scaled_font.ascent()));
            if let Some(outlined) = font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                outlined.draw(|gx, gy, coverage| {
                    let mx = bounds.min.x as i64 + gx as i64;
                    let my = bounds.min.y as i64 + gy as i64;
                    if mx >= 0 && my >= 0 && (mx as usize) < mask_w && (my as usize) < mask_h {
                        let idx = my as usize * mask_w + mx as usize;
                        mask[idx] = mask[idx].max(coverage);
                    }
                });
            }
            cursor_x += scaled_font.h_advance(glyph_id);
        }

        let (ox, oy) = (x as i64, y as i64);
        for my in 0..mask_h {
            for mx in 0..mask_w {
                let coverage = mask[my * mask_w + mx];
                if coverage > 0.0 {
                    self.blend(ox + my as i64, oy + (mask_w - 1 - mx) as i64, fg, coverage);
                }
            }
        }
    }
}

fn distance_to_segment(p: (f32, f32), a: (f32, f32), b: (f32, f32)) -> f32 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq == 0.0 {
        0.0
    } else {
        (((p.0 - a.0) * dx + (p.1 - a.1) * dy) / len_sq).clamp(0.0, 1.0)
    };
    (p.0 - (a.0 + t * dx)).hypot(p.1 - (a.1 + t * dy))
}

// ============================================================================
// Axes
// ============================================================================

/// Jan 1 of the first year to Dec 31 of the last.
struct TimeAxis {
    start: NaiveDate,
    end: NaiveDate,
    span_days: f64,
    year_start: i32,
    year_end: i32,
}

impl TimeAxis {
    fn new(year_start: i32, year_end: i32) -> Result<Self> {
        let (year_start, year_end) = (year_start.min(year_end), year_start.max(year_end));
        let start = NaiveDate::from_ymd_opt(year_start, 1, 1)
            .with_context(|| format!("Year {} is out of range", year_start))?;
        let end = NaiveDate::from_ymd_opt(year_end, 12, 31)
            .with_context(|| format!("Year {} is out of range", year_end))?;
        Ok(Self {
            start,
            end,
            span_days: (end - start).num_days() as f64,
            year_start,
            year_end,
        })
    }

    fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Position of `date` along the axis, 0.0 at the start and 1.0 at the end.
    fn fraction(&self, date: NaiveDate) -> f32 {
        ((date - self.start).num_days() as f64 / self.span_days) as f32
    }

    /// Jan 1 of every year on the axis.
    fn year_ticks(&self) -> Vec<(i32, NaiveDate)> {
        (self.year_start..=self.year_end)
            .filter_map(|y| NaiveDate::from_ymd_opt(y, 1, 1).map(|d| (y, d)))
            .collect()
    }
}

/// Value range of the points inside the date range, padded by 5%.
fn value_range(series: &[ChartSeries], axis: &TimeAxis) -> (f64, f64) {
    let visible = series
        .iter()
        .flat_map(|s| s.points.iter())
        .filter(|(date, _)| axis.contains(*date))
        .map(|(_, v)| *v);

    let (min, max) = visible.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() || !max.is_finite() {
        return DEFAULT_VALUE_RANGE;
    }

    let span = max - min;
    let pad = if span > f64::EPSILON {
        span * 0.05
    } else {
        (max.abs() * 0.05).max(1.0)
    };
    let (lo, hi) = (min - pad, max + pad);
    if !(hi - lo).is_finite() {
        log::warn!("Rating values {} to {} are out of range; using default axis", min, max);
        return DEFAULT_VALUE_RANGE;
    }
    (lo, hi)
}

/// Tick step of 1, 2, 2.5 or 5 times a power of ten giving about `target` ticks.
fn nice_step(span: f64, target: usize) -> f64 {
    let raw = span / target.max(1) as f64;
    if raw <= 0.0 || !raw.is_finite() {
        return 1.0;
    }
    let magnitude = 10f64.powf(raw.log10().floor());
    let norm = raw / magnitude;
    let nice = if norm <= 1.0 {
        1.0
    } else if norm <= 2.0 {
        2.0
    } else if norm <= 2.5 {
        2.5
    } else if norm <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

/// Ticks are counted by index, so a step below the float spacing at huge
/// values cannot stall. Repeats from rounding are dropped.
fn nice_ticks(min: f64, max: f64, target: usize) -> (Vec<f64>, f64) {
    let step = nice_step(max - min, target);
    let first = (min / step).ceil() * step;
    let mut ticks: Vec<f64> = (0..MAX_TICKS)
        .map(|i| first + i as f64 * step)
        .take_while(|v| *v <= max + step * 1e-9)
        .collect();
    ticks.dedup();
    (ticks, step)
}

/// Format with as many decimals as the step needs (2.5 -> one, 0.25 -> two).
fn format_tick(value: f64, step: f64) -> String {
    let decimals = (0..6)
        .find(|&d| {
            let scaled = step * 10f64.powi(d);
            (scaled - scaled.round()).abs() < 1e-6
        })
        .unwrap_or(6) as usize;
    format!("{:.*}", decimals, value)
}

// ============================================================================
// Rendering
// ============================================================================

/// Render the chart and return PNG bytes.
pub fn render_chart(
    series: &[ChartSeries],
    config: &ChartConfig,
    font: Option<&FontVec>,
) -> Result<Vec<u8>> {
    if config.width == 0 || config.height == 0 {
        anyhow::bail!("Chart size must be non-zero ({}x{})", config.width, config.height);
    }
    let s = config.height as f32 / REFERENCE_HEIGHT;
    let width = config.width as usize;
    let height = config.height as usize;

    let plot = Rect {
        x0: (150.0 * s).round(),
        y0: (100.0 * s).round(),
        x1: (width as f32 - 50.0 * s).round(),
        y1: (height as f32 - 120.0 * s).round(),
    };
    if plot.width() < 2.0 || plot.height() < 2.0 {
        anyhow::bail!("Chart size {}x{} is too small", config.width, config.height);
    }

    let axis = TimeAxis::new(config.year_start, config.year_end)?;
    let (y_min, y_max) = value_range(series, &axis);
    let (y_ticks, y_step) = nice_ticks(y_min, y_max, 8);

    let x_of = |date: NaiveDate| plot.x0 + axis.fraction(date) * plot.width();
    // Far off-axis values are pinned well outside the plot so they stay finite
    let y_of = |value: f64| {
        let fraction = ((value - y_min) / (y_max - y_min)).clamp(-1e4, 1e4) as f32;
        plot.y1 - fraction * plot.height()
    };

    let mut canvas = Canvas::new(width, height, BACKGROUND);
    canvas.fill_rect(plot, PLOT_BACKGROUND, 1.0);

    // Grid: dashed, 2 pt wide at reference size
    let grid_half = (1.4 * s).max(1.0);
    let dash = (10.0 * s).max(3.0);
    let gap = (4.5 * s).max(2.0);
    for (_, date) in axis.year_ticks() {
        let x = x_of(date);
        canvas.dashed_line((x, plot.y1), (x, plot.y0), grid_half, dash, gap, GRID, plot);
    }
    for &value in &y_ticks {
        let y = y_of(value);
        canvas.dashed_line((plot.x0, y), (plot.x1, y), grid_half, dash, gap, GRID, plot);
    }

    // Series: lines first, markers on top
    let line_half = (config.line_width * s / 2.0).max(0.75);
    let marker_radius = (config.marker_radius * s).max(2.0);
    for line in series {
        let points: Vec<(f32, f32)> = line.points.iter().map(|&(d, v)| (x_of(d), y_of(v))).collect();
        for pair in points.windows(2) {
            canvas.segment(pair[0], pair[1], line_half, line.color, plot);
        }
        for &(x, y) in &points {
            canvas.disc(x, y, marker_radius, line.color, plot);
        }
    }

    let Some(font) = font else {
        return encode_png(&canvas.pixels, config.width, config.height);
    };

    let title_h = 42.0 * s;
    let label_h = 33.0 * s;
    let tick_h = 25.0 * s;
    let full = canvas.full();

    // Title and axis labels
    let title_w = measure_text_width(font, &config.title, title_h);
    canvas.text(font, &config.title, (full.width() - title_w) / 2.0, 30.0 * s, title_h, TEXT);

    let x_label_w = measure_text_width(font, &config.x_label, label_h);
    canvas.text(
        font,
        &config.x_label,
        plot.x0 + (plot.width() - x_label_w) / 2.0,
        plot.y1 + 60.0 * s,
        label_h,
        TEXT,
    );

    let y_label_w = measure_text_width(font, &config.y_label, label_h);
    canvas.text_vertical(
        font,
        &config.y_label,
        20.0 * s,
        plot.y0 + (plot.height() - y_label_w) / 2.0,
        label_h,
        TEXT,
    );

    // Tick labels
    for (year, date) in axis.year_ticks() {
        let label = year.to_string();
        let w = measure_text_width(font, &label, tick_h);
        canvas.text(font, &label, x_of(date) - w / 2.0, plot.y1 + 12.0 * s, tick_h, TICK_TEXT);
    }
    for &value in &y_ticks {
        let label = format_tick(value, y_step);
        let w = measure_text_width(font, &label, tick_h);
        canvas.text(
            font,
            &label,
            plot.x0 - 12.0 * s - w,
            y_of(value) - tick_h * 0.6,
            tick_h,
            TICK_TEXT,
        );
    }

    draw_legend(&mut canvas, font, series, plot, s, line_half, marker_radius);

    encode_png(&canvas.pixels, config.width, config.height)
}

fn draw_legend(
    canvas: &mut Canvas,
    font: &FontVec,
    series: &[ChartSeries],
    plot: Rect,
    s: f32,
    line_half: f32,
    marker_radius: f32,
) {
    if series.is_empty() {
        return;
    }

    let font_h = 25.0 * s;
    let row_h = font_h * 1.5;
    let pad = 12.0 * s;
    let swatch_w = 50.0 * s;
    let label_w = series
        .iter()
        .map(|line| measure_text_width(font, &line.label, font_h))
        .fold(0.0, f32::max);

    let legend = Rect {
        x0: plot.x0 + 15.0 * s,
        y0: plot.y0 + 15.0 * s,
        x1: plot.x0 + 15.0 * s + pad * 3.0 + swatch_w + label_w,
        y1: plot.y0 + 15.0 * s + pad * 2.0 + row_h * series.len() as f32,
    };
    canvas.fill_rect(legend, BACKGROUND, 0.8);
    canvas.stroke_rect(legend, LEGEND_BORDER);

    let clip = canvas.full();
    for (i, line) in series.iter().enumerate() {
        let row_top = legend.y0 + pad + row_h * i as f32;
        let mid_y = row_top + row_h / 2.0;
        let x0 = legend.x0 + pad;
        canvas.segment((x0, mid_y), (x0 + swatch_w, mid_y), line_half, line.color, clip);
        canvas.disc(x0 + swatch_w / 2.0, mid_y, marker_radius, line.color, clip);
        canvas.text(
            font,
            &line.label,
            x0 + swatch_w + pad,
            mid_y - font_h * 0.6,
            font_h,
            TEXT,
        );
    }
}

fn encode_png(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut output, width, height);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().context("Failed to write PNG header")?;
        writer
            .write_image_data(pixels)
            .context("Failed to encode chart PNG")?;
    }
    Ok(output)
}
