//! Roster text extraction
//!
//! Turns text pasted from an OCR tool (Google Lens run over a photo of a
//! printed roster) into a mapping of member number -> player name.
//!
//! OCR output is noisy: member numbers pick up stray prefix digits, names end
//! up on the line below their number, and full-width characters or bidi marks
//! sneak in. Each line is tried against an ordered list of patterns and the
//! first one that yields a pair wins.

use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Member number as stored in the rating data.
pub type PlayerId = u32;

/// Maximum number of players that go into a single report.
pub const MAX_REPORT_PLAYERS: usize = 7;

/// How many lines below a bare number are searched for its name.
const LOOKAHEAD_LINES: usize = 3;

lazy_static! {
    /// Leftmost digit run, optional whitespace, then a remainder that does not
    /// start with a digit (at least two characters).
    static ref INLINE_PATTERN: Regex = Regex::new(r"([0-9]+)\s*([^0-9].+)$").unwrap();
    static ref DIGIT_RUN: Regex = Regex::new(r"[0-9]+").unwrap();
}

// ============================================================================
// Name map
// ============================================================================

/// Member number -> name, in the order numbers were first seen.
///
/// Re-inserting an id replaces its name but keeps its position, so the
/// report order follows the roster order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameMap {
    entries: Vec<(PlayerId, String)>,
}

impl NameMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a name. Returns the previous name, if any.
    pub fn insert(&mut self, id: PlayerId, name: impl Into<String>) -> Option<String> {
        let name = name.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == id) {
            Some((_, current)) => Some(std::mem::replace(current, name)),
            None => {
                self.entries.push((id, name));
                None
            }
        }
    }

    pub fn get(&self, id: PlayerId) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| *existing == id)
            .map(|(_, name)| name.as_str())
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlayerId, &str)> {
        self.entries.iter().map(|(id, name)| (*id, name.as_str()))
    }

    /// All ids in first-seen order.
    pub fn ids(&self) -> Vec<PlayerId> {
        self.entries.iter().map(|(id, _)| *id).collect()
    }

    /// The ids that go into a report: the first [`MAX_REPORT_PLAYERS`].
    pub fn report_ids(&self) -> Vec<PlayerId> {
        self.entries
            .iter()
            .take(MAX_REPORT_PLAYERS)
            .map(|(id, _)| *id)
            .collect()
    }
}

// ============================================================================
// Normalization
// ============================================================================

/// Map a raw OCR digit run to a member number.
///
/// - 8 or more digits: the last 7 (OCR tends to glue a table index on the front)
/// - exactly 7 digits: as-is
/// - 6 digits starting with `9`: as-is (older member numbers)
/// - anything else: noise
pub fn canonical_id(digits: &str) -> Option<PlayerId> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let len = digits.len();
    let kept = if len >= 8 {
        &digits[len - 7..]
    } else if len == 7 || (len == 6 && digits.starts_with('9')) {
        digits
    } else {
        return None;
    };

    kept.parse().ok()
}

/// NFKC-normalize (full-width digits and spaces become ASCII) and drop
/// bidirectional formatting marks.
pub fn normalize_text(text: &str) -> String {
    text.nfkc().filter(|c| !is_bidi_control(*c)).collect()
}

fn is_bidi_control(c: char) -> bool {
    matches!(c, '\u{200E}' | '\u{200F}' | '\u{202A}'..='\u{202E}')
}

fn is_line_boundary(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\u{0B}' | '\u{0C}' | '\u{1C}' | '\u{1D}' | '\u{1E}' | '\u{85}'
            | '\u{2028}'
            | '\u{2029}'
    )
}

/// Split on every Unicode line boundary (`\r\n` counts once) and trim each line.
fn split_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if is_line_boundary(c) {
            if c == '\r' && chars.peek() == Some(&'\n') {
                chars.next();
            }
            lines.push(current.trim().to_string());
            current.clear();
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        lines.push(current.trim().to_string());
    }

    lines
}

fn is_all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

// ============================================================================
// Extraction
// ============================================================================

/// One way of reading a (number, name) pair out of the line at `index`.
type Attempt = fn(&[String], usize) -> Vec<(PlayerId, String)>;

/// Tried in order; the first attempt that finds anything wins.
const ATTEMPTS: [Attempt; 2] = [inline_pair, lookahead_pairs];

/// `1234567 山田太郎` on a single line.
fn inline_pair(lines: &[String], index: usize) -> Vec<(PlayerId, String)> {
    let Some(caps) = INLINE_PATTERN.captures(&lines[index]) else {
        return Vec::new();
    };

    let name = caps[2].trim();
    match canonical_id(&caps[1]) {
        Some(id) if !name.is_empty() => vec![(id, name.to_string())],
        _ => Vec::new(),
    }
}

/// Numbers on this line, name on one of the next few lines.
fn lookahead_pairs(lines: &[String], index: usize) -> Vec<(PlayerId, String)> {
    DIGIT_RUN
        .find_iter(&lines[index])
        .filter_map(|m| canonical_id(m.as_str()))
        .filter_map(|id| lookahead_name(lines, index).map(|name| (id, name)))
        .collect()
}

/// First non-empty, not purely numeric line among the next [`LOOKAHEAD_LINES`].
fn lookahead_name(lines: &[String], index: usize) -> Option<String> {
    let end = (index + 1 + LOOKAHEAD_LINES).min(lines.len());
    lines
        .get(index + 1..end)?
        .iter()
        .map(|line| line.trim())
        .find(|line| !line.is_empty() && !is_all_digits(line))
        .map(str::to_string)
}

/// Extract the member number -> name mapping from pasted roster text.
pub fn extract_name_map(text: &str) -> NameMap {
    let normalized = normalize_text(text);
    let lines = split_lines(&normalized);

    let mut names = NameMap::new();
    for index in 0..lines.len() {
        if lines[index].is_empty() {
            continue;
        }

        for attempt in ATTEMPTS {
            let pairs = attempt(&lines, index);
            if pairs.is_empty() {
                continue;
            }
            for (id, name) in pairs {
                if let Some(previous) = names.insert(id, name) {
                    log::debug!("Member {} seen again (was '{}')", id, previous);
                }
            }
            break;
        }
    }

    log::info!("Extracted {} member numbers from pasted text", names.len());
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_id_long_runs_keep_last_seven() {
        assert_eq!(canonical_id("12345678"), Some(2345678));
        assert_eq!(canonical_id("001234567"), Some(1234567));
        assert_eq!(canonical_id("98765432101"), Some(5432101));
    }

    #[test]
    fn test_canonical_id_short_runs() {
        assert_eq!(canonical_id("1234567"), Some(1234567));
        assert_eq!(canonical_id("912345"), Some(912345));
        assert_eq!(canonical_id("812345"), None);
        assert_eq!(canonical_id("12345"), None);
        assert_eq!(canonical_id(""), None);
        assert_eq!(canonical_id("12a4567"), None);
    }

    #[test]
    fn test_inline_name() {
        let names = extract_name_map("1234567 Taro");
        assert_eq!(names.len(), 1);
        assert_eq!(names.get(1234567), Some("Taro"));
    }

    #[test]
    fn test_name_on_next_line() {
        let names = extract_name_map("1234567\nTaro");
        assert_eq!(names.len(), 1);
        assert_eq!(names.get(1234567), Some("Taro"));
    }

    #[test]
    fn test_lookahead_skips_blank_and_numeric_lines() {
        let names = extract_name_map("1234567\n\n42\n山田 花子");
        assert_eq!(names.get(1234567), Some("山田 花子"));
    }

    #[test]
    fn test_lookahead_stops_after_three_lines() {
        let names = extract_name_map("1234567\n1\n2\n3\nTaro");
        assert!(names.is_empty());
    }

    #[test]
    fn test_full_width_digits_and_spaces() {
        let names = extract_name_map("１２３４５６７\u{3000}山田太郎");
        assert_eq!(names.get(1234567), Some("山田太郎"));
    }

    #[test]
    fn test_bidi_marks_are_stripped() {
        let names = extract_name_map("123\u{200E}4567 Taro\u{202C}");
        assert_eq!(names.get(1234567), Some("Taro"));
    }

    #[test]
    fn test_prefixed_table_index() {
        let names = extract_name_map("11234567 Hanako");
        assert_eq!(names.get(1234567), Some("Hanako"));
    }

    #[test]
    fn test_noise_digits_are_ignored() {
        let names = extract_name_map("No. 12\nRound 3 Table 4\n");
        assert!(names.is_empty());
    }

    #[test]
    fn test_inline_failure_falls_back_to_lookahead() {
        // "12" is the inline candidate and is rejected; the 7-digit run then
        // looks ahead for its name.
        let names = extract_name_map("12 1234567\nTaro");
        assert_eq!(names.get(1234567), Some("Taro"));
    }

    #[test]
    fn test_several_numbers_share_lookahead_name() {
        let names = extract_name_map("12 1234567 7654321\nTaro");
        assert_eq!(names.ids(), vec![1234567, 7654321]);
        assert_eq!(names.get(1234567), Some("Taro"));
        assert_eq!(names.get(7654321), Some("Taro"));
    }

    #[test]
    fn test_trailing_number_reads_as_inline_name() {
        // The inline pattern only needs a non-digit after the first run, and
        // the separating space is enough.
        let names = extract_name_map("1234567 7654321\nTaro");
        assert_eq!(names.len(), 1);
        assert_eq!(names.get(1234567), Some("7654321"));
    }

    #[test]
    fn test_last_write_wins_and_keeps_position() {
        let names = extract_name_map("1234567 Taro\n7654321 Jiro\n1234567 Saburo");
        assert_eq!(names.ids(), vec![1234567, 7654321]);
        assert_eq!(names.get(1234567), Some("Saburo"));
    }

    #[test]
    fn test_crlf_and_blank_lines() {
        let names = extract_name_map("\r\n1234567\r\n\r\nTaro\r\n\r\n");
        assert_eq!(names.get(1234567), Some("Taro"));
    }

    #[test]
    fn test_report_ids_capped() {
        let text: String = (0..10)
            .map(|i| format!("{} Player{}\n", 1_000_000 + i, i))
            .collect();
        let names = extract_name_map(&text);
        assert_eq!(names.len(), 10);
        assert_eq!(
            names.report_ids(),
            (0..7).map(|i| 1_000_000 + i).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_name_map_insert_returns_previous() {
        let mut names = NameMap::new();
        assert_eq!(names.insert(1, "a"), None);
        assert_eq!(names.insert(1, "b"), Some("a".to_string()));
        assert!(names.contains(1));
        assert!(!names.contains(2));
    }
}
