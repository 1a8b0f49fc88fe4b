//! Persisted settings: `~/.rating-graph.conf`
//!
//! Plain `key=value` lines. Unknown keys and unparsable values are ignored,
//! and a missing file means defaults.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// First year shown when nothing is configured.
pub const DEFAULT_START_YEAR: i32 = 2019;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Rating history CSV
    pub data_csv: Option<PathBuf>,
    pub start_year: i32,
    /// Font used for chart text, tried before the system fonts
    pub font_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_csv: None,
            start_year: DEFAULT_START_YEAR,
            font_path: None,
        }
    }
}

/// Get the config file path: ~/.rating-graph.conf
pub fn config_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".rating-graph.conf"))
}

impl Settings {
    pub fn parse(content: &str) -> Self {
        let mut settings = Self::default();

        for line in content.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "data_csv" if !value.is_empty() => settings.data_csv = Some(PathBuf::from(value)),
                "font_path" if !value.is_empty() => settings.font_path = Some(PathBuf::from(value)),
                "start_year" => match value.parse() {
                    Ok(year) => settings.start_year = year,
                    Err(_) => log::warn!("Ignoring invalid start_year '{}' in settings", value),
                },
                _ => {}
            }
        }

        settings
    }

    pub fn to_config_string(&self) -> String {
        let path_str = |p: &Option<PathBuf>| {
            p.as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        };
        format!(
            "data_csv={}\nstart_year={}\nfont_path={}\n",
            path_str(&self.data_csv),
            self.start_year,
            path_str(&self.font_path)
        )
    }

    /// Load from `path`; a missing or unreadable file yields defaults.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::default(),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_config_string())
            .with_context(|| format!("Failed to write settings: {}", path.display()))
    }

    /// Load from the default location.
    pub fn load() -> Self {
        config_path()
            .map(|p| Self::load_from(&p))
            .unwrap_or_default()
    }

    /// Save to the default location. Does nothing without a home directory.
    pub fn save(&self) -> Result<()> {
        match config_path() {
            Some(path) => self.save_to(&path),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_empty() {
        assert_eq!(Settings::parse(""), Settings::default());
        assert_eq!(Settings::default().start_year, 2019);
    }

    #[test]
    fn test_parse_known_keys_and_ignore_others() {
        let s = Settings::parse(
            "data_csv = /data/rating.csv\nstart_year=2021\ntheme=dark\nnot a setting\nfont_path=\n",
        );
        assert_eq!(s.data_csv, Some(PathBuf::from("/data/rating.csv")));
        assert_eq!(s.start_year, 2021);
        assert_eq!(s.font_path, None);
    }

    #[test]
    fn test_invalid_year_keeps_default() {
        assert_eq!(Settings::parse("start_year=soon").start_year, DEFAULT_START_YEAR);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.conf");
        let settings = Settings {
            data_csv: Some(PathBuf::from("/data/レイティング.csv")),
            start_year: 2020,
            font_path: Some(PathBuf::from("/fonts/a.ttf")),
        };
        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path), settings);
        assert_eq!(Settings::load_from(&dir.path().join("missing.conf")), Settings::default());
    }
}
