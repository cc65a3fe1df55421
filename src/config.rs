//! Configuration management

use crate::calendar::LocaleKind;
use crate::error::Result;
use crate::normalizer::NormalizeOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration. Every field has a default, so an empty or
/// partial file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub locale: LocaleKind,
    /// Sheet holding the workouts inside a workbook.
    pub sheet_name: String,
    /// Read `05/03/2024` as 5 March rather than May 3.
    pub day_first: bool,
    /// Workbook loaded automatically by the shell when it exists.
    pub default_file: Option<PathBuf>,
    pub chart: ChartConfig,
}

/// Chart output size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            locale: LocaleKind::Pt,
            sheet_name: "treinos".to_string(),
            day_first: true,
            default_file: None,
            chart: ChartConfig::default(),
        }
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 600,
        }
    }
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml(&text)?;
        log::info!("loaded configuration from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            locale: self.locale.locale(),
            day_first: self.day_first,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::ENGLISH;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = Config::from_toml(
            r#"
locale = "en"
day_first = false

[chart]
width = 640
"#,
        )
        .unwrap();
        assert_eq!(config.locale, LocaleKind::En);
        assert!(!config.day_first);
        assert_eq!(config.sheet_name, "treinos");
        assert_eq!(config.chart.width, 640);
        assert_eq!(config.chart.height, 600);
        assert_eq!(config.normalize_options().locale, ENGLISH);
    }

    #[test]
    fn unknown_locale_is_rejected() {
        assert!(Config::from_toml("locale = \"fr\"").is_err());
    }
}
