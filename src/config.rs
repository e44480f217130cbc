use std::path::Path;

use config::{Config, Environment, File};
use regex::Regex;
use serde::Deserialize;

use crate::error::ConfigError;

pub const ENV_PREFIX: &str = "PAGE_ALIGNER";
pub const KEY_PLACEHOLDER: &str = "<key>";

/// Run settings. Layered: defaults, optional TOML file, `PAGE_ALIGNER_*` environment,
/// then command-line overrides.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Minimum similarity for a fuzzy match to be accepted.
    pub similarity_threshold: f64,
    /// Half-width of the page window around the last confirmed page.
    pub page_tolerance: u32,
    /// Substring and prefix comparisons shorter than this are ignored.
    pub min_substring_length: usize,
    pub page_range_start: u32,
    pub page_range_end: u32,
    /// Added to every page written to the assignment file.
    pub page_offset: i64,
    /// Page number of the first unit in a page-text source.
    pub first_page: u32,
    pub delimiter: char,
    pub interpolated_marker: char,
    pub case_fold: bool,
    /// Trailing particles dropped during normalization (e.g. "la").
    pub trailing_particles: Vec<String>,
    /// Extra OCR confusions, applied after the built-in table.
    pub ocr_confusions: Vec<(String, String)>,
    pub headword_marker: String,
    /// Key search pattern for keyed page sources, with a `<key>` placeholder.
    pub key_pattern: Option<String>,
    /// Raw page-text replacements in `FROM|TO` form.
    pub replacements: Vec<String>,
    /// Extraction threads; 0 uses the rayon default.
    pub workers: usize,
    /// Collapse singular/plural anchor pairs into the singular form.
    pub plural_rule: bool,
    pub dedup_threshold: f64,
    pub dedup_window: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            similarity_threshold: 0.80,
            page_tolerance: 2,
            min_substring_length: 6,
            page_range_start: 1,
            page_range_end: 1000,
            page_offset: 0,
            first_page: 1,
            delimiter: '|',
            interpolated_marker: '?',
            case_fold: true,
            trailing_particles: Vec::new(),
            ocr_confusions: Vec::new(),
            headword_marker: r"\[T\]".to_string(),
            key_pattern: None,
            replacements: Vec::new(),
            workers: 0,
            plural_rule: false,
            dedup_threshold: 0.80,
            dedup_window: 8,
        }
    }
}

impl Settings {
    pub fn load(path: Option<&Path>) -> Result<Settings, ConfigError> {
        let mut builder = Config::builder();
        if let Some(p) = path {
            if !p.exists() {
                return Err(ConfigError::MissingInput(p.to_path_buf()));
            }
            builder = builder.add_source(File::from(p).required(true));
        }
        let settings: Settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for t in [self.similarity_threshold, self.dedup_threshold] {
            if !(t > 0.0 && t <= 1.0) {
                return Err(ConfigError::Threshold(t));
            }
        }
        if self.page_range_start > self.page_range_end {
            return Err(ConfigError::PageRange {
                start: self.page_range_start,
                end: self.page_range_end,
            });
        }
        if self.delimiter == self.interpolated_marker
            || self.delimiter.is_whitespace()
            || self.interpolated_marker.is_whitespace()
        {
            return Err(ConfigError::Delimiter);
        }
        self.marker_regex()?;
        self.key_regex()?;
        self.replacement_pairs()?;
        Ok(())
    }

    pub fn page_range(&self) -> std::ops::RangeInclusive<u32> {
        self.page_range_start..=self.page_range_end
    }

    pub fn midpoint_page(&self) -> u32 {
        self.page_range_start + (self.page_range_end - self.page_range_start) / 2
    }

    pub fn marker_regex(&self) -> Result<Regex, ConfigError> {
        Regex::new(&self.headword_marker).map_err(|source| ConfigError::Pattern {
            name: "headword marker",
            pattern: self.headword_marker.clone(),
            source,
        })
    }

    /// The key pattern with its placeholder turned into a named `key` group.
    pub fn key_regex(&self) -> Result<Option<Regex>, ConfigError> {
        let Some(template) = &self.key_pattern else {
            return Ok(None);
        };
        if !template.contains(KEY_PLACEHOLDER) {
            return Err(ConfigError::KeyPlaceholder(template.clone()));
        }
        let pattern = template.replace(KEY_PLACEHOLDER, r"(?P<key>\d+)");
        Regex::new(&pattern)
            .map(Some)
            .map_err(|source| ConfigError::Pattern {
                name: "key",
                pattern,
                source,
            })
    }

    pub fn replacement_pairs(&self) -> Result<Vec<(String, String)>, ConfigError> {
        self.replacements
            .iter()
            .map(|raw| {
                raw.split_once('|')
                    .map(|(from, to)| (from.to_string(), to.to_string()))
                    .ok_or_else(|| ConfigError::Replacement(raw.clone()))
            })
            .collect()
    }
}
