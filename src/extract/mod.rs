pub mod index;
pub mod pages;

use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use indicatif::{ProgressBar, ProgressStyle};
use thiserror::Error;
use tracing::{info, warn};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::anchors::RawAnchor;
use crate::engine::Engine;
use crate::error::{AlignError, ConfigError};
use crate::text::variants::expand_variants;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceFormat {
    /// OCR page text, form-feed separated or one file per page
    Pages,
    /// OCR page text searched for entry keys
    KeyedPages,
    /// `PAGE. headword (gloss)` lines
    HeadwordIndex,
    /// `headword|page` lines
    Toc,
}

impl SourceFormat {
    pub fn is_keyed(self) -> bool {
        self == SourceFormat::KeyedPages
    }
}

/// Why a single page or line contributed no anchors.
#[derive(Debug, Error)]
pub enum UnitError {
    #[error("page {page}: cannot read {path:?}")]
    Unreadable {
        page: u32,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: bad page number {value:?}")]
    BadPage { line: usize, value: String },

    #[error("line {line}: expected HEADWORD{delimiter}PAGE")]
    MissingField { line: usize, delimiter: char },
}

#[derive(Debug, Default)]
pub struct Extraction {
    pub anchors: Vec<RawAnchor>,
    pub units: usize,
    pub failed: usize,
    pub out_of_range: usize,
}

pub fn extract(path: &Path, format: SourceFormat, engine: &Engine) -> Result<Extraction, AlignError> {
    if !path.exists() {
        return Err(ConfigError::MissingInput(path.to_path_buf()).into());
    }
    let settings = &engine.settings;
    let workers = settings.workers;

    let mut extraction = match format {
        SourceFormat::Pages => {
            let units = pages::load_pages(path, settings.first_page)?;
            let marker = engine.marker();
            let replacements = engine.replacements();
            run_units(&units, workers, |unit| {
                let text = unit.text()?;
                let text = pages::apply_replacements(&text, replacements);
                Ok(pages::marked_headwords(&text, marker)
                    .iter()
                    .flat_map(|h| expand_variants(h))
                    .map(|v| RawAnchor::new(unit.page, v))
                    .collect())
            })
        }
        SourceFormat::KeyedPages => {
            let key_re = engine.key_regex().ok_or(ConfigError::MissingKeyPattern)?;
            let units = pages::load_pages(path, settings.first_page)?;
            let replacements = engine.replacements();
            run_units(&units, workers, |unit| {
                let text = unit.text()?;
                let text = pages::apply_replacements(&text, replacements);
                Ok(pages::page_keys(&text, key_re)
                    .into_iter()
                    .map(|k| RawAnchor::new(unit.page, k))
                    .collect())
            })
        }
        SourceFormat::HeadwordIndex | SourceFormat::Toc => {
            let content = fs::read_to_string(path).map_err(|source| AlignError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            let lines: Vec<(usize, &str)> = content.lines().enumerate().map(|(i, l)| (i + 1, l)).collect();
            let delimiter = settings.delimiter;
            run_units(&lines, workers, |&(line_no, line)| {
                let parsed = if format == SourceFormat::Toc {
                    index::parse_toc_line(line_no, line, delimiter)?
                } else {
                    index::parse_headword_line(line_no, line)?
                };
                Ok(parsed
                    .map(|(page, head)| {
                        expand_variants(&head)
                            .into_iter()
                            .map(|v| RawAnchor::new(page, v))
                            .collect()
                    })
                    .unwrap_or_default())
            })
        }
    };

    let range = settings.page_range();
    let before = extraction.anchors.len();
    extraction.anchors.retain(|a| range.contains(&a.page));
    extraction.out_of_range = before - extraction.anchors.len();

    info!(
        source = %path.display(),
        units = extraction.units,
        failed = extraction.failed,
        anchors = extraction.anchors.len(),
        out_of_range = extraction.out_of_range,
        "extraction finished"
    );
    Ok(extraction)
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb
}

fn gather(results: Vec<Result<Vec<RawAnchor>, UnitError>>) -> Extraction {
    let mut extraction = Extraction {
        units: results.len(),
        ..Extraction::default()
    };
    for result in results {
        match result {
            Ok(anchors) => extraction.anchors.extend(anchors),
            Err(e) => {
                warn!(error = %e, "unit skipped");
                extraction.failed += 1;
            }
        }
    }
    extraction
}

#[cfg(feature = "rayon")]
fn run_units<U, F>(units: &[U], workers: usize, parse: F) -> Extraction
where
    U: Sync,
    F: Fn(&U) -> Result<Vec<RawAnchor>, UnitError> + Sync,
{
    let pb = progress_bar(units.len());
    let work = || -> Vec<_> {
        units
            .par_iter()
            .map(|u| {
                let result = parse(u);
                pb.inc(1);
                result
            })
            .collect()
    };
    let results = if workers > 0 {
        match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
            Ok(pool) => pool.install(work),
            Err(e) => {
                warn!(error = %e, workers, "thread pool unavailable, using the global pool");
                work()
            }
        }
    } else {
        work()
    };
    pb.finish_and_clear();
    gather(results)
}

#[cfg(not(feature = "rayon"))]
fn run_units<U, F>(units: &[U], _workers: usize, parse: F) -> Extraction
where
    F: Fn(&U) -> Result<Vec<RawAnchor>, UnitError>,
{
    let pb = progress_bar(units.len());
    let results = units
        .iter()
        .map(|u| {
            let result = parse(u);
            pb.inc(1);
            result
        })
        .collect();
    pb.finish_and_clear();
    gather(results)
}
