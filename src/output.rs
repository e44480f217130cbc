use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::align::Assignment;
use crate::config::Settings;
use crate::error::AlignError;

/// `TERM<DELIM>PAGE[MARK]`, with the configured page offset applied.
pub fn format_assignment(a: &Assignment, settings: &Settings) -> String {
    let page = a
        .page
        .map(|p| (p as i64 + settings.page_offset).to_string())
        .unwrap_or_default();
    let mut line = format!("{}{}{}", a.term.text, settings.delimiter, page);
    if a.interpolated || a.page.is_none() {
        line.push(settings.interpolated_marker);
    }
    line
}

pub fn write_assignments(path: &Path, assignments: &[Assignment], settings: &Settings) -> Result<(), AlignError> {
    write_lines(path, assignments.iter().map(|a| format_assignment(a, settings)))
}

/// Write through a temporary file next to `path` and rename it into place,
/// so readers never see a partial file.
pub fn write_lines<I>(path: &Path, lines: I) -> Result<(), AlignError>
where
    I: IntoIterator<Item = String>,
{
    let write_err = |source| AlignError::Write {
        path: path.to_path_buf(),
        source,
    };
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(write_err)?;

    let temp = NamedTempFile::new_in(parent).map_err(write_err)?;
    {
        let mut writer = BufWriter::new(&temp);
        for line in lines {
            writeln!(writer, "{}", line).map_err(write_err)?;
        }
        writer.flush().map_err(write_err)?;
    }
    temp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

/// Statistics of one alignment run, printed and optionally saved as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub generated_at: DateTime<Utc>,
    pub wordlist: String,
    pub source: String,
    pub strategy: String,
    pub anchors: usize,
    pub total: usize,
    pub matched: usize,
    pub interpolated: usize,
    pub skipped: usize,
    pub match_rate: f64,
    pub by_kind: BTreeMap<String, usize>,
    pub elapsed_secs: f64,
}

impl RunSummary {
    pub fn from_assignments(assignments: &[Assignment], skipped: usize, anchors: usize) -> Self {
        let total = assignments.len();
        let matched = assignments.iter().filter(|a| a.is_matched()).count();
        let interpolated = assignments.iter().filter(|a| a.interpolated).count();
        let mut by_kind = BTreeMap::new();
        for kind in assignments.iter().filter_map(|a| a.kind) {
            *by_kind.entry(kind.label().to_string()).or_insert(0) += 1;
        }
        RunSummary {
            generated_at: Utc::now(),
            wordlist: String::new(),
            source: String::new(),
            strategy: String::new(),
            anchors,
            total,
            matched,
            interpolated,
            skipped,
            match_rate: if total == 0 { 0.0 } else { matched as f64 / total as f64 },
            by_kind,
            elapsed_secs: 0.0,
        }
    }

    pub fn print(&self) {
        println!("Total:        {}", self.total);
        println!("Matched:      {}", self.matched);
        println!("Interpolated: {}", self.interpolated);
        println!("Skipped:      {}", self.skipped);
        println!("Match rate:   {:.1}%", self.match_rate * 100.0);
        for (kind, count) in &self.by_kind {
            println!("  {:<10} {}", kind, count);
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<(), AlignError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| AlignError::Write {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        write_lines(path, [json])
    }
}
