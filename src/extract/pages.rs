use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use super::UnitError;
use crate::error::AlignError;

// Start of another tagged field, e.g. `[ML]`, `[MT]`, `[T]`.
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*\[[A-Z]+\]").unwrap());

const FORM_FEED: char = '\u{000C}';

#[derive(Debug)]
enum PageSource {
    Inline(String),
    File(PathBuf),
}

/// One page of extracted text, read lazily when it comes from its own file.
#[derive(Debug)]
pub struct PageUnit {
    pub page: u32,
    source: PageSource,
}

impl PageUnit {
    pub fn inline(page: u32, text: impl Into<String>) -> Self {
        PageUnit {
            page,
            source: PageSource::Inline(text.into()),
        }
    }

    pub fn text(&self) -> Result<Cow<'_, str>, UnitError> {
        match &self.source {
            PageSource::Inline(text) => Ok(Cow::Borrowed(text)),
            PageSource::File(path) => fs::read_to_string(path)
                .map(Cow::Owned)
                .map_err(|source| UnitError::Unreadable {
                    page: self.page,
                    path: path.clone(),
                    source,
                }),
        }
    }
}

/// Split a source into pages: a directory holds one file per page (sorted by
/// name), a single file separates pages with form feeds.
pub fn load_pages(path: &Path, first_page: u32) -> Result<Vec<PageUnit>, AlignError> {
    let read_err = |source| AlignError::Read {
        path: path.to_path_buf(),
        source,
    };

    if path.is_dir() {
        let mut files: Vec<PathBuf> = fs::read_dir(path)
            .map_err(read_err)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file())
            .collect();
        files.sort();
        return Ok(files
            .into_iter()
            .zip(first_page..)
            .map(|(file, page)| PageUnit {
                page,
                source: PageSource::File(file),
            })
            .collect());
    }

    let content = fs::read_to_string(path).map_err(read_err)?;
    Ok(content
        .split(FORM_FEED)
        .zip(first_page..)
        .map(|(text, page)| PageUnit::inline(page, text))
        .collect())
}

pub fn apply_replacements<'a>(text: &'a str, replacements: &[(String, String)]) -> Cow<'a, str> {
    let mut out = Cow::Borrowed(text);
    for (from, to) in replacements {
        if !from.is_empty() && out.contains(from.as_str()) {
            out = Cow::Owned(out.replace(from.as_str(), to));
        }
    }
    out
}

/// Headwords introduced by `marker`. A headword runs to the end of its line
/// and continues over the following lines until a blank line or another tag.
pub fn marked_headwords(text: &str, marker: &Regex) -> Vec<String> {
    let lines: Vec<&str> = text.lines().collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let Some(m) = marker.find(lines[i]) else {
            i += 1;
            continue;
        };
        let mut parts = vec![lines[i][m.end()..].trim()];
        i += 1;
        while i < lines.len() {
            let next = lines[i];
            if next.trim().is_empty() || TAG_RE.is_match(next) || marker.is_match(next) {
                break;
            }
            parts.push(next.trim());
            i += 1;
        }
        let headword = parts
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if !headword.is_empty() {
            out.push(headword);
        }
    }
    out
}

/// Entry keys captured by the `key` group. A page with no match is searched
/// once more with `1` read as `l`.
pub fn page_keys(text: &str, key_re: &Regex) -> Vec<String> {
    let collect = |t: &str| -> Vec<String> {
        key_re
            .captures_iter(t)
            .filter_map(|c| c.name("key").map(|k| k.as_str().to_string()))
            .collect()
    };
    let keys = collect(text);
    if !keys.is_empty() {
        return keys;
    }
    collect(&text.replace('1', "l"))
}
