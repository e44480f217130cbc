use std::collections::HashSet;
use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{AlignError, ConfigError};

/// One wordlist entry. `index` is its position in the wordlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub text: String,
    pub key: Option<String>,
    pub index: usize,
}

impl Term {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Term {
            text: text.into(),
            key: None,
            index,
        }
    }

    /// What gets compared against anchors: the key when present.
    pub fn match_text(&self) -> &str {
        self.key.as_deref().unwrap_or(&self.text)
    }
}

#[derive(Debug, Clone, Default)]
pub struct WordlistOptions {
    pub delimiter: char,
    pub keyed: bool,
    pub allowed: Option<HashSet<String>>,
}

pub fn load_wordlist(path: &Path, options: &WordlistOptions) -> Result<Vec<Term>, AlignError> {
    if !path.exists() {
        return Err(ConfigError::MissingInput(path.to_path_buf()).into());
    }
    let content = fs::read_to_string(path).map_err(|source| AlignError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let terms = parse_wordlist(&content, options);
    if terms.is_empty() {
        return Err(AlignError::EmptyWordlist {
            path: path.to_path_buf(),
        });
    }
    Ok(terms)
}

/// One word per line; blank lines, `#` comments and lines opening with `/*`
/// or closing with `*/` are ignored.
pub fn load_allowed(path: &Path) -> Result<HashSet<String>, AlignError> {
    let content = fs::read_to_string(path).map_err(|source| AlignError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !is_ignored(l))
        .map(str::to_string)
        .collect())
}

pub fn parse_wordlist(content: &str, options: &WordlistOptions) -> Vec<Term> {
    let mut terms = Vec::new();
    for (line_no, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if is_ignored(line) {
            continue;
        }

        let (key, text) = if options.keyed {
            match line.split_once(options.delimiter) {
                Some((k, t)) if !k.trim().is_empty() && !t.trim().is_empty() => {
                    (Some(k.trim().to_string()), t.trim())
                }
                _ => {
                    warn!(line = line_no + 1, text = line, "keyed line without KEY{}TERM, skipped", options.delimiter);
                    continue;
                }
            }
        } else if line.contains(options.delimiter) {
            warn!(line = line_no + 1, text = line, "line contains the output delimiter, skipped");
            continue;
        } else {
            (None, line)
        };

        if let Some(allowed) = &options.allowed {
            if !allowed.contains(text) {
                debug!(line = line_no + 1, text, "not in allowed words");
                continue;
            }
        }

        terms.push(Term {
            key,
            ..Term::new(terms.len(), text)
        });
    }
    terms
}

fn is_ignored(line: &str) -> bool {
    line.is_empty() || line.starts_with('#') || line.starts_with("/*") || line.ends_with("*/")
}
