use strsim::normalized_levenshtein;

use crate::anchors::Anchor;
use crate::config::Settings;
use crate::text::NormalizedText;

const SUBSTRING_SCORE: f64 = 0.95;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MatchKind {
    Exact,
    Substring,
    Fuzzy,
}

impl MatchKind {
    pub fn label(&self) -> &'static str {
        match self {
            MatchKind::Exact => "exact",
            MatchKind::Substring => "substring",
            MatchKind::Fuzzy => "fuzzy",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MatchResult<'a> {
    pub anchor: &'a Anchor,
    pub score: f64,
    pub kind: MatchKind,
}

/// Which stages beyond exact equality are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchPolicy {
    pub substring: bool,
    pub fuzzy: bool,
}

impl MatchPolicy {
    pub const FULL: MatchPolicy = MatchPolicy {
        substring: true,
        fuzzy: true,
    };
    pub const EXACT_ONLY: MatchPolicy = MatchPolicy {
        substring: false,
        fuzzy: false,
    };
    pub const FUZZY_ONLY: MatchPolicy = MatchPolicy {
        substring: false,
        fuzzy: true,
    };
}

#[derive(Debug, Clone)]
pub struct Matcher {
    threshold: f64,
    min_len: usize,
    policy: MatchPolicy,
}

impl Matcher {
    pub fn from_settings(settings: &Settings) -> Self {
        Matcher {
            threshold: settings.similarity_threshold,
            min_len: settings.min_substring_length,
            policy: MatchPolicy::FULL,
        }
    }

    pub fn with_policy(&self, policy: MatchPolicy) -> Self {
        Matcher {
            policy,
            ..self.clone()
        }
    }

    /// Score one term against one anchor. Exact beats substring beats fuzzy.
    pub fn score<'a>(&self, term: &NormalizedText, anchor: &'a Anchor) -> Option<MatchResult<'a>> {
        if term.is_empty() || anchor.canonical.is_empty() {
            return None;
        }
        let result = |score, kind| Some(MatchResult { anchor, score, kind });

        if term.canonical == anchor.canonical || term.relaxed == anchor.relaxed {
            return result(1.0, MatchKind::Exact);
        }

        if self.policy.substring {
            let (short, long) = if char_len(&term.relaxed) <= char_len(&anchor.relaxed) {
                (&term.relaxed, &anchor.relaxed)
            } else {
                (&anchor.relaxed, &term.relaxed)
            };
            if char_len(short) >= self.min_len && long.contains(short.as_str()) {
                return result(SUBSTRING_SCORE, MatchKind::Substring);
            }
        }

        if self.policy.fuzzy {
            let similarity = self.similarity(term, anchor);
            if similarity >= self.threshold {
                return result(similarity, MatchKind::Fuzzy);
            }
        }
        None
    }

    fn similarity(&self, term: &NormalizedText, anchor: &Anchor) -> f64 {
        let mut best = normalized_levenshtein(&term.canonical, &anchor.canonical)
            .max(normalized_levenshtein(&term.relaxed, &anchor.relaxed));

        // OCR often truncates or runs a headword into the following text,
        // so compare the shared-length prefixes as well.
        let shared = char_len(&term.relaxed).min(char_len(&anchor.relaxed));
        if shared >= self.min_len {
            let a = prefix(&term.relaxed, shared);
            let b = prefix(&anchor.relaxed, shared);
            best = best.max(normalized_levenshtein(a, b));
        }
        best
    }

    /// Best candidate for a term. Ties keep the earlier candidate and an
    /// exact match ends the search.
    pub fn best_match<'a, I>(&self, term: &NormalizedText, candidates: I) -> Option<MatchResult<'a>>
    where
        I: IntoIterator<Item = &'a Anchor>,
    {
        let mut best: Option<MatchResult<'a>> = None;
        for anchor in candidates {
            let Some(m) = self.score(term, anchor) else {
                continue;
            };
            if m.kind == MatchKind::Exact {
                return Some(m);
            }
            if best.map_or(true, |b| m.score > b.score) {
                best = Some(m);
            }
        }
        best
    }
}

/// True when one form is the other plus a trailing `s`.
pub fn is_plural_pair(a: &str, b: &str) -> bool {
    fn plural_of(plural: &str, singular: &str) -> bool {
        !singular.is_empty() && plural.strip_suffix('s') == Some(singular)
    }
    plural_of(a, b) || plural_of(b, a)
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn prefix(s: &str, chars: usize) -> &str {
    match s.char_indices().nth(chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
