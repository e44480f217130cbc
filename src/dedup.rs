use strsim::normalized_levenshtein;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::matcher::is_plural_pair;
use crate::text::{NormalizedText, Normalizer};
use crate::wordlist::Term;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    Plural,
    Duplicate,
    NearDuplicate,
}

#[derive(Debug, Clone)]
pub struct Dropped {
    pub term: Term,
    pub kept: String,
    pub reason: DropReason,
}

#[derive(Debug, Default)]
pub struct DedupOutcome {
    pub kept: Vec<Term>,
    pub dropped: Vec<Dropped>,
}

/// Collapse plural and near-duplicate entries against the most recently
/// kept terms. A singular replaces an earlier plural in place; any other
/// duplicate is dropped in favour of the first occurrence.
pub fn dedup(terms: &[Term], normalizer: &Normalizer, settings: &Settings) -> DedupOutcome {
    let mut kept: Vec<(Term, NormalizedText)> = Vec::with_capacity(terms.len());
    let mut dropped = Vec::new();

    'terms: for term in terms {
        let norm = normalizer.prepare(term.match_text());
        if norm.is_empty() {
            warn!(term = %term.text, "term normalizes to empty, skipped");
            continue;
        }

        let window_start = kept.len().saturating_sub(settings.dedup_window);
        for slot in (window_start..kept.len()).rev() {
            let (prior, prior_norm) = &kept[slot];
            let Some(reason) = duplicate_of(&norm, prior_norm, settings) else {
                continue;
            };
            if reason == DropReason::Plural && norm.canonical.len() < prior_norm.canonical.len() {
                debug!(singular = %term.text, plural = %prior.text, "singular replaces plural");
                let replaced = std::mem::replace(&mut kept[slot], (term.clone(), norm));
                dropped.push(Dropped {
                    term: replaced.0,
                    kept: term.text.clone(),
                    reason,
                });
            } else {
                dropped.push(Dropped {
                    term: term.clone(),
                    kept: prior.text.clone(),
                    reason,
                });
            }
            continue 'terms;
        }
        kept.push((term.clone(), norm));
    }

    DedupOutcome {
        kept: kept
            .into_iter()
            .enumerate()
            .map(|(index, (term, _))| Term { index, ..term })
            .collect(),
        dropped,
    }
}

fn duplicate_of(a: &NormalizedText, b: &NormalizedText, settings: &Settings) -> Option<DropReason> {
    if is_plural_pair(&a.canonical, &b.canonical) {
        return Some(DropReason::Plural);
    }
    if a.canonical == b.canonical || a.relaxed == b.relaxed {
        return Some(DropReason::Duplicate);
    }
    let shortest = a.relaxed.chars().count().min(b.relaxed.chars().count());
    if shortest >= settings.min_substring_length
        && normalized_levenshtein(&a.relaxed, &b.relaxed) >= settings.dedup_threshold
    {
        return Some(DropReason::NearDuplicate);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(words: &[&str]) -> Vec<Term> {
        words.iter().enumerate().map(|(i, w)| Term::new(i, *w)).collect()
    }

    fn kept(outcome: &DedupOutcome) -> Vec<&str> {
        outcome.kept.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn singular_wins_either_way() {
        let s = Settings::default();
        let n = Normalizer::default();
        let out = dedup(&terms(&["dorje", "dorjes"]), &n, &s);
        assert_eq!(kept(&out), vec!["dorje"]);
        assert_eq!(out.dropped[0].reason, DropReason::Plural);

        let out = dedup(&terms(&["dorjes", "ka", "dorje"]), &n, &s);
        assert_eq!(kept(&out), vec!["dorje", "ka"]);
        assert_eq!(out.dropped[0].term.text, "dorjes");
        assert_eq!(out.dropped[0].kept, "dorje");
    }

    #[test]
    fn exact_and_near_duplicates() {
        let out = dedup(
            &terms(&["sangs rgyas", "Sangs rgyas.", "bcom ldan 'das", "bcom ldan 'dos", "ka"]),
            &Normalizer::default(),
            &Settings::default(),
        );
        assert_eq!(kept(&out), vec!["sangs rgyas", "bcom ldan 'das", "ka"]);
        let reasons: Vec<DropReason> = out.dropped.iter().map(|d| d.reason).collect();
        assert_eq!(reasons, vec![DropReason::Duplicate, DropReason::NearDuplicate]);
    }

    #[test]
    fn short_terms_are_not_fuzzy_duplicates() {
        let out = dedup(&terms(&["ka", "kha", "ga"]), &Normalizer::default(), &Settings::default());
        assert_eq!(out.kept.len(), 3);
        assert!(out.dropped.is_empty());
    }

    #[test]
    fn duplicates_beyond_the_window_survive() {
        let s = Settings {
            dedup_window: 1,
            ..Settings::default()
        };
        let out = dedup(&terms(&["chos", "ka", "chos"]), &Normalizer::default(), &s);
        assert_eq!(kept(&out), vec!["chos", "ka", "chos"]);
    }

    #[test]
    fn kept_terms_are_reindexed() {
        let out = dedup(&terms(&["ka", "ka", "kha"]), &Normalizer::default(), &Settings::default());
        let idx: Vec<usize> = out.kept.iter().map(|t| t.index).collect();
        assert_eq!(idx, vec![0, 1]);
    }
}
