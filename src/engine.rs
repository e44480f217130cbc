use regex::Regex;
use tracing::{info, warn};

use crate::align::{self, Assignment, PreparedTerm, Strategy};
use crate::anchors::{AnchorSet, RawAnchor};
use crate::collate::Collator;
use crate::config::Settings;
use crate::error::ConfigError;
use crate::matcher::{MatchPolicy, Matcher};
use crate::text::{NormalizedText, Normalizer};
use crate::wordlist::Term;

/// Everything one run needs, built once from validated settings and passed
/// to every stage.
#[derive(Debug)]
pub struct Engine {
    pub settings: Settings,
    pub normalizer: Normalizer,
    pub collator: Collator,
    pub matcher: Matcher,
    marker: Regex,
    key_re: Option<Regex>,
    replacements: Vec<(String, String)>,
}

/// Where a lookup query lands.
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    pub query: String,
    pub headword: String,
    pub page: i64,
    pub exact: bool,
}

impl Engine {
    pub fn new(settings: Settings) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Engine {
            normalizer: Normalizer::from_settings(&settings),
            collator: Collator::new(),
            matcher: Matcher::from_settings(&settings),
            marker: settings.marker_regex()?,
            key_re: settings.key_regex()?,
            replacements: settings.replacement_pairs()?,
            settings,
        })
    }

    pub fn marker(&self) -> &Regex {
        &self.marker
    }

    pub fn key_regex(&self) -> Option<&Regex> {
        self.key_re.as_ref()
    }

    pub fn replacements(&self) -> &[(String, String)] {
        &self.replacements
    }

    /// Keys are identifiers and are compared verbatim; everything else goes
    /// through the normalizer.
    fn prepare_text(&self, text: &str, keyed: bool) -> NormalizedText {
        if keyed {
            let key = text.trim().to_string();
            NormalizedText {
                relaxed: key.clone(),
                canonical: key,
            }
        } else {
            self.normalizer.prepare(text)
        }
    }

    /// Terms that normalize to empty are dropped with a warning. Returns the
    /// prepared terms and how many were dropped.
    pub fn prepare_terms(&self, terms: Vec<Term>) -> (Vec<PreparedTerm>, usize) {
        let before = terms.len();
        let prepared: Vec<PreparedTerm> = terms
            .into_iter()
            .filter_map(|term| {
                let norm = self.prepare_text(term.match_text(), term.key.is_some());
                if norm.is_empty() {
                    warn!(index = term.index, term = %term.text, "term normalizes to empty, skipped");
                    return None;
                }
                Some(PreparedTerm { term, norm })
            })
            .collect();
        let skipped = before - prepared.len();
        (prepared, skipped)
    }

    pub fn build_anchors(&self, raw: Vec<RawAnchor>, keyed: bool) -> AnchorSet {
        let plural_rule = self.settings.plural_rule && !keyed;
        let set = AnchorSet::build(raw, |t| self.prepare_text(t, keyed), &self.collator, plural_rule);
        info!(
            anchors = set.len(),
            first_page = ?set.min_page(),
            last_page = ?set.max_page(),
            "anchor set frozen"
        );
        set
    }

    /// Align and interpolate. Keyed terms always take the windowed path with
    /// exact matching.
    pub fn align(&self, terms: &[PreparedTerm], anchors: &AnchorSet, strategy: Strategy) -> Vec<Assignment> {
        let keyed = terms.iter().any(|t| t.term.key.is_some());
        let mut assignments = match strategy {
            Strategy::Merge if !keyed => align::align_merge(terms, anchors, &self.matcher, &self.collator),
            Strategy::Merge | Strategy::Window => {
                let matcher = if keyed {
                    self.matcher.with_policy(MatchPolicy::EXACT_ONLY)
                } else {
                    self.matcher.clone()
                };
                align::align_window(terms, anchors, &matcher, &self.settings)
            }
        };
        let unresolved = assignments.iter().filter(|a| !a.is_resolved()).count();
        let filled = align::interpolate(&mut assignments, &self.settings);
        info!(terms = terms.len(), unresolved, filled, "alignment finished");
        assignments
    }

    /// Page of the query's headword, or of the last headword sorting before it.
    pub fn lookup(&self, anchors: &AnchorSet, query: &str) -> Option<Lookup> {
        let norm = self.normalizer.prepare(query);
        if norm.is_empty() {
            return None;
        }
        let (anchor, exact) = match anchors.get(&norm.canonical) {
            Some(a) => (a, true),
            None => (anchors.preceding(&norm.relaxed, &self.collator)?, false),
        };
        Some(Lookup {
            query: query.to_string(),
            headword: anchor.raw_text.clone(),
            page: anchor.page as i64 + self.settings.page_offset,
            exact,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Engine {
        Engine::new(Settings::default()).unwrap()
    }

    fn terms(words: &[&str]) -> Vec<Term> {
        words.iter().enumerate().map(|(i, w)| Term::new(i, *w)).collect()
    }

    fn raw(pairs: &[(u32, &str)]) -> Vec<RawAnchor> {
        pairs.iter().map(|(p, r)| RawAnchor::new(*p, *r)).collect()
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let s = Settings {
            similarity_threshold: 0.0,
            ..Settings::default()
        };
        assert!(matches!(Engine::new(s), Err(ConfigError::Threshold(_))));
    }

    #[test]
    fn scenario_gap_is_interpolated() {
        let e = engine();
        let (prepared, skipped) = e.prepare_terms(terms(&["kha", "ga", "nga"]));
        assert_eq!(skipped, 0);
        let set = e.build_anchors(raw(&[(10, "kha"), (12, "nga")]), false);
        let out = e.align(&prepared, &set, Strategy::Window);
        let got: Vec<(u32, bool)> = out.iter().map(|a| (a.page.unwrap(), a.interpolated)).collect();
        assert_eq!(got, vec![(10, false), (11, true), (12, false)]);
    }

    #[test]
    fn scenario_no_anchors_gives_midpoint() {
        let e = engine();
        let (prepared, _) = e.prepare_terms(terms(&["om"]));
        let set = e.build_anchors(Vec::new(), false);
        let out = e.align(&prepared, &set, Strategy::Window);
        assert_eq!(out[0].page, Some(500));
        assert!(out[0].interpolated);
    }

    #[test]
    fn exact_match_beats_similar_anchors() {
        let e = engine();
        let (prepared, _) = e.prepare_terms(terms(&["rnam par shes pa"]));
        let set = e.build_anchors(
            raw(&[(1, "rnam par shos pa"), (2, "rnam par shes pa'i"), (3, "rnam par shes pa")]),
            false,
        );
        let out = e.align(&prepared, &set, Strategy::Window);
        assert_eq!(out[0].page, Some(3));
        assert!(!out[0].interpolated);
    }

    #[test]
    fn unresolvable_wordlist_falls_back_to_midpoint() {
        let e = engine();
        let (prepared, _) = e.prepare_terms(terms(&["om", "ah", "hum"]));
        let set = e.build_anchors(raw(&[(10, "ka"), (12, "kha")]), false);
        let out = e.align(&prepared, &set, Strategy::Window);
        assert!(out.iter().all(|a| a.interpolated && a.page == Some(500)));
    }

    #[test]
    fn order_and_cardinality_are_preserved() {
        let e = engine();
        let words = ["nga", "(gloss)", "ka", "ga", "kha"];
        let (prepared, skipped) = e.prepare_terms(terms(&words));
        assert_eq!(skipped, 1);
        let set = e.build_anchors(raw(&[(3, "ka"), (4, "kha")]), false);
        for strategy in [Strategy::Window, Strategy::Merge] {
            let out = e.align(&prepared, &set, strategy);
            let texts: Vec<&str> = out.iter().map(|a| a.term.text.as_str()).collect();
            assert_eq!(texts, vec!["nga", "ka", "ga", "kha"]);
            assert!(out.iter().all(|a| a.is_resolved()));
        }
    }

    #[test]
    fn toc_fixture_merge_run() {
        use crate::extract::{extract, SourceFormat};
        use crate::wordlist::{load_wordlist, WordlistOptions};
        use std::path::Path;

        let e = engine();
        let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
        let options = WordlistOptions {
            delimiter: '|',
            ..WordlistOptions::default()
        };
        let words = load_wordlist(&fixtures.join("wordlist.txt"), &options).unwrap();
        let ex = extract(&fixtures.join("toc.txt"), SourceFormat::Toc, &e).unwrap();
        let set = e.build_anchors(ex.anchors, false);
        let (prepared, _) = e.prepare_terms(words);
        let out = e.align(&prepared, &set, Strategy::Merge);
        let lines: Vec<String> = out
            .iter()
            .map(|a| crate::output::format_assignment(a, &e.settings))
            .collect();
        assert_eq!(
            lines,
            vec![
                "ka|27", "ka ba|27?", "kha|31", "kha btags|31?", "ga|40", "nga|52", "nga rgyal|52?",
                "ca|60",
            ]
        );
    }

    #[test]
    fn keyed_run_matches_keys_only() {
        let e = engine();
        let keyed = vec![
            Term {
                text: "dge slong".to_string(),
                key: Some("8634".to_string()),
                index: 0,
            },
            Term {
                text: "dge tshul".to_string(),
                key: Some("8635".to_string()),
                index: 1,
            },
            Term {
                text: "dge slong ma".to_string(),
                key: Some("8640".to_string()),
                index: 2,
            },
        ];
        let (prepared, skipped) = e.prepare_terms(keyed);
        assert_eq!(skipped, 0);
        let set = e.build_anchors(raw(&[(120, "8634"), (122, "8640")]), true);
        let out = e.align(&prepared, &set, Strategy::Merge);
        let got: Vec<(u32, bool)> = out.iter().map(|a| (a.page.unwrap(), a.interpolated)).collect();
        assert_eq!(got, vec![(120, false), (121, true), (122, false)]);
    }

    #[test]
    fn lookup_uses_preceding_headword() {
        let settings = Settings {
            page_offset: 2,
            ..Settings::default()
        };
        let e = Engine::new(settings).unwrap();
        let set = e.build_anchors(raw(&[(10, "ka"), (12, "kha"), (15, "ga")]), false);

        let hit = e.lookup(&set, "Kha").unwrap();
        assert!(hit.exact);
        assert_eq!(hit.page, 14);

        let near = e.lookup(&set, "kha btags").unwrap();
        assert!(!near.exact);
        assert_eq!(near.headword, "kha");
        assert_eq!(near.page, 14);

        assert!(e.lookup(&set, "  ").is_none());
    }
}
