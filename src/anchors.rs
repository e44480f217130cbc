use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::collate::{CollationKey, Collator};
use crate::matcher::is_plural_pair;
use crate::text::NormalizedText;

/// A headword found in the source, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAnchor {
    pub page: u32,
    pub raw: String,
}

impl RawAnchor {
    pub fn new(page: u32, raw: impl Into<String>) -> Self {
        RawAnchor {
            page,
            raw: raw.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    pub page: u32,
    pub raw_text: String,
    pub canonical: String,
    pub relaxed: String,
}

impl Anchor {
    pub fn new(page: u32, raw: &str, norm: NormalizedText) -> Self {
        Anchor {
            page,
            raw_text: raw.to_string(),
            canonical: norm.canonical,
            relaxed: norm.relaxed,
        }
    }
}

/// Frozen, collapsed anchors ordered by page and then by collation.
#[derive(Debug, Default)]
pub struct AnchorSet {
    anchors: Vec<Anchor>,
    by_canonical: HashMap<String, usize>,
    collated: Vec<(CollationKey, usize)>,
}

impl AnchorSet {
    /// Collapse duplicates and freeze. A canonical form seen more than once
    /// keeps the lowest page, and on the same page the shortest raw text.
    pub fn build<F>(raw: Vec<RawAnchor>, prepare: F, collator: &Collator, plural_rule: bool) -> Self
    where
        F: Fn(&str) -> NormalizedText,
    {
        let mut prepared: Vec<Anchor> = raw
            .iter()
            .filter_map(|r| {
                let norm = prepare(&r.raw);
                if norm.is_empty() {
                    debug!(page = r.page, raw = %r.raw, "anchor normalizes to empty, dropped");
                    return None;
                }
                Some(Anchor::new(r.page, r.raw.trim(), norm))
            })
            .collect();
        prepared.sort_by_key(|a| (a.page, a.raw_text.chars().count()));

        let mut seen = HashSet::new();
        let mut anchors: Vec<Anchor> = prepared
            .into_iter()
            .filter(|a| seen.insert(a.canonical.clone()))
            .collect();

        if plural_rule {
            let before = anchors.len();
            anchors.retain(|a| {
                !a.canonical
                    .strip_suffix('s')
                    .is_some_and(|singular| seen.contains(singular))
            });
            debug!(dropped = before - anchors.len(), "plural anchors folded into singular");
        }

        anchors.sort_by_cached_key(|a| (a.page, collator.key(&a.relaxed)));
        let by_canonical = anchors
            .iter()
            .enumerate()
            .map(|(i, a)| (a.canonical.clone(), i))
            .collect();
        let mut collated: Vec<(CollationKey, usize)> = anchors
            .iter()
            .enumerate()
            .map(|(i, a)| (collator.key(&a.relaxed), i))
            .collect();
        collated.sort();

        AnchorSet {
            anchors,
            by_canonical,
            collated,
        }
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Anchor> {
        self.anchors.iter()
    }

    pub fn get(&self, canonical: &str) -> Option<&Anchor> {
        self.by_canonical.get(canonical).map(|&i| &self.anchors[i])
    }

    pub fn min_page(&self) -> Option<u32> {
        self.anchors.first().map(|a| a.page)
    }

    pub fn max_page(&self) -> Option<u32> {
        self.anchors.last().map(|a| a.page)
    }

    /// Anchors with `lo <= page <= hi`, in page then collation order.
    pub fn in_window(&self, lo: u32, hi: u32) -> &[Anchor] {
        let start = self.anchors.partition_point(|a| a.page < lo);
        let end = self.anchors.partition_point(|a| a.page <= hi);
        &self.anchors[start..end.max(start)]
    }

    /// All anchors in collation order of their relaxed form.
    pub fn collated(&self) -> impl Iterator<Item = &Anchor> + '_ {
        self.collated.iter().map(|(_, i)| &self.anchors[*i])
    }

    /// The last anchor that sorts at or before `relaxed`.
    pub fn preceding(&self, relaxed: &str, collator: &Collator) -> Option<&Anchor> {
        let key = collator.key(relaxed);
        let pos = self.collated.partition_point(|(k, _)| *k <= key);
        pos.checked_sub(1).map(|p| &self.anchors[self.collated[p].1])
    }

    /// Pairs in the set where one entry is the plural of the other.
    pub fn plural_pairs(&self) -> Vec<(&Anchor, &Anchor)> {
        self.anchors
            .iter()
            .filter_map(|a| {
                let singular = a.canonical.strip_suffix('s')?;
                let s = self.get(singular)?;
                is_plural_pair(&a.canonical, &s.canonical).then_some((s, a))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::Normalizer;

    fn build(raw: &[(u32, &str)], plural_rule: bool) -> AnchorSet {
        let raw = raw.iter().map(|(p, r)| RawAnchor::new(*p, *r)).collect();
        let n = Normalizer::default();
        AnchorSet::build(raw, |s| n.prepare(s), &Collator::new(), plural_rule)
    }

    #[test]
    fn duplicates_collapse_to_one() {
        let set = build(&[(5, "chos"), (5, "chos")], false);
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("chos").unwrap().page, 5);
    }

    #[test]
    fn duplicate_keeps_lowest_page_then_shortest_raw() {
        let set = build(&[(9, "chos"), (7, "Chos (dharma)"), (7, "chos."), (8, "chos")], false);
        let a = set.get("chos").unwrap();
        assert_eq!(a.page, 7);
        assert_eq!(a.raw_text, "chos.");
    }

    #[test]
    fn ordered_by_page_then_collation() {
        let set = build(&[(2, "kha"), (1, "ga"), (1, "bka"), (1, "ka")], false);
        let order: Vec<&str> = set.iter().map(|a| a.canonical.as_str()).collect();
        assert_eq!(order, vec!["ka", "bka", "ga", "kha"]);
        let collated: Vec<&str> = set.collated().map(|a| a.canonical.as_str()).collect();
        assert_eq!(collated, vec!["ka", "bka", "kha", "ga"]);
    }

    #[test]
    fn ocr_headword_collates_by_reading() {
        let set = build(&[(9, "beam ldan 'das"), (5, "ca"), (12, "cha")], false);
        let collated: Vec<u32> = set.collated().map(|a| a.page).collect();
        assert_eq!(collated, vec![5, 9, 12]);
        let c = Collator::new();
        assert_eq!(set.preceding("bcom ldan 'das ma", &c).unwrap().page, 9);
    }

    #[test]
    fn window_query() {
        let set = build(&[(1, "ka"), (3, "kha"), (4, "ga"), (9, "nga")], false);
        let pages: Vec<u32> = set.in_window(2, 4).iter().map(|a| a.page).collect();
        assert_eq!(pages, vec![3, 4]);
        assert!(set.in_window(5, 8).is_empty());
        assert!(set.in_window(10, 3).is_empty());
    }

    #[test]
    fn plural_rule_keeps_singular() {
        let set = build(&[(4, "dorjes"), (5, "dorje")], true);
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("dorje").unwrap().page, 5);

        let set = build(&[(4, "dorjes"), (5, "dorje")], false);
        assert_eq!(set.len(), 2);
        assert_eq!(set.plural_pairs().len(), 1);
    }

    #[test]
    fn empty_anchors_are_dropped() {
        let set = build(&[(3, "(gloss only)"), (3, "  ")], false);
        assert!(set.is_empty());
        assert_eq!(set.min_page(), None);
    }

    #[test]
    fn preceding_headword() {
        let set = build(&[(10, "ka"), (12, "kha"), (15, "ga")], false);
        let c = Collator::new();
        assert_eq!(set.preceding("ka ba", &c).unwrap().page, 10);
        assert_eq!(set.preceding("kha", &c).unwrap().page, 12);
        assert_eq!(set.preceding("nga", &c).unwrap().page, 15);
        assert!(set.preceding("a", &c).is_some());
        assert!(set.preceding("'", &c).is_some());
    }
}
