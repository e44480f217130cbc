use std::cmp::Ordering;

use tracing::debug;

use super::{Assignment, PreparedTerm};
use crate::anchors::{Anchor, AnchorSet};
use crate::collate::Collator;
use crate::matcher::{MatchKind, MatchPolicy, Matcher};

/// Two-cursor walk over terms and headwords, both in collation order.
///
/// The headword cursor only moves forward: it advances while the next
/// headword sorts at or before the current term. A term with no match of
/// its own falls under the last headword sorting before it. Both sides are
/// ordered by their OCR-relaxed form. Assignments come back in wordlist
/// order.
pub fn align_merge(
    terms: &[PreparedTerm],
    anchors: &AnchorSet,
    matcher: &Matcher,
    collator: &Collator,
) -> Vec<Assignment> {
    let heads: Vec<&Anchor> = anchors.collated().collect();
    if heads.is_empty() {
        return terms.iter().map(|t| Assignment::unresolved(t.term.clone())).collect();
    }
    let fuzzy = matcher.with_policy(MatchPolicy::FUZZY_ONLY);

    let mut order: Vec<usize> = (0..terms.len()).collect();
    order.sort_by_cached_key(|&i| collator.key(&terms[i].norm.relaxed));

    let mut slots: Vec<Option<Assignment>> = vec![None; terms.len()];
    let mut cursor = 0;
    for i in order {
        let t = &terms[i];
        while cursor + 1 < heads.len()
            && collator.compare(&heads[cursor + 1].relaxed, &t.norm.relaxed) != Ordering::Greater
        {
            cursor += 1;
        }
        let head = heads[cursor];
        let nearby = &heads[cursor..(cursor + 2).min(heads.len())];
        slots[i] = Some(assign(t, head, nearby, &fuzzy, collator));
    }

    slots
        .into_iter()
        .zip(terms)
        .map(|(slot, t)| slot.unwrap_or_else(|| Assignment::unresolved(t.term.clone())))
        .collect()
}

fn assign(
    t: &PreparedTerm,
    head: &Anchor,
    nearby: &[&Anchor],
    fuzzy: &Matcher,
    collator: &Collator,
) -> Assignment {
    let term = t.term.clone();
    if head.canonical == t.norm.canonical || head.relaxed == t.norm.relaxed {
        return Assignment::confirmed(term, head.page, 1.0, MatchKind::Exact);
    }
    if is_compound_of(&t.norm.canonical, &head.canonical) || is_compound_of(&t.norm.relaxed, &head.relaxed) {
        return Assignment::inferred(term, head.page);
    }
    match fuzzy.best_match(&t.norm, nearby.iter().copied()) {
        Some(m) => Assignment::confirmed(term, m.anchor.page, m.score, m.kind),
        None if collator.compare(&head.relaxed, &t.norm.relaxed) == Ordering::Less => {
            Assignment::inferred(term, head.page)
        }
        // Sorts before the first headword.
        None => {
            debug!(term = %t.term.text, head = %head.canonical, "no headword at or before term");
            Assignment::unresolved(term)
        }
    }
}

/// `head` followed by more syllables.
fn is_compound_of(term: &str, head: &str) -> bool {
    term.strip_prefix(head)
        .is_some_and(|rest| rest.starts_with(' '))
}
