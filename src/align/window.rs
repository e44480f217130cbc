use tracing::{debug, trace};

use super::{Assignment, PreparedTerm};
use crate::anchors::AnchorSet;
use crate::config::Settings;
use crate::matcher::Matcher;

#[derive(Debug, Clone, Copy)]
struct WindowState {
    last_confirmed: u32,
    tolerance: u32,
}

impl WindowState {
    fn window(&self) -> (u32, u32) {
        (
            self.last_confirmed.saturating_sub(self.tolerance),
            self.last_confirmed.saturating_add(self.tolerance),
        )
    }
}

/// Walk the wordlist in order, matching each term against the anchors on
/// pages near the last confirmed page. Unmatched terms are left unresolved
/// and do not move the window.
///
/// Keyed terms are identifiers, so they are looked up in the whole set.
pub fn align_window(
    terms: &[PreparedTerm],
    anchors: &AnchorSet,
    matcher: &Matcher,
    settings: &Settings,
) -> Vec<Assignment> {
    let mut state = WindowState {
        last_confirmed: anchors.min_page().unwrap_or(settings.page_range_start),
        tolerance: settings.page_tolerance,
    };
    let mut out = Vec::with_capacity(terms.len());

    for t in terms {
        let (lo, hi) = state.window();
        let found = if t.term.key.is_some() {
            matcher.best_match(&t.norm, anchors.get(&t.norm.canonical))
        } else {
            matcher.best_match(&t.norm, anchors.in_window(lo, hi))
        };

        match found {
            Some(m) => {
                let page = m.anchor.page;
                trace!(term = %t.term.text, page, score = m.score, kind = m.kind.label(), "matched");
                state.last_confirmed = page;
                out.push(Assignment::confirmed(t.term.clone(), page, m.score, m.kind));
            }
            None => {
                debug!(term = %t.term.text, lo, hi, "no match in window");
                out.push(Assignment::unresolved(t.term.clone()));
            }
        }
    }
    out
}
