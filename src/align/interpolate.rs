use super::Assignment;
use crate::config::Settings;

/// Fill every unresolved assignment from its nearest resolved neighbours by
/// wordlist index. Returns how many were filled.
///
/// Between two neighbours the page is linear in the index; with a single
/// neighbour its page is copied; with none the middle of the page range is
/// used.
pub fn interpolate(assignments: &mut [Assignment], settings: &Settings) -> usize {
    let n = assignments.len();
    let mut prev: Vec<Option<(usize, u32)>> = vec![None; n];
    let mut next: Vec<Option<(usize, u32)>> = vec![None; n];

    let mut last = None;
    for (i, a) in assignments.iter().enumerate() {
        prev[i] = last;
        if let Some(page) = a.page {
            last = Some((a.term.index, page));
        }
    }
    last = None;
    for (i, a) in assignments.iter().enumerate().rev() {
        next[i] = last;
        if let Some(page) = a.page {
            last = Some((a.term.index, page));
        }
    }

    let mut filled = 0;
    for (i, a) in assignments.iter_mut().enumerate() {
        if a.page.is_some() {
            continue;
        }
        let page = match (prev[i], next[i]) {
            (Some(before), Some(after)) => between(a.term.index, before, after),
            (Some((_, page)), None) | (None, Some((_, page))) => page,
            (None, None) => settings.midpoint_page(),
        };
        a.page = Some(page);
        a.interpolated = true;
        filled += 1;
    }
    filled
}

fn between(i: usize, (ib, pb): (usize, u32), (ia, pa): (usize, u32)) -> u32 {
    if ia <= ib {
        return pb;
    }
    let frac = (i - ib) as f64 / (ia - ib) as f64;
    let page = pb as f64 + frac * (pa as f64 - pb as f64);
    page.round().max(0.0) as u32
}
