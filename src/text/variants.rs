use std::sync::LazyLock;

use itertools::Itertools;
use regex::Regex;

static ANGLE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<([^>]+)>").unwrap());
static SOURCE_SIGLA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+[A-Z]{2,}\s*").unwrap());
static EDITORIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{[^}]*\}|\(READ[^)]*\)|\(TEXT:[^)]*\)|\(\?[^)]*\)").unwrap()
});
static PAREN_GROUP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\([^)]*\)").unwrap());

/// All spelling variants a raw headword stands for, in discovery order.
///
/// `<gdul DC / 'dul PN>` style groups expand into one variant per reading,
/// slash alternatives split, and a parenthetical yields a form without its
/// content and a form without the brackets.
pub fn expand_variants(raw: &str) -> Vec<String> {
    expand_angle_brackets(raw)
        .iter()
        .flat_map(|v| v.split('/').map(str::to_string).collect::<Vec<_>>())
        .map(|v| clean_raw(&v))
        .filter(|v| !v.is_empty())
        .flat_map(|v| parenthetical_variants(&v))
        .filter(|v| !v.is_empty())
        .unique()
        .collect()
}

/// Drop editorial notes and collapse whitespace, keeping the raw spelling.
pub fn clean_raw(text: &str) -> String {
    let stripped = EDITORIAL_RE.replace_all(text, " ");
    collapse(&stripped)
}

fn collapse(text: &str) -> String {
    text.split_whitespace().join(" ")
}

/// Expand `<...>` variant groups. Groups that do not yield at least two
/// readings are left untouched.
pub fn expand_angle_brackets(text: &str) -> Vec<String> {
    let mut variants = vec![text.to_string()];
    let groups: Vec<(String, String)> = ANGLE_RE
        .captures_iter(text)
        .map(|c| (c[0].to_string(), c[1].to_string()))
        .collect();

    for (whole, inner) in groups.iter().rev() {
        let readings: Vec<String> = if inner.contains('/') {
            inner
                .split('/')
                .filter_map(|part| part.split_whitespace().next())
                .filter(|token| !token.starts_with('*'))
                .map(str::to_string)
                .collect()
        } else {
            SOURCE_SIGLA_RE
                .split(inner)
                .map(str::trim)
                .filter(|part| {
                    !part.is_empty() && !is_all_upper(part) && !part.starts_with('*')
                })
                .map(str::to_string)
                .collect()
        };
        if readings.len() < 2 {
            continue;
        }
        variants = variants
            .iter()
            .flat_map(|v| readings.iter().map(move |r| v.replacen(whole.as_str(), r, 1)))
            .collect();
    }
    variants
}

fn is_all_upper(text: &str) -> bool {
    text.chars().any(char::is_alphabetic)
        && text
            .chars()
            .filter(|c| c.is_alphabetic())
            .all(char::is_uppercase)
}

/// `a (b) c` gives `a c` and `a b c`; text without a complete group is
/// returned as is.
pub fn parenthetical_variants(text: &str) -> Vec<String> {
    if !(text.contains('(') && text.contains(')')) {
        return vec![collapse(text)];
    }
    let without_content = collapse(&PAREN_GROUP_RE.replace_all(text, " "));
    let without_brackets = collapse(&text.replace(['(', ')'], ""));
    let variants: Vec<String> = [without_content, without_brackets]
        .into_iter()
        .filter(|v| !v.is_empty())
        .unique()
        .collect();
    if variants.is_empty() {
        vec![collapse(text)]
    } else {
        variants
    }
}
