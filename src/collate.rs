//! Tibetan dictionary order over Wylie transliteration.
//!
//! Words compare syllable by syllable. A syllable is split into its
//! prefix, superscript, root, subscript, vowel and suffixes and ordered by
//! root letter first, then by the prefix/superscript combination, then by
//! subscript, vowel and suffixes, which is how printed Tibetan dictionaries
//! group their entries. Text that does not parse as Wylie falls back to
//! code-point order.

use std::cmp::Ordering;

// Alphabet order of the thirty consonants.
const K: u8 = 0;
const KH: u8 = 1;
const G: u8 = 2;
const NG: u8 = 3;
const C: u8 = 4;
const CH: u8 = 5;
const J: u8 = 6;
const NY: u8 = 7;
const T: u8 = 8;
const TH: u8 = 9;
const D: u8 = 10;
const N: u8 = 11;
const P: u8 = 12;
const PH: u8 = 13;
const B: u8 = 14;
const M: u8 = 15;
const TS: u8 = 16;
const TSH: u8 = 17;
const DZ: u8 = 18;
const W: u8 = 19;
const ZH: u8 = 20;
const Z: u8 = 21;
const ACHUNG: u8 = 22;
const Y: u8 = 23;
const R: u8 = 24;
const L: u8 = 25;
const SH: u8 = 26;
const S: u8 = 27;
const H: u8 = 28;
const A: u8 = 29;

// Longest spelling first so digraphs win over their first letter.
const CONSONANTS: &[(&str, u8)] = &[
    ("tsh", TSH),
    ("kh", KH),
    ("ng", NG),
    ("ch", CH),
    ("ny", NY),
    ("th", TH),
    ("ph", PH),
    ("ts", TS),
    ("dz", DZ),
    ("zh", ZH),
    ("sh", SH),
    ("k", K),
    ("g", G),
    ("c", C),
    ("j", J),
    ("t", T),
    ("d", D),
    ("n", N),
    ("p", P),
    ("b", B),
    ("m", M),
    ("w", W),
    ("z", Z),
    ("'", ACHUNG),
    ("y", Y),
    ("r", R),
    ("l", L),
    ("s", S),
    ("h", H),
];

const SUFFIXES: &[u8] = &[G, NG, D, N, B, M, ACHUNG, R, L, S];
const SECOND_SUFFIXES: &[u8] = &[S, D];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tok {
    Cons(u8),
    Vowel(u8),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Onset {
    prefix: Option<u8>,
    superscript: Option<u8>,
    root: u8,
    subscript: Option<u8>,
}

impl Onset {
    fn head_rank(&self) -> u8 {
        let p = match self.prefix {
            None => 0,
            Some(G) => 1,
            Some(D) => 2,
            Some(B) => 3,
            Some(M) => 4,
            Some(_) => 5,
        };
        let s = match self.superscript {
            None => 0,
            Some(R) => 1,
            Some(L) => 2,
            Some(_) => 3,
        };
        match (p, s) {
            (p, 0) => p,
            (0, s) => 5 + s,
            (p, s) => 8 + (p - 1) * 3 + s,
        }
    }

    fn subscript_rank(&self) -> u8 {
        match self.subscript {
            None => 0,
            Some(Y) => 1,
            Some(R) => 2,
            Some(L) => 3,
            Some(_) => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum SyllableKey {
    Parsed {
        root: u8,
        head: u8,
        subscript: u8,
        vowel: u8,
        suffix: u8,
        second_suffix: u8,
        tail: Vec<u8>,
    },
    Raw(String),
}

/// Precomputed sort key; comparing keys gives the same order as
/// [`Collator::compare`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CollationKey {
    syllables: Vec<SyllableKey>,
    text: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Collator;

impl Collator {
    pub fn new() -> Self {
        Collator
    }

    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        self.key(a).cmp(&self.key(b))
    }

    pub fn key(&self, text: &str) -> CollationKey {
        let syllables = text
            .split(|c: char| c.is_whitespace() || c == '\u{0F0B}')
            .filter(|s| !s.is_empty())
            .map(syllable_key)
            .collect();
        CollationKey {
            syllables,
            text: text.to_string(),
        }
    }
}

fn syllable_key(syllable: &str) -> SyllableKey {
    parse_syllable(syllable).unwrap_or_else(|| SyllableKey::Raw(syllable.to_string()))
}

fn parse_syllable(syllable: &str) -> Option<SyllableKey> {
    let (toks, dot) = tokenize(syllable)?;
    let vowel_at = toks.iter().position(|t| matches!(t, Tok::Vowel(_)))?;
    let consonants: Vec<u8> = toks[..vowel_at]
        .iter()
        .filter_map(|t| match t {
            Tok::Cons(c) => Some(*c),
            Tok::Vowel(_) => None,
        })
        .collect();
    let onset = if consonants.is_empty() {
        Onset {
            root: A,
            ..Onset::default()
        }
    } else {
        decompose(&consonants, dot)?
    };
    let Tok::Vowel(vowel) = toks[vowel_at] else {
        return None;
    };

    let mut rest = toks[vowel_at + 1..].iter().peekable();
    let mut suffix = 0;
    let mut second_suffix = 0;
    if let Some(Tok::Cons(c)) = rest.peek() {
        if SUFFIXES.contains(c) {
            suffix = c + 1;
            rest.next();
            if let Some(Tok::Cons(c2)) = rest.peek() {
                if SECOND_SUFFIXES.contains(c2) {
                    second_suffix = c2 + 1;
                    rest.next();
                }
            }
        }
    }
    let tail = rest
        .map(|t| match t {
            Tok::Cons(c) => *c,
            Tok::Vowel(v) => 100 + v,
        })
        .collect();

    Some(SyllableKey::Parsed {
        root: onset.root,
        head: onset.head_rank(),
        subscript: onset.subscript_rank(),
        vowel,
        suffix,
        second_suffix,
        tail,
    })
}

/// Split a syllable into letters. Returns the tokens and, when the syllable
/// carries a `.` disambiguation mark (`g.yag`), how many consonants precede it.
fn tokenize(syllable: &str) -> Option<(Vec<Tok>, Option<usize>)> {
    let mut toks = Vec::new();
    let mut dot = None;
    let mut onset_len = 0;
    let mut seen_vowel = false;
    let mut rest = syllable;

    while let Some(ch) = rest.chars().next() {
        if ch == '.' {
            if seen_vowel || dot.is_some() {
                return None;
            }
            dot = Some(onset_len);
            rest = &rest[1..];
            continue;
        }
        if let Some(v) = vowel_rank(ch) {
            toks.push(Tok::Vowel(v));
            seen_vowel = true;
            rest = &rest[1..];
            continue;
        }
        let (spelling, letter) = CONSONANTS.iter().find(|(sp, _)| rest.starts_with(sp))?;
        toks.push(Tok::Cons(*letter));
        if !seen_vowel {
            onset_len += 1;
        }
        rest = &rest[spelling.len()..];
    }
    Some((toks, dot))
}

fn vowel_rank(ch: char) -> Option<u8> {
    match ch {
        'a' => Some(0),
        'i' => Some(1),
        'u' => Some(2),
        'e' => Some(3),
        'o' => Some(4),
        _ => None,
    }
}

fn decompose(c: &[u8], dot: Option<usize>) -> Option<Onset> {
    match dot {
        Some(1) => {
            let mut onset = decompose_unprefixed(&c[1..])?;
            if !can_prefix(c[0], onset.root) {
                return None;
            }
            onset.prefix = Some(c[0]);
            Some(onset)
        }
        Some(_) => None,
        None => decompose_unprefixed(c).or_else(|| decompose_prefixed(c)),
    }
}

fn decompose_unprefixed(c: &[u8]) -> Option<Onset> {
    match *c {
        [root] => Some(Onset {
            root,
            ..Onset::default()
        }),
        [a, b] if can_subjoin(a, b) => Some(Onset {
            root: a,
            subscript: Some(b),
            ..Onset::default()
        }),
        [a, b] if can_superscribe(a, b) => Some(Onset {
            superscript: Some(a),
            root: b,
            ..Onset::default()
        }),
        [a, b, s] if can_superscribe(a, b) && can_subjoin(b, s) => Some(Onset {
            superscript: Some(a),
            root: b,
            subscript: Some(s),
            ..Onset::default()
        }),
        _ => None,
    }
}

fn decompose_prefixed(c: &[u8]) -> Option<Onset> {
    let (&prefix, rest) = c.split_first()?;
    let mut onset = decompose_unprefixed(rest)?;
    let allowed = match onset.superscript {
        None => can_prefix(prefix, onset.root),
        Some(sup) => prefix == B && (sup == R || sup == S),
    };
    if !allowed {
        return None;
    }
    onset.prefix = Some(prefix);
    Some(onset)
}

fn can_prefix(prefix: u8, root: u8) -> bool {
    let roots: &[u8] = match prefix {
        G => &[C, NY, T, D, N, TS, ZH, Z, Y, SH, S],
        D => &[K, G, NG, P, B, M],
        B => &[K, G, C, T, D, TS, ZH, Z, SH, S],
        M => &[KH, G, NG, CH, J, NY, TH, D, N, TSH, DZ],
        ACHUNG => &[KH, G, CH, J, TH, D, PH, B, TSH, DZ],
        _ => &[],
    };
    roots.contains(&root)
}

fn can_superscribe(sup: u8, root: u8) -> bool {
    let roots: &[u8] = match sup {
        R => &[K, G, NG, J, NY, T, D, N, B, M, TS, DZ],
        L => &[K, G, NG, C, J, T, D, P, B, H],
        S => &[K, G, NG, NY, T, D, N, P, B, M, TS],
        _ => &[],
    };
    roots.contains(&root)
}

fn can_subjoin(root: u8, sub: u8) -> bool {
    let roots: &[u8] = match sub {
        Y => &[K, KH, G, P, PH, B, M, H],
        R => &[K, KH, G, T, TH, D, N, P, PH, B, M, S, H],
        L => &[K, G, B, Z, R, S],
        W => &[K, KH, G, C, NY, T, D, TS, TSH, ZH, Z, R, L, SH, S, H],
        _ => &[],
    };
    roots.contains(&root)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(words: &[&str]) -> Vec<String> {
        let collator = Collator::new();
        let mut v: Vec<String> = words.iter().map(|w| w.to_string()).collect();
        v.sort_by(|a, b| collator.compare(a, b));
        v
    }

    #[test]
    fn dictionary_order_within_a_root() {
        let expected = [
            "ka", "kag", "ki", "kya", "kra", "dka", "bka", "rka", "ska", "brka", "bska",
        ];
        let mut shuffled = expected.to_vec();
        shuffled.reverse();
        shuffled.swap(2, 7);
        assert_eq!(sorted(&shuffled), expected.to_vec());
    }

    #[test]
    fn root_letters_follow_the_alphabet() {
        let expected = ["kha", "ga", "nga", "ca", "tsha", "'a", "ya", "sha", "ha", "a"];
        let mut shuffled = expected.to_vec();
        shuffled.sort();
        assert_eq!(sorted(&shuffled), expected.to_vec());
    }

    #[test]
    fn shorter_word_sorts_first() {
        let c = Collator::new();
        assert_eq!(c.compare("ka", "ka ba"), Ordering::Less);
        assert_eq!(c.compare("ka ba", "kag"), Ordering::Less);
        assert_eq!(c.compare("bka' 'gyur", "bka'"), Ordering::Greater);
    }

    #[test]
    fn not_code_point_order() {
        let c = Collator::new();
        // 'bka' precedes 'ka' by code point, but both sort under the root k
        // with the prefixed form after the bare one.
        assert_eq!(c.compare("ka", "bka"), Ordering::Less);
        assert_eq!(c.compare("bka", "kha"), Ordering::Less);
        assert_eq!(c.compare("sgra", "ga"), Ordering::Greater);
    }

    #[test]
    fn parses_common_clusters() {
        for word in [
            "bsgrubs", "brgyad", "dbyangs", "mkhris", "'phrul", "g.yag", "rgyal", "lha",
            "zla", "rlung", "dga'i", "tshogs", "'dzin",
        ] {
            assert!(
                matches!(syllable_key(word), SyllableKey::Parsed { .. }),
                "failed to parse {}",
                word
            );
        }
    }

    #[test]
    fn dot_forces_a_prefix() {
        let c = Collator::new();
        // gya is root g; g.ya is root y
        assert_eq!(c.compare("gya", "nga"), Ordering::Less);
        assert_eq!(c.compare("g.ya", "ra"), Ordering::Less);
        assert_eq!(c.compare("g.ya", "'a"), Ordering::Greater);
    }

    #[test]
    fn order_is_total_and_consistent() {
        let c = Collator::new();
        let words = ["chos", "chos ", "ཆོས", "Chos", "chos kyi", "xyz", "ka", "k.a"];
        for a in words {
            assert_eq!(c.compare(a, a), Ordering::Equal);
            for b in words {
                assert_eq!(c.compare(a, b), c.compare(b, a).reverse());
                if a != b {
                    assert_ne!(c.compare(a, b), Ordering::Equal);
                }
            }
        }
    }

    #[test]
    fn keys_agree_with_compare() {
        let c = Collator::new();
        let words = ["rdo rje", "rdo", "dkon mchog", "a", "ha", "'od"];
        for a in words {
            for b in words {
                assert_eq!(c.key(a).cmp(&c.key(b)), c.compare(a, b));
            }
        }
    }
}
