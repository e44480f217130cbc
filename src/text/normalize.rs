use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::config::Settings;

// Innermost groups only; nested annotations are peeled from the inside out.
static ANNOTATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^()]*\)|\{[^{}]*\}").unwrap());

// Trailing punctuation, footnote markers, tsheg/shad.
static TRAILING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s.,;:/|*†‡0-9¹²³⁴⁵⁶⁷⁸⁹⁰\u{0F0B}\u{0F0C}\u{0F0D}\u{0F0E}]+$").unwrap());

/// Known OCR confusions in romanized Tibetan, applied in order.
/// The right-hand side is the reading the relaxed form converges on.
const OCR_CONFUSIONS: &[(&str, &str)] = &[
    ("beam", "bcom"), // e/c
    ("idan", "ldan"), // I/l, after case folding
    ("1", "l"),
];

/// Comparison forms of a term or anchor. Never written to output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText {
    pub canonical: String,
    pub relaxed: String,
}

impl NormalizedText {
    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Normalizer {
    case_fold: bool,
    particles: Vec<String>,
    confusions: Vec<(String, String)>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Normalizer::from_settings(&Settings::default())
    }
}

impl Normalizer {
    pub fn from_settings(settings: &Settings) -> Self {
        let confusions = OCR_CONFUSIONS
            .iter()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .chain(settings.ocr_confusions.iter().cloned())
            .filter(|(from, _)| !from.is_empty())
            .collect();
        let particles = settings
            .trailing_particles
            .iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .map(|p| if settings.case_fold { p.to_lowercase() } else { p })
            .collect();
        Normalizer {
            case_fold: settings.case_fold,
            particles,
            confusions,
        }
    }

    /// Canonical comparison form. Idempotent.
    pub fn normalize(&self, raw: &str) -> String {
        let composed: String = raw.nfc().map(fold_apostrophe).collect();
        let stripped = strip_annotations(composed);
        let cased = if self.case_fold {
            stripped.to_lowercase()
        } else {
            stripped
        };
        let mut out = cased.split_whitespace().collect::<Vec<_>>().join(" ");
        loop {
            let before = out.len();
            let trimmed = TRAILING_RE.replace(&out, "");
            out = trimmed.trim_end().to_string();
            for particle in &self.particles {
                if let Some(rest) = out.strip_suffix(particle.as_str()) {
                    if rest.ends_with(' ') {
                        out = rest.trim_end().to_string();
                    }
                }
            }
            if out.len() == before {
                break;
            }
        }
        out
    }

    /// OCR-relaxed variant of an already canonical string.
    pub fn relax(&self, canonical: &str) -> String {
        let mut out = canonical.to_string();
        for (from, to) in &self.confusions {
            if out.contains(from.as_str()) {
                out = out.replace(from.as_str(), to);
            }
        }
        out
    }

    pub fn prepare(&self, raw: &str) -> NormalizedText {
        let canonical = self.normalize(raw);
        let relaxed = self.relax(&canonical);
        NormalizedText { canonical, relaxed }
    }
}

fn strip_annotations(mut text: String) -> String {
    while ANNOTATION_RE.is_match(&text) {
        text = ANNOTATION_RE.replace_all(&text, " ").into_owned();
    }
    text
}

fn fold_apostrophe(c: char) -> char {
    match c {
        '\u{2019}' | '\u{2018}' | '\u{02BC}' | '\u{00B4}' | '`' => '\'',
        _ => c,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: &[&str] = &[
        "  bcom  ldan 'das  ",
        "Chos (dharma).",
        "rdo rje{ed.}  2",
        "dkon mchog gsum;*",
        "ka ba / ",
        "ཀ་བ་",
        "sangs rgyas ((nested) gloss)",
        "don dam pa la",
        "Idan pa’i",
        "",
        "  ..  ",
        "(only a gloss)",
    ];

    #[test]
    fn collapses_and_strips() {
        let n = Normalizer::default();
        assert_eq!(n.normalize("  bcom  ldan 'das  "), "bcom ldan 'das");
        assert_eq!(n.normalize("Chos (dharma)."), "chos");
        assert_eq!(n.normalize("rdo rje{ed.}  2"), "rdo rje");
        assert_eq!(n.normalize("dkon mchog gsum;*"), "dkon mchog gsum");
        assert_eq!(n.normalize("ཀ་བ་"), "ཀ་བ");
        assert_eq!(n.normalize("Idan pa’i"), "idan pa'i");
        assert_eq!(n.normalize("(only a gloss)"), "");
        assert_eq!(n.normalize("sangs rgyas ((nested) gloss)"), "sangs rgyas");
        assert_eq!(n.normalize("chos {a (b) c} nyid"), "chos nyid");
    }

    #[test]
    fn normalization_is_idempotent() {
        let settings = Settings {
            trailing_particles: vec!["la".to_string()],
            ..Settings::default()
        };
        for n in [Normalizer::default(), Normalizer::from_settings(&settings)] {
            for sample in SAMPLES {
                let once = n.normalize(sample);
                assert_eq!(n.normalize(&once), once, "not idempotent for {:?}", sample);
            }
        }
    }

    #[test]
    fn trailing_particle_only_as_separate_syllable() {
        let settings = Settings {
            trailing_particles: vec!["la".to_string()],
            ..Settings::default()
        };
        let n = Normalizer::from_settings(&settings);
        assert_eq!(n.normalize("don dam pa la"), "don dam pa");
        assert_eq!(n.normalize("bla"), "bla");
        assert_eq!(n.normalize("la"), "la");
    }

    #[test]
    fn case_is_kept_when_folding_disabled() {
        let settings = Settings {
            case_fold: false,
            ..Settings::default()
        };
        let n = Normalizer::from_settings(&settings);
        assert_eq!(n.normalize("Ta la"), "Ta la");
    }

    #[test]
    fn relaxed_form_repairs_known_confusions() {
        let n = Normalizer::default();
        let beam = n.prepare("beam ldan 'das");
        let bcom = n.prepare("bcom ldan 'das");
        assert_ne!(beam.canonical, bcom.canonical);
        assert_eq!(beam.relaxed, bcom.relaxed);
        assert_eq!(n.prepare("Idan").relaxed, "ldan");
        assert_eq!(n.relax(&beam.relaxed), beam.relaxed);
    }

    #[test]
    fn configured_confusions_extend_the_table() {
        let settings = Settings {
            ocr_confusions: vec![("rn".to_string(), "m".to_string())],
            ..Settings::default()
        };
        let n = Normalizer::from_settings(&settings);
        assert_eq!(n.prepare("rnam").relaxed, "mam");
    }
}
