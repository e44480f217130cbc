pub mod interpolate;
pub mod merge;
pub mod window;

use clap::ValueEnum;

use crate::matcher::MatchKind;
use crate::text::NormalizedText;
use crate::wordlist::Term;

pub use interpolate::interpolate;
pub use merge::align_merge;
pub use window::align_window;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    /// Walk the wordlist with a page window around the last confirmed page
    Window,
    /// Walk wordlist and headwords together in collation order
    Merge,
}

impl Strategy {
    pub fn label(&self) -> &'static str {
        match self {
            Strategy::Window => "window",
            Strategy::Merge => "merge",
        }
    }
}

/// A term with its comparison forms.
#[derive(Debug, Clone)]
pub struct PreparedTerm {
    pub term: Term,
    pub norm: NormalizedText,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub term: Term,
    pub page: Option<u32>,
    pub interpolated: bool,
    pub score: f64,
    pub kind: Option<MatchKind>,
}

impl Assignment {
    pub fn unresolved(term: Term) -> Self {
        Assignment {
            term,
            page: None,
            interpolated: false,
            score: 0.0,
            kind: None,
        }
    }

    pub fn confirmed(term: Term, page: u32, score: f64, kind: MatchKind) -> Self {
        Assignment {
            term,
            page: Some(page),
            interpolated: false,
            score,
            kind: Some(kind),
        }
    }

    /// Page taken from a neighbouring headword rather than a match.
    pub fn inferred(term: Term, page: u32) -> Self {
        Assignment {
            term,
            page: Some(page),
            interpolated: true,
            score: 0.0,
            kind: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.page.is_some()
    }

    pub fn is_matched(&self) -> bool {
        self.kind.is_some()
    }
}
