pub mod normalize;
pub mod variants;

pub use normalize::{NormalizedText, Normalizer};
