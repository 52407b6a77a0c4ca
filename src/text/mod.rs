//! Transcript text cleanup.

mod hallucination;
mod script;

pub use hallucination::{
    char_similarity, filter_segments, has_internal_repetition, is_known_hallucination,
};
pub use script::to_simplified;
