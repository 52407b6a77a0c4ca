//! Filters for segments the recognizer invented rather than heard.
//!
//! Models trained on subtitled video emit credit lines, watch-keeping
//! phrases, and bare URLs when fed silence or music. They also loop, either
//! inside one segment or by re-emitting the previous one. All four cases are
//! dropped here before rendering.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::transcribe::Segment;

static HALLUCINATION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // punctuation or whitespace only
        r#"^[，。！？、：；“”‘’…\s]+$"#,
        // subtitle credit lines
        r"字幕由.*提供",
        r"字幕.*制作",
        r"本字幕.*仅供",
        r"谢谢观看",
        r"感谢收看",
        r"感谢观看",
        r"请不吝点赞",
        r"订阅",
        r"(?i)thanks? for watching",
        r"(?i)subtitles? by",
        r"(?i)please subscribe",
        // bare links
        r"https?://\S+",
        r"www\.\S+",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

const REPEAT_MIN_LEN: usize = 4;
const REPEAT_MIN_COUNT: usize = 3;
const SIMILARITY_THRESHOLD: f64 = 0.8;

/// Whether the text matches a known hallucination pattern. Empty or
/// whitespace-only text counts.
pub fn is_known_hallucination(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return true;
    }
    HALLUCINATION_PATTERNS.iter().any(|p| p.is_match(trimmed))
}

/// Whether the text contains a substring of at least `REPEAT_MIN_LEN` chars
/// occurring at least `REPEAT_MIN_COUNT` times, counting overlaps.
pub fn has_internal_repetition(text: &str) -> bool {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() < REPEAT_MIN_LEN * REPEAT_MIN_COUNT {
        return false;
    }
    for start in 0..=(chars.len() - REPEAT_MIN_LEN) {
        let needle = &chars[start..start + REPEAT_MIN_LEN];
        let mut count = 0;
        let mut idx = 0;
        while idx + REPEAT_MIN_LEN <= chars.len() {
            if &chars[idx..idx + REPEAT_MIN_LEN] == needle {
                count += 1;
                if count >= REPEAT_MIN_COUNT {
                    return true;
                }
            }
            idx += 1;
        }
    }
    false
}

/// Greedy character-multiset similarity in `[0, 1]`, normalized by the
/// longer text. Order-insensitive, so near-duplicates with small edits
/// still score high.
pub fn char_similarity(a: &str, b: &str) -> f64 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    if a_chars.is_empty() && b_chars.is_empty() {
        return 1.0;
    }
    if a_chars.is_empty() || b_chars.is_empty() {
        return 0.0;
    }
    let mut remaining = b_chars.clone();
    let mut matched = 0usize;
    for c in &a_chars {
        if let Some(pos) = remaining.iter().position(|r| r == c) {
            remaining.swap_remove(pos);
            matched += 1;
        }
    }
    matched as f64 / a_chars.len().max(b_chars.len()) as f64
}

/// Drop hallucinated segments. The near-duplicate check compares against the
/// previous *kept* segment, so a run of lookalikes collapses to its first
/// member.
pub fn filter_segments(segments: Vec<Segment>) -> Vec<Segment> {
    let mut kept: Vec<Segment> = Vec::with_capacity(segments.len());
    for segment in segments {
        let text = segment.text.trim();
        if is_known_hallucination(text) {
            debug!(%text, "dropped hallucinated segment");
            continue;
        }
        if has_internal_repetition(text) {
            debug!(%text, "dropped repetitive segment");
            continue;
        }
        if let Some(prev) = kept.last() {
            if char_similarity(text, prev.text.trim()) > SIMILARITY_THRESHOLD {
                debug!(%text, "dropped near-duplicate segment");
                continue;
            }
        }
        kept.push(segment);
    }
    kept
}
