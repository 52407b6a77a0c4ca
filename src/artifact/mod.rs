//! Markdown transcript rendering and delivery.

mod sink;

pub use sink::{DeliverySink, FileSink};

use chrono::{DateTime, SecondsFormat, Utc};

use crate::transcribe::Segment;

/// A finished transcript ready to render as a Markdown document.
#[derive(Debug, Clone)]
pub struct TranscriptArtifact {
    pub title: String,
    pub source_url: String,
    pub duration_sec: f64,
    pub language: String,
    pub model: String,
    pub generated_at: DateTime<Utc>,
    pub segments: Vec<Segment>,
}

impl TranscriptArtifact {
    /// Render the document: front matter, a full-text section, then one
    /// timestamped line per segment.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("---\n");
        out.push_str(&format!("title: {}\n", yaml_quote(&self.title)));
        out.push_str(&format!("source: {}\n", yaml_quote(&self.source_url)));
        out.push_str(&format!(
            "duration: {}\n",
            yaml_quote(&format_time(self.duration_sec))
        ));
        out.push_str(&format!(
            "transcribed_at: {}\n",
            yaml_quote(
                &self
                    .generated_at
                    .to_rfc3339_opts(SecondsFormat::Millis, true)
            )
        ));
        out.push_str(&format!("language: {}\n", yaml_quote(&self.language)));
        out.push_str(&format!("model: {}\n", yaml_quote(&self.model)));
        out.push_str("---\n\n");

        out.push_str(&format!("# {}\n\n", self.title));

        out.push_str("## 完整文本\n\n");
        for segment in &self.segments {
            out.push_str(segment.text.trim());
        }
        out.push_str("\n\n");

        out.push_str("## 带时间戳的分段\n\n");
        for segment in &self.segments {
            let end = segment.end_sec.unwrap_or(self.duration_sec);
            out.push_str(&format!(
                "**[{} - {}]** {}\n\n",
                format_time(segment.start_sec),
                format_time(end),
                segment.text.trim()
            ));
        }
        out
    }
}

/// Double-quote a front-matter value so titles containing `:` or leading
/// flow-indicator characters stay valid YAML.
fn yaml_quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// Seconds to `mm:ss`, flooring fractional seconds.
pub fn format_time(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Reduce a recording title to a safe filename stem: drop characters invalid
/// on common filesystems, collapse whitespace to underscores, cap the length.
pub fn sanitize_filename(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*') && !c.is_control())
        .collect();
    let mut out = String::new();
    let mut last_was_sep = false;
    for c in cleaned.trim().chars() {
        if c.is_whitespace() {
            if !last_was_sep {
                out.push('_');
                last_was_sep = true;
            }
        } else {
            out.push(c);
            last_was_sep = false;
        }
    }
    if out.is_empty() {
        out.push_str("transcript");
    }
    out.chars().take(100).collect()
}
