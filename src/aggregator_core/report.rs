//! Finished window report

use super::occurrence::RankedEntry;
use serde::Serialize;
use std::fmt::{self, Write as _};

/// Percentage of content entries with some property
///
/// Undefined (NaN) when the window saw no content entries. Serializes to
/// `null` in that case.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Rate(f64);

impl Rate {
    pub fn of(part: u64, whole: u64) -> Self {
        Rate(part as f64 / whole as f64 * 100.0)
    }

    pub fn is_defined(&self) -> bool {
        !self.0.is_nan()
    }

    pub fn value(&self) -> Option<f64> {
        self.is_defined().then_some(self.0)
    }

    pub fn raw(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value() {
            Some(v) => write!(f, "{:.2}%", v),
            None => write!(f, "undefined (no content entries)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub index: u32,
    pub start_offset_secs: f64,
    pub duration_secs: f64,
    pub generated_at: i64,

    pub total_entries: u64,
    pub content_entries: u64,
    pub tombstones: u64,
    pub malformed_entries: u64,

    pub top_languages: Vec<RankedEntry>,
    pub top_hashtags: Vec<RankedEntry>,
    pub top_domains: Vec<RankedEntry>,
    pub top_mentions: Vec<RankedEntry>,

    pub link_rate: Rate,
    pub photo_rate: Rate,
    pub reshare_rate: Rate,
}

impl Report {
    /// True when no rate could be computed for this window
    pub fn rates_undefined(&self) -> bool {
        !self.link_rate.is_defined() && !self.photo_rate.is_defined() && !self.reshare_rate.is_defined()
    }

    /// Human readable report, as printed to the terminal or a text file
    pub fn render_text(&self) -> String {
        let n = self.index;
        let mut out = String::new();

        let _ = writeln!(out, "=============== Report {} ===============", n);
        let _ = writeln!(
            out,
            "Window: +{}s for {}s",
            self.start_offset_secs, self.duration_secs
        );
        let _ = writeln!(out, "Total entries this interval for report {} = {}", n, self.total_entries);
        let _ = writeln!(out, "Content entries this interval for report {} = {}", n, self.content_entries);
        let _ = writeln!(out, "Deleted entries this interval for report {} = {}", n, self.tombstones);
        if self.malformed_entries > 0 {
            let _ = writeln!(out, "Unreadable entries this interval for report {} = {}", n, self.malformed_entries);
        }
        out.push('\n');

        render_ranked(&mut out, n, "Hashtag", &self.top_hashtags);
        render_ranked(&mut out, n, "Language", &self.top_languages);

        let _ = writeln!(out, "Percentage of entries that contained a url during report {}: {}", n, self.link_rate);
        let _ = writeln!(out, "Percentage of entries that contained a photo during report {}: {}", n, self.photo_rate);
        out.push('\n');

        render_ranked(&mut out, n, "Domain", &self.top_domains);
        render_ranked(&mut out, n, "User Mentions", &self.top_mentions);

        let _ = writeln!(out, "Percentage of entries that were reshared during report {}: {}", n, self.reshare_rate);
        out
    }
}

fn render_ranked(out: &mut String, index: u32, field: &str, entries: &[RankedEntry]) {
    let _ = writeln!(out, "Top {} most common {} occurrences - report {}", entries.len(), field, index);
    if entries.is_empty() {
        let _ = writeln!(out, "Report: {} - {}: (none observed)", index, field);
    }
    for entry in entries {
        let _ = writeln!(
            out,
            "Report: {} - {}: {}, Occurrences: {}",
            index, field, entry.key, entry.count
        );
    }
    out.push('\n');
}
