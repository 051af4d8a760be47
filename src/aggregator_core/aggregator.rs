//! Per-window aggregation of captured entries into a report

use super::occurrence::{OccurrenceTable, DEFAULT_TOP_K};
use super::payload::{ContentPost, PostEvent};
use super::report::{Rate, Report};
use crate::pipeline::types::{RawEvent, WindowSpec};
use reqwest::Url;
use tokio::sync::mpsc;

/// Scalar counters of one window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowCounters {
    pub total_entries: u64,
    pub tombstones: u64,
    pub content: u64,
    pub malformed: u64,
    pub with_link: u64,
    pub with_photo: u64,
    pub reshared: u64,
}

/// Aggregates the entries of exactly one window
///
/// The aggregator exclusively owns its counters and tables; nothing is
/// shared with other windows.
pub struct Aggregator {
    spec: WindowSpec,
    top_k: usize,
    counters: WindowCounters,
    languages: OccurrenceTable,
    hashtags: OccurrenceTable,
    domains: OccurrenceTable,
    mentions: OccurrenceTable,
}

impl Aggregator {
    pub fn new(spec: WindowSpec) -> Self {
        Self {
            spec,
            top_k: DEFAULT_TOP_K,
            counters: WindowCounters::default(),
            languages: OccurrenceTable::new(),
            hashtags: OccurrenceTable::new(),
            domains: OccurrenceTable::new(),
            mentions: OccurrenceTable::new(),
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn counters(&self) -> &WindowCounters {
        &self.counters
    }

    pub fn languages(&self) -> &OccurrenceTable {
        &self.languages
    }

    pub fn hashtags(&self) -> &OccurrenceTable {
        &self.hashtags
    }

    pub fn domains(&self) -> &OccurrenceTable {
        &self.domains
    }

    pub fn mentions(&self) -> &OccurrenceTable {
        &self.mentions
    }

    /// Consume the window's private queue until its consumer closes it
    pub async fn run(mut self, mut queue: mpsc::UnboundedReceiver<RawEvent>) -> Report {
        while let Some(event) = queue.recv().await {
            self.ingest(&event);
        }
        self.finish()
    }

    /// Classify and count a single entry
    pub fn ingest(&mut self, event: &RawEvent) {
        self.counters.total_entries += 1;

        match PostEvent::decode(event.payload()) {
            Ok(PostEvent::Tombstone) => self.counters.tombstones += 1,
            Ok(PostEvent::Content(post)) => {
                self.counters.content += 1;
                self.record_content(&post);
            }
            Err(e) => {
                self.counters.malformed += 1;
                log::warn!("⚠️  Window #{}: skipping unreadable entry: {}", self.spec.index, e);
            }
        }
    }

    fn record_content(&mut self, post: &ContentPost) {
        if let Some(language) = &post.language {
            self.languages.record(language);
        }

        for hashtag in &post.hashtags {
            self.hashtags.record(hashtag);
        }

        if !post.urls.is_empty() {
            self.counters.with_link += 1;
            for url in &post.urls {
                match host_of(url) {
                    Ok(host) => self.domains.record(&host),
                    Err(reason) => {
                        log::warn!("⚠️  Window #{}: no host for {:?}: {}", self.spec.index, url, reason);
                    }
                }
            }
        }

        if post.has_photo() {
            self.counters.with_photo += 1;
        }

        for mention in &post.mentions {
            self.mentions.record(mention);
        }

        if post.is_reshared() {
            self.counters.reshared += 1;
        }
    }

    /// Build the final report from the current counts
    pub fn finish(self) -> Report {
        let c = self.counters;

        log::info!(
            "📊 Window #{} complete: {} entries ({} content, {} deleted, {} unreadable)",
            self.spec.index,
            c.total_entries,
            c.content,
            c.tombstones,
            c.malformed
        );

        Report {
            index: self.spec.index,
            start_offset_secs: self.spec.start_delay.as_secs_f64(),
            duration_secs: self.spec.duration.as_secs_f64(),
            generated_at: chrono::Utc::now().timestamp(),
            total_entries: c.total_entries,
            content_entries: c.content,
            tombstones: c.tombstones,
            malformed_entries: c.malformed,
            top_languages: self.languages.top_k(self.top_k),
            top_hashtags: self.hashtags.top_k(self.top_k),
            top_domains: self.domains.top_k(self.top_k),
            top_mentions: self.mentions.top_k(self.top_k),
            link_rate: Rate::of(c.with_link, c.content),
            photo_rate: Rate::of(c.with_photo, c.content),
            reshare_rate: Rate::of(c.reshared, c.content),
        }
    }
}

fn host_of(url: &str) -> Result<String, String> {
    let parsed = Url::parse(url).map_err(|e| e.to_string())?;
    parsed
        .host_str()
        .map(str::to_string)
        .ok_or_else(|| "url has no host".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator_core::RankedEntry;
    use tokio::time::Duration;

    fn spec() -> WindowSpec {
        WindowSpec::new(0, Duration::ZERO, Duration::from_secs(2))
    }

    fn post(lang: &str) -> RawEvent {
        RawEvent::new(format!(r#"{{"lang":"{}","retweet_count":0,"entities":{{}}}}"#, lang))
    }

    fn tombstone() -> RawEvent {
        RawEvent::new(r#"{"delete":{"status":{"id":1}}}"#)
    }

    #[test]
    fn test_counters_partition_entries() {
        let mut aggregator = Aggregator::new(spec());
        for lang in ["en", "en", "ja"] {
            aggregator.ingest(&post(lang));
        }
        aggregator.ingest(&tombstone());

        let c = *aggregator.counters();
        assert_eq!(c.total_entries, 4);
        assert_eq!(c.content + c.tombstones, c.total_entries);
        assert_eq!(aggregator.languages().count("en"), 2);
    }

    #[test]
    fn test_photo_counted_once_per_entry() {
        let mut aggregator = Aggregator::new(spec());
        aggregator.ingest(&RawEvent::new(
            r#"{"lang":"en","extended_entities":{"media":[{"type":"photo"},{"type":"photo"}]}}"#,
        ));

        assert_eq!(aggregator.counters().with_photo, 1);
    }

    #[test]
    fn test_bad_url_only_skips_its_host() {
        let mut aggregator = Aggregator::new(spec());
        aggregator.ingest(&RawEvent::new(
            r#"{"lang":"de","retweet_count":3,
                "entities":{"hashtags":[{"text":"news"}],
                            "urls":[{"expanded_url":"not a url"},{"expanded_url":"https://example.org/a"}],
                            "user_mentions":[{"screen_name":"bob"}]}}"#,
        ));

        let c = *aggregator.counters();
        assert_eq!(c.content, 1);
        assert_eq!(c.with_link, 1);
        assert_eq!(c.reshared, 1);
        assert_eq!(aggregator.domains().count("example.org"), 1);
        assert_eq!(aggregator.domains().len(), 1);
        assert_eq!(aggregator.hashtags().count("news"), 1);
        assert_eq!(aggregator.mentions().count("bob"), 1);
        assert_eq!(aggregator.languages().count("de"), 1);
    }

    #[test]
    fn test_unreadable_entries_are_counted_separately() {
        let mut aggregator = Aggregator::new(spec());
        aggregator.ingest(&RawEvent::new("{not json"));
        aggregator.ingest(&post("en"));

        let report = aggregator.finish();
        assert_eq!(report.total_entries, 2);
        assert_eq!(report.malformed_entries, 1);
        assert_eq!(report.content_entries, 1);
    }

    #[test]
    fn test_window_without_content_has_undefined_rates() {
        let mut aggregator = Aggregator::new(spec());
        aggregator.ingest(&tombstone());

        let report = aggregator.finish();

        assert_eq!(report.content_entries, 0);
        assert!(!report.link_rate.is_defined());
        assert!(!report.photo_rate.is_defined());
        assert!(!report.reshare_rate.is_defined());
        assert!(report.rates_undefined());
    }

    #[tokio::test]
    async fn test_run_consumes_until_queue_closed() {
        let (tx, rx) = mpsc::unbounded_channel();
        for _ in 0..5 {
            tx.send(post("en")).unwrap();
        }
        for _ in 0..3 {
            tx.send(post("fr")).unwrap();
        }
        for _ in 0..2 {
            tx.send(post("es")).unwrap();
        }
        tx.send(tombstone()).unwrap();
        tx.send(tombstone()).unwrap();
        drop(tx);

        let report = Aggregator::new(spec()).run(rx).await;

        assert_eq!(report.total_entries, 12);
        assert_eq!(report.tombstones, 2);
        assert_eq!(report.content_entries, 10);
        assert_eq!(
            report.top_languages,
            vec![
                RankedEntry::new("en", 5),
                RankedEntry::new("fr", 3),
                RankedEntry::new("es", 2),
            ]
        );
        assert_eq!(report.link_rate.value(), Some(0.0));
    }
}
