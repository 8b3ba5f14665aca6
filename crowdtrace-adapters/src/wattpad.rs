//! WattPad book adapter.

use crate::dom::{select_first, text_of};
use crate::error::{AdapterError, Result};
use crate::parse::{fraction, parse_compact};
use chrono::{DateTime, Utc};
use crowdtrace_core::{
    AppendOutcome, ArtifactUrl, Cluster, Individual, Metrics, Named, StoreHandle, StoreIter,
    StoreRegistry,
};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::rc::Rc;

thread_local! {
    static STORES: StoreRegistry<BookSnapshot> = StoreRegistry::new();
}

/// One captured measurement of a book, or an aggregate of several.
///
/// `votes_per_read` is the percentage of reads that voted, computed once at
/// construction and recomputed from the summed counters on merge; zero for
/// an unread book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookSnapshot {
    title: Option<String>,
    captured_at: DateTime<Utc>,
    reads: u64,
    votes: u64,
    votes_per_read: f64,
}

impl BookSnapshot {
    /// Builds a snapshot and, when a book handle is given, registers it into
    /// that book's store.
    pub fn new(
        book: Option<&WattPadBook>,
        title: Option<String>,
        captured_at: DateTime<Utc>,
        reads: u64,
        votes: u64,
    ) -> Self {
        let snapshot = Self {
            title,
            captured_at,
            reads,
            votes,
            votes_per_read: 100.0 * fraction(votes, reads),
        };
        if let Some(book) = book {
            book.append(snapshot.clone());
        }
        snapshot
    }

    /// Constructs a book snapshot from a captured HTML document, registering
    /// it into the supplied book's store when one is given.
    pub fn from_html(
        book: Option<&WattPadBook>,
        captured_at: DateTime<Utc>,
        html: &str,
    ) -> Result<Self> {
        let document = Html::parse_document(html);
        let title = select_first(&document, "h1")
            .map(text_of)
            .ok_or(AdapterError::MissingField("title"))?;
        let reads = read_tooltip_counter(&document, "Reads")?;
        let votes = read_tooltip_counter(&document, "Votes")?;
        Ok(Self::new(book, Some(title), captured_at, reads, votes))
    }

    /// The title at capture time; `None` on an aggregate.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// The number of reads.
    #[must_use]
    pub fn reads(&self) -> u64 {
        self.reads
    }

    /// The number of votes.
    #[must_use]
    pub fn votes(&self) -> u64 {
        self.votes
    }

    /// Percentage of reads that voted.
    #[must_use]
    pub fn votes_per_read(&self) -> f64 {
        self.votes_per_read
    }
}

impl Individual for BookSnapshot {
    fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    fn merge(self, other: Self) -> Self {
        Self::new(
            None,
            None,
            self.captured_at.max(other.captured_at),
            self.reads + other.reads,
            self.votes + other.votes,
        )
    }
}

impl Metrics for BookSnapshot {
    fn metric(&self, key: &str) -> Option<f64> {
        match key {
            "reads" => Some(self.reads as f64),
            "votes" => Some(self.votes as f64),
            "votes_per_read" => Some(self.votes_per_read),
            _ => None,
        }
    }
}

/// A WattPad book handle, keyed by URL.
///
/// Every handle built from the same URL shares one snapshot series while any
/// handle is alive; the series is discarded with the last handle.
#[derive(Debug, Clone)]
pub struct WattPadBook {
    url: ArtifactUrl,
    store: StoreHandle<BookSnapshot>,
}

impl WattPadBook {
    /// Creates a handle from a book URL.
    #[must_use]
    pub fn new(url: impl Into<ArtifactUrl>) -> Self {
        let url = url.into();
        let store = STORES.with(|registry| registry.obtain(&url));
        Self { url, store }
    }

    /// The identifying URL.
    #[must_use]
    pub fn url(&self) -> &ArtifactUrl {
        &self.url
    }

    /// Records a snapshot into the book's series.
    pub fn append(&self, snapshot: BookSnapshot) -> AppendOutcome {
        self.store.borrow_mut().append(snapshot)
    }

    /// The most recent snapshot, or `None` before the first capture.
    #[must_use]
    pub fn latest(&self) -> Option<BookSnapshot> {
        self.store.borrow().latest().cloned()
    }
}

impl Named for WattPadBook {
    fn name(&self) -> String {
        self.latest()
            .and_then(|snapshot| snapshot.title.clone())
            .unwrap_or_else(|| "(unknown title)".to_string())
    }
}

impl Cluster for WattPadBook {
    type Individual = BookSnapshot;

    fn iter(&self) -> Box<dyn Iterator<Item = BookSnapshot> + '_> {
        Box::new(StoreIter::new(Rc::clone(&self.store)))
    }
}

impl PartialEq for WattPadBook {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

impl Eq for WattPadBook {}

impl Hash for WattPadBook {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state);
    }
}

fn read_tooltip_counter(document: &Html, label: &'static str) -> Result<u64> {
    let selector = Selector::parse(r#"span[data-toggle="tooltip"]"#).expect("static selector");
    let counter = document
        .select(&selector)
        .map(text_of)
        .find(|text| text.ends_with(label))
        .ok_or(AdapterError::MissingField(label))?;
    parse_compact(&counter)
}
