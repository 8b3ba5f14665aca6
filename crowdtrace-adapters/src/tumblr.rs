//! Tumblr post adapter.
//!
//! Posts have no reliable title element; the description meta stands in, and
//! the joined tag list is the fallback.

use crate::dom::{select_first, select_first_in, text_of};
use crate::error::{AdapterError, Result};
use crate::parse::parse_compact;
use chrono::{DateTime, Utc};
use crowdtrace_core::{
    AppendOutcome, ArtifactUrl, Cluster, Individual, Metrics, Named, StoreHandle, StoreIter,
    StoreRegistry,
};
use scraper::Html;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

thread_local! {
    static STORES: StoreRegistry<PostSnapshot> = StoreRegistry::new();
}

/// One captured measurement of a post, or an aggregate of several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostSnapshot {
    title: Option<String>,
    captured_at: DateTime<Utc>,
    tags: BTreeSet<String>,
    notes: u64,
}

impl PostSnapshot {
    /// Builds a snapshot and, when a post handle is given, registers it into
    /// that post's store.
    pub fn new(
        post: Option<&TumblrPost>,
        title: Option<String>,
        captured_at: DateTime<Utc>,
        tags: impl IntoIterator<Item = String>,
        notes: u64,
    ) -> Self {
        let snapshot = Self {
            title,
            captured_at,
            tags: tags.into_iter().collect(),
            notes,
        };
        if let Some(post) = post {
            post.append(snapshot.clone());
        }
        snapshot
    }

    /// Constructs a post snapshot from a captured HTML document, registering
    /// it into the supplied post's store when one is given.
    pub fn from_html(
        post: Option<&TumblrPost>,
        captured_at: DateTime<Utc>,
        html: &str,
    ) -> Result<Self> {
        let document = Html::parse_document(html);

        let description = select_first(&document, r#"meta[name="description"]"#)
            .or_else(|| select_first(&document, r#"meta[property="og:description"]"#))
            .and_then(|meta| meta.value().attr("content"))
            .ok_or(AdapterError::MissingField("description"))?;

        let tags: Vec<String> = select_first(&document, r#"meta[name="keywords"]"#)
            .and_then(|meta| meta.value().attr("content"))
            .ok_or(AdapterError::MissingField("tags"))?
            .split(',')
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect();

        let title = if description.is_empty() {
            tags.join(" ")
        } else {
            description.to_string()
        };

        let article = select_first(&document, "div.main article")
            .ok_or(AdapterError::MissingField("post"))?;
        let notes = match select_first_in(article, "a.post-notes") {
            Some(element) => parse_compact(&text_of(element))?,
            None => 0,
        };

        Ok(Self::new(post, Some(title), captured_at, tags, notes))
    }

    /// The title at capture time; `None` on an aggregate.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// The tags on the post; the union of all members' tags on an aggregate.
    #[must_use]
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// The number of notes.
    #[must_use]
    pub fn notes(&self) -> u64 {
        self.notes
    }
}

impl Individual for PostSnapshot {
    fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    fn merge(self, other: Self) -> Self {
        let mut tags = self.tags;
        tags.extend(other.tags);
        Self {
            title: None,
            captured_at: self.captured_at.max(other.captured_at),
            tags,
            notes: self.notes + other.notes,
        }
    }
}

impl Metrics for PostSnapshot {
    fn metric(&self, key: &str) -> Option<f64> {
        match key {
            "notes" => Some(self.notes as f64),
            _ => None,
        }
    }
}

/// A Tumblr post handle, keyed by URL.
///
/// Every handle built from the same URL shares one snapshot series while any
/// handle is alive; the series is discarded with the last handle.
#[derive(Debug, Clone)]
pub struct TumblrPost {
    url: ArtifactUrl,
    store: StoreHandle<PostSnapshot>,
}

impl TumblrPost {
    /// Creates a handle from a post URL.
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

    /// Records a snapshot into the post's series.
    pub fn append(&self, snapshot: PostSnapshot) -> AppendOutcome {
        self.store.borrow_mut().append(snapshot)
    }

    /// The most recent snapshot, or `None` before the first capture.
    #[must_use]
    pub fn latest(&self) -> Option<PostSnapshot> {
        self.store.borrow().latest().cloned()
    }

    /// The tags of the latest snapshot, or an empty set.
    #[must_use]
    pub fn tags(&self) -> BTreeSet<String> {
        self.latest()
            .map(|snapshot| snapshot.tags)
            .unwrap_or_default()
    }
}

impl Named for TumblrPost {
    fn name(&self) -> String {
        self.latest()
            .and_then(|snapshot| snapshot.title)
            .unwrap_or_else(|| "(unknown title)".to_string())
    }
}

impl Cluster for TumblrPost {
    type Individual = PostSnapshot;

    fn iter(&self) -> Box<dyn Iterator<Item = PostSnapshot> + '_> {
        Box::new(StoreIter::new(Rc::clone(&self.store)))
    }
}

impl PartialEq for TumblrPost {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

impl Eq for TumblrPost {}

impl Hash for TumblrPost {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state);
    }
}
