//! YouTube video adapter.

use crate::dom::{select_first, text_of};
use crate::error::{AdapterError, Result};
use crate::parse::{fraction, parse_leading_int};
use chrono::{DateTime, Utc};
use crowdtrace_core::{
    AppendOutcome, ArtifactUrl, Cluster, Individual, Metrics, Named, StoreHandle, StoreIter,
    StoreRegistry,
};
use scraper::Html;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::rc::Rc;

thread_local! {
    static STORES: StoreRegistry<VideoSnapshot> = StoreRegistry::new();
}

/// One captured measurement of a video, or an aggregate of several.
///
/// `like_rate` is the percentage of views that liked; `approval` is the
/// percentage of likes among all ratings. Both are computed once at
/// construction and recomputed from the summed counters on merge, and both
/// are zero when their denominator is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSnapshot {
    title: Option<String>,
    captured_at: DateTime<Utc>,
    views: u64,
    likes: u64,
    dislikes: u64,
    like_rate: f64,
    approval: f64,
}

impl VideoSnapshot {
    /// Builds a snapshot and, when a video handle is given, registers it into
    /// that video's store.
    pub fn new(
        video: Option<&YouTubeVideo>,
        title: Option<String>,
        captured_at: DateTime<Utc>,
        views: u64,
        likes: u64,
        dislikes: u64,
    ) -> Self {
        let snapshot = Self {
            title,
            captured_at,
            views,
            likes,
            dislikes,
            like_rate: 100.0 * fraction(likes, views),
            approval: 100.0 * fraction(likes, likes + dislikes),
        };
        if let Some(video) = video {
            video.append(snapshot.clone());
        }
        snapshot
    }

    /// Constructs a video snapshot from a captured HTML document,
    /// registering it into the supplied video's store when one is given.
    pub fn from_html(
        video: Option<&YouTubeVideo>,
        captured_at: DateTime<Utc>,
        html: &str,
    ) -> Result<Self> {
        let document = Html::parse_document(html);
        let title = select_first(&document, r#"meta[property="og:title"]"#)
            .and_then(|meta| meta.value().attr("content"))
            .ok_or(AdapterError::MissingField("title"))?
            .to_string();
        let views = select_first(&document, "div.watch-view-count")
            .map(|element| parse_leading_int(&text_of(element)))
            .ok_or(AdapterError::MissingField("views"))??;
        let likes = select_first(&document, "button.like-button-renderer-like-button")
            .map(|element| parse_leading_int(&text_of(element)))
            .ok_or(AdapterError::MissingField("likes"))??;
        let dislikes = select_first(&document, "button.like-button-renderer-dislike-button")
            .map(|element| parse_leading_int(&text_of(element)))
            .ok_or(AdapterError::MissingField("dislikes"))??;
        Ok(Self::new(
            video,
            Some(title),
            captured_at,
            views,
            likes,
            dislikes,
        ))
    }

    /// The title at capture time; `None` on an aggregate.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// The number of views.
    #[must_use]
    pub fn views(&self) -> u64 {
        self.views
    }

    /// The number of likes.
    #[must_use]
    pub fn likes(&self) -> u64 {
        self.likes
    }

    /// The number of dislikes.
    #[must_use]
    pub fn dislikes(&self) -> u64 {
        self.dislikes
    }

    /// Percentage of views that liked.
    #[must_use]
    pub fn like_rate(&self) -> f64 {
        self.like_rate
    }

    /// Percentage of likes among all ratings.
    #[must_use]
    pub fn approval(&self) -> f64 {
        self.approval
    }
}

impl Individual for VideoSnapshot {
    fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    fn merge(self, other: Self) -> Self {
        Self::new(
            None,
            None,
            self.captured_at.max(other.captured_at),
            self.views + other.views,
            self.likes + other.likes,
            self.dislikes + other.dislikes,
        )
    }
}

impl Metrics for VideoSnapshot {
    fn metric(&self, key: &str) -> Option<f64> {
        match key {
            "views" => Some(self.views as f64),
            "likes" => Some(self.likes as f64),
            "dislikes" => Some(self.dislikes as f64),
            "like_rate" => Some(self.like_rate),
            "approval" => Some(self.approval),
            _ => None,
        }
    }
}

/// A YouTube video handle, keyed by URL.
///
/// Every handle built from the same URL shares one snapshot series while any
/// handle is alive; the series is discarded with the last handle.
#[derive(Debug, Clone)]
pub struct YouTubeVideo {
    url: ArtifactUrl,
    store: StoreHandle<VideoSnapshot>,
}

impl YouTubeVideo {
    /// Creates a handle from a video URL.
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

    /// Records a snapshot into the video's series.
    pub fn append(&self, snapshot: VideoSnapshot) -> AppendOutcome {
        self.store.borrow_mut().append(snapshot)
    }

    /// The most recent snapshot, or `None` before the first capture.
    #[must_use]
    pub fn latest(&self) -> Option<VideoSnapshot> {
        self.store.borrow().latest().cloned()
    }
}

impl Named for YouTubeVideo {
    fn name(&self) -> String {
        self.latest()
            .and_then(|snapshot| snapshot.title)
            .unwrap_or_else(|| "(unknown title)".to_string())
    }
}

impl Cluster for YouTubeVideo {
    type Individual = VideoSnapshot;

    fn iter(&self) -> Box<dyn Iterator<Item = VideoSnapshot> + '_> {
        Box::new(StoreIter::new(Rc::clone(&self.store)))
    }
}

impl PartialEq for YouTubeVideo {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

impl Eq for YouTubeVideo {}

impl Hash for YouTubeVideo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state);
    }
}
