//! SoundCloud track adapter.
//!
//! Track pages carry their counters in `soundcloud:`-namespaced meta tags,
//! so extraction is a straight read of four counts plus the title.

use crate::dom::select_first;
use crate::error::{AdapterError, Result};
use crate::parse::fraction;
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
    static STORES: StoreRegistry<TrackSnapshot> = StoreRegistry::new();
}

/// One captured measurement of a track, or an aggregate of several.
///
/// `likes_per_play` is computed once at construction and recomputed from the
/// summed counters on merge; it is zero for a track with no plays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSnapshot {
    title: Option<String>,
    captured_at: DateTime<Utc>,
    plays: u64,
    downloads: u64,
    comments: u64,
    likes: u64,
    likes_per_play: f64,
}

impl TrackSnapshot {
    /// Builds a snapshot and, when a track handle is given, registers it into
    /// that track's store.
    pub fn new(
        track: Option<&SoundCloudTrack>,
        title: Option<String>,
        captured_at: DateTime<Utc>,
        plays: u64,
        downloads: u64,
        comments: u64,
        likes: u64,
    ) -> Self {
        let snapshot = Self {
            title,
            captured_at,
            plays,
            downloads,
            comments,
            likes,
            likes_per_play: fraction(likes, plays),
        };
        if let Some(track) = track {
            track.append(snapshot.clone());
        }
        snapshot
    }

    /// Constructs a track snapshot from a captured HTML document,
    /// registering it into the supplied track's store when one is given.
    pub fn from_html(
        track: Option<&SoundCloudTrack>,
        captured_at: DateTime<Utc>,
        html: &str,
    ) -> Result<Self> {
        let document = Html::parse_document(html);
        let title = read_meta(&document, "og:title", "title")?;
        let plays = read_meta_count(&document, "soundcloud:play_count", "plays")?;
        let downloads = read_meta_count(&document, "soundcloud:download_count", "downloads")?;
        let comments = read_meta_count(&document, "soundcloud:comments_count", "comments")?;
        let likes = read_meta_count(&document, "soundcloud:like_count", "likes")?;
        Ok(Self::new(
            track,
            Some(title),
            captured_at,
            plays,
            downloads,
            comments,
            likes,
        ))
    }

    /// The title at capture time; `None` on an aggregate.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// The number of plays.
    #[must_use]
    pub fn plays(&self) -> u64 {
        self.plays
    }

    /// The number of downloads.
    #[must_use]
    pub fn downloads(&self) -> u64 {
        self.downloads
    }

    /// The number of comments.
    #[must_use]
    pub fn comments(&self) -> u64 {
        self.comments
    }

    /// The number of likes.
    #[must_use]
    pub fn likes(&self) -> u64 {
        self.likes
    }

    /// Likes per play, zero when nothing has been played.
    #[must_use]
    pub fn likes_per_play(&self) -> f64 {
        self.likes_per_play
    }
}

impl Individual for TrackSnapshot {
    fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    fn merge(self, other: Self) -> Self {
        Self::new(
            None,
            None,
            self.captured_at.max(other.captured_at),
            self.plays + other.plays,
            self.downloads + other.downloads,
            self.comments + other.comments,
            self.likes + other.likes,
        )
    }
}

impl Metrics for TrackSnapshot {
    fn metric(&self, key: &str) -> Option<f64> {
        match key {
            "plays" => Some(self.plays as f64),
            "downloads" => Some(self.downloads as f64),
            "comments" => Some(self.comments as f64),
            "likes" => Some(self.likes as f64),
            "likes_per_play" => Some(self.likes_per_play),
            _ => None,
        }
    }
}

/// A SoundCloud track handle, keyed by URL.
///
/// Every handle built from the same URL shares one snapshot series while any
/// handle is alive; the series is discarded with the last handle.
#[derive(Debug, Clone)]
pub struct SoundCloudTrack {
    url: ArtifactUrl,
    store: StoreHandle<TrackSnapshot>,
}

impl SoundCloudTrack {
    /// Creates a handle from a track URL.
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

    /// Records a snapshot into the track's series.
    pub fn append(&self, snapshot: TrackSnapshot) -> AppendOutcome {
        self.store.borrow_mut().append(snapshot)
    }

    /// The most recent snapshot, or `None` before the first capture.
    #[must_use]
    pub fn latest(&self) -> Option<TrackSnapshot> {
        self.store.borrow().latest().cloned()
    }
}

impl Named for SoundCloudTrack {
    fn name(&self) -> String {
        self.latest()
            .and_then(|snapshot| snapshot.title)
            .unwrap_or_else(|| "(unknown title)".to_string())
    }
}

impl Cluster for SoundCloudTrack {
    type Individual = TrackSnapshot;

    fn iter(&self) -> Box<dyn Iterator<Item = TrackSnapshot> + '_> {
        Box::new(StoreIter::new(Rc::clone(&self.store)))
    }
}

impl PartialEq for SoundCloudTrack {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

impl Eq for SoundCloudTrack {}

impl Hash for SoundCloudTrack {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state);
    }
}

fn read_meta(document: &Html, property: &str, field: &'static str) -> Result<String> {
    select_first(document, &format!(r#"meta[property="{property}"]"#))
        .and_then(|meta| meta.value().attr("content"))
        .map(str::to_string)
        .ok_or(AdapterError::MissingField(field))
}

fn read_meta_count(document: &Html, property: &str, field: &'static str) -> Result<u64> {
    let content = read_meta(document, property, field)?;
    content.parse().map_err(|_| AdapterError::Malformed {
        expected: field,
        text: content,
    })
}
