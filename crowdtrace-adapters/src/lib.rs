//! Site extraction adapters for crowdtrace.
//!
//! Each module pairs an entity handle with its snapshot kind:
//!
//! - [`github`] — repositories: social counters, activity counters, licenses,
//!   and a language-ratio breakdown
//! - [`soundcloud`] — tracks: plays, downloads, comments, likes
//! - [`youtube`] — videos: views, likes, dislikes
//! - [`tumblr`] — posts: tags and notes
//! - [`wattpad`] — books: reads and votes
//!
//! The construction contract is uniform: `Snapshot::from_html` parses a
//! captured HTML document, fails descriptively on a missing required field,
//! registers the snapshot into the supplied entity's store as a side effect
//! when an entity is given, and returns the snapshot regardless. Entity
//! handles built with the same URL share one store for as long as any handle
//! is alive.
//!
//! Derived ratio fields (likes per play, votes per read, ...) are computed
//! once at construction and recomputed from the summed counters on merge.

mod dom;
mod error;
mod parse;

pub mod github;
pub mod soundcloud;
pub mod tumblr;
pub mod wattpad;
pub mod youtube;

pub use error::{AdapterError, Result};
pub use github::{GitHubRepository, LanguageBreakdown, LanguageRatios, RepositoryCounts, RepositorySnapshot};
pub use parse::{fraction, parse_compact, parse_counter, parse_leading_int, parse_percentage};
pub use soundcloud::{SoundCloudTrack, TrackSnapshot};
pub use tumblr::{PostSnapshot, TumblrPost};
pub use wattpad::{BookSnapshot, WattPadBook};
pub use youtube::{VideoSnapshot, YouTubeVideo};
