//! GitHub repository adapter.
//!
//! A repository snapshot carries social counters (watching, stars, forks),
//! activity counters (issues, pull requests, projects, commits, branches,
//! releases), the license set, and a language-ratio breakdown. The breakdown
//! is itself algebra-typed: merging two snapshots concatenates their
//! per-repository language samples, and the mean ratio per language is
//! computed on read.

use crate::dom::{select_first, select_first_in, text_of};
use crate::error::{AdapterError, Result};
use crate::parse::{parse_counter, parse_percentage};
use chrono::{DateTime, Utc};
use crowdtrace_core::{
    AppendOutcome, ArtifactUrl, Cluster, Individual, Metrics, Named, StoreHandle, StoreIter,
    StoreRegistry,
};
use scraper::Html;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use tracing::debug;

/// Filenames a repository's license link may point at.
const LICENSE_FILENAMES: [&str; 4] = ["COPYING", "LICENSE", "LICENSE.md", "LICENSE.txt"];

thread_local! {
    static STORES: StoreRegistry<RepositorySnapshot> = StoreRegistry::new();
}

/// The usage ratios of the programming languages in one repository.
///
/// Every ratio lies in the range (0; 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageRatios {
    languages: BTreeMap<String, f64>,
}

impl LanguageRatios {
    /// Builds a validated ratio table.
    pub fn new<S: Into<String>>(languages: impl IntoIterator<Item = (S, f64)>) -> Result<Self> {
        let mut table = BTreeMap::new();
        for (name, ratio) in languages {
            if ratio <= 0.0 || ratio > 1.0 {
                return Err(AdapterError::RatioOutOfRange(ratio));
            }
            table.insert(name.into(), ratio);
        }
        Ok(Self { languages: table })
    }

    /// Returns the ratio of one language, or `None` if the repository does
    /// not use it.
    #[must_use]
    pub fn get(&self, language: &str) -> Option<f64> {
        self.languages.get(language).copied()
    }

    /// Iterates the languages and their usage ratios.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.languages
            .iter()
            .map(|(name, &ratio)| (name.as_str(), ratio))
    }
}

/// Language ratios of a cluster of repositories, one sample per repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageBreakdown {
    captured_at: DateTime<Utc>,
    samples: Vec<LanguageRatios>,
}

impl LanguageBreakdown {
    /// Builds a breakdown; at least one sample is required.
    pub fn new(
        captured_at: DateTime<Utc>,
        samples: impl IntoIterator<Item = LanguageRatios>,
    ) -> Result<Self> {
        let samples: Vec<_> = samples.into_iter().collect();
        if samples.is_empty() {
            return Err(AdapterError::EmptyBreakdown);
        }
        Ok(Self {
            captured_at,
            samples,
        })
    }

    /// Returns the number of repository samples aggregated so far.
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Returns the arithmetic mean usage ratio per language across the
    /// samples; a repository that does not use a language contributes zero.
    #[must_use]
    pub fn mean(&self) -> BTreeMap<String, f64> {
        let mut totals: BTreeMap<String, f64> = BTreeMap::new();
        for sample in &self.samples {
            for (name, ratio) in sample.iter() {
                *totals.entry(name.to_string()).or_insert(0.0) += ratio;
            }
        }
        let count = self.samples.len() as f64;
        totals.values_mut().for_each(|total| *total /= count);
        totals
    }

    /// Returns the mean share of one language, matched case-insensitively;
    /// zero if no sample uses it.
    #[must_use]
    pub fn share(&self, language: &str) -> f64 {
        let wanted = language.to_lowercase();
        self.mean()
            .iter()
            .filter(|(name, _)| name.to_lowercase() == wanted)
            .map(|(_, ratio)| ratio)
            .sum()
    }
}

impl Individual for LanguageBreakdown {
    fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    fn merge(self, other: Self) -> Self {
        let mut samples = self.samples;
        samples.extend(other.samples);
        Self {
            captured_at: self.captured_at.max(other.captured_at),
            samples,
        }
    }
}

/// The integer counters of a repository snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryCounts {
    pub watching: u64,
    pub stars: u64,
    pub forks: u64,
    pub issues: u64,
    pub pull_requests: u64,
    pub projects: u64,
    pub commits: u64,
    pub branches: u64,
    pub releases: u64,
}

impl RepositoryCounts {
    fn merged(self, other: Self) -> Self {
        Self {
            watching: self.watching + other.watching,
            stars: self.stars + other.stars,
            forks: self.forks + other.forks,
            issues: self.issues + other.issues,
            pull_requests: self.pull_requests + other.pull_requests,
            projects: self.projects + other.projects,
            commits: self.commits + other.commits,
            branches: self.branches + other.branches,
            releases: self.releases + other.releases,
        }
    }
}

/// One captured measurement of a repository, or an aggregate of several.
///
/// `owner` and `title` identify one artifact, so an aggregate carries
/// neither.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositorySnapshot {
    owner: Option<String>,
    title: Option<String>,
    captured_at: DateTime<Utc>,
    counts: RepositoryCounts,
    licenses: BTreeSet<String>,
    languages: LanguageBreakdown,
}

impl RepositorySnapshot {
    /// Builds a snapshot and, when a repository handle is given, registers it
    /// into that repository's store.
    pub fn new(
        repository: Option<&GitHubRepository>,
        owner: Option<String>,
        title: Option<String>,
        captured_at: DateTime<Utc>,
        counts: RepositoryCounts,
        licenses: BTreeSet<String>,
        languages: LanguageBreakdown,
    ) -> Self {
        let snapshot = Self {
            owner,
            title,
            captured_at,
            counts,
            licenses,
            languages,
        };
        if let Some(repository) = repository {
            repository.append(snapshot.clone());
        }
        snapshot
    }

    /// Constructs a repository snapshot from a captured HTML document,
    /// registering it into the supplied repository's store when one is given.
    pub fn from_html(
        repository: Option<&GitHubRepository>,
        captured_at: DateTime<Utc>,
        html: &str,
    ) -> Result<Self> {
        let document = Html::parse_document(html);

        let full_title = select_first(&document, r#"meta[property="og:title"]"#)
            .and_then(|meta| meta.value().attr("content"))
            .ok_or(AdapterError::MissingField("title"))?;
        let (owner, title) =
            full_title
                .split_once('/')
                .ok_or_else(|| AdapterError::Malformed {
                    expected: "owner/title pair",
                    text: full_title.to_string(),
                })?;

        let counts = RepositoryCounts {
            watching: read_social_counter(&document, "watchers")?,
            stars: read_social_counter(&document, "stargazers")?,
            forks: read_social_counter(&document, "network")?,
            issues: read_navitem_counter(&document, "issues")?,
            pull_requests: read_navitem_counter(&document, "pulls")?,
            projects: read_navitem_counter(&document, "projects")?,
            commits: read_summary_counter(&document, "commits")?,
            branches: read_summary_counter(&document, "branches")?,
            releases: read_summary_counter(&document, "releases")?,
        };

        let summary = select_first(&document, "div.overall-summary")
            .ok_or(AdapterError::MissingField("summary"))?;
        let licenses: BTreeSet<String> = LICENSE_FILENAMES
            .iter()
            .filter_map(|filename| {
                select_first_in(summary, &format!(r#"a[href$="/{filename}"]"#))
            })
            .map(text_of)
            .take(1)
            .collect();

        let languages = match select_first(&document, "div.repository-lang-stats") {
            Some(stats) => {
                let mut ratios = Vec::new();
                let item_selector =
                    scraper::Selector::parse("li").expect("static selector");
                for item in stats.select(&item_selector) {
                    let name = select_first_in(item, "span.lang")
                        .map(text_of)
                        .ok_or(AdapterError::MissingField("language name"))?;
                    let percent = select_first_in(item, "span.percent")
                        .map(|element| text_of(element))
                        .ok_or(AdapterError::MissingField("language percentage"))?;
                    ratios.push((name, parse_percentage(&percent)?));
                }
                LanguageRatios::new(ratios)?
            }
            None => LanguageRatios::new([("Other", 1.0)])?,
        };
        let breakdown = LanguageBreakdown::new(captured_at, [languages])?;

        Ok(Self::new(
            repository,
            Some(owner.to_string()),
            Some(title.to_string()),
            captured_at,
            counts,
            licenses,
            breakdown,
        ))
    }

    /// The owner at capture time; `None` on an aggregate.
    #[must_use]
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    /// The title at capture time; `None` on an aggregate.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// The integer counters.
    #[must_use]
    pub fn counts(&self) -> RepositoryCounts {
        self.counts
    }

    /// The licenses seen across the aggregated repositories.
    #[must_use]
    pub fn licenses(&self) -> &BTreeSet<String> {
        &self.licenses
    }

    /// The language breakdown.
    #[must_use]
    pub fn languages(&self) -> &LanguageBreakdown {
        &self.languages
    }

    /// Mean share of one language across the aggregated repositories,
    /// matched case-insensitively.
    #[must_use]
    pub fn language_share(&self, language: &str) -> f64 {
        self.languages.share(language)
    }
}

impl Individual for RepositorySnapshot {
    fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    fn merge(self, other: Self) -> Self {
        let mut licenses = self.licenses;
        licenses.extend(other.licenses);
        Self {
            owner: None,
            title: None,
            captured_at: self.captured_at.max(other.captured_at),
            counts: self.counts.merged(other.counts),
            licenses,
            languages: self.languages.merge(other.languages),
        }
    }
}

impl Metrics for RepositorySnapshot {
    fn metric(&self, key: &str) -> Option<f64> {
        let value = match key {
            "watching" => self.counts.watching,
            "stars" => self.counts.stars,
            "forks" => self.counts.forks,
            "issues" => self.counts.issues,
            "pull_requests" => self.counts.pull_requests,
            "projects" => self.counts.projects,
            "commits" => self.counts.commits,
            "branches" => self.counts.branches,
            "releases" => self.counts.releases,
            _ => return None,
        };
        Some(value as f64)
    }
}

/// A GitHub repository handle, keyed by URL.
///
/// Every handle built from the same URL shares one snapshot series while any
/// handle is alive; the series is discarded with the last handle.
#[derive(Debug, Clone)]
pub struct GitHubRepository {
    url: ArtifactUrl,
    owner: String,
    title: String,
    store: StoreHandle<RepositorySnapshot>,
}

impl GitHubRepository {
    /// Creates a handle from a repository URL, whose last two path segments
    /// must be the owner and the title.
    pub fn new(url: impl Into<ArtifactUrl>) -> Result<Self> {
        let url = url.into();
        let segments: Vec<&str> = url.path_segments().collect();
        let &[.., owner, title] = segments.as_slice() else {
            return Err(AdapterError::InvalidUrl(url.to_string()));
        };
        let (owner, title) = (owner.to_string(), title.to_string());
        let store = STORES.with(|registry| registry.obtain(&url));
        Ok(Self {
            url,
            owner,
            title,
            store,
        })
    }

    /// The identifying URL.
    #[must_use]
    pub fn url(&self) -> &ArtifactUrl {
        &self.url
    }

    /// Records a snapshot into the repository's series.
    pub fn append(&self, snapshot: RepositorySnapshot) -> AppendOutcome {
        self.store.borrow_mut().append(snapshot)
    }

    /// The most recent snapshot, or `None` before the first capture.
    #[must_use]
    pub fn latest(&self) -> Option<RepositorySnapshot> {
        self.store.borrow().latest().cloned()
    }

    /// The owner as of the latest snapshot, falling back to the URL-derived
    /// owner for a zero-snapshot repository.
    #[must_use]
    pub fn owner(&self) -> String {
        self.latest()
            .and_then(|snapshot| snapshot.owner)
            .unwrap_or_else(|| self.owner.clone())
    }

    /// The languages of the latest snapshot, or an empty set.
    #[must_use]
    pub fn languages(&self) -> BTreeSet<String> {
        self.latest()
            .map(|snapshot| snapshot.languages.mean().into_keys().collect())
            .unwrap_or_default()
    }
}

impl Named for GitHubRepository {
    /// `owner/title`, preferring the latest snapshot over the URL, so a
    /// renamed repository reports its current name.
    fn name(&self) -> String {
        match self.latest() {
            Some(snapshot) => match (snapshot.owner(), snapshot.title()) {
                (Some(owner), Some(title)) => format!("{owner}/{title}"),
                _ => format!("{}/{}", self.owner, self.title),
            },
            None => format!("{}/{}", self.owner, self.title),
        }
    }
}

impl Cluster for GitHubRepository {
    type Individual = RepositorySnapshot;

    fn iter(&self) -> Box<dyn Iterator<Item = RepositorySnapshot> + '_> {
        Box::new(StoreIter::new(Rc::clone(&self.store)))
    }
}

impl PartialEq for GitHubRepository {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

impl Eq for GitHubRepository {}

impl Hash for GitHubRepository {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state);
    }
}

fn read_social_counter(document: &Html, target: &'static str) -> Result<u64> {
    let button = select_first(document, &format!(r#"a.social-count[href$="/{target}"]"#))
        .ok_or(AdapterError::MissingField(target))?;
    parse_counter(&text_of(button))
}

fn read_navitem_counter(document: &Html, target: &'static str) -> Result<u64> {
    let Some(navitem) = select_first(document, &format!(r#"a.reponav-item[href$="/{target}"]"#))
    else {
        debug!(item = target, "navigation menu item not found, counting zero");
        return Ok(0);
    };
    let counter = select_first_in(navitem, "span.Counter")
        .ok_or(AdapterError::MissingField(target))?;
    parse_counter(&text_of(counter))
}

fn read_summary_counter(document: &Html, target: &'static str) -> Result<u64> {
    let item = select_first(document, &format!("li.{target}"))
        .or_else(|| select_first(document, &format!(r#"a[href$="/{target}"]"#)))
        .ok_or(AdapterError::MissingField(target))?;
    let counter =
        select_first_in(item, "span.num").ok_or(AdapterError::MissingField(target))?;
    parse_counter(&text_of(counter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    const REPOSITORY_HTML: &str = r#"<html><head>
<meta property="og:title" content="twbs/bootstrap">
</head><body>
<a class="social-count" href="/twbs/bootstrap/watchers">7,356</a>
<a class="social-count" href="/twbs/bootstrap/stargazers">125,696</a>
<a class="social-count" href="/twbs/bootstrap/network">60,569</a>
<a class="reponav-item" href="/twbs/bootstrap/issues"><span class="Counter">400</span></a>
<a class="reponav-item" href="/twbs/bootstrap/pulls"><span class="Counter">123</span></a>
<div class="overall-summary">
<ul>
<li class="commits"><span class="num">17,739</span></li>
<li class="branches"><span class="num">29</span></li>
<li class="releases"><span class="num">47</span></li>
</ul>
<a href="/twbs/bootstrap/blob/master/LICENSE">MIT</a>
</div>
<div class="repository-lang-stats">
<ol>
<li><span class="lang">JavaScript</span><span class="percent">42.9%</span></li>
<li><span class="lang">CSS</span><span class="percent">42.7%</span></li>
<li><span class="lang">HTML</span><span class="percent">13.8%</span></li>
<li><span class="lang">Other</span><span class="percent">0.6%</span></li>
</ol>
</div>
</body></html>"#;

    fn captured() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2018, 5, 29, 16, 18, 21).unwrap()
    }

    #[test]
    fn ratios_reject_out_of_range() {
        assert!(LanguageRatios::new([("Python", 1.2)]).is_err());
        assert!(LanguageRatios::new([("Java", -0.4)]).is_err());
        assert!(LanguageRatios::new([("C", 0.7)]).is_ok());
    }

    #[test]
    fn breakdown_mean_counts_absent_languages_as_zero() {
        let breakdown = LanguageBreakdown::new(
            captured(),
            [
                LanguageRatios::new([("python", 0.1), ("java", 0.2), ("c", 0.7)]).unwrap(),
                LanguageRatios::new([("python", 0.5), ("java", 0.5)]).unwrap(),
                LanguageRatios::new([("java", 0.5), ("c", 0.5)]).unwrap(),
            ],
        )
        .unwrap();
        let mean = breakdown.mean();
        assert_eq!(mean["python"], (0.1 + 0.5 + 0.0) / 3.0);
        assert_eq!(mean["java"], (0.2 + 0.5 + 0.5) / 3.0);
        assert_eq!(mean["c"], (0.7 + 0.0 + 0.5) / 3.0);
    }

    #[test]
    fn breakdown_requires_a_sample() {
        assert!(matches!(
            LanguageBreakdown::new(captured(), []),
            Err(AdapterError::EmptyBreakdown)
        ));
    }

    #[test]
    fn breakdown_share_is_case_insensitive() {
        let breakdown = LanguageBreakdown::new(
            captured(),
            [LanguageRatios::new([("JavaScript", 0.4)]).unwrap()],
        )
        .unwrap();
        assert_eq!(breakdown.share("javascript"), 0.4);
        assert_eq!(breakdown.share("cobol"), 0.0);
    }

    #[test]
    fn from_html_reads_every_field() {
        let snapshot = RepositorySnapshot::from_html(None, captured(), REPOSITORY_HTML).unwrap();
        assert_eq!(snapshot.owner(), Some("twbs"));
        assert_eq!(snapshot.title(), Some("bootstrap"));
        assert_eq!(
            snapshot.counts(),
            RepositoryCounts {
                watching: 7356,
                stars: 125_696,
                forks: 60_569,
                issues: 400,
                pull_requests: 123,
                projects: 0,
                commits: 17_739,
                branches: 29,
                releases: 47,
            }
        );
        assert_eq!(
            snapshot.licenses().iter().collect::<Vec<_>>(),
            vec!["MIT"]
        );
        assert!((snapshot.language_share("JavaScript") - 0.429).abs() < 1e-9);
    }

    #[test]
    fn from_html_without_title_fails() {
        let result = RepositorySnapshot::from_html(None, captured(), "<html></html>");
        assert!(matches!(result, Err(AdapterError::MissingField("title"))));
    }

    #[test]
    fn from_html_without_language_stats_falls_back_to_other() {
        let html = REPOSITORY_HTML.replace("repository-lang-stats", "elsewhere");
        let snapshot = RepositorySnapshot::from_html(None, captured(), &html).unwrap();
        assert_eq!(snapshot.language_share("Other"), 1.0);
    }

    #[test]
    fn from_html_attaches_to_the_repository() {
        let repository = GitHubRepository::new("https://github.com/twbs/bootstrap").unwrap();
        let snapshot =
            RepositorySnapshot::from_html(Some(&repository), captured(), REPOSITORY_HTML).unwrap();
        assert_eq!(repository.latest(), Some(snapshot));
        assert_eq!(repository.name(), "twbs/bootstrap");
    }

    #[test]
    fn merge_sums_counters_and_clears_identity() {
        let a = RepositorySnapshot::from_html(None, captured(), REPOSITORY_HTML).unwrap();
        let mut b = a.clone();
        b.licenses = BTreeSet::from(["GPL-2.0".to_string()]);
        let merged = a.clone().merge(b);
        assert_eq!(merged.owner(), None);
        assert_eq!(merged.title(), None);
        assert_eq!(merged.counts().stars, 2 * a.counts().stars);
        assert_eq!(merged.licenses().len(), 2);
        assert_eq!(merged.languages().sample_count(), 2);
    }

    #[test]
    fn url_without_owner_segment_is_invalid() {
        assert!(GitHubRepository::new("https://github.com").is_err());
    }

    #[test]
    fn name_falls_back_to_url_before_first_snapshot() {
        let repository =
            GitHubRepository::new("https://github.com/rust-lang/rust-fallback").unwrap();
        assert_eq!(repository.name(), "rust-lang/rust-fallback");
    }
}
