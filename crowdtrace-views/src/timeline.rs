//! Metric projection and CSV rendering.

use crate::window::TimeWindow;
use crate::{Result, ViewError};
use chrono::{DateTime, Utc};
use crowdtrace_core::{Cluster, Individual, Metrics, Named, NamedCluster};
use std::io::Write;

/// Projects one named metric out of a cluster, ascending by capture time,
/// restricted to a window. Individuals that do not carry the metric are
/// skipped.
pub fn series<C>(cluster: &C, metric: &str, window: TimeWindow) -> Vec<(DateTime<Utc>, f64)>
where
    C: Cluster,
    C::Individual: Metrics,
{
    cluster
        .iter()
        .filter(|individual| window.contains(individual.captured_at()))
        .filter_map(|individual| {
            let value = individual.metric(metric)?;
            Some((individual.captured_at(), value))
        })
        .collect()
}

/// Renders named clusters as CSV rows of `cluster, captured_at, <metric>`.
///
/// Each render starts a fresh traversal of every cluster, so rows reflect
/// the store state at render time.
pub struct CsvTimeline<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvTimeline<W> {
    /// Wraps a writer.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(writer),
        }
    }

    /// Writes a header row followed by one row per in-window snapshot per
    /// cluster, in roster order.
    pub fn render<C>(
        &mut self,
        clusters: &[NamedCluster<C>],
        metric: &str,
        window: TimeWindow,
    ) -> Result<()>
    where
        C: Cluster,
        C::Individual: Metrics,
    {
        self.writer.write_record(["cluster", "captured_at", metric])?;
        for cluster in clusters {
            let name = cluster.name();
            for (captured_at, value) in series(cluster, metric, window) {
                self.writer.write_record([
                    name.as_str(),
                    captured_at.to_rfc3339().as_str(),
                    value.to_string().as_str(),
                ])?;
            }
        }
        Ok(())
    }

    /// Flushes buffered rows and returns the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        self.writer
            .into_inner()
            .map_err(|error| ViewError::Io(error.into_error()))
    }
}
