//! Pairwise merge of two ascending snapshot sequences.

use crate::individual::Individual;
use std::iter::Peekable;

/// Merges two ascending-by-capture-time iterators into one, combining
/// same-timestamp snapshots via the individual algebra.
///
/// One snapshot is buffered as pending output. Each pull takes the earliest
/// element across both sides; while its capture time equals the pending
/// element's, the two are merged and buffering continues; a strictly later
/// capture time flushes the pending element. A final flush runs at
/// exhaustion. The result carries exactly one individual per distinct
/// capture time.
///
/// Both inputs must already be ascending with unique capture times, which
/// every leaf store guarantees and which this merge preserves — so k-way
/// merging is pairwise recursion over this binary base case.
pub(crate) struct Merged<T, L, R>
where
    L: Iterator<Item = T>,
    R: Iterator<Item = T>,
{
    left: Peekable<L>,
    right: Peekable<R>,
    pending: Option<T>,
}

impl<T, L, R> Merged<T, L, R>
where
    L: Iterator<Item = T>,
    R: Iterator<Item = T>,
{
    pub(crate) fn new(left: L, right: R) -> Self {
        Self {
            left: left.peekable(),
            right: right.peekable(),
            pending: None,
        }
    }
}

impl<T, L, R> Iterator for Merged<T, L, R>
where
    T: Individual,
    L: Iterator<Item = T>,
    R: Iterator<Item = T>,
{
    type Item = T;

    fn next(&mut self) -> Option<T> {
        loop {
            let earliest = match (self.left.peek(), self.right.peek()) {
                (None, None) => return self.pending.take(),
                (Some(_), None) => self.left.next(),
                (None, Some(_)) => self.right.next(),
                (Some(l), Some(r)) => {
                    if l.captured_at() <= r.captured_at() {
                        self.left.next()
                    } else {
                        self.right.next()
                    }
                }
            };
            let Some(earliest) = earliest else {
                return self.pending.take();
            };
            match self.pending.take() {
                None => self.pending = Some(earliest),
                Some(pending) if pending.captured_at() == earliest.captured_at() => {
                    self.pending = Some(pending.merge(earliest));
                }
                Some(pending) => {
                    self.pending = Some(earliest);
                    return Some(pending);
                }
            }
        }
    }
}
