//! Per-group execution cache with incremental re-run
//!
//! An [`ExecutionCache`] owns one evaluation context and the cells last
//! evaluated against it. Re-running with a new fragment list keeps every
//! cell of the longest unchanged prefix and evaluates the first changed
//! fragment and everything after it, even fragments whose text matches the
//! old one: they may depend on state the changed fragment touched.

use crate::error::Cancelled;
use crate::evaluator::{EvaluationBackend, Evaluator};
use crate::group::GroupId;
use crate::value::CapturedResult;
use serde::{Deserialize, Serialize};

/// One evaluated fragment: its text, captured output and result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedCell {
    /// Fragment text the cell was evaluated from
    pub source: String,
    /// Captured side-effect output
    pub output: String,
    /// Final value or failure
    pub result: Option<CapturedResult>,
}

/// Counters from one re-run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RerunStats {
    /// Cells carried over without evaluation
    pub reused: usize,
    /// Fragments evaluated
    pub evaluated: usize,
    /// Trailing cells dropped because the new list is shorter
    pub dropped: usize,
}

/// Cached cells of one group, bound to that group's context
pub struct ExecutionCache<C> {
    context: C,
    cells: Vec<CachedCell>,
}

impl<C> ExecutionCache<C> {
    /// Create empty cache around a fresh context
    #[inline]
    #[must_use]
    pub fn new(context: C) -> Self {
        Self {
            context,
            cells: Vec::new(),
        }
    }

    /// Cached cells in fragment order
    #[inline]
    #[must_use]
    pub fn cells(&self) -> &[CachedCell] {
        &self.cells
    }

    /// Evaluation context the cells ran in
    #[inline]
    #[must_use]
    pub fn context(&self) -> &C {
        &self.context
    }

    /// Number of cached cells
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if no cells are cached
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Bring the cache in line with a new fragment list
    ///
    /// Position `i` reuses the old cell only while no earlier position has
    /// been evaluated in this run and the text at `i` is unchanged. The new
    /// list replaces the old one entirely. Failures are cached like values
    /// and do not stop the scan.
    ///
    /// # Errors
    /// - `Cancelled` if the backend cancels. The cache then holds the cells
    ///   completed in this run, which are exactly the fragments that have
    ///   run against the context.
    pub fn rerun<B, S>(
        &mut self,
        evaluator: &Evaluator<'_, B>,
        group: &GroupId,
        sources: &[S],
    ) -> Result<RerunStats, Cancelled>
    where
        B: EvaluationBackend<Context = C> + ?Sized,
        S: AsRef<str>,
    {
        let mut previous = std::mem::take(&mut self.cells).into_iter();
        let mut next = Vec::with_capacity(sources.len());
        let mut stats = RerunStats::default();
        let mut invalidated = false;

        for (position, source) in sources.iter().enumerate() {
            let source = source.as_ref();
            match previous.next() {
                Some(cell) if !invalidated && cell.source == source => {
                    next.push(cell);
                    stats.reused += 1;
                }
                _ => {
                    invalidated = true;
                    match evaluator.evaluate(&mut self.context, group, position, source) {
                        Ok(evaluation) => {
                            next.push(CachedCell {
                                source: source.to_string(),
                                output: evaluation.output,
                                result: evaluation.result,
                            });
                            stats.evaluated += 1;
                        }
                        Err(cancelled) => {
                            self.cells = next;
                            return Err(cancelled);
                        }
                    }
                }
            }
        }

        stats.dropped = previous.count();
        self.cells = next;

        tracing::debug!(
            group = %group,
            reused = stats.reused,
            evaluated = stats.evaluated,
            dropped = stats.dropped,
            "group re-run"
        );
        Ok(stats)
    }
}

impl<C> std::fmt::Debug for ExecutionCache<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionCache")
            .field("cells", &self.cells.len())
            .finish_non_exhaustive()
    }
}
