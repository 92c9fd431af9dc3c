//! Grouping and dispatch
//!
//! Splits a flat fragment list into per-group subsequences (stable, so each
//! group keeps document order), re-runs every group against its own cache,
//! then maps each input fragment back to its cell through the
//! `(group, position in group)` slot recorded while partitioning.

use crate::cache::{CachedCell, ExecutionCache, RerunStats};
use crate::error::Cancelled;
use crate::evaluator::{EvaluationBackend, Evaluator};
use crate::group::GroupId;
use crate::value::{CapturedResult, Failure};
use indexmap::IndexMap;
use std::collections::HashMap;

/// Fragment text tagged with its group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Group the fragment is evaluated in
    pub group: GroupId,
    /// Fragment text
    pub source: String,
}

impl Fragment {
    /// Create fragment
    #[inline]
    #[must_use]
    pub fn new(group: GroupId, source: impl Into<String>) -> Self {
        Self {
            group,
            source: source.into(),
        }
    }
}

/// Output and result for one input fragment
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentOutcome {
    /// Group the fragment ran in
    pub group: GroupId,
    /// Position within the group
    pub position: usize,
    /// Captured side-effect output
    pub output: String,
    /// Final value or failure
    pub result: Option<CapturedResult>,
}

impl FragmentOutcome {
    /// Failure, if the fragment failed
    #[inline]
    #[must_use]
    pub fn failure(&self) -> Option<&Failure> {
        self.result.as_ref().and_then(CapturedResult::as_failure)
    }
}

/// What happened to one group during dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSummary {
    /// Group id
    pub group: GroupId,
    /// Whether the group's cache and context were created by this run
    pub created: bool,
    /// Re-run counters
    pub stats: RerunStats,
}

/// Result of one dispatch pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dispatched {
    /// One outcome per input fragment, in input order
    pub outcomes: Vec<FragmentOutcome>,
    /// One summary per group, in order of first appearance
    pub groups: Vec<GroupSummary>,
}

impl Dispatched {
    /// Number of fragments evaluated (not reused) in this pass
    #[must_use]
    pub fn evaluated(&self) -> usize {
        self.groups.iter().map(|g| g.stats.evaluated).sum()
    }
}

/// Run fragments against their groups' caches
///
/// Caches for unseen groups are created with a fresh context. Groups are
/// processed in order of first appearance; fragments within a group in
/// input order.
///
/// # Errors
/// - `Cancelled` if any evaluation is cancelled. Groups processed before
///   the cancelled one keep their updated caches.
pub(crate) fn dispatch<B>(
    caches: &mut HashMap<GroupId, ExecutionCache<B::Context>>,
    backend: &B,
    fragments: &[Fragment],
) -> Result<Dispatched, Cancelled>
where
    B: EvaluationBackend + ?Sized,
{
    let mut groups: IndexMap<&GroupId, Vec<&str>> = IndexMap::new();
    let mut slots = Vec::with_capacity(fragments.len());
    for fragment in fragments {
        let entry = groups.entry(&fragment.group);
        let group_index = entry.index();
        let sources = entry.or_default();
        slots.push((group_index, sources.len()));
        sources.push(fragment.source.as_str());
    }

    let evaluator = Evaluator::new(backend);
    let mut summaries = Vec::with_capacity(groups.len());
    for (group, sources) in &groups {
        let created = !caches.contains_key(*group);
        let cache = caches.entry((*group).clone()).or_insert_with(|| {
            tracing::debug!(group = %group, "creating evaluation context");
            ExecutionCache::new(evaluator.create_context(group))
        });
        let stats = cache.rerun(&evaluator, group, sources)?;
        summaries.push(GroupSummary {
            group: (*group).clone(),
            created,
            stats,
        });
    }

    let cells: Vec<&[CachedCell]> = groups
        .keys()
        .map(|group| caches.get(*group).map(ExecutionCache::cells).unwrap_or_default())
        .collect();

    let outcomes = slots
        .into_iter()
        .map(|(group_index, position)| {
            let cell = &cells[group_index][position];
            FragmentOutcome {
                group: summaries[group_index].group.clone(),
                position,
                output: cell.output.clone(),
                result: cell.result.clone(),
            }
        })
        .collect();

    Ok(Dispatched {
        outcomes,
        groups: summaries,
    })
}
