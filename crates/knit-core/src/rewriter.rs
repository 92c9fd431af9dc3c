//! Document rewriter
//!
//! Selects fragment nodes, runs them through a [`CacheStore`] and replaces
//! each with a cell holding the original fragment and what it produced.

use crate::config::{FragmentOptions, RewriteConfig};
use crate::error::Result;
use crate::render;
use knit_document::Document;
use knit_exec::{CacheStore, EvaluationBackend, Fragment, GroupId, GroupSummary};
use std::fmt;
use std::path::PathBuf;

/// A fragment that failed during a rewrite
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationWarning {
    /// Document containing the fragment
    pub document: PathBuf,
    /// Group the fragment ran in
    pub group: GroupId,
    /// Position within the group
    pub position: usize,
    /// Fragment text
    pub source: String,
    /// Failure description
    pub cause: String,
}

impl fmt::Display for EvaluationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fragment {} of group '{}' in {} failed: {}",
            self.position,
            self.group.name(),
            self.document.display(),
            self.cause
        )
    }
}

/// Outcome of a rewrite
#[derive(Debug, Clone)]
pub struct Rewritten {
    /// Document with fragments replaced by cells
    pub document: Document,
    /// One warning per failed fragment, in document order
    pub warnings: Vec<EvaluationWarning>,
    /// Per-group re-run summaries, in order of first appearance
    pub groups: Vec<GroupSummary>,
}

impl Rewritten {
    /// Check if any fragment failed
    #[inline]
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Number of fragments evaluated rather than reused
    #[must_use]
    pub fn evaluated(&self) -> usize {
        self.groups.iter().map(|g| g.stats.evaluated).sum()
    }
}

/// Rewrites documents by executing their fragments
#[derive(Debug, Clone)]
pub struct Rewriter<B> {
    backend: B,
    config: RewriteConfig,
}

impl<B: EvaluationBackend> Rewriter<B> {
    /// Create rewriter with default configuration
    #[inline]
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            config: RewriteConfig::default(),
        }
    }

    /// With configuration
    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: RewriteConfig) -> Self {
        self.config = config;
        self
    }

    /// Backend in use
    #[inline]
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &RewriteConfig {
        &self.config
    }

    /// Rewrite one document against a cache store
    ///
    /// Every selected fragment is replaced by a cell. Failed fragments do not
    /// stop the rewrite; they are rendered and reported as warnings.
    ///
    /// # Errors
    /// - `RewriteError::Configuration` / `InvalidOption` before anything runs
    /// - `RewriteError::Cancelled` if evaluation was cancelled
    /// - `RewriteError::Document` if the tree rewrite fails
    pub fn rewrite(
        &self,
        store: &CacheStore<B::Context>,
        document: &Document,
    ) -> Result<Rewritten> {
        let span = tracing::debug_span!("rewrite", document = %document.path().display());
        let _enter = span.enter();

        self.config.validate()?;
        let selector = self.config.selector.as_ref();
        let nodes = document.select(selector);
        let doc_key = document.path().display().to_string();

        let mut fragments = Vec::with_capacity(nodes.len());
        let mut options = Vec::with_capacity(nodes.len());
        for (index, node) in nodes.iter().enumerate() {
            let group = GroupId::new(doc_key.as_str(), self.config.group_name(node)?);
            options.push(FragmentOptions::read(
                &self.config,
                node,
                document.path(),
                index,
            )?);
            fragments.push(Fragment::new(group, node.text()));
        }

        if fragments.is_empty() {
            tracing::debug!("no fragments selected");
            return Ok(Rewritten {
                document: document.clone(),
                warnings: Vec::new(),
                groups: Vec::new(),
            });
        }

        let dispatched = store.run(&self.backend, &fragments)?;

        let mut warnings = Vec::new();
        let mut cells = Vec::with_capacity(nodes.len());
        for ((node, outcome), options) in nodes.iter().zip(&dispatched.outcomes).zip(options) {
            if let Some(failure) = outcome.failure() {
                let warning = EvaluationWarning {
                    document: document.path().to_path_buf(),
                    group: outcome.group.clone(),
                    position: outcome.position,
                    source: node.text().to_string(),
                    cause: failure.to_string(),
                };
                if self.config.warn_on_error {
                    tracing::warn!(
                        group = %warning.group,
                        position = warning.position,
                        source = %warning.source,
                        cause = %warning.cause,
                        "fragment evaluation failed"
                    );
                }
                warnings.push(warning);
            }
            cells.push(render::cell(node, outcome, options));
        }

        let rewritten = document.replace(selector, cells)?;
        tracing::info!(
            fragments = fragments.len(),
            evaluated = dispatched.evaluated(),
            failed = warnings.len(),
            "rewrote document"
        );

        Ok(Rewritten {
            document: rewritten,
            warnings,
            groups: dispatched.groups,
        })
    }
}

/// Discard every cached group and its evaluation context
///
/// The next rewrite of any document starts from fresh contexts. Safe to call
/// on an empty store.
pub fn reset<C: Send>(store: &CacheStore<C>) {
    store.reset();
}
