//! Evaluator adapter over an evaluation backend
//!
//! The backend does the actual work: it owns one context type, creates a
//! fresh context per group and evaluates fragment text against it, writing
//! any side-effect output into a buffer it is handed. The [`Evaluator`]
//! turns what comes back into an [`Evaluation`]:
//!
//! - output has terminal escape sequences removed
//! - backend errors and panics become [`CapturedResult::Failure`]
//! - cancellation is returned as [`Cancelled`] and never captured

use crate::error::{Cancelled, EvalFault};
use crate::group::GroupId;
use crate::value::{CapturedResult, Failure, RichValue};
use once_cell::sync::Lazy;
use regex::Regex;
use std::any::Any;
use std::borrow::Cow;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

/// Value produced by a backend
#[derive(Debug, Clone, PartialEq)]
pub enum Produced {
    /// Plain value
    Value(serde_json::Value),
    /// Richly renderable payload
    Rich(RichValue),
}

impl From<Produced> for CapturedResult {
    fn from(produced: Produced) -> Self {
        match produced {
            Produced::Value(value) => Self::Value(value),
            Produced::Rich(rich) => Self::Rich(rich),
        }
    }
}

/// Evaluation backend
///
/// Implement this trait to plug a language into the pipeline. A context is
/// created once per group and then evaluated against repeatedly; state left
/// by one fragment must be visible to the next.
pub trait EvaluationBackend: Send + Sync {
    /// Per-group mutable evaluation state
    type Context: Send;

    /// Create a fresh, isolated context for a group
    fn create_context(&self, group: &GroupId) -> Self::Context;

    /// Evaluate fragment text against a context
    ///
    /// Side-effect output goes to `output`, never to the process's own
    /// streams. Returns the fragment's value, or `None` when it produced
    /// nothing.
    ///
    /// # Errors
    /// - `EvalFault::Failed` if the fragment raised an error
    /// - `EvalFault::Cancelled` if evaluation was aborted from outside
    fn evaluate(
        &self,
        context: &mut Self::Context,
        source: &str,
        output: &mut String,
    ) -> Result<Option<Produced>, EvalFault>;
}

/// Output and result of one evaluated fragment
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Captured side-effect output
    pub output: String,
    /// Final value or failure, `None` when nothing was produced
    pub result: Option<CapturedResult>,
}

/// Adapter that evaluates fragments through a backend
#[derive(Debug)]
pub struct Evaluator<'a, B: ?Sized> {
    backend: &'a B,
}

impl<'a, B: EvaluationBackend + ?Sized> Evaluator<'a, B> {
    /// Create evaluator over a backend
    #[inline]
    #[must_use]
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Create a fresh context for a group
    #[inline]
    #[must_use]
    pub fn create_context(&self, group: &GroupId) -> B::Context {
        self.backend.create_context(group)
    }

    /// Evaluate one fragment
    ///
    /// # Arguments
    /// * `context` - Group context to evaluate against
    /// * `group` - Group the fragment belongs to
    /// * `position` - Fragment position within the group
    /// * `source` - Fragment text
    ///
    /// A backend panic is captured as a failure, but the process panic hook
    /// still runs first. Binaries that keep stderr clean install their own
    /// hook, as `knit` does.
    ///
    /// # Errors
    /// - `Cancelled` if the backend reported a cancellation
    pub fn evaluate(
        &self,
        context: &mut B::Context,
        group: &GroupId,
        position: usize,
        source: &str,
    ) -> Result<Evaluation, Cancelled> {
        let span = tracing::trace_span!("evaluate", group = %group, position);
        let _enter = span.enter();
        let started = Instant::now();

        let mut output = String::new();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.backend.evaluate(context, source, &mut output)
        }));

        let result = match outcome {
            Ok(Ok(produced)) => produced.map(CapturedResult::from),
            Ok(Err(EvalFault::Cancelled)) => {
                tracing::debug!("evaluation cancelled");
                return Err(Cancelled {
                    group: group.clone(),
                    position,
                });
            }
            Ok(Err(EvalFault::Failed(error))) => Some(CapturedResult::Failure(Failure::error(
                position,
                error.to_string(),
            ))),
            Err(payload) => Some(CapturedResult::Failure(Failure::panic(
                position,
                panic_message(payload.as_ref()),
            ))),
        };

        tracing::trace!(
            elapsed_us = started.elapsed().as_micros() as u64,
            failed = result.as_ref().is_some_and(CapturedResult::is_failure),
            "fragment evaluated"
        );

        Ok(Evaluation {
            output: strip_ansi(&output).into_owned(),
            result,
        })
    }
}

static ANSI_ESCAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\x1b(?:\[[0-?]*[ -/]*[@-~]|\][^\x07\x1b]*(?:\x07|\x1b\\)|[@-_])")
        .expect("valid escape sequence pattern")
});

/// Remove terminal escape sequences (colors, cursor movement, titles)
#[must_use]
pub fn strip_ansi(text: &str) -> Cow<'_, str> {
    ANSI_ESCAPE.replace_all(text, "")
}

/// Text of a panic payload
#[must_use]
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "backend panicked".to_string()
    }
}
