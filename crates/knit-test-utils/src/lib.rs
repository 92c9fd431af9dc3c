//! Testing utilities for the Knit workspace
//!
//! Shared test backends, fixtures and document builders.

#![allow(missing_docs)]

use knit_document::{tags, Document, Node};
use knit_exec::{EvalFault, EvaluationBackend, Fragment, GroupId, Produced, RichValue};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One evaluation seen by a [`RecordingBackend`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub group: GroupId,
    pub source: String,
}

/// Context of a [`RecordingBackend`]: everything evaluated against it so far
#[derive(Debug, Clone)]
pub struct RecordingContext {
    pub group: GroupId,
    pub history: Vec<String>,
}

/// Backend whose behavior is scripted by the fragment text
///
/// Each line of a fragment is one directive; the last line decides the
/// result:
///
/// | line            | effect                                        |
/// |-----------------|-----------------------------------------------|
/// | `print:<text>`  | appends `<text>\n` to output, no result       |
/// | `fail:<msg>`    | fails with `<msg>`                            |
/// | `panic`         | panics                                        |
/// | `cancel`        | reports cancellation                          |
/// | `count`         | result is the number of fragments this context has seen |
/// | `html:<markup>` | rich HTML result                              |
/// | `none`          | no result                                     |
/// | anything else   | result is the line as a string                |
///
/// Every call is recorded, so tests can assert exactly which fragments were
/// (re-)evaluated.
#[derive(Debug, Clone, Default)]
pub struct RecordingBackend {
    log: Arc<Mutex<Vec<Recorded>>>,
    cancel: Arc<AtomicBool>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// All evaluations in call order
    pub fn evaluations(&self) -> Vec<Recorded> {
        self.log.lock().clone()
    }

    /// Sources evaluated, in call order
    pub fn sources(&self) -> Vec<String> {
        self.log.lock().iter().map(|r| r.source.clone()).collect()
    }

    pub fn evaluation_count(&self) -> usize {
        self.log.lock().len()
    }

    pub fn clear(&self) {
        self.log.lock().clear();
    }

    /// Make every subsequent evaluation report cancellation
    pub fn cancel_all(&self, cancel: bool) {
        self.cancel.store(cancel, Ordering::SeqCst);
    }
}

impl EvaluationBackend for RecordingBackend {
    type Context = RecordingContext;

    fn create_context(&self, group: &GroupId) -> RecordingContext {
        RecordingContext {
            group: group.clone(),
            history: Vec::new(),
        }
    }

    fn evaluate(
        &self,
        context: &mut RecordingContext,
        source: &str,
        output: &mut String,
    ) -> Result<Option<Produced>, EvalFault> {
        if self.cancel.load(Ordering::SeqCst) {
            return Err(EvalFault::Cancelled);
        }
        self.log.lock().push(Recorded {
            group: context.group.clone(),
            source: source.to_string(),
        });
        context.history.push(source.to_string());

        let mut result = None;
        for line in source.lines() {
            result = match line.split_once(':') {
                Some(("print", text)) => {
                    output.push_str(text);
                    output.push('\n');
                    None
                }
                Some(("fail", message)) => return Err(EvalFault::failed(message.to_string())),
                Some(("html", markup)) => Some(Produced::Rich(RichValue::html(markup))),
                _ => match line {
                    "panic" => panic!("scripted panic"),
                    "cancel" => return Err(EvalFault::Cancelled),
                    "count" => Some(Produced::Value(json!(context.history.len()))),
                    "none" | "" => None,
                    other => Some(Produced::Value(json!(other))),
                },
            };
        }
        Ok(result)
    }
}

/// Fragments of one group, in order
pub fn fragments(document: &str, group: &str, sources: &[&str]) -> Vec<Fragment> {
    let group = GroupId::new(document, group);
    sources
        .iter()
        .map(|source| Fragment::new(group.clone(), *source))
        .collect()
}

/// Executable code block node
pub fn code_block(lang: &str, source: &str) -> Node {
    Node::new(tags::CODE)
        .with_attr("lang", lang)
        .with_attr("exec", "true")
        .with_text(source)
}

/// Executable code block node with extra attributes
pub fn code_block_with(lang: &str, source: &str, attrs: &[(&str, &str)]) -> Node {
    attrs
        .iter()
        .fold(code_block(lang, source), |node, (k, v)| node.with_attr(*k, *v))
}

/// Raw text node
pub fn raw(text: &str) -> Node {
    Node::new(tags::RAW).with_text(text)
}

/// Document made of the given nodes
pub fn document(path: &str, nodes: impl IntoIterator<Item = Node>) -> Document {
    Document::from_nodes(path, nodes)
}
