//! Cell construction
//!
//! A fragment node is replaced by a `cell`:
//!
//! ```text
//! cell
//! ├── input   (the original fragment node)
//! ├── output  (only if shown and non-empty)
//! └── result  (only if shown and present)
//! ```

use crate::config::FragmentOptions;
use knit_document::node::attrs;
use knit_document::{tags, Node};
use knit_exec::{CapturedResult, FragmentOutcome};

/// Build the replacement cell for one fragment
pub(crate) fn cell(fragment: &Node, outcome: &FragmentOutcome, options: FragmentOptions) -> Node {
    let mut cell =
        Node::new(tags::CELL).with_child(Node::new(tags::INPUT).with_child(fragment.clone()));

    let mut output = outcome.output.clone();
    if let Some(CapturedResult::Failure(failure)) = &outcome.result {
        if !options.show_result && options.show_output {
            if !output.is_empty() && !output.ends_with('\n') {
                output.push('\n');
            }
            output.push_str(&failure.to_string());
        }
    }

    if options.show_output && !output.is_empty() {
        cell = cell.with_child(Node::new(tags::OUTPUT).with_text(output));
    }
    if options.show_result {
        if let Some(result) = &outcome.result {
            cell = cell.with_child(result_node(result));
        }
    }
    cell
}

/// Build the `result` node for a captured result
#[must_use]
pub fn result_node(result: &CapturedResult) -> Node {
    let node = Node::new(tags::RESULT);
    match result {
        CapturedResult::Value(_) => node
            .with_attr(attrs::KIND, attrs::VALUE)
            .with_text(result.to_string()),
        CapturedResult::Rich(rich) => node
            .with_attr(attrs::KIND, attrs::RICH)
            .with_attr(attrs::MIME, rich.mime.as_str())
            .with_text(rich.data.as_str()),
        CapturedResult::Failure(failure) => node
            .with_attr(attrs::KIND, attrs::ERROR)
            .with_text(failure.to_string()),
    }
}
