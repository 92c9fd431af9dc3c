//! Markdown ingress and egress
//!
//! Uses pulldown-cmark to find top-level fenced code blocks. Each becomes a
//! `code` node whose attributes come from the info string; every byte in
//! between is kept verbatim in `raw` nodes, so rendering an untouched
//! document reproduces its source.
//!
//! Info strings accept both `calc exec group=setup` and the braced
//! `{.calc .exec group="setup"}` form. The first bare word is the language,
//! later bare words become `word=true` flags.

use crate::document::Document;
use crate::error::DocumentError;
use crate::node::{attrs, tags, Node};
use crate::selector::LANG_ATTR;
use pulldown_cmark::{CodeBlockKind, Event, Parser as MdParser, Tag, TagEnd};
use std::path::Path;

/// Parse markdown source into a document
#[must_use]
pub fn parse(path: impl AsRef<Path>, source: &str) -> Document {
    let mut nodes = Vec::new();
    let mut cursor = 0;
    let mut depth = 0usize;
    let mut current: Option<(String, String)> = None;

    for (event, range) in MdParser::new(source).into_offset_iter() {
        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) if depth == 0 => {
                push_raw(&mut nodes, &source[cursor..range.start]);
                current = Some((info.to_string(), String::new()));
                depth += 1;
            }
            Event::Text(text) => {
                if let Some((_, ref mut code)) = current {
                    code.push_str(&text);
                }
            }
            Event::End(TagEnd::CodeBlock) if current.is_some() => {
                depth = depth.saturating_sub(1);
                if let Some((info, code)) = current.take() {
                    nodes.push(code_node(&info, &code));
                }
                // Keep the trailing line break in the following raw segment
                let block = &source[range.start..range.end];
                let trailing = block.len() - block.trim_end_matches(['\n', '\r']).len();
                cursor = range.end - trailing;
            }
            Event::Start(_) => depth += 1,
            Event::End(_) => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    push_raw(&mut nodes, &source[cursor..]);

    let doc = Document::from_nodes(path.as_ref(), nodes);
    tracing::debug!(
        path = %path.as_ref().display(),
        nodes = doc.root().children().len(),
        "parsed markdown"
    );
    doc
}

/// Read and parse a markdown file
///
/// # Errors
/// - `DocumentError::Io` if the file cannot be read
pub fn read(path: impl AsRef<Path>) -> Result<Document, DocumentError> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).map_err(|e| DocumentError::io_error(path, e))?;
    Ok(parse(path, &source))
}

/// Render document as markdown and write it to a file
///
/// # Errors
/// - `DocumentError::Io` if the file cannot be written
pub fn write(document: &Document, path: impl AsRef<Path>) -> Result<(), DocumentError> {
    let path = path.as_ref();
    std::fs::write(path, render(document)).map_err(|e| DocumentError::io_error(path, e))
}

/// Render document as markdown
#[must_use]
pub fn render(document: &Document) -> String {
    let mut out = String::new();
    render_node(document.root(), &mut out);
    out
}

fn render_node(node: &Node, out: &mut String) {
    match node.tag() {
        tags::RAW => out.push_str(node.text()),
        tags::CODE => push_fence(out, &info_string(node), node.text()),
        tags::CELL => {
            for (i, child) in node.children().iter().enumerate() {
                if i > 0 {
                    out.push('\n');
                }
                render_node(child, out);
            }
        }
        tags::OUTPUT => push_fence(out, "output", node.text()),
        tags::RESULT => render_result(node, out),
        _ => {
            out.push_str(node.text());
            for child in node.children() {
                render_node(child, out);
            }
        }
    }
}

fn render_result(node: &Node, out: &mut String) {
    match node.attr(attrs::KIND) {
        Some(attrs::ERROR) => push_fence(out, "error", node.text()),
        Some(attrs::RICH) => match node.attr(attrs::MIME).unwrap_or_default() {
            "text/html" | "text/markdown" | "image/svg+xml" => out.push_str(node.text()),
            mime @ ("image/png" | "image/jpeg" | "image/gif") => {
                out.push_str(&format!("![result](data:{mime};base64,{})", node.text()));
            }
            _ => push_fence(out, "result", node.text()),
        },
        _ => push_fence(out, "result", node.text()),
    }
}

fn push_raw(nodes: &mut Vec<Node>, text: &str) {
    if !text.is_empty() {
        nodes.push(Node::new(tags::RAW).with_text(text));
    }
}

fn code_node(info: &str, code: &str) -> Node {
    let code = code
        .strip_suffix("\r\n")
        .or_else(|| code.strip_suffix('\n'))
        .unwrap_or(code);
    let mut node = Node::new(tags::CODE).with_text(code);
    for (key, value) in parse_info(info) {
        node = node.with_attr(key, value);
    }
    node
}

/// Split an info string into attributes; the first bare word is `lang`
fn parse_info(info: &str) -> Vec<(String, String)> {
    let trimmed = info.trim();
    let inner = trimmed
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .unwrap_or(trimmed);

    let mut out: Vec<(String, String)> = Vec::new();
    let mut has_lang = false;
    for token in tokenize(inner) {
        if let Some((key, value)) = token.split_once('=') {
            out.push((key.to_string(), unquote(value).to_string()));
            continue;
        }
        let word = token.strip_prefix('.').unwrap_or(&token);
        if word.is_empty() {
            continue;
        }
        if has_lang {
            out.push((word.to_string(), "true".to_string()));
        } else {
            out.insert(0, (LANG_ATTR.to_string(), word.to_string()));
            has_lang = true;
        }
    }
    out
}

fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for c in input.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                current.push(c);
            }
            c if c.is_whitespace() && !quoted => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn info_string(node: &Node) -> String {
    let mut parts = Vec::with_capacity(node.attrs().len());
    for (key, value) in node.attrs() {
        if key == LANG_ATTR {
            parts.push(value.clone());
        } else if value == "true" {
            parts.push(key.clone());
        } else if value.chars().any(char::is_whitespace) {
            parts.push(format!("{key}=\"{value}\""));
        } else {
            parts.push(format!("{key}={value}"));
        }
    }
    parts.join(" ")
}

fn push_fence(out: &mut String, info: &str, body: &str) {
    let fence = "`".repeat(longest_backtick_run(body).max(2) + 1);
    out.push_str(&fence);
    out.push_str(info);
    out.push('\n');
    out.push_str(body);
    if !body.is_empty() && !body.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(&fence);
}

fn longest_backtick_run(text: &str) -> usize {
    let mut longest = 0;
    let mut run = 0;
    for c in text.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    longest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::{CodeBlockSelector, Selector};
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"# Notes

Some prose.

```calc exec group=setup
x = 41
```

```rust
fn main() {}
```

```calc exec
x + 1
```
"#;

    #[test]
    fn parses_fenced_blocks_with_attributes() {
        let doc = parse("notes.md", SAMPLE);
        let code: Vec<_> = doc
            .root()
            .children()
            .iter()
            .filter(|n| n.is(tags::CODE))
            .collect();

        assert_eq!(code.len(), 3);
        assert_eq!(code[0].attr("lang"), Some("calc"));
        assert_eq!(code[0].attr("exec"), Some("true"));
        assert_eq!(code[0].attr("group"), Some("setup"));
        assert_eq!(code[0].text(), "x = 41");
        assert_eq!(code[1].attr("lang"), Some("rust"));
        assert_eq!(code[1].attr("exec"), None);
        assert_eq!(code[2].attr("lang"), Some("calc"));
        assert_eq!(code[2].text(), "x + 1");
    }

    #[test]
    fn selector_finds_only_executable_blocks() {
        let doc = parse("notes.md", SAMPLE);
        let selected = doc.select(&CodeBlockSelector::new());
        assert_eq!(selected.len(), 2);
        assert!(selected.iter().all(|n| CodeBlockSelector::new().matches(n)));
    }

    #[test]
    fn untouched_document_roundtrips() {
        let doc = parse("notes.md", SAMPLE);
        assert_eq!(render(&doc), SAMPLE);
    }

    #[test]
    fn nested_code_blocks_stay_raw() {
        let source = "> ```calc exec\n> 1\n> ```\n";
        let doc = parse("quote.md", source);
        assert!(doc.select(&CodeBlockSelector::new()).is_empty());
        assert_eq!(render(&doc), source);
    }

    #[test]
    fn braced_info_string() {
        let doc = parse("braced.md", "```{.calc .exec group=\"a\"}\nx\n```\n");
        let selected = doc.select(&CodeBlockSelector::language("calc"));
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].attr("group"), Some("a"));
    }

    #[test]
    fn quoted_attribute_values() {
        let attrs = parse_info(r#"calc exec title="two words""#);
        assert_eq!(
            attrs,
            vec![
                ("lang".to_string(), "calc".to_string()),
                ("exec".to_string(), "true".to_string()),
                ("title".to_string(), "two words".to_string()),
            ]
        );
    }

    #[test]
    fn renders_cells() {
        let cell = Node::new(tags::CELL)
            .with_child(
                Node::new(tags::INPUT).with_child(
                    Node::new(tags::CODE)
                        .with_attr("lang", "calc")
                        .with_attr("exec", "true")
                        .with_text("print(\"hi\")\n1 + 1"),
                ),
            )
            .with_child(Node::new(tags::OUTPUT).with_text("hi\n"))
            .with_child(
                Node::new(tags::RESULT)
                    .with_attr(attrs::KIND, attrs::VALUE)
                    .with_text("2"),
            );
        let doc = Document::from_nodes("cell.md", [cell]);

        assert_eq!(
            render(&doc),
            "```calc exec\nprint(\"hi\")\n1 + 1\n```\n```output\nhi\n```\n```result\n2\n```"
        );
    }

    #[test]
    fn renders_rich_results_inline() {
        let html = Node::new(tags::RESULT)
            .with_attr(attrs::KIND, attrs::RICH)
            .with_attr(attrs::MIME, "text/html")
            .with_text("<b>bold</b>");
        let png = Node::new(tags::RESULT)
            .with_attr(attrs::KIND, attrs::RICH)
            .with_attr(attrs::MIME, "image/png")
            .with_text("AAAA");

        assert_eq!(render(&Document::from_nodes("a.md", [html])), "<b>bold</b>");
        assert_eq!(
            render(&Document::from_nodes("b.md", [png])),
            "![result](data:image/png;base64,AAAA)"
        );
    }

    #[test]
    fn fence_grows_past_embedded_backticks() {
        let mut out = String::new();
        push_fence(&mut out, "output", "a ``` b");
        assert_eq!(out, "````output\na ``` b\n````");
    }

    #[test]
    fn read_and_write_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.md");
        std::fs::write(&path, SAMPLE).unwrap();

        let doc = read(&path).unwrap();
        assert_eq!(doc.path(), path.as_path());

        let out = dir.path().join("out.md");
        write(&doc, &out).unwrap();
        assert_eq!(std::fs::read_to_string(out).unwrap(), SAMPLE);
    }

    #[test]
    fn read_missing_file_is_io_error() {
        let err = read("/definitely/not/here.md").unwrap_err();
        assert!(matches!(err, DocumentError::Io { .. }));
    }
}
