//! End-to-end rewrites with the calc backend

use knit_calc::{CalcBackend, CalcContext};
use knit_core::{reset, RewriteConfig, RewriteError, Rewriter, Settings};
use knit_document::node::attrs;
use knit_document::{markdown, tags, Document, Node};
use knit_exec::{CacheStore, GroupId};
use pretty_assertions::assert_eq;
use rayon::prelude::*;

fn setup() -> (Rewriter<CalcBackend>, CacheStore<CalcContext>) {
    (Rewriter::new(CalcBackend::new()), CacheStore::new())
}

fn code(source: &str) -> Node {
    Node::new(tags::CODE)
        .with_attr("lang", "calc")
        .with_attr("exec", "true")
        .with_text(source)
}

fn doc(path: &str, sources: &[&str]) -> Document {
    Document::from_nodes(path, sources.iter().map(|s| code(s)))
}

fn cell(document: &Document, index: usize) -> &Node {
    &document.root().children()[index]
}

fn child<'a>(cell: &'a Node, tag: &str) -> Option<&'a Node> {
    cell.children().iter().find(|c| c.is(tag))
}

#[test]
fn value_fragment_gets_result_only() {
    let (rewriter, store) = setup();
    let out = rewriter.rewrite(&store, &doc("a.md", &["1 + 1"])).unwrap();

    let expected = Node::new(tags::CELL)
        .with_child(Node::new(tags::INPUT).with_child(code("1 + 1")))
        .with_child(
            Node::new(tags::RESULT)
                .with_attr(attrs::KIND, attrs::VALUE)
                .with_text("2"),
        );
    assert_eq!(cell(&out.document, 0), &expected);
}

#[test]
fn print_fragment_gets_output_only() {
    let (rewriter, store) = setup();
    let out = rewriter
        .rewrite(&store, &doc("a.md", &["print(\"hi\")"]))
        .unwrap();

    let cell = cell(&out.document, 0);
    assert_eq!(child(cell, tags::OUTPUT).map(Node::text), Some("hi\n"));
    assert!(child(cell, tags::RESULT).is_none());
}

#[test]
fn unchanged_random_is_replayed_until_reset() {
    let (rewriter, store) = setup();
    let document = doc("r.md", &["random()"]);
    let result = |store: &CacheStore<CalcContext>| {
        let out = rewriter.rewrite(store, &document).unwrap();
        child(cell(&out.document, 0), tags::RESULT)
            .map(|n| n.text().to_string())
            .unwrap()
    };

    let first = result(&store);
    assert_eq!(result(&store), first);

    reset(&store);
    assert_ne!(result(&store), first);
}

#[test]
fn editing_a_fragment_reruns_the_suffix() {
    let (rewriter, store) = setup();
    let before = doc("e.md", &["a = 1", "b = random()", "a + 1", "str(b)"]);
    let first = rewriter.rewrite(&store, &before).unwrap();
    assert_eq!(first.evaluated(), 4);

    let after = doc("e.md", &["a = 1", "b = random()", "a + 2", "str(b)"]);
    let second = rewriter.rewrite(&store, &after).unwrap();
    let stats = second.groups[0].stats;
    assert_eq!((stats.reused, stats.evaluated, stats.dropped), (2, 2, 0));

    // `b` came from the reused prefix, so the re-run suffix still sees it
    let b = |out: &knit_core::Rewritten| {
        child(cell(&out.document, 3), tags::RESULT)
            .map(|n| n.text().to_string())
            .unwrap()
    };
    assert_eq!(b(&first), b(&second));
    assert_eq!(
        child(cell(&second.document, 2), tags::RESULT).map(Node::text),
        Some("3")
    );
}

#[test]
fn groups_are_isolated() {
    let (rewriter, store) = setup();
    let document = Document::from_nodes(
        "g.md",
        [
            code("x = 1").with_attr("group", "one"),
            code("x = 2").with_attr("group", "two"),
            code("x").with_attr("group", "one"),
            code("x").with_attr("group", "two"),
            code("x"),
        ],
    );

    let out = rewriter.rewrite(&store, &document).unwrap();
    let result = |i| child(cell(&out.document, i), tags::RESULT).unwrap();
    assert_eq!(result(2).text(), "1");
    assert_eq!(result(3).text(), "2");
    assert_eq!(result(4).attr(attrs::KIND), Some(attrs::ERROR));
    assert_eq!(out.warnings.len(), 1);
    assert_eq!(out.warnings[0].group, GroupId::new("g.md", "main"));
}

#[test]
fn failed_fragment_does_not_stop_the_document() {
    let (rewriter, store) = setup();
    let document = doc("f.md", &["1 / 0", "y = 5", "y * 2"]);

    let out = rewriter.rewrite(&store, &document).unwrap();
    assert!(out.has_failures());
    assert_eq!(
        child(cell(&out.document, 0), tags::RESULT).map(Node::text),
        Some("error in fragment 0: division by zero")
    );
    assert_eq!(
        child(cell(&out.document, 2), tags::RESULT).map(Node::text),
        Some("10")
    );

    // Unchanged failures replay from cache
    let again = rewriter.rewrite(&store, &document).unwrap();
    assert_eq!(again.evaluated(), 0);
    assert_eq!(again.warnings, out.warnings);
}

#[test]
fn oversized_fragments_become_failures() {
    let (rewriter, store) = setup();
    let deep = format!("{}1{}", "(".repeat(200_000), ")".repeat(200_000));
    let flat = vec!["1"; 300_000].join("+");
    let document = doc("big.md", &[deep.as_str(), flat.as_str(), "2 + 2"]);

    let out = rewriter.rewrite(&store, &document).unwrap();
    assert_eq!(out.warnings.len(), 2);
    for index in 0..2 {
        let text = child(cell(&out.document, index), tags::RESULT).map(Node::text);
        assert!(text.is_some_and(|t| t.contains("syntax error on line 1")), "{text:?}");
    }
    assert_eq!(
        child(cell(&out.document, 2), tags::RESULT).map(Node::text),
        Some("4")
    );
}

#[test]
fn float_overflow_is_reported_not_rendered_as_null() {
    let (rewriter, store) = setup();
    let squarings = format!("x = 10.0\n{}", "x = x * x\n".repeat(10));
    let out = rewriter
        .rewrite(&store, &doc("sq.md", &[squarings.as_str(), "x"]))
        .unwrap();

    assert_eq!(
        child(cell(&out.document, 0), tags::RESULT).map(Node::text),
        Some("error in fragment 0: float result out of range")
    );
    let last = child(cell(&out.document, 1), tags::RESULT).map(Node::text);
    assert!(last.is_some_and(|t| t != "null" && t.parse::<f64>().is_ok()), "{last:?}");
}

#[test]
fn same_group_name_in_two_documents_is_two_groups() {
    let (rewriter, store) = setup();
    rewriter.rewrite(&store, &doc("one.md", &["x = 1"])).unwrap();
    let out = rewriter.rewrite(&store, &doc("two.md", &["x"])).unwrap();

    assert!(out.has_failures());
    assert_eq!(store.stats().groups, 2);
}

#[test]
fn cancellation_aborts_and_resumes() {
    let backend = CalcBackend::new();
    let flag = backend.cancel_flag();
    let rewriter = Rewriter::new(backend);
    let store = CacheStore::new();
    let document = doc("c.md", &["1", "2"]);

    flag.raise();
    let err = rewriter.rewrite(&store, &document).unwrap_err();
    assert!(matches!(err, RewriteError::Cancelled(ref c) if c.position == 0));

    flag.clear();
    let out = rewriter.rewrite(&store, &document).unwrap();
    assert_eq!(out.evaluated(), 2);
}

#[test]
fn markdown_end_to_end() {
    let source = "# Demo\n\n```calc exec\nx = 20\nprint(\"x is\", x)\nx + 1\n```\n\nDone.\n";
    let (rewriter, store) = setup();

    let out = rewriter
        .rewrite(&store, &markdown::parse("demo.md", source))
        .unwrap();
    assert_eq!(
        markdown::render(&out.document),
        "# Demo\n\n```calc exec\nx = 20\nprint(\"x is\", x)\nx + 1\n```\n```output\nx is 20\n```\n```result\n21\n```\n\nDone.\n"
    );
}

#[test]
fn rich_results_are_embedded() {
    let source = "```calc exec\nhtml(\"<b>hi</b>\")\n```\n";
    let (rewriter, store) = setup();

    let out = rewriter
        .rewrite(&store, &markdown::parse("rich.md", source))
        .unwrap();
    assert_eq!(
        markdown::render(&out.document),
        "```calc exec\nhtml(\"<b>hi</b>\")\n```\n<b>hi</b>\n"
    );
}

#[test]
fn settings_drive_the_rewrite() {
    let settings = Settings::from_toml("show_output = false\nlanguage = \"calc\"").unwrap();
    let rewriter = Rewriter::new(CalcBackend::new()).with_config(settings.into_config().unwrap());
    let store = CacheStore::new();
    let document = Document::from_nodes(
        "s.md",
        [
            code("print(1)\n2"),
            Node::new(tags::CODE)
                .with_attr("lang", "python")
                .with_attr("exec", "true")
                .with_text("print(1)"),
            code("print(3)").with_attr("output", "yes"),
        ],
    );

    let out = rewriter.rewrite(&store, &document).unwrap();
    let root = out.document.root();
    assert!(child(&root.children()[0], tags::OUTPUT).is_none());
    assert!(root.children()[1].is(tags::CODE));
    assert_eq!(
        child(&root.children()[2], tags::OUTPUT).map(Node::text),
        Some("3\n")
    );
}

#[test]
fn custom_group_naming() {
    let config = RewriteConfig::new().with_group_naming(|node| node.attr("session").map(str::to_string));
    let rewriter = Rewriter::new(CalcBackend::new()).with_config(config);
    let store = CacheStore::new();
    let document = Document::from_nodes(
        "n.md",
        [code("v = 7").with_attr("session", "s1"), code("v").with_attr("session", "s1")],
    );

    let out = rewriter.rewrite(&store, &document).unwrap();
    assert!(!out.has_failures());
    assert!(store.contains(&GroupId::new("n.md", "s1")));
}

#[test]
fn concurrent_rewrites_share_one_store() {
    let (rewriter, store) = setup();
    let documents: Vec<Document> = (0..16)
        .map(|i| {
            let assign = format!("n = {i}");
            doc(&format!("doc-{i}.md"), &[assign.as_str(), "n * n", "print(n)"])
        })
        .collect();

    let outputs: Vec<_> = documents
        .par_iter()
        .map(|document| rewriter.rewrite(&store, document).unwrap())
        .collect();

    for (i, out) in outputs.iter().enumerate() {
        let square = child(cell(&out.document, 1), tags::RESULT).unwrap();
        assert_eq!(square.text(), (i * i).to_string());
    }
    assert_eq!(store.stats().groups, 16);
    assert_eq!(store.stats().cells, 48);
}
