use knit_exec::{CacheStore, Fragment, GroupId};
use knit_test_utils::{fragments, RecordingBackend};
use rayon::prelude::*;

#[test]
fn concurrent_runs_against_one_store() {
    let backend = RecordingBackend::new();
    let store = CacheStore::new();

    (0..32).into_par_iter().for_each(|i| {
        let doc = format!("doc-{i}.md");
        let run = store
            .run(&backend, &fragments(&doc, "main", &["a", "count", "count"]))
            .unwrap();
        assert_eq!(run.outcomes[2].result.as_ref().unwrap().to_string(), "3");
    });

    let stats = store.stats();
    assert_eq!(stats.groups, 32);
    assert_eq!(stats.cells, 96);
    assert_eq!(backend.evaluation_count(), 96);
}

#[test]
fn concurrent_runs_of_one_group_stay_consistent() {
    let backend = RecordingBackend::new();
    let store = CacheStore::new();
    let input = fragments("shared.md", "main", &["a", "count"]);

    (0..16).into_par_iter().for_each(|_| {
        let run = store.run(&backend, &input).unwrap();
        assert_eq!(run.outcomes[1].result.as_ref().unwrap().to_string(), "2");
    });

    assert_eq!(backend.evaluation_count(), 2);
}

#[test]
fn reset_discards_contexts() {
    let backend = RecordingBackend::new();
    let store = CacheStore::new();
    let input = fragments("doc.md", "main", &["a", "count"]);

    store.run(&backend, &input).unwrap();
    store.reset();
    assert_eq!(store.stats().groups, 0);

    let run = store.run(&backend, &input).unwrap();
    assert!(run.groups[0].created);
    assert_eq!(run.outcomes[1].result.as_ref().unwrap().to_string(), "2");
    assert_eq!(backend.evaluation_count(), 4);
}

#[test]
fn groups_do_not_share_contexts() {
    let backend = RecordingBackend::new();
    let store = CacheStore::new();
    let one = GroupId::new("doc.md", "one");
    let two = GroupId::new("doc.md", "two");
    let input = vec![
        Fragment::new(one.clone(), "a"),
        Fragment::new(two.clone(), "count"),
        Fragment::new(one.clone(), "count"),
        Fragment::new(two.clone(), "count"),
    ];

    let run = store.run(&backend, &input).unwrap();
    let counts: Vec<String> = run
        .outcomes
        .iter()
        .map(|o| o.result.as_ref().unwrap().to_string())
        .collect();
    assert_eq!(counts, vec!["\"a\"", "1", "2", "2"]);
    assert_eq!(run.groups.len(), 2);
    assert_eq!(run.groups[0].group, one);
}
