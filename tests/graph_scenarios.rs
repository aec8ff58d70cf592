// tests/graph_scenarios.rs

use std::path::PathBuf;

use quickscope::errors::QuickscopeError;
use quickscope::hub::{HubEvent, Topic};
use quickscope_test_utils::harness::{Harness, HarnessBuilder};
use quickscope_test_utils::init_tracing;

fn paths(items: &[&str]) -> Vec<PathBuf> {
    items.iter().map(PathBuf::from).collect()
}

/// Two targets sharing `lib/two.js`:
/// a-test -> one, two
/// b-test -> two, three
fn shared_project() -> Harness {
    init_tracing();
    let mut h = HarnessBuilder::new("/p").build();
    h.file("lib/one.js", &[]);
    h.file("lib/two.js", &[]);
    h.file("lib/three.js", &[]);
    h.file("test/a-test.js", &["lib/one.js", "lib/two.js"]);
    h.file("test/b-test.js", &["lib/two.js", "lib/three.js"]);

    h.target_created("test/a-test.js").unwrap();
    h.target_created("test/b-test.js").unwrap();
    h.ready().unwrap();
    h.recorder.clear();
    h
}

#[test]
fn adding_targets_watches_every_reachable_file_once() {
    let h = shared_project();

    assert_eq!(
        h.watched(),
        paths(&[
            "lib/one.js",
            "lib/three.js",
            "lib/two.js",
            "test/a-test.js",
            "test/b-test.js",
        ])
    );
    assert_eq!(h.watch_log.borrow().opened.len(), 5);
    assert_eq!(h.targets_of("lib/two.js"), Some(paths(&["test/a-test.js", "test/b-test.js"])));
    assert_eq!(h.targets_of("test/a-test.js"), Some(paths(&["test/a-test.js"])));
    assert!(h.runs.borrow().is_empty());
}

#[test]
fn removing_a_target_keeps_shared_dependencies() {
    let mut h = shared_project();

    h.target_deleted("test/a-test.js").unwrap();

    assert_eq!(
        h.watched(),
        paths(&["lib/three.js", "lib/two.js", "test/b-test.js"])
    );
    assert_eq!(h.targets_of("lib/two.js"), Some(paths(&["test/b-test.js"])));
    assert_eq!(h.targets_of("lib/one.js"), None);

    let mut closed = h.watch_log.borrow().closed.clone();
    closed.sort();
    assert_eq!(closed, vec![h.path("lib/one.js"), h.path("test/a-test.js")]);

    let topics = h.recorder.topics();
    assert_eq!(topics.iter().filter(|t| **t == Topic::DependencyUnwatch).count(), 2);
    assert!(h.runs.borrow().is_empty());
}

#[test]
fn changed_dependency_reruns_every_target_reaching_it() {
    let mut h = shared_project();

    h.modified("lib/two.js").unwrap();

    assert_eq!(h.run_targets(), vec![paths(&["test/a-test.js", "test/b-test.js"])]);
}

#[test]
fn changed_leaf_reruns_only_its_target() {
    init_tracing();
    let mut h = HarnessBuilder::new("/p").build();
    h.file("lib/one.js", &[]);
    h.file("lib/three.js", &[]);
    h.file("test/a-test.js", &["lib/one.js"]);
    h.file("test/b-test.js", &["lib/three.js"]);
    h.target_created("test/a-test.js").unwrap();
    h.target_created("test/b-test.js").unwrap();
    h.ready().unwrap();

    h.modified("lib/three.js").unwrap();

    assert_eq!(h.run_targets(), vec![paths(&["test/b-test.js"])]);
}

#[test]
fn shared_nodes_do_not_pull_in_other_targets() {
    let mut h = shared_project();

    // Only b-test reaches lib/three.js; rebuilding b-test also touches the
    // shared lib/two.js, which must not re-run a-test.
    h.modified("lib/three.js").unwrap();
    h.modified("lib/one.js").unwrap();

    assert_eq!(
        h.run_targets(),
        vec![paths(&["test/b-test.js"]), paths(&["test/a-test.js"])]
    );
    assert_eq!(h.targets_of("lib/two.js"), Some(paths(&["test/a-test.js", "test/b-test.js"])));
}

#[test]
fn unchanged_re_resolution_still_publishes_changed() {
    let mut h = shared_project();

    h.modified("lib/one.js").unwrap();

    let events = h.recorder.events();
    let changed: Vec<PathBuf> = events
        .iter()
        .find_map(|e| match e {
            HubEvent::MultipleDependencyChanged(deps) => {
                Some(deps.iter().map(|d| d.path().to_path_buf()).collect())
            }
            _ => None,
        })
        .expect("MULTIPLE_DEPENDENCY_CHANGED published");
    assert_eq!(
        changed,
        vec![h.path("lib/one.js"), h.path("lib/two.js"), h.path("test/a-test.js")]
    );
    assert!(!h.recorder.topics().contains(&Topic::MultipleDependencyUnwatch));
    assert_eq!(h.watch_log.borrow().opened.len(), 5);
}

#[test]
fn dropped_import_is_evicted_and_unwatched() {
    let mut h = shared_project();

    // a-test stops importing lib/one.js.
    h.file("test/a-test.js", &["lib/two.js"]);
    h.modified("test/a-test.js").unwrap();

    assert_eq!(h.targets_of("lib/one.js"), None);
    assert!(!h.watched().contains(&PathBuf::from("lib/one.js")));
    assert_eq!(h.store_cached("test/a-test.js"), paths(&["lib/two.js"]));

    let unwatched: Vec<PathBuf> = h
        .recorder
        .events()
        .into_iter()
        .find_map(|e| match e {
            HubEvent::MultipleDependencyUnwatch(paths) => Some(paths),
            _ => None,
        })
        .expect("MULTIPLE_DEPENDENCY_UNWATCH published");
    assert_eq!(unwatched, vec![h.path("lib/one.js")]);

    assert_eq!(h.run_targets(), vec![paths(&["test/a-test.js"])]);
}

#[test]
fn dropped_shared_import_only_loses_the_edge() {
    let mut h = shared_project();

    h.file("test/a-test.js", &["lib/one.js"]);
    h.modified("test/a-test.js").unwrap();

    assert_eq!(h.targets_of("lib/two.js"), Some(paths(&["test/b-test.js"])));
    assert!(h.watched().contains(&PathBuf::from("lib/two.js")));
    assert!(!h.recorder.topics().contains(&Topic::MultipleDependencyUnwatch));
}

#[test]
fn new_nested_import_is_watched() {
    let mut h = shared_project();

    h.file("lib/four.js", &[]);
    h.file("lib/one.js", &["lib/four.js"]);
    h.file("test/a-test.js", &["lib/four.js", "lib/one.js", "lib/two.js"]);
    h.modified("lib/one.js").unwrap();

    assert!(h.watched().contains(&PathBuf::from("lib/four.js")));
    assert_eq!(h.targets_of("lib/four.js"), Some(paths(&["test/a-test.js"])));
    assert_eq!(h.run_targets(), vec![paths(&["test/a-test.js"])]);
}

#[test]
fn deleted_dependency_marks_its_targets_dirty() {
    let mut h = shared_project();

    h.deleted("lib/two.js").unwrap();

    assert_eq!(h.recorder.topics()[0], Topic::MultipleDependencyDirty);
    assert_eq!(h.run_targets(), vec![paths(&["test/a-test.js", "test/b-test.js"])]);
    assert!(!h.watched().contains(&PathBuf::from("lib/two.js")));
    // The node stays until a referencing file is re-parsed.
    assert!(h.targets_of("lib/two.js").is_some());
}

#[test]
fn re_adding_a_target_is_idempotent() {
    let mut h = shared_project();

    h.target_created("test/a-test.js").unwrap();

    assert_eq!(h.watch_log.borrow().opened.len(), 5);
    assert_eq!(h.targets_of("lib/two.js"), Some(paths(&["test/a-test.js", "test/b-test.js"])));
    assert!(h.recorder.events().is_empty());
}

#[test]
fn target_importing_another_target_is_rejected() {
    init_tracing();
    let mut h = HarnessBuilder::new("/p").build();
    h.file("test/b-test.js", &[]);
    h.file("test/a-test.js", &["test/b-test.js"]);

    h.target_created("test/b-test.js").unwrap();
    let err = h.target_created("test/a-test.js").unwrap_err();

    assert!(matches!(err, QuickscopeError::TargetConflict { .. }));
    assert_eq!(h.watched(), paths(&["test/b-test.js"]));
    let known: Vec<PathBuf> = h.engine.controller().targets().map(PathBuf::from).collect();
    assert_eq!(known, paths(&["test/b-test.js"]));
}

#[test]
fn imported_file_matching_the_glob_is_rejected_as_target() {
    init_tracing();
    let mut h = HarnessBuilder::new("/p").build();
    h.file("test/helper-test.js", &[]);
    h.file("test/a-test.js", &["test/helper-test.js"]);

    h.target_created("test/a-test.js").unwrap();
    let err = h.target_created("test/helper-test.js").unwrap_err();

    assert!(matches!(err, QuickscopeError::TargetConflict { .. }));
    assert_eq!(h.targets_of("test/helper-test.js"), Some(paths(&["test/a-test.js"])));
    let known: Vec<PathBuf> = h.engine.controller().targets().map(PathBuf::from).collect();
    assert_eq!(known, paths(&["test/a-test.js"]));
}

#[test]
fn unparseable_change_leaves_graph_untouched() {
    let mut h = shared_project();

    h.resolver.forget(h.path("lib/one.js"));
    let err = h.modified("lib/one.js").unwrap_err();

    assert!(matches!(err, QuickscopeError::ParseFailure { .. }));
    assert_eq!(h.targets_of("lib/one.js"), Some(paths(&["test/a-test.js"])));
    assert!(h.runs.borrow().is_empty());
}

trait StoreExt {
    fn store_cached(&self, target: &str) -> Vec<PathBuf>;
}

impl StoreExt for Harness {
    fn store_cached(&self, target: &str) -> Vec<PathBuf> {
        let store = self.engine.store();
        store
            .cached_dependencies(&self.path(target))
            .unwrap_or_default()
            .iter()
            .map(|p| p.strip_prefix(&self.root).unwrap_or(p).to_path_buf())
            .collect()
    }
}
