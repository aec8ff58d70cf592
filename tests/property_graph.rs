// tests/property_graph.rs

use std::collections::BTreeSet;
use std::path::PathBuf;

use proptest::prelude::*;
use quickscope_test_utils::harness::{Harness, HarnessBuilder};

const TARGETS: usize = 4;
const LIBS: usize = 6;

#[derive(Debug, Clone)]
enum Op {
    Add(usize),
    Remove(usize),
    /// Point a target at a new set of libs and report the change.
    Rewire(usize, Vec<usize>),
    /// Touch a lib.
    Touch(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..TARGETS).prop_map(Op::Add),
        (0..TARGETS).prop_map(Op::Remove),
        (0..TARGETS, proptest::collection::vec(0..LIBS, 0..4))
            .prop_map(|(t, libs)| Op::Rewire(t, libs)),
        (0..LIBS).prop_map(Op::Touch),
    ]
}

fn target(i: usize) -> String {
    format!("test/t{i}-test.js")
}

fn lib(i: usize) -> String {
    format!("lib/l{i}.js")
}

fn wire(h: &Harness, t: usize, libs: &[usize]) {
    let deps: Vec<String> = libs.iter().map(|l| lib(*l)).collect();
    let deps: Vec<&str> = deps.iter().map(String::as_str).collect();
    h.file(&target(t), &deps);
}

/// The graph and the watch set agree with each other after every step.
fn check_invariants(h: &Harness) -> Result<(), TestCaseError> {
    let store = h.engine.store();
    let targets: BTreeSet<PathBuf> = store.targets().into_iter().collect();

    for node in store.dependencies() {
        prop_assert!(!node.targets().is_empty(), "node {:?} has no targets", node.path());

        let unique: BTreeSet<&PathBuf> = node.targets().iter().collect();
        prop_assert_eq!(unique.len(), node.targets().len());

        if node.is_target() {
            prop_assert_eq!(node.targets().len(), 1);
        }

        for t in node.targets() {
            prop_assert!(targets.contains(t), "{:?} points at unknown target {:?}", node.path(), t);
            let reaches = t == node.path()
                || store
                    .cached_dependencies(t)
                    .is_some_and(|list| list.iter().any(|p| p == node.path()));
            prop_assert!(reaches, "{:?} lists {:?} which does not reach it", node.path(), t);
        }
    }

    for t in &targets {
        let own = store.dependency(t);
        prop_assert!(own.is_some_and(|n| n.is_target()), "target {:?} has no own node", t);
        for dep in store.cached_dependencies(t).unwrap_or_default() {
            let linked = store.dependency(dep).is_some_and(|n| n.has_target(t));
            prop_assert!(linked, "{:?} is cached for {:?} but not linked", dep, t);
        }
    }

    let nodes: Vec<PathBuf> = store.dependencies().map(|d| d.path().to_path_buf()).collect();
    drop(store);
    let watched: Vec<PathBuf> = h.watched().into_iter().map(|p| h.path(&p.to_string_lossy())).collect();
    prop_assert_eq!(nodes, watched);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn graph_stays_bipartite_and_fully_watched(ops in proptest::collection::vec(op_strategy(), 1..30)) {
        let mut h = HarnessBuilder::new("/p").build();
        let mut wiring: Vec<Vec<usize>> = vec![Vec::new(); TARGETS];
        for l in 0..LIBS {
            h.file(&lib(l), &[]);
        }
        for (t, libs) in wiring.iter().enumerate() {
            wire(&h, t, libs);
        }
        h.ready().unwrap();

        for op in ops {
            match op {
                Op::Add(t) => {
                    wire(&h, t, &wiring[t]);
                    h.target_created(&target(t)).unwrap();
                }
                Op::Remove(t) => {
                    h.target_deleted(&target(t)).unwrap();
                }
                Op::Rewire(t, libs) => {
                    wiring[t] = libs;
                    wire(&h, t, &wiring[t]);
                    h.modified(&target(t)).unwrap();
                }
                Op::Touch(l) => {
                    h.modified(&lib(l)).unwrap();
                }
            }
            check_invariants(&h)?;
        }
    }
}
