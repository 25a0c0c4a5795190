//! Property-based tests over random dependency graphs
//!
//! Six distinct node types are registered in a random order with random
//! acyclic dependencies between them. Wiring must build each exactly once,
//! dependencies first, and teardown must mirror construction.

use autowirer::{AutoWirer, BoxError, Cleanable, Constructor, DiError, TypeKey};
use parking_lot::Mutex;
use proptest::prelude::*;
use std::sync::Arc;

const NODES: usize = 6;
const PAIRS: usize = NODES * (NODES - 1) / 2;

#[derive(Default)]
struct Journal {
    built: Mutex<Vec<usize>>,
    torn_down: Mutex<Vec<usize>>,
}

struct Node<const I: usize> {
    journal: Arc<Journal>,
}

impl<const I: usize> Cleanable for Node<I> {
    fn cleanup(&self) -> Result<(), BoxError> {
        self.journal.torn_down.lock().push(I);
        Ok(())
    }
}

fn register<const I: usize>(wirer: &AutoWirer, dependencies: &[usize], journal: &Arc<Journal>) {
    let keys: Vec<TypeKey> = dependencies.iter().map(|&d| key(d)).collect();
    let journal = Arc::clone(journal);
    let arity = keys.len();

    wirer.add_singleton_with(
        Constructor::new(move |args| {
            assert_eq!(args.len(), arity);
            journal.built.lock().push(I);
            Ok(Node::<I> {
                journal: Arc::clone(&journal),
            })
        })
        .with_dependencies(&keys)
        .cleanable(),
    );
}

fn key(node: usize) -> TypeKey {
    match node {
        0 => TypeKey::of::<Node<0>>(),
        1 => TypeKey::of::<Node<1>>(),
        2 => TypeKey::of::<Node<2>>(),
        3 => TypeKey::of::<Node<3>>(),
        4 => TypeKey::of::<Node<4>>(),
        5 => TypeKey::of::<Node<5>>(),
        _ => unreachable!("only {NODES} node types"),
    }
}

fn register_node(node: usize, wirer: &AutoWirer, dependencies: &[usize], journal: &Arc<Journal>) {
    match node {
        0 => register::<0>(wirer, dependencies, journal),
        1 => register::<1>(wirer, dependencies, journal),
        2 => register::<2>(wirer, dependencies, journal),
        3 => register::<3>(wirer, dependencies, journal),
        4 => register::<4>(wirer, dependencies, journal),
        5 => register::<5>(wirer, dependencies, journal),
        _ => unreachable!("only {NODES} node types"),
    }
}

/// Node `i` depends on lower-numbered node `j` when the matching flag is set
fn graph(edges: &[bool]) -> Vec<Vec<usize>> {
    let mut flags = edges.iter();
    (0..NODES)
        .map(|i| (0..i).filter(|_| *flags.next().unwrap_or(&false)).collect())
        .collect()
}

fn registration_order() -> impl Strategy<Value = Vec<usize>> {
    Just((0..NODES).collect::<Vec<_>>()).prop_shuffle()
}

fn wire_graph(order: &[usize], graph: &[Vec<usize>]) -> (AutoWirer, Arc<Journal>, autowirer::Result<()>) {
    let journal = Arc::new(Journal::default());
    let wirer = AutoWirer::new();
    for &node in order {
        register_node(node, &wirer, &graph[node], &journal);
    }
    let result = wirer.try_wire();
    (wirer, journal, result)
}

proptest! {
    #[test]
    fn test_wiring_builds_dependencies_first(
        order in registration_order(),
        edges in prop::collection::vec(any::<bool>(), PAIRS),
    ) {
        let graph = graph(&edges);
        let (wirer, journal, result) = wire_graph(&order, &graph);
        prop_assert!(result.is_ok(), "{:?}", result);

        let built = journal.built.lock().clone();
        let mut sorted = built.clone();
        sorted.sort_unstable();
        prop_assert_eq!(sorted, (0..NODES).collect::<Vec<_>>());

        let position = |node: usize| built.iter().position(|&b| b == node);
        for (node, dependencies) in graph.iter().enumerate() {
            for &dependency in dependencies {
                prop_assert!(position(dependency) < position(node));
            }
        }

        // the wirer's own handle is the extra record
        prop_assert_eq!(wirer.instances_count(), NODES + 1);

        prop_assert!(wirer.cleanup().is_ok());
        let mut expected = built;
        expected.reverse();
        prop_assert_eq!(journal.torn_down.lock().clone(), expected);
        prop_assert_eq!(wirer.instances_count(), 0);
    }
}

proptest! {
    #[test]
    fn test_cycle_builds_neither_side(
        order in registration_order(),
        edges in prop::collection::vec(any::<bool>(), PAIRS),
        (low, high) in (0..NODES - 1).prop_flat_map(|low| (Just(low), low + 1..NODES)),
    ) {
        let mut graph = graph(&edges);
        if !graph[high].contains(&low) {
            graph[high].push(low);
        }
        graph[low].push(high);

        let (wirer, journal, result) = wire_graph(&order, &graph);
        prop_assert!(
            matches!(result, Err(DiError::CircularDependency { .. })),
            "{:?}",
            result
        );

        let built = journal.built.lock().clone();
        prop_assert!(!built.contains(&low));
        prop_assert!(!built.contains(&high));

        // whatever was built is still torn down in reverse
        prop_assert!(wirer.cleanup().is_ok());
        let mut expected = built;
        expected.reverse();
        prop_assert_eq!(journal.torn_down.lock().clone(), expected);
    }
}
