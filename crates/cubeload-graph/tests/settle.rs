//! Settled graphs agree with a breadth-first reference, however the sources
//! were reached.

use cubeload_core::{Level, Position, NO_SOURCE};
use cubeload_graph::{Connectivity, DistanceGraph};
use cubeload_test_utils::{reference_levels, MapLevelStore};
use proptest::prelude::*;
use rustc_hash::FxHashMap;

const LEVEL_COUNT: Level = 7;

fn cube_position() -> impl Strategy<Value = Position> {
    (0..5i32, 0..5i32, 0..5i32).prop_map(|(x, y, z)| Position::new(x, y, z))
}

fn connectivity() -> impl Strategy<Value = Connectivity> {
    prop_oneof![
        Just(Connectivity::DirectOnly),
        Just(Connectivity::Face6),
        Just(Connectivity::Column8),
        Just(Connectivity::Full26),
    ]
}

fn source_set() -> impl Strategy<Value = FxHashMap<Position, Level>> {
    prop::collection::vec((cube_position(), 0..LEVEL_COUNT), 0..12)
        .prop_map(|v| v.into_iter().collect())
}

/// Move the store's sources to `target`, telling the graph about each
/// change with the correct direction.
fn apply_sources(
    graph: &mut DistanceGraph,
    store: &mut MapLevelStore,
    target: &FxHashMap<Position, Level>,
) {
    let mut touched: Vec<Position> = store.sources.keys().copied().collect();
    touched.extend(target.keys().copied());
    touched.sort();
    touched.dedup();

    for pos in touched {
        let old = store.sources.get(&pos).copied().unwrap_or(NO_SOURCE);
        let new = target.get(&pos).copied().unwrap_or(NO_SOURCE);
        if old == new {
            continue;
        }
        match target.get(&pos) {
            Some(&level) => store.sources.insert(pos, level),
            None => store.sources.remove(&pos),
        };
        graph.update_source_level(&*store, pos, new, new < old);
    }
}

proptest! {
    #[test]
    fn settled_graph_matches_reference(
        conn in connectivity(),
        first in source_set(),
        second in source_set(),
    ) {
        let mut graph = DistanceGraph::new(LEVEL_COUNT);
        let mut store = MapLevelStore::new(conn, LEVEL_COUNT);

        apply_sources(&mut graph, &mut store, &first);
        graph.drain(&mut store);
        prop_assert!(graph.is_settled());
        prop_assert_eq!(&store.levels, &reference_levels(&first, conn, LEVEL_COUNT));

        apply_sources(&mut graph, &mut store, &second);
        graph.drain(&mut store);
        prop_assert!(graph.is_settled());
        prop_assert_eq!(&store.levels, &reference_levels(&second, conn, LEVEL_COUNT));
    }

    #[test]
    fn budgeted_drain_reaches_the_same_fixpoint(
        conn in connectivity(),
        first in source_set(),
        second in source_set(),
        budget in 1usize..8,
    ) {
        let mut graph = DistanceGraph::new(LEVEL_COUNT);
        let mut store = MapLevelStore::new(conn, LEVEL_COUNT);

        apply_sources(&mut graph, &mut store, &first);
        // Interleave mutations with partial drains.
        graph.process_updates(&mut store, budget);
        apply_sources(&mut graph, &mut store, &second);
        while graph.process_updates(&mut store, budget) == 0 {}

        prop_assert!(graph.is_settled());
        prop_assert_eq!(graph.pending_len(), 0);
        prop_assert_eq!(&store.levels, &reference_levels(&second, conn, LEVEL_COUNT));
    }
}

#[test]
fn full_cube_of_sources_settles() {
    let mut graph = DistanceGraph::new(LEVEL_COUNT);
    let mut store = MapLevelStore::new(Connectivity::Full26, LEVEL_COUNT);
    let mut sources = FxHashMap::default();
    for x in 0..5 {
        for y in 0..5 {
            for z in 0..5 {
                sources.insert(Position::new(x, y, z), ((x + y + z) % 3) as Level);
            }
        }
    }
    apply_sources(&mut graph, &mut store, &sources);
    graph.drain(&mut store);
    assert_eq!(
        store.levels,
        reference_levels(&sources, Connectivity::Full26, LEVEL_COUNT)
    );

    apply_sources(&mut graph, &mut store, &FxHashMap::default());
    graph.drain(&mut store);
    assert!(store.levels.is_empty());
}
