//! The store's minimum always matches the live ticket set.

use std::collections::HashMap;

use cubeload_core::{Level, Position, TickId, NO_SOURCE};
use cubeload_ticket::{Ticket, TicketKind, TicketStore};
use proptest::prelude::*;

const KINDS: [TicketKind; 4] = [
    TicketKind::PLAYER,
    TicketKind::PORTAL,
    TicketKind::POST_TELEPORT,
    TicketKind::UNKNOWN,
];

#[derive(Clone, Debug)]
enum Op {
    Register {
        pos: i32,
        kind: usize,
        level: Level,
        payload: u64,
    },
    Release {
        pos: i32,
        kind: usize,
        level: Level,
        payload: u64,
    },
    Tick,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..3i32, 0..KINDS.len(), 20..34u32, 0..3u64)
            .prop_map(|(pos, kind, level, payload)| Op::Register {
                pos,
                kind,
                level,
                payload,
            }),
        (0..3i32, 0..KINDS.len(), 20..34u32, 0..3u64)
            .prop_map(|(pos, kind, level, payload)| Op::Release {
                pos,
                kind,
                level,
                payload,
            }),
        Just(Op::Tick),
    ]
}

type Key = (i32, usize, Level, u64);

fn model_min(model: &HashMap<Key, TickId>, pos: i32) -> Level {
    model
        .keys()
        .filter(|k| k.0 == pos)
        .map(|k| k.2)
        .min()
        .unwrap_or(NO_SOURCE)
}

proptest! {
    #[test]
    fn min_level_tracks_live_tickets(ops in prop::collection::vec(op(), 1..120)) {
        let mut store = TicketStore::new();
        let mut model: HashMap<Key, TickId> = HashMap::new();

        for op in ops {
            match op {
                Op::Register { pos, kind, level, payload } => {
                    let ticket = Ticket::new(KINDS[kind], level, payload);
                    let min = store.register(Position::new(pos, 0, 0), ticket);
                    model.insert((pos, kind, level, payload), store.now());
                    prop_assert_eq!(min, model_min(&model, pos));
                }
                Op::Release { pos, kind, level, payload } => {
                    let ticket = Ticket::new(KINDS[kind], level, payload);
                    let released = store.release(Position::new(pos, 0, 0), &ticket);
                    prop_assert_eq!(released, model.remove(&(pos, kind, level, payload)).is_some());
                }
                Op::Tick => {
                    store.tick();
                    let now = store.now();
                    model.retain(|k, created| {
                        let timeout = KINDS[k.1].timeout();
                        timeout == 0 || created.0 + timeout + 1 > now.0
                    });
                }
            }
            for pos in 0..3 {
                prop_assert_eq!(store.min_level(Position::new(pos, 0, 0)), model_min(&model, pos));
            }
            prop_assert_eq!(store.ticket_count(), model.len());
        }
    }

    /// Every position whose minimum moved shows up in the drained changes,
    /// flagged as a decrease only if it went down.
    #[test]
    fn source_changes_cover_every_minimum_move(ops in prop::collection::vec(op(), 1..60)) {
        let mut store = TicketStore::new();
        let before: Vec<Level> = (0..3).map(|p| store.min_level(Position::new(p, 0, 0))).collect();

        for op in ops {
            match op {
                Op::Register { pos, kind, level, payload } => {
                    let ticket = Ticket::new(KINDS[kind], level, payload);
                    store.register(Position::new(pos, 0, 0), ticket);
                }
                Op::Release { pos, kind, level, payload } => {
                    let ticket = Ticket::new(KINDS[kind], level, payload);
                    store.release(Position::new(pos, 0, 0), &ticket);
                }
                Op::Tick => {
                    store.tick();
                }
            }
        }

        let changes: HashMap<Position, bool> = store.take_source_changes().into_iter().collect();
        for p in 0..3 {
            let pos = Position::new(p, 0, 0);
            let after = store.min_level(pos);
            if after < before[p as usize] {
                prop_assert!(changes.contains_key(&pos));
            }
            if after > before[p as usize] {
                prop_assert_eq!(changes.get(&pos), Some(&false));
            }
        }
    }
}

#[test]
fn identical_ticket_twice_is_one_ticket() {
    let mut store = TicketStore::new();
    let pos = Position::new(0, 0, 0);
    let t = Ticket::new(TicketKind::PORTAL, 30, 77);
    store.register(pos, t);
    store.register(pos, t);
    assert_eq!(store.tickets(pos).count(), 1);
    assert!(store.release(pos, &t));
    assert_eq!(store.min_level(pos), NO_SOURCE);
}
