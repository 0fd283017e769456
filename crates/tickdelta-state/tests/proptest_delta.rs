//! Property tests for the delta aggregator.
//!
//! These tests use `proptest` to generate random sequences of record calls
//! against a small pool of entities, cells and viewers, and verify that the
//! collapsing invariants hold after every sequence.

use std::collections::{HashMap, HashSet};

use proptest::prelude::*;
use tickdelta_state::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Create(u16, u16),
    Delete(u16),
    Move(u16, u16),
    IconState(u16, String),
    Direction(u16, Direction),
    OverlayAdd(u16, u16, String),
    OverlayRemove(u16, u16),
    Screen(u16, i32, i32),
    Cell(i32, i32, u16),
    RegisterViewer(u8),
    Eye(u8, u16),
}

fn direction_strategy() -> impl Strategy<Value = Direction> {
    prop_oneof![
        Just(Direction::North),
        Just(Direction::South),
        Just(Direction::East),
        Just(Direction::West),
        Just(Direction::Northeast),
        Just(Direction::Southwest),
    ]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    // Small ID pools so that collisions (the interesting case) are frequent.
    prop_oneof![
        (0..8u16, 0..4u16).prop_map(|(e, b)| Op::Create(e, b)),
        (0..8u16).prop_map(Op::Delete),
        (0..8u16, 0..16u16).prop_map(|(e, l)| Op::Move(e, l)),
        (0..8u16, "[a-d]{1,3}").prop_map(|(e, s)| Op::IconState(e, s)),
        (0..8u16, direction_strategy()).prop_map(|(e, d)| Op::Direction(e, d)),
        (0..8u16, 0..4u16, "[a-d]{1,3}").prop_map(|(e, o, s)| Op::OverlayAdd(e, o, s)),
        (0..8u16, 0..4u16).prop_map(|(e, o)| Op::OverlayRemove(e, o)),
        (0..8u16, -4..4i32, -4..4i32).prop_map(|(e, x, y)| Op::Screen(e, x, y)),
        (-3..3i32, -3..3i32, 0..8u16).prop_map(|(x, y, e)| Op::Cell(x, y, e)),
        (0..3u8).prop_map(Op::RegisterViewer),
        (0..3u8, 0..8u16).prop_map(|(v, e)| Op::Eye(v, e)),
    ]
}

fn viewer_key(v: u8) -> String {
    format!("viewer-{v}")
}

fn apply(delta: &mut DeltaState, op: &Op) {
    match op {
        Op::Create(e, b) => delta.record_creation(EntityId(*e), BaseId(*b)),
        Op::Delete(e) => delta.record_deletion(EntityId(*e)),
        Op::Move(e, l) => delta.record_location_change(EntityId(*e), LocationId(*l)),
        Op::IconState(e, s) => delta.record_icon_state_change(EntityId(*e), s.as_str()),
        Op::Direction(e, d) => delta.record_direction_change(EntityId(*e), *d),
        Op::OverlayAdd(e, o, s) => delta.record_overlay_add(
            EntityId(*e),
            OverlayId(*o),
            VisualProperties::new().with_icon_state(s.as_str()),
        ),
        Op::OverlayRemove(e, o) => delta.record_overlay_remove(EntityId(*e), OverlayId(*o)),
        Op::Screen(e, x, y) => {
            delta.record_screen_location_change(EntityId(*e), ScreenPoint::new(*x, *y))
        }
        Op::Cell(x, y, e) => delta.record_cell_occupant(*x, *y, EntityId(*e)),
        Op::RegisterViewer(v) => delta.register_viewer(&viewer_key(*v)),
        Op::Eye(v, e) => delta.record_viewer_eye_change(&viewer_key(*v), EntityId(*e)),
    }
}

fn build(ops: &[Op]) -> DeltaState {
    let mut delta = DeltaState::new(SequenceId(1));
    for op in ops {
        apply(&mut delta, op);
    }
    delta
}

/// `Create` ops with a repeated entity are a caller bug with unspecified
/// merge results; strip them for properties that assume well-formed input.
fn without_duplicate_creations(ops: Vec<Op>) -> Vec<Op> {
    let mut created = HashSet::new();
    ops.into_iter()
        .filter(|op| match op {
            Op::Create(e, _) => created.insert(*e),
            _ => true,
        })
        .collect()
}

/// Ops that touch `entity` only and never create or delete it.
fn entity_op_strategy(entity: u16) -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..16u16).prop_map(move |l| Op::Move(entity, l)),
        "[a-d]{1,3}".prop_map(move |s| Op::IconState(entity, s)),
        direction_strategy().prop_map(move |d| Op::Direction(entity, d)),
        (0..3u16, "[a-d]{1,3}").prop_map(move |(o, s)| Op::OverlayAdd(entity, o, s)),
        (0..3u16).prop_map(move |o| Op::OverlayRemove(entity, o)),
        (-4..4i32, -4..4i32).prop_map(move |(x, y)| Op::Screen(entity, x, y)),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// No entity ever has both a creation and a property delta.
    #[test]
    fn creation_and_property_delta_are_exclusive(
        ops in prop::collection::vec(op_strategy(), 0..60),
    ) {
        let delta = build(&without_duplicate_creations(ops));

        let created: HashSet<EntityId> = delta.creations().iter().map(|c| c.entity).collect();
        for pd in delta.property_deltas() {
            prop_assert!(!created.contains(&pd.entity), "entity {} in both", pd.entity);
        }
        for ld in delta.location_deltas() {
            prop_assert!(!created.contains(&ld.entity), "entity {} moved and created", ld.entity);
        }
    }

    /// At most one property delta per entity.
    #[test]
    fn property_deltas_unique_per_entity(
        ops in prop::collection::vec(op_strategy(), 0..60),
    ) {
        let delta = build(&ops);
        let mut seen = HashSet::new();
        for pd in delta.property_deltas() {
            prop_assert!(seen.insert(pd.entity));
        }
    }

    /// At most one location delta per entity, equal to the last move reported
    /// after the entity's creation (if any).
    #[test]
    fn location_delta_is_last_write(
        ops in prop::collection::vec(op_strategy(), 0..60),
    ) {
        let ops = without_duplicate_creations(ops);
        let delta = build(&ops);

        let mut expected: HashMap<EntityId, LocationId> = HashMap::new();
        let mut created: HashSet<EntityId> = HashSet::new();
        for op in &ops {
            match op {
                Op::Create(e, _) => {
                    created.insert(EntityId(*e));
                    expected.remove(&EntityId(*e));
                }
                Op::Move(e, l) if !created.contains(&EntityId(*e)) => {
                    expected.insert(EntityId(*e), LocationId(*l));
                }
                _ => {}
            }
        }

        let mut seen = HashSet::new();
        for ld in delta.location_deltas() {
            prop_assert!(seen.insert(ld.entity));
            prop_assert_eq!(Some(&ld.location), expected.get(&ld.entity));
        }
        prop_assert_eq!(seen.len(), expected.len());
    }

    /// At most one cell delta per coordinate, equal to the last occupant.
    #[test]
    fn cell_delta_is_last_write(
        ops in prop::collection::vec(op_strategy(), 0..60),
    ) {
        let delta = build(&ops);

        let mut expected: HashMap<(i32, i32), EntityId> = HashMap::new();
        for op in &ops {
            if let Op::Cell(x, y, e) = op {
                expected.insert((*x, *y), EntityId(*e));
            }
        }

        let mut seen = HashSet::new();
        for cell in delta.cell_deltas() {
            prop_assert!(seen.insert((cell.x, cell.y)));
            prop_assert_eq!(Some(&cell.occupant), expected.get(&(cell.x, cell.y)));
        }
        prop_assert_eq!(seen.len(), expected.len());
    }

    /// The last icon state reported for an entity is the one recorded.
    #[test]
    fn icon_state_is_last_write(
        entity in 0..8u16,
        states in prop::collection::vec("[a-z]{1,4}", 1..10),
        created in proptest::bool::ANY,
    ) {
        let mut delta = DeltaState::new(SequenceId(1));
        if created {
            delta.record_creation(EntityId(entity), BaseId(0));
        }
        for s in &states {
            delta.record_icon_state_change(EntityId(entity), s.as_str());
        }

        let last = states.last().map(String::as_str);
        let recorded = if created {
            prop_assert!(delta.property_deltas().is_empty());
            delta.creation(EntityId(entity)).and_then(|c| c.visual.icon_state.as_deref())
        } else {
            prop_assert!(delta.creations().is_empty());
            prop_assert_eq!(delta.property_deltas().len(), 1);
            delta.property_delta(EntityId(entity)).and_then(|p| p.changed.icon_state.as_deref())
        };
        prop_assert_eq!(recorded, last);
    }

    /// Any non-empty sequence of calls registers a change.
    #[test]
    fn any_call_registers_a_change(
        ops in prop::collection::vec(op_strategy(), 1..20),
    ) {
        prop_assert!(build(&ops).has_changes());
        prop_assert!(build(&ops).change_count() > 0);
    }

    /// Replaying the same calls yields the same delta and the same hash.
    #[test]
    fn replay_is_deterministic(
        ops in prop::collection::vec(op_strategy(), 0..60),
    ) {
        let a = build(&ops);
        let b = build(&ops);
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(a.content_hash(), b.content_hash());
    }

    /// Changes reported before the creation end up in the creation exactly as
    /// if they had been reported after it.
    #[test]
    fn creation_fold_matches_creation_first(
        ops in prop::collection::vec(entity_op_strategy(3), 0..30),
    ) {
        let create = Op::Create(3, 1);

        let mut first = vec![create.clone()];
        first.extend(ops.iter().cloned());
        let mut last = ops.clone();
        last.push(create);

        let first = build(&first);
        let last = build(&last);

        prop_assert!(last.property_deltas().is_empty());
        prop_assert!(last.location_deltas().is_empty());
        prop_assert_eq!(first.creation(EntityId(3)), last.creation(EntityId(3)));
        prop_assert_eq!(first.content_hash(), last.content_hash());
    }
}
