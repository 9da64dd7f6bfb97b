use std::collections::HashSet;

use chrono::{Duration, NaiveDateTime};
use phased_tasks::dates::{duration_in_days, format_timestamp, parse_timestamp};
use phased_tasks::hierarchy::{descendants_of, is_descendant};
use phased_tasks::persist::{export_json, import_merge, parse_import};
use phased_tasks::store::check_structure;
use phased_tasks::{CycleError, ImportStrategy, TaskDraft, TaskError, TaskId, TaskPatch, TaskStore};
use proptest::prelude::*;

fn now() -> NaiveDateTime {
    parse_timestamp("2030-03-01T08:00").unwrap()
}

#[derive(Debug, Clone)]
enum Op {
    Create { parent: Option<usize>, hours: i64, progress: u32 },
    Edit { target: usize, due_hours: i64 },
    Reparent { target: usize, parent: Option<usize> },
    Delete { target: usize },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (proptest::option::of(0..16usize), 0..200i64, 0..=100u32)
            .prop_map(|(parent, hours, progress)| Op::Create { parent, hours, progress }),
        1 => (0..16usize, -48..200i64).prop_map(|(target, due_hours)| Op::Edit { target, due_hours }),
        2 => (0..16usize, proptest::option::of(0..16usize))
            .prop_map(|(target, parent)| Op::Reparent { target, parent }),
        1 => (0..16usize).prop_map(|target| Op::Delete { target }),
    ]
}

fn pick(store: &TaskStore, i: usize) -> Option<TaskId> {
    let tasks = store.tasks();
    (!tasks.is_empty()).then(|| tasks[i % tasks.len()].id().clone())
}

fn at(hours: i64) -> String {
    format_timestamp(now() + Duration::hours(hours))
}

fn assert_invariants(store: &TaskStore) {
    let tasks = store.tasks();
    check_structure(tasks).unwrap();
    for t in tasks {
        assert!(t.created_at() <= t.due_at());
        assert_eq!(t.duration_days(), duration_in_days(t.created_at(), t.due_at()));
    }
}

fn apply(store: &mut TaskStore, op: &Op, minted: &mut HashSet<TaskId>) {
    match *op {
        Op::Create { parent, hours, progress } => {
            let mut draft = TaskDraft::new("task", "generated").window(at(1), at(1 + hours)).progress(progress);
            draft.parent_id = parent.and_then(|p| pick(store, p));
            let task = store.create_at(&draft, now()).unwrap();
            assert!(minted.insert(task.id().clone()), "id {} was reused", task.id());
        }
        Op::Edit { target, due_hours } => {
            let Some(id) = pick(store, target) else { return };
            let patch = TaskPatch {
                due_at: Some(at(due_hours)),
                ..Default::default()
            };
            let before = store.tasks().to_vec();
            if store.edit_at(&id, &patch, now()).is_err() {
                assert_eq!(store.tasks(), before.as_slice());
            }
        }
        Op::Reparent { target, parent } => {
            let Some(id) = pick(store, target) else { return };
            let parent = parent.and_then(|p| pick(store, p));
            let before = store.tasks().to_vec();
            if store.reparent(&id, parent.as_ref()).is_err() {
                assert_eq!(store.tasks(), before.as_slice());
            }
        }
        Op::Delete { target } => {
            let Some(id) = pick(store, target) else { return };
            let expected: HashSet<TaskId> = descendants_of(&id, store.tasks())
                .into_iter()
                .chain([id.clone()])
                .collect();
            let survivors: Vec<TaskId> = store
                .tasks()
                .iter()
                .map(|t| t.id().clone())
                .filter(|i| !expected.contains(i))
                .collect();
            let removed = store.delete(&id).unwrap();
            assert_eq!(removed, expected);
            let left: Vec<TaskId> = store.tasks().iter().map(|t| t.id().clone()).collect();
            assert_eq!(left, survivors);
        }
    }
}

proptest! {
    #[test]
    fn prop_operations_preserve_invariants(ops in proptest::collection::vec(op(), 0..60)) {
        let mut store = TaskStore::default();
        let mut minted = HashSet::new();
        for op in &ops {
            apply(&mut store, op, &mut minted);
            assert_invariants(&store);
        }
    }

    #[test]
    fn prop_no_bidirectional_ancestry(ops in proptest::collection::vec(op(), 0..40)) {
        let mut store = TaskStore::default();
        let mut minted = HashSet::new();
        for op in &ops {
            apply(&mut store, op, &mut minted);
        }
        let tasks = store.tasks();
        for a in tasks {
            for b in tasks {
                if a.id() != b.id() {
                    prop_assert!(!(is_descendant(a.id(), b.id(), tasks) && is_descendant(b.id(), a.id(), tasks)));
                }
            }
        }
    }

    #[test]
    fn prop_merge_is_idempotent_and_json_round_trips(ops in proptest::collection::vec(op(), 0..30)) {
        let mut store = TaskStore::default();
        let mut minted = HashSet::new();
        for op in &ops {
            apply(&mut store, op, &mut minted);
        }
        let json = export_json(store.tasks()).unwrap();
        let incoming = parse_import(&json).unwrap();
        prop_assert_eq!(&incoming, &store.tasks().to_vec());

        let once = import_merge(&[], incoming.clone(), ImportStrategy::Merge).unwrap();
        let twice = import_merge(&once, incoming, ImportStrategy::Merge).unwrap();
        prop_assert_eq!(once, twice);
    }
}

#[test]
fn test_reparent_under_own_descendant_is_rejected() {
    let mut store = TaskStore::default();
    let a = store.create_at(&TaskDraft::new("a", "x").window(at(1), at(2)), now()).unwrap();
    let b = store
        .create_at(&TaskDraft::new("b", "x").window(at(1), at(2)).parent(a.id().clone()), now())
        .unwrap();
    let c = store
        .create_at(&TaskDraft::new("c", "x").window(at(1), at(2)).parent(b.id().clone()), now())
        .unwrap();

    let before = store.tasks().to_vec();
    let err = store.reparent(a.id(), Some(c.id())).unwrap_err();
    assert!(matches!(err, TaskError::Cycle(CycleError::WouldCycle { .. })));
    assert_eq!(store.tasks(), before.as_slice());
}

#[test]
fn test_json_round_trip_is_order_insensitive() {
    let mut store = TaskStore::default();
    let a = store.create_at(&TaskDraft::new("a", "x").window(at(1), at(30)), now()).unwrap();
    store
        .create_at(&TaskDraft::new("b", "x").window(at(2), at(3)).parent(a.id().clone()).progress(10), now())
        .unwrap();
    store.create_at(&TaskDraft::new("c", "x").window(at(4), at(90)), now()).unwrap();

    let mut reversed = store.tasks().to_vec();
    reversed.reverse();
    let json = export_json(&reversed).unwrap();
    let back = import_merge(&[], parse_import(&json).unwrap(), ImportStrategy::Replace).unwrap();

    let mut want = store.tasks().to_vec();
    let mut got = back;
    want.sort_by(|x, y| x.id().cmp(y.id()));
    got.sort_by(|x, y| x.id().cmp(y.id()));
    assert_eq!(got, want);
}
