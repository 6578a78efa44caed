use std::collections::HashSet;

use chrono::{DateTime, TimeZone, Utc};
use planner_core::reorder::{DropEvent, Slot, apply_drop};
use planner_core::store::{MemorySnapshot, TaskStore};
use planner_core::task::{Category, TaskPatch};

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 7, 12, 0, 0)
        .single()
        .expect("valid now")
}

fn open(port: MemorySnapshot) -> TaskStore {
    TaskStore::open(Box::new(port)).expect("open store")
}

fn texts(store: &TaskStore, category: Category) -> Vec<String> {
    store
        .by_category(category)
        .iter()
        .map(|t| t.text.clone())
        .collect()
}

#[test]
fn snapshot_round_trips_exactly() {
    let now = fixed_now();
    let port = MemorySnapshot::new();
    let mut store = open(port.clone());

    store
        .add(Category::Must, "Pay rent".to_string(), None, now)
        .expect("add");
    let noted = store
        .add(Category::Should, "Call the dentist".to_string(), None, now)
        .expect("add");
    store
        .add(
            Category::Must,
            "File taxes".to_string(),
            Some("2026-09-01".parse().expect("date")),
            now,
        )
        .expect("add");
    store
        .update(
            noted,
            TaskPatch {
                details: Some(Some("ask about the wisdom tooth".to_string())),
                ..Default::default()
            },
            now,
        )
        .expect("update");
    store.toggle_completed(noted, now).expect("toggle");
    store
        .move_task(noted, Category::Must, 1, now)
        .expect("move");

    let blob = port.contents().expect("snapshot written");
    let reopened = open(MemorySnapshot::seeded(&blob));

    assert_eq!(reopened.tasks(), store.tasks());

    let reserialized = serde_json::to_string(reopened.tasks()).expect("serialize");
    assert_eq!(reserialized, blob);
}

#[test]
fn ids_are_unique_across_adds() {
    let now = fixed_now();
    let mut store = open(MemorySnapshot::new());

    for i in 0..10 {
        let category = Category::ALL[i % Category::ALL.len()];
        store
            .add(category, format!("task {i}"), None, now)
            .expect("add");
    }
    store
        .remove(store.tasks()[3].id)
        .expect("remove")
        .expect("existed");
    store
        .add(Category::Could, "late arrival".to_string(), None, now)
        .expect("add");

    let ids: HashSet<u64> = store.tasks().iter().map(|t| t.id).collect();
    assert_eq!(ids.len(), store.len());
}

#[test]
fn moves_never_orphan_a_category() {
    let now = fixed_now();
    let mut store = open(MemorySnapshot::new());
    let id = store
        .add(Category::Must, "wanderer".to_string(), None, now)
        .expect("add");

    for target in Category::ALL {
        assert!(store.move_task(id, target, 0, now).expect("move"));
        let task = store.get(id).expect("still present");
        assert_eq!(task.category, target);
        assert_eq!(store.len(), 1);
    }
}

#[test]
fn toggle_twice_restores_the_flag() {
    let now = fixed_now();
    let mut store = open(MemorySnapshot::new());
    let id = store
        .add(Category::Should, "flip me".to_string(), None, now)
        .expect("add");

    assert_eq!(store.toggle_completed(id, now).expect("toggle"), Some(true));
    assert_eq!(store.toggle_completed(id, now).expect("toggle"), Some(false));
    assert!(!store.get(id).expect("task").completed);
}

#[test]
fn operations_on_missing_ids_change_nothing() {
    let now = fixed_now();
    let port = MemorySnapshot::new();
    let mut store = open(port.clone());
    store
        .add(Category::Must, "only task".to_string(), None, now)
        .expect("add");
    let before = store.tasks().to_vec();
    let blob_before = port.contents();

    let patch = TaskPatch {
        text: Some("rewritten".to_string()),
        ..Default::default()
    };
    assert!(!store.update(9999, patch, now).expect("update"));
    assert!(store.remove(9999).expect("remove").is_none());
    assert!(store.toggle_completed(9999, now).expect("toggle").is_none());
    assert!(!store.move_task(9999, Category::Could, 0, now).expect("move"));

    assert_eq!(store.tasks(), before.as_slice());
    assert_eq!(port.contents(), blob_before);
}

#[test]
fn add_then_list_shows_one_fresh_task() {
    let now = fixed_now();
    let mut store = open(MemorySnapshot::new());
    store
        .add(Category::Must, "Buy milk".to_string(), None, now)
        .expect("add");

    let must = store.by_category(Category::Must);
    assert_eq!(must.len(), 1);
    assert_eq!(must[0].text, "Buy milk");
    assert!(!must[0].completed);
    assert_eq!(store.len(), 1);
}

#[test]
fn new_tasks_land_at_the_front_of_their_bucket() {
    let now = fixed_now();
    let mut store = open(MemorySnapshot::new());
    store
        .add(Category::Must, "older".to_string(), None, now)
        .expect("add");
    store
        .add(Category::Must, "newer".to_string(), None, now)
        .expect("add");

    assert_eq!(texts(&store, Category::Must), ["newer", "older"]);
}

#[test]
fn bulk_delete_only_touches_one_bucket() {
    let now = fixed_now();
    let mut store = open(MemorySnapshot::new());
    store
        .add(Category::Must, "must one".to_string(), None, now)
        .expect("add");
    store
        .add(Category::Must, "must two".to_string(), None, now)
        .expect("add");
    let keeper = store
        .add(Category::Should, "should stay".to_string(), None, now)
        .expect("add");

    let removed = store.remove_by_category(Category::Must).expect("clear");
    assert_eq!(removed, 2);
    assert!(store.by_category(Category::Must).is_empty());

    let should = store.by_category(Category::Should);
    assert_eq!(should.len(), 1);
    assert_eq!(should[0].id, keeper);
    assert_eq!(should[0].text, "should stay");
}

#[test]
fn cross_category_move_inserts_at_the_target_index() {
    let now = fixed_now();
    let mut store = open(MemorySnapshot::new());
    // add() prepends, so insert in reverse to get [A, B] and [C].
    let b = store
        .add(Category::Should, "B".to_string(), None, now)
        .expect("add");
    store
        .add(Category::Should, "A".to_string(), None, now)
        .expect("add");
    store
        .add(Category::Must, "C".to_string(), None, now)
        .expect("add");
    assert_eq!(texts(&store, Category::Should), ["A", "B"]);

    assert!(store.move_task(b, Category::Must, 0, now).expect("move"));

    assert_eq!(texts(&store, Category::Must), ["B", "C"]);
    assert_eq!(texts(&store, Category::Should), ["A"]);
}

#[test]
fn drop_without_destination_is_a_noop() {
    let now = fixed_now();
    let port = MemorySnapshot::new();
    let mut store = open(port.clone());
    store
        .add(Category::Must, "anchored".to_string(), None, now)
        .expect("add");
    let before = store.tasks().to_vec();
    let blob_before = port.contents();

    let event = DropEvent {
        source: Slot {
            category: Category::Must,
            index: 0,
        },
        destination: None,
    };
    assert!(!apply_drop(&mut store, event, now).expect("drop"));
    assert_eq!(store.tasks(), before.as_slice());
    assert_eq!(port.contents(), blob_before);
}

#[test]
fn drop_from_an_out_of_range_slot_is_a_noop() {
    let now = fixed_now();
    let mut store = open(MemorySnapshot::new());
    store
        .add(Category::Must, "only one".to_string(), None, now)
        .expect("add");

    let event = DropEvent {
        source: Slot {
            category: Category::Must,
            index: 5,
        },
        destination: Some(Slot {
            category: Category::Should,
            index: 0,
        }),
    };
    assert!(!apply_drop(&mut store, event, now).expect("drop"));
    assert_eq!(store.len(), 1);
    assert_eq!(texts(&store, Category::Must), ["only one"]);
}

#[test]
fn same_category_drop_reorders_in_place() {
    let now = fixed_now();
    let mut store = open(MemorySnapshot::new());
    for text in ["C", "B", "A"] {
        store
            .add(Category::Could, text.to_string(), None, now)
            .expect("add");
    }
    assert_eq!(texts(&store, Category::Could), ["A", "B", "C"]);

    let event = DropEvent {
        source: Slot {
            category: Category::Could,
            index: 0,
        },
        destination: Some(Slot {
            category: Category::Could,
            index: 2,
        }),
    };
    assert!(apply_drop(&mut store, event, now).expect("drop"));
    assert_eq!(texts(&store, Category::Could), ["B", "C", "A"]);
}

#[test]
fn legacy_category_map_snapshots_still_load() {
    let blob = r#"{
        "must": [{"text": "One", "completed": false}],
        "should": [{"text": "Two", "completed": true, "details": "note"}],
        "could": [],
        "ifTime": []
    }"#;
    let store = open(MemorySnapshot::seeded(blob));

    assert_eq!(store.len(), 2);
    assert_eq!(texts(&store, Category::Must), ["One"]);
    assert_eq!(texts(&store, Category::Should), ["Two"]);

    let two = store.by_category(Category::Should)[0];
    assert!(two.completed);
    assert_eq!(two.details.as_deref(), Some("note"));

    let ids: HashSet<u64> = store.tasks().iter().map(|t| t.id).collect();
    assert_eq!(ids.len(), 2);
}

#[test]
fn malformed_snapshots_fall_back_to_an_empty_board() {
    let store = open(MemorySnapshot::seeded("{definitely not json"));
    assert!(store.is_empty());

    let store = open(MemorySnapshot::seeded("[{\"wrong\": \"shape\"}]"));
    assert!(store.is_empty());
}

#[test]
fn refresh_is_last_writer_wins() {
    let now = fixed_now();
    let port = MemorySnapshot::new();
    let mut tab_a = open(port.clone());
    let mut tab_b = open(port.clone());

    tab_a
        .add(Category::Must, "from tab A".to_string(), None, now)
        .expect("add in A");
    // Tab B loaded before A's write, so its save clobbers A's task.
    tab_b
        .add(Category::Must, "from tab B".to_string(), None, now)
        .expect("add in B");

    tab_a.refresh().expect("refresh");
    let remaining: Vec<String> = tab_a.tasks().iter().map(|t| t.text.clone()).collect();
    assert_eq!(remaining, ["from tab B"]);
}
