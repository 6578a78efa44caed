use chrono::{DateTime, Utc};
use tracing::debug;

use crate::store::TaskStore;
use crate::task::Category;

/// Position inside one bucket's visual order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub category: Category,
    pub index: usize,
}

/// What the drag primitive reports when a drag finishes. A drop outside
/// any valid target arrives with `destination` unset.
#[derive(Debug, Clone, Copy)]
pub struct DropEvent {
    pub source: Slot,
    pub destination: Option<Slot>,
}

/// Resolves a finished drag into a store move. Missing destinations and
/// out-of-range sources leave the store untouched.
pub fn apply_drop(store: &mut TaskStore, event: DropEvent, now: DateTime<Utc>) -> anyhow::Result<bool> {
    let Some(destination) = event.destination else {
        debug!("drop without destination ignored");
        return Ok(false);
    };

    let id = {
        let bucket = store.by_category(event.source.category);
        let Some(task) = bucket.get(event.source.index) else {
            debug!(
                category = event.source.category.key(),
                index = event.source.index,
                "drop source out of range"
            );
            return Ok(false);
        };
        task.id
    };

    store.move_task(id, destination.category, destination.index, now)
}
