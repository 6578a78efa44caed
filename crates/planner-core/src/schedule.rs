use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::datetime::clock_minutes;
use crate::store::SnapshotStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub time: String,
    pub activity: String,
    pub emoji: String,
}

impl ScheduleEntry {
    fn minutes(&self) -> u32 {
        clock_minutes(&self.time).unwrap_or(u32::MAX)
    }
}

/// The daily schedule list. Unlike the board, a missing or unreadable
/// snapshot seeds the built-in default plan rather than an empty list.
pub struct Schedule {
    entries: Vec<ScheduleEntry>,
    port: Box<dyn SnapshotStore>,
}

impl std::fmt::Debug for Schedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schedule")
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl Schedule {
    #[tracing::instrument(skip(port))]
    pub fn open(port: Box<dyn SnapshotStore>) -> anyhow::Result<Self> {
        let mut schedule = Self {
            entries: load_entries(port.as_ref())?,
            port,
        };
        schedule.sort();
        Ok(schedule)
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    /// All fields are required, the time must be a clock time, and times
    /// are unique (case-insensitively). The list stays sorted by time.
    #[tracing::instrument(skip(self))]
    pub fn add(&mut self, time: &str, emoji: &str, activity: &str) -> anyhow::Result<()> {
        let time = time.trim();
        let emoji = emoji.trim();
        let activity = activity.trim();
        if time.is_empty() || emoji.is_empty() || activity.is_empty() {
            return Err(anyhow!("time, emoji and activity are all required"));
        }
        if clock_minutes(time).is_none() {
            return Err(anyhow!("invalid time: {time} (use e.g. 6:30 AM or 18:30)"));
        }
        if self
            .entries
            .iter()
            .any(|entry| entry.time.eq_ignore_ascii_case(time))
        {
            return Err(anyhow!("an entry at {time} already exists"));
        }

        self.entries.push(ScheduleEntry {
            time: time.to_string(),
            activity: activity.to_string(),
            emoji: emoji.to_string(),
        });
        self.sort();
        self.persist()?;
        debug!(time, "schedule entry added");
        Ok(())
    }

    /// Removes by 1-based list position.
    #[tracing::instrument(skip(self))]
    pub fn remove(&mut self, position: usize) -> anyhow::Result<ScheduleEntry> {
        if position == 0 || position > self.entries.len() {
            return Err(anyhow!(
                "no schedule entry at position {position} (1-{})",
                self.entries.len()
            ));
        }
        let removed = self.entries.remove(position - 1);
        self.persist()?;
        Ok(removed)
    }

    #[tracing::instrument(skip(self))]
    pub fn reset(&mut self) -> anyhow::Result<()> {
        self.entries = default_plan();
        self.sort();
        self.persist()
    }

    /// Cross-tab reconciliation: replaces the list wholesale with the
    /// stored value, re-sorted.
    #[tracing::instrument(skip(self))]
    pub fn refresh(&mut self) -> anyhow::Result<()> {
        self.entries = load_entries(self.port.as_ref())?;
        self.sort();
        Ok(())
    }

    /// The slot in effect now: the latest entry at or before `now_minutes`.
    pub fn current(&self, now_minutes: u32) -> Option<&ScheduleEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.minutes() <= now_minutes)
            .next_back()
    }

    /// Entries starting exactly `lead` minutes from now, for reminders.
    pub fn upcoming(&self, now_minutes: u32, lead: u32) -> Vec<&ScheduleEntry> {
        self.entries
            .iter()
            .filter(|entry| {
                let minutes = entry.minutes();
                minutes != u32::MAX && minutes >= now_minutes && minutes - now_minutes == lead
            })
            .collect()
    }

    fn sort(&mut self) {
        self.entries.sort_by_key(ScheduleEntry::minutes);
    }

    fn persist(&self) -> anyhow::Result<()> {
        let blob = serde_json::to_string(&self.entries)?;
        self.port.save(&blob)
    }
}

fn load_entries(port: &dyn SnapshotStore) -> anyhow::Result<Vec<ScheduleEntry>> {
    let Some(raw) = port.load()? else {
        return Ok(default_plan());
    };
    match serde_json::from_str(&raw) {
        Ok(entries) => Ok(entries),
        Err(err) => {
            warn!(error = %err, "malformed schedule snapshot; using default plan");
            Ok(default_plan())
        }
    }
}

pub fn default_plan() -> Vec<ScheduleEntry> {
    let seed = [
        ("6:30 AM", "🌅", "Morning walk"),
        ("7:30 AM", "☕", "Breakfast & reading"),
        ("9:00 AM", "💻", "Deep work"),
        ("12:00 PM", "🍽️", "Lunch break"),
        ("1:00 PM", "📧", "Email & admin"),
        ("3:00 PM", "📚", "Project work"),
        ("6:00 PM", "🏃", "Exercise"),
        ("8:00 PM", "🍛", "Dinner & family time"),
        ("10:30 PM", "😴", "Wind down & sleep"),
    ];
    seed.into_iter()
        .map(|(time, emoji, activity)| ScheduleEntry {
            time: time.to_string(),
            activity: activity.to_string(),
            emoji: emoji.to_string(),
        })
        .collect()
}
