use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    Must,
    Should,
    Could,
    IfTime,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Must,
        Category::Should,
        Category::Could,
        Category::IfTime,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Category::Must => "must",
            Category::Should => "should",
            Category::Could => "could",
            Category::IfTime => "ifTime",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Must => "MUST DO",
            Category::Should => "SHOULD DO",
            Category::Could => "COULD DO",
            Category::IfTime => "IF I HAVE TIME",
        }
    }

    // ANSI color code used by the renderer for this bucket's header.
    pub fn accent(&self) -> &'static str {
        match self {
            Category::Must => "35",
            Category::Should => "36",
            Category::Could => "32",
            Category::IfTime => "95",
        }
    }

    pub fn parse_key(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "must" => Some(Category::Must),
            "should" => Some(Category::Should),
            "could" => Some(Category::Could),
            "iftime" | "if-time" => Some(Category::IfTime),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,

    pub text: String,

    #[serde(default)]
    pub completed: bool,

    pub category: Category,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,

    pub created: DateTime<Utc>,

    pub modified: DateTime<Utc>,
}

impl Task {
    pub fn new(
        id: u64,
        category: Category,
        text: String,
        deadline: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            text,
            completed: false,
            category,
            details: None,
            deadline,
            created: now,
            modified: now,
        }
    }

    pub fn has_details(&self) -> bool {
        self.details.as_deref().is_some_and(|d| !d.is_empty())
    }
}

#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub text: Option<String>,
    pub completed: Option<bool>,
    pub details: Option<Option<String>>,
    pub deadline: Option<Option<NaiveDate>>,
}

impl TaskPatch {
    pub fn apply(&self, task: &mut Task) {
        if let Some(text) = &self.text {
            task.text = text.clone();
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        if let Some(details) = &self.details {
            task.details = details.clone();
        }
        if let Some(deadline) = &self.deadline {
            task.deadline = *deadline;
        }
    }
}
