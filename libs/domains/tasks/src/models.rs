use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use strum::{Display, EnumString, VariantNames};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{TaskError, TaskResult};

/// Workflow state of a task
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    VariantNames,
    Default,
    ToSchema,
)]
#[strum(ascii_case_insensitive)]
pub enum TaskStatus {
    #[default]
    #[serde(rename = "To Do")]
    #[strum(serialize = "To Do")]
    ToDo,
    #[serde(rename = "In Progress")]
    #[strum(serialize = "In Progress")]
    InProgress,
    Done,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    VariantNames,
    Default,
    ToSchema,
)]
#[strum(ascii_case_insensitive)]
pub enum TaskPriority {
    High,
    #[default]
    Medium,
    Low,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    VariantNames,
    Default,
    ToSchema,
)]
#[strum(ascii_case_insensitive)]
pub enum TaskCategory {
    #[default]
    Work,
    Personal,
    Errands,
}

/// Task entity as returned to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier (UUID v7)
    #[serde(rename = "_id", alias = "id")]
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub category: TaskCategory,
    /// Always equal to `status == "Done"`
    pub completion_flag: bool,
    /// Absolute URL of the attached image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated input for a new task
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CreateTask {
    pub title: String,
    pub description: String,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub category: TaskCategory,
    pub image: Option<String>,
}

/// Validated partial update. `None` leaves the field untouched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub category: Option<TaskCategory>,
    pub image: Option<String>,
}

impl UpdateTask {
    pub fn mark_done() -> Self {
        Self {
            status: Some(TaskStatus::Done),
            ..Default::default()
        }
    }

    /// The completion flag implied by this update, if it touches `status`.
    pub fn completion_flag(&self) -> Option<bool> {
        self.status.map(|status| status == TaskStatus::Done)
    }
}

impl Task {
    pub fn new(input: CreateTask) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            title: input.title,
            description: input.description,
            start_date: input.start_date,
            due_date: input.due_date,
            status: input.status,
            priority: input.priority,
            category: input.category,
            completion_flag: input.status == TaskStatus::Done,
            image: input.image,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_update(&mut self, update: UpdateTask) {
        if let Some(completion_flag) = update.completion_flag() {
            self.completion_flag = completion_flag;
        }
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(start_date) = update.start_date {
            self.start_date = Some(start_date);
        }
        if let Some(due_date) = update.due_date {
            self.due_date = Some(due_date);
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(priority) = update.priority {
            self.priority = priority;
        }
        if let Some(category) = update.category {
            self.category = category;
        }
        if let Some(image) = update.image {
            self.image = Some(image);
        }
        self.updated_at = Utc::now();
    }
}

/// `{ "doc": Task }`
#[derive(Debug, Serialize, ToSchema)]
pub struct TaskDoc {
    pub doc: Task,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TaskUpdated {
    pub message: String,
    pub doc: Task,
}

impl TaskUpdated {
    pub fn new(doc: Task) -> Self {
        Self {
            message: "Task updated!".to_string(),
            doc,
        }
    }
}

/// One page of tasks
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskPage {
    pub page: u64,
    pub page_size: u64,
    /// Number of tasks on this page
    pub total_items: usize,
    /// Number of matching tasks across all pages
    pub total_count: u64,
    pub data: Vec<Task>,
}

/// Body of the bulk delete endpoint: `{ "ids": [uuid, ...] }`
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DeleteTasksRequest {
    pub ids: Vec<Uuid>,
}

impl DeleteTasksRequest {
    pub const INVALID_IDS: &'static str = "Invalid task ids array";

    /// Parse a raw body, rejecting anything that is not a non-empty array of UUIDs.
    pub fn parse(body: &[u8]) -> TaskResult<Self> {
        let invalid = || TaskError::InvalidInput(Self::INVALID_IDS.to_string());

        let value: Value = serde_json::from_slice(body).map_err(|_| invalid())?;
        let ids = value
            .get("ids")
            .and_then(Value::as_array)
            .filter(|ids| !ids.is_empty())
            .ok_or_else(invalid)?;

        let ids = ids
            .iter()
            .map(|id| id.as_str().and_then(|s| Uuid::parse_str(s).ok()))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(invalid)?;

        Ok(Self { ids })
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TasksDeleted {
    pub message: String,
    pub deleted_count: u64,
}

impl TasksDeleted {
    pub fn new(deleted_count: u64) -> Self {
        Self {
            message: format!("{} tasks deleted", deleted_count),
            deleted_count,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TotalTaskCount {
    pub total_task_count: u64,
}

/// A single enum value to compute statistics for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatKey {
    Status(TaskStatus),
    Priority(TaskPriority),
    Category(TaskCategory),
}

impl StatKey {
    pub fn field(&self) -> &'static str {
        match self {
            StatKey::Status(_) => "status",
            StatKey::Priority(_) => "priority",
            StatKey::Category(_) => "category",
        }
    }

    pub fn value(&self) -> String {
        match self {
            StatKey::Status(status) => status.to_string(),
            StatKey::Priority(priority) => priority.to_string(),
            StatKey::Category(category) => category.to_string(),
        }
    }

    /// Key used by the legacy statistics shape, e.g. `"In Progress Tasks"`,
    /// `"high priority Tasks"` or `"work category Tasks"`.
    ///
    /// Built from the parsed value, so `in progress` in the path still yields
    /// `"In Progress Tasks"` rather than echoing the raw segment.
    pub fn legacy_label(&self) -> String {
        match self {
            StatKey::Status(status) => format!("{} Tasks", status),
            StatKey::Priority(priority) => {
                format!("{} priority Tasks", priority.to_string().to_lowercase())
            }
            StatKey::Category(category) => {
                format!("{} category Tasks", category.to_string().to_lowercase())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct StatCount {
    pub count: u64,
    pub percentage: f64,
}

/// `{ "field": "status", "value": "To Do", "count": 3, "percentage": 37.5 }`
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TaskStat {
    pub field: String,
    pub value: String,
    pub count: u64,
    pub percentage: f64,
}

/// Statistics body, either the fixed schema or the legacy dynamic-key map
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(untagged)]
pub enum StatsBody {
    Fixed(TaskStat),
    Legacy(BTreeMap<String, StatCount>),
}

impl StatsBody {
    pub fn new(key: StatKey, count: u64, total: u64, legacy: bool) -> Self {
        let percentage = percentage(count, total);
        if legacy {
            let mut map = BTreeMap::new();
            map.insert(key.legacy_label(), StatCount { count, percentage });
            StatsBody::Legacy(map)
        } else {
            StatsBody::Fixed(TaskStat {
                field: key.field().to_string(),
                value: key.value(),
                count,
                percentage,
            })
        }
    }
}

/// `100 * count / total` rounded to two decimals, or 0 when there are no tasks.
pub fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 * 10_000.0 / total as f64).round() / 100.0
}
