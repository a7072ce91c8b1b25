//! MongoDB implementation of TaskRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::{
    Collection, Database, IndexModel,
    bson::{DateTime as BsonDateTime, Document, doc},
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::error::{TaskError, TaskResult};
use crate::models::{CreateTask, Task, TaskCategory, TaskPriority, TaskStatus, UpdateTask};
use crate::query::{Pagination, SortOrder, TaskCriteria, TaskSort};
use crate::repository::TaskRepository;

pub const COLLECTION: &str = "tasks";

/// Stored shape of a task.
///
/// Same camelCase keys as the API, but `_id` is the hyphenated UUID string and
/// dates are BSON dates so range queries and sorts are chronological.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<BsonDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<BsonDateTime>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub category: TaskCategory,
    pub completion_flag: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
}

fn to_bson_date(dt: DateTime<Utc>) -> BsonDateTime {
    BsonDateTime::from_millis(dt.timestamp_millis())
}

fn from_bson_date(dt: BsonDateTime) -> TaskResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(dt.timestamp_millis())
        .ok_or_else(|| TaskError::Internal(format!("Stored date out of range: {}", dt)))
}

impl From<&Task> for TaskDocument {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.to_string(),
            title: task.title.clone(),
            description: task.description.clone(),
            start_date: task.start_date.map(to_bson_date),
            due_date: task.due_date.map(to_bson_date),
            status: task.status,
            priority: task.priority,
            category: task.category,
            completion_flag: task.completion_flag,
            image: task.image.clone(),
            created_at: to_bson_date(task.created_at),
            updated_at: to_bson_date(task.updated_at),
        }
    }
}

impl TryFrom<TaskDocument> for Task {
    type Error = TaskError;

    fn try_from(document: TaskDocument) -> TaskResult<Self> {
        let id = Uuid::parse_str(&document.id)
            .map_err(|e| TaskError::Internal(format!("Stored id {} is not a UUID: {}", document.id, e)))?;

        Ok(Self {
            id,
            title: document.title,
            description: document.description,
            start_date: document.start_date.map(from_bson_date).transpose()?,
            due_date: document.due_date.map(from_bson_date).transpose()?,
            status: document.status,
            priority: document.priority,
            category: document.category,
            completion_flag: document.completion_flag,
            image: document.image,
            created_at: from_bson_date(document.created_at)?,
            updated_at: from_bson_date(document.updated_at)?,
        })
    }
}

/// MongoDB implementation of the TaskRepository
pub struct MongoTaskRepository {
    collection: Collection<TaskDocument>,
}

impl MongoTaskRepository {
    /// ```ignore
    /// let client = Client::with_uri_str("mongodb://localhost:27017").await?;
    /// let repo = MongoTaskRepository::new(client.database("task_manager_db"));
    /// ```
    pub fn new(db: Database) -> Self {
        Self::with_collection(db, COLLECTION)
    }

    pub fn with_collection(db: Database, collection_name: &str) -> Self {
        let collection = db.collection::<TaskDocument>(collection_name);
        Self { collection }
    }

    /// Create the single-field indexes used by filters, statistics and the
    /// default sort. Safe to call on every startup.
    #[instrument(skip(self))]
    pub async fn ensure_indexes(&self) -> TaskResult<()> {
        let indexes: Vec<IndexModel> = [
            "status",
            "priority",
            "category",
            "startDate",
            "dueDate",
            "createdAt",
        ]
        .into_iter()
        .map(|field| {
            let mut keys = Document::new();
            keys.insert(field, 1);
            IndexModel::builder().keys(keys).build()
        })
        .collect();

        self.collection.create_indexes(indexes).await?;
        tracing::info!(collection = COLLECTION, "Task indexes ensured");
        Ok(())
    }

    fn id_filter(id: Uuid) -> Document {
        doc! { "_id": id.to_string() }
    }

    /// Build a MongoDB filter document from TaskCriteria
    fn build_filter(criteria: &TaskCriteria) -> Document {
        let mut doc = doc! {};

        if let Some(status) = criteria.status {
            doc.insert("status", status.to_string());
        }

        if let Some(priority) = criteria.priority {
            doc.insert("priority", priority.to_string());
        }

        if let Some(category) = criteria.category {
            doc.insert("category", category.to_string());
        }

        if let Some(start_from) = criteria.start_from {
            doc.insert("startDate", doc! { "$gte": to_bson_date(start_from) });
        }

        if let Some(due_until) = criteria.due_until {
            doc.insert("dueDate", doc! { "$lte": to_bson_date(due_until) });
        }

        if let Some(ref keyword) = criteria.keyword {
            let pattern = regex::escape(keyword);
            doc.insert(
                "$or",
                vec![
                    doc! { "title": { "$regex": &pattern, "$options": "i" } },
                    doc! { "description": { "$regex": &pattern, "$options": "i" } },
                ],
            );
        }

        doc
    }

    /// Requested order with `_id` as tiebreaker, or creation order.
    fn build_sort(sort: Option<TaskSort>) -> Document {
        let mut doc = Document::new();
        match sort {
            Some(TaskSort { field, order }) => {
                let direction = match order {
                    SortOrder::Asc => 1,
                    SortOrder::Desc => -1,
                };
                doc.insert(field.as_ref(), direction);
            }
            None => {
                doc.insert("createdAt", 1);
            }
        }
        doc.insert("_id", 1);
        doc
    }

    /// `$set` document for a partial update, including the derived completion flag.
    fn build_update(update: &UpdateTask, now: DateTime<Utc>) -> Document {
        let mut set = doc! { "updatedAt": to_bson_date(now) };

        if let Some(ref title) = update.title {
            set.insert("title", title);
        }
        if let Some(ref description) = update.description {
            set.insert("description", description);
        }
        if let Some(start_date) = update.start_date {
            set.insert("startDate", to_bson_date(start_date));
        }
        if let Some(due_date) = update.due_date {
            set.insert("dueDate", to_bson_date(due_date));
        }
        if let Some(status) = update.status {
            set.insert("status", status.to_string());
        }
        if let Some(completion_flag) = update.completion_flag() {
            set.insert("completionFlag", completion_flag);
        }
        if let Some(priority) = update.priority {
            set.insert("priority", priority.to_string());
        }
        if let Some(category) = update.category {
            set.insert("category", category.to_string());
        }
        if let Some(ref image) = update.image {
            set.insert("image", image);
        }

        doc! { "$set": set }
    }
}

#[async_trait]
impl TaskRepository for MongoTaskRepository {
    #[instrument(skip(self, input), fields(title = %input.title))]
    async fn create(&self, input: CreateTask) -> TaskResult<Task> {
        let document = TaskDocument::from(&Task::new(input));

        self.collection.insert_one(&document).await?;

        tracing::info!(task_id = %document.id, "Task created successfully");
        Task::try_from(document)
    }

    #[instrument(skip(self))]
    async fn get_by_id(&self, id: Uuid) -> TaskResult<Option<Task>> {
        self.collection
            .find_one(Self::id_filter(id))
            .await?
            .map(Task::try_from)
            .transpose()
    }

    #[instrument(skip(self))]
    async fn find(&self, criteria: TaskCriteria, page: Pagination) -> TaskResult<Vec<Task>> {
        use futures_util::TryStreamExt;

        let options = FindOptions::builder()
            .sort(Self::build_sort(criteria.sort))
            .skip(page.skip())
            .limit(page.page_size as i64)
            .build();

        let cursor = self
            .collection
            .find(Self::build_filter(&criteria))
            .with_options(options)
            .await?;
        let documents: Vec<TaskDocument> = cursor.try_collect().await?;

        documents.into_iter().map(Task::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn count(&self, criteria: TaskCriteria) -> TaskResult<u64> {
        let count = self
            .collection
            .count_documents(Self::build_filter(&criteria))
            .await?;
        Ok(count)
    }

    #[instrument(skip(self, input))]
    async fn update(&self, id: Uuid, input: UpdateTask) -> TaskResult<Option<Task>> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let updated = self
            .collection
            .find_one_and_update(Self::id_filter(id), Self::build_update(&input, Utc::now()))
            .with_options(options)
            .await?;

        if updated.is_some() {
            tracing::info!(task_id = %id, "Task updated successfully");
        }
        updated.map(Task::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> TaskResult<bool> {
        let result = self.collection.delete_one(Self::id_filter(id)).await?;

        if result.deleted_count > 0 {
            tracing::info!(task_id = %id, "Task deleted successfully");
        }
        Ok(result.deleted_count > 0)
    }

    #[instrument(skip(self, ids), fields(requested = ids.len()))]
    async fn delete_many(&self, ids: Vec<Uuid>) -> TaskResult<u64> {
        let ids: Vec<String> = ids.iter().map(Uuid::to_string).collect();
        let result = self
            .collection
            .delete_many(doc! { "_id": { "$in": ids } })
            .await?;

        tracing::info!(deleted = result.deleted_count, "Tasks deleted");
        Ok(result.deleted_count)
    }
}
