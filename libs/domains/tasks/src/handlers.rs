use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
};
use axum_helpers::{
    QueryParams, UuidPath,
    errors::responses::{
        BadRequestResponse, BadRequestUuidResponse, BadRequestValidationResponse,
        InternalServerErrorResponse, NotFoundResponse, PayloadTooLargeResponse,
    },
};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::error::TaskResult;
use crate::form::{CreateTaskForm, PublicBaseUrl, TaskUpload, UpdateTaskForm};
use crate::models::{
    DeleteTasksRequest, StatCount, StatsBody, Task, TaskCategory, TaskDoc, TaskPage,
    TaskPriority, TaskStat, TaskStatus, TaskUpdated, TasksDeleted, TotalTaskCount,
};
use crate::query::{FilterQuery, PageQuery, SearchQuery};
use crate::repository::TaskRepository;
use crate::service::TaskService;

const TAG: &str = "Tasks";

/// OpenAPI documentation for Tasks API
#[derive(OpenApi)]
#[openapi(
    paths(
        list_tasks,
        create_task,
        delete_tasks,
        delete_tasks_alias,
        search_tasks,
        filter_tasks,
        total_task_count,
        status_stats,
        priority_stats,
        category_stats,
        get_task,
        update_task,
        delete_task,
        mark_done,
    ),
    components(
        schemas(
            Task,
            TaskStatus,
            TaskPriority,
            TaskCategory,
            CreateTaskForm,
            UpdateTaskForm,
            TaskDoc,
            TaskUpdated,
            TaskPage,
            DeleteTasksRequest,
            TasksDeleted,
            TotalTaskCount,
            TaskStat,
            StatCount,
            StatsBody
        ),
        responses(
            NotFoundResponse,
            BadRequestResponse,
            BadRequestValidationResponse,
            BadRequestUuidResponse,
            PayloadTooLargeResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = TAG, description = "Task management endpoints (MongoDB)")
    )
)]
pub struct ApiDoc;

/// Create the tasks router, meant to be nested under `/task`
pub fn router<R: TaskRepository + 'static>(service: TaskService<R>) -> Router {
    let shared_service = Arc::new(service);

    Router::new()
        .route("/", get(list_tasks).post(create_task))
        .route("/deteleMultiple", delete(delete_tasks))
        .route("/deleteMultiple", delete(delete_tasks_alias))
        .route("/search", get(search_tasks))
        .route("/filter", get(filter_tasks))
        .route("/statistics/totalTasks", get(total_task_count))
        .route("/statistics/status/{status}", get(status_stats))
        .route("/statistics/priority/{priority}", get(priority_stats))
        .route("/statistics/category/{category}", get(category_stats))
        .route(
            "/{id}",
            get(get_task)
                .put(update_task)
                .delete(delete_task)
                .patch(mark_done),
        )
        .with_state(shared_service)
}

/// List tasks in creation order
#[utoipa::path(
    get,
    path = "",
    tag = TAG,
    params(PageQuery),
    responses(
        (status = 200, description = "One page of tasks", body = TaskPage),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_tasks<R: TaskRepository>(
    State(service): State<Arc<TaskService<R>>>,
    QueryParams(query): QueryParams<PageQuery>,
) -> TaskResult<Json<TaskPage>> {
    let page = service.list_tasks(&query).await?;
    Ok(Json(page))
}

/// Create a task, optionally with an image
///
/// Accepts `multipart/form-data` (with an `image` file part), URL-encoded
/// forms or JSON.
#[utoipa::path(
    post,
    path = "",
    tag = TAG,
    request_body(content = CreateTaskForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Task created successfully", body = TaskDoc),
        (status = 400, response = BadRequestValidationResponse),
        (status = 413, response = PayloadTooLargeResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn create_task<R: TaskRepository>(
    State(service): State<Arc<TaskService<R>>>,
    base_url: PublicBaseUrl,
    TaskUpload { form, image }: TaskUpload<CreateTaskForm>,
) -> TaskResult<impl IntoResponse> {
    let doc = service.create_task(form, image, &base_url).await?;
    Ok((StatusCode::CREATED, Json(TaskDoc { doc })))
}

/// Delete several tasks at once
#[utoipa::path(
    delete,
    path = "/deteleMultiple",
    tag = TAG,
    request_body = DeleteTasksRequest,
    responses(
        (status = 200, description = "Tasks deleted", body = TasksDeleted),
        (status = 400, response = BadRequestResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn delete_tasks<R: TaskRepository>(
    State(service): State<Arc<TaskService<R>>>,
    body: Bytes,
) -> TaskResult<Json<TasksDeleted>> {
    let request = DeleteTasksRequest::parse(&body)?;
    let deleted = service.delete_tasks(request.ids).await?;
    Ok(Json(TasksDeleted::new(deleted)))
}

/// Delete several tasks at once
#[utoipa::path(
    delete,
    path = "/deleteMultiple",
    tag = TAG,
    request_body = DeleteTasksRequest,
    responses(
        (status = 200, description = "Tasks deleted", body = TasksDeleted),
        (status = 400, response = BadRequestResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn delete_tasks_alias<R: TaskRepository>(
    state: State<Arc<TaskService<R>>>,
    body: Bytes,
) -> TaskResult<Json<TasksDeleted>> {
    delete_tasks(state, body).await
}

/// Search tasks by keyword in title or description
#[utoipa::path(
    get,
    path = "/search",
    tag = TAG,
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching tasks", body = TaskPage),
        (status = 400, response = BadRequestValidationResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn search_tasks<R: TaskRepository>(
    State(service): State<Arc<TaskService<R>>>,
    QueryParams(query): QueryParams<SearchQuery>,
) -> TaskResult<Json<TaskPage>> {
    let page = service.search_tasks(&query).await?;
    Ok(Json(page))
}

/// Filter and sort tasks
#[utoipa::path(
    get,
    path = "/filter",
    tag = TAG,
    params(FilterQuery),
    responses(
        (status = 200, description = "Matching tasks", body = TaskPage),
        (status = 400, response = BadRequestValidationResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn filter_tasks<R: TaskRepository>(
    State(service): State<Arc<TaskService<R>>>,
    QueryParams(query): QueryParams<FilterQuery>,
) -> TaskResult<Json<TaskPage>> {
    let page = service.filter_tasks(&query).await?;
    Ok(Json(page))
}

/// Total number of tasks
#[utoipa::path(
    get,
    path = "/statistics/totalTasks",
    tag = TAG,
    responses(
        (status = 200, description = "Task count", body = TotalTaskCount),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn total_task_count<R: TaskRepository>(
    State(service): State<Arc<TaskService<R>>>,
) -> TaskResult<Json<TotalTaskCount>> {
    let total_task_count = service.total_task_count().await?;
    Ok(Json(TotalTaskCount { total_task_count }))
}

/// Count and share of tasks with a status
#[utoipa::path(
    get,
    path = "/statistics/status/{status}",
    tag = TAG,
    params(
        ("status" = String, Path, description = "To Do, In Progress or Done (case-insensitive)")
    ),
    responses(
        (status = 200, description = "Status statistics", body = StatsBody),
        (status = 400, response = BadRequestResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn status_stats<R: TaskRepository>(
    State(service): State<Arc<TaskService<R>>>,
    Path(status): Path<String>,
) -> TaskResult<Json<StatsBody>> {
    let stats = service.status_stats(&status).await?;
    Ok(Json(stats))
}

/// Count and share of tasks with a priority
#[utoipa::path(
    get,
    path = "/statistics/priority/{priority}",
    tag = TAG,
    params(
        ("priority" = String, Path, description = "High, Medium or Low (case-insensitive)")
    ),
    responses(
        (status = 200, description = "Priority statistics", body = StatsBody),
        (status = 400, response = BadRequestResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn priority_stats<R: TaskRepository>(
    State(service): State<Arc<TaskService<R>>>,
    Path(priority): Path<String>,
) -> TaskResult<Json<StatsBody>> {
    let stats = service.priority_stats(&priority).await?;
    Ok(Json(stats))
}

/// Count and share of tasks in a category
#[utoipa::path(
    get,
    path = "/statistics/category/{category}",
    tag = TAG,
    params(
        ("category" = String, Path, description = "Work, Personal or Errands (case-insensitive)")
    ),
    responses(
        (status = 200, description = "Category statistics", body = StatsBody),
        (status = 400, response = BadRequestResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn category_stats<R: TaskRepository>(
    State(service): State<Arc<TaskService<R>>>,
    Path(category): Path<String>,
) -> TaskResult<Json<StatsBody>> {
    let stats = service.category_stats(&category).await?;
    Ok(Json(stats))
}

/// Get a task by ID
#[utoipa::path(
    get,
    path = "/{id}",
    tag = TAG,
    params(
        ("id" = Uuid, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Task found", body = TaskDoc),
        (status = 400, response = BadRequestUuidResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_task<R: TaskRepository>(
    State(service): State<Arc<TaskService<R>>>,
    UuidPath(id): UuidPath,
) -> TaskResult<Json<TaskDoc>> {
    let doc = service.get_task(id).await?;
    Ok(Json(TaskDoc { doc }))
}

/// Update a task, optionally replacing its image
#[utoipa::path(
    put,
    path = "/{id}",
    tag = TAG,
    params(
        ("id" = Uuid, Path, description = "Task ID")
    ),
    request_body(content = UpdateTaskForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Task updated successfully", body = TaskUpdated),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse),
        (status = 413, response = PayloadTooLargeResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn update_task<R: TaskRepository>(
    State(service): State<Arc<TaskService<R>>>,
    UuidPath(id): UuidPath,
    base_url: PublicBaseUrl,
    TaskUpload { form, image }: TaskUpload<UpdateTaskForm>,
) -> TaskResult<Json<TaskUpdated>> {
    let doc = service.update_task(id, form, image, &base_url).await?;
    Ok(Json(TaskUpdated::new(doc)))
}

/// Delete a task
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = TAG,
    params(
        ("id" = Uuid, Path, description = "Task ID")
    ),
    responses(
        (status = 204, description = "Task deleted successfully"),
        (status = 400, response = BadRequestUuidResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn delete_task<R: TaskRepository>(
    State(service): State<Arc<TaskService<R>>>,
    UuidPath(id): UuidPath,
) -> TaskResult<impl IntoResponse> {
    service.delete_task(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Mark a task as done
#[utoipa::path(
    patch,
    path = "/{id}",
    tag = TAG,
    params(
        ("id" = Uuid, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Task marked as done", body = TaskDoc),
        (status = 400, response = BadRequestUuidResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn mark_done<R: TaskRepository>(
    State(service): State<Arc<TaskService<R>>>,
    UuidPath(id): UuidPath,
) -> TaskResult<Json<TaskDoc>> {
    let doc = service.mark_done(id).await?;
    Ok(Json(TaskDoc { doc }))
}
