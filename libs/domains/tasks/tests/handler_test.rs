//! Handler tests for Tasks domain
//!
//! Drive `handlers::router` end to end over an in-memory repository and a
//! disk image store in a temporary directory:
//! - multipart, URL-encoded and JSON request extraction
//! - response shapes and HTTP status codes
//! - error bodies

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use domain_tasks::query::SortOrder;
use domain_tasks::*;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::cmp::Ordering;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::ServiceExt; // For oneshot()
use uuid::Uuid;

const BOUNDARY: &str = "task-form-boundary";

#[derive(Default)]
struct InMemoryTaskRepository {
    tasks: Mutex<Vec<Task>>,
}

fn matches(task: &Task, criteria: &TaskCriteria) -> bool {
    let contains = |haystack: &str, needle: &str| {
        haystack.to_lowercase().contains(&needle.to_lowercase())
    };

    criteria.status.is_none_or(|s| task.status == s)
        && criteria.priority.is_none_or(|p| task.priority == p)
        && criteria.category.is_none_or(|c| task.category == c)
        && criteria
            .start_from
            .is_none_or(|from| task.start_date.is_some_and(|d| d >= from))
        && criteria
            .due_until
            .is_none_or(|until| task.due_date.is_some_and(|d| d <= until))
        && criteria.keyword.as_deref().is_none_or(|k| {
            contains(&task.title, k) || contains(&task.description, k)
        })
}

fn compare(a: &Task, b: &Task, field: query::SortField) -> Ordering {
    use query::SortField::*;
    match field {
        Title => a.title.cmp(&b.title),
        Description => a.description.cmp(&b.description),
        Status => a.status.to_string().cmp(&b.status.to_string()),
        Priority => a.priority.to_string().cmp(&b.priority.to_string()),
        Category => a.category.to_string().cmp(&b.category.to_string()),
        StartDate => a.start_date.cmp(&b.start_date),
        DueDate => a.due_date.cmp(&b.due_date),
        CompletionFlag => a.completion_flag.cmp(&b.completion_flag),
        CreatedAt => a.created_at.cmp(&b.created_at),
        UpdatedAt => a.updated_at.cmp(&b.updated_at),
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn create(&self, input: CreateTask) -> TaskResult<Task> {
        let task = Task::new(input);
        self.tasks.lock().unwrap().push(task.clone());
        Ok(task)
    }

    async fn get_by_id(&self, id: Uuid) -> TaskResult<Option<Task>> {
        Ok(self.tasks.lock().unwrap().iter().find(|t| t.id == id).cloned())
    }

    async fn find(&self, criteria: TaskCriteria, page: Pagination) -> TaskResult<Vec<Task>> {
        let mut found: Vec<Task> = self
            .tasks
            .lock()
            .unwrap()
            .iter()
            .filter(|t| matches(t, &criteria))
            .cloned()
            .collect();

        if let Some(sort) = criteria.sort {
            found.sort_by(|a, b| {
                let ord = compare(a, b, sort.field);
                match sort.order {
                    SortOrder::Asc => ord,
                    SortOrder::Desc => ord.reverse(),
                }
            });
        }

        Ok(found
            .into_iter()
            .skip(page.skip() as usize)
            .take(page.page_size as usize)
            .collect())
    }

    async fn count(&self, criteria: TaskCriteria) -> TaskResult<u64> {
        let tasks = self.tasks.lock().unwrap();
        Ok(tasks.iter().filter(|t| matches(t, &criteria)).count() as u64)
    }

    async fn update(&self, id: Uuid, input: UpdateTask) -> TaskResult<Option<Task>> {
        let mut tasks = self.tasks.lock().unwrap();
        Ok(tasks.iter_mut().find(|t| t.id == id).map(|task| {
            task.apply_update(input);
            task.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> TaskResult<bool> {
        let mut tasks = self.tasks.lock().unwrap();
        let before = tasks.len();
        tasks.retain(|t| t.id != id);
        Ok(tasks.len() < before)
    }

    async fn delete_many(&self, ids: Vec<Uuid>) -> TaskResult<u64> {
        let mut tasks = self.tasks.lock().unwrap();
        let before = tasks.len();
        tasks.retain(|t| !ids.contains(&t.id));
        Ok((before - tasks.len()) as u64)
    }
}

struct TestApp {
    router: Router,
    images: TempDir,
}

impl TestApp {
    fn new() -> Self {
        Self::with_config(TaskServiceConfig::default())
    }

    fn with_config(config: TaskServiceConfig) -> Self {
        let images = tempfile::tempdir().unwrap();
        let store = DiskImageStore::new(images.path());
        let service = TaskService::new(InMemoryTaskRepository::default(), Arc::new(store))
            .with_config(config);

        Self {
            router: handlers::router(service),
            images,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    async fn json(&self, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn create(&self, title: &str, extra: Value) -> Value {
        let mut body = json!({
            "title": title,
            "description": format!("{} in detail", title),
            "startDate": "2024-03-01",
            "dueDate": "2024-03-31"
        });
        if let (Some(body), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
            body.extend(extra.clone());
        }

        let (status, body) = self.json("POST", "/", body).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["doc"].clone()
    }
}

fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn multipart_request(method: &str, uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::HOST, "tasks.test:8080")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

const FORM_FIELDS: [(&str, &str); 5] = [
    ("title", "Upload logo"),
    ("description", "Attach the new logo"),
    ("startDate", "2024-03-01"),
    ("dueDate", "2024-03-02T12:00:00Z"),
    ("priority", "High"),
];

#[tokio::test]
async fn test_create_task_returns_201_with_defaults() {
    let app = TestApp::new();
    let (status, body) = app
        .json(
            "POST",
            "/",
            json!({
                "title": "Write report",
                "description": "Quarterly numbers",
                "startDate": "2024-03-01",
                "dueDate": "2024-03-15"
            }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    let doc = &body["doc"];
    assert!(Uuid::parse_str(doc["_id"].as_str().unwrap()).is_ok());
    assert_eq!(doc["status"], "To Do");
    assert_eq!(doc["priority"], "Medium");
    assert_eq!(doc["category"], "Work");
    assert_eq!(doc["completionFlag"], false);
    assert_eq!(doc["startDate"], "2024-03-01T00:00:00Z");
    assert!(doc.get("image").is_none());
}

#[tokio::test]
async fn test_create_done_task_is_complete() {
    let app = TestApp::new();
    let doc = app.create("Already finished", json!({"status": "Done"})).await;
    assert_eq!(doc["completionFlag"], true);
}

#[tokio::test]
async fn test_create_task_reports_every_invalid_field() {
    let app = TestApp::new();
    let (status, body) = app
        .json(
            "POST",
            "/",
            json!({"title": "abc", "status": "Finished", "dueDate": "someday"}),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
    let details = body["details"].as_object().unwrap();
    for field in ["title", "description", "startDate", "dueDate", "status"] {
        assert!(details.contains_key(field), "missing {field}: {body}");
    }
}

#[tokio::test]
async fn test_create_with_image_upload() {
    let app = TestApp::new();
    let png = b"\x89PNG\r\n\x1a\nfake";
    let request = multipart_request(
        "POST",
        "/",
        multipart_body(&FORM_FIELDS, Some(("logo.png", "image/png", png))),
    );

    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let doc = &body["doc"];
    assert_eq!(doc["priority"], "High");
    let url = doc["image"].as_str().unwrap();
    let name = url
        .strip_prefix("http://tasks.test:8080/img/")
        .expect("image URL uses request host");
    assert!(name.starts_with("logo.png-"));
    assert!(name.ends_with(".png"));

    let stored = std::fs::read(app.images.path().join(name)).unwrap();
    assert_eq!(stored, png);
}

#[tokio::test]
async fn test_forwarded_host_needs_trust() {
    let forged = || {
        let mut request = multipart_request(
            "POST",
            "/",
            multipart_body(&FORM_FIELDS, Some(("logo.png", "image/png", b"png"))),
        );
        request
            .headers_mut()
            .insert("x-forwarded-host", "evil.example".parse().unwrap());
        request
    };

    let app = TestApp::new();
    let (status, body) = app.send(forged()).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let url = body["doc"]["image"].as_str().unwrap();
    assert!(url.starts_with("http://tasks.test:8080/img/"), "{url}");

    let app = TestApp::with_config(TaskServiceConfig {
        trust_forwarded_headers: true,
        ..Default::default()
    });
    let (_, body) = app.send(forged()).await;
    let url = body["doc"]["image"].as_str().unwrap();
    assert!(url.starts_with("http://evil.example/img/"), "{url}");
}

#[tokio::test]
async fn test_create_and_update_from_urlencoded_form() {
    let app = TestApp::new();
    let urlencoded = |method: &str, uri: &str, body: &'static str| {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    };

    let (status, body) = app
        .send(urlencoded(
            "POST",
            "/",
            "title=Write+report&description=Quarterly%20numbers&startDate=2024-03-01&dueDate=2024-03-15&priority=Low",
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["doc"]["title"], "Write report");
    assert_eq!(body["doc"]["priority"], "Low");

    let id = body["doc"]["_id"].as_str().unwrap().to_string();
    let (status, body) = app
        .send(urlencoded("PUT", &format!("/{id}"), "status=In+Progress"))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["doc"]["status"], "In Progress");

    let (status, body) = app
        .send(urlencoded("POST", "/", "title=abc&startDate=soon"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"].get("startDate").is_some(), "{body}");
}

#[tokio::test]
async fn test_create_rejects_non_image_upload() {
    let app = TestApp::new();
    let request = multipart_request(
        "POST",
        "/",
        multipart_body(&FORM_FIELDS, Some(("notes.txt", "text/plain", b"hello"))),
    );

    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"].get("image").is_some(), "{body}");
    assert_eq!(std::fs::read_dir(app.images.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_empty_file_part_is_no_image() {
    let app = TestApp::new();
    let request = multipart_request(
        "POST",
        "/",
        multipart_body(&FORM_FIELDS, Some(("", "application/octet-stream", b""))),
    );

    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert!(body["doc"].get("image").is_none());
}

#[tokio::test]
async fn test_get_task() {
    let app = TestApp::new();
    let doc = app.create("Find me later", json!({})).await;
    let id = doc["_id"].as_str().unwrap();

    let (status, body) = app.get(&format!("/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["doc"], doc);
}

#[tokio::test]
async fn test_get_unknown_and_malformed_ids() {
    let app = TestApp::new();

    let (status, body) = app.get(&format!("/{}", Uuid::now_v7())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Task not found");

    let (status, body) = app.get("/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_UUID");
}

#[tokio::test]
async fn test_update_task() {
    let app = TestApp::new();
    let doc = app.create("Review budget", json!({"status": "Done"})).await;
    let id = doc["_id"].as_str().unwrap();

    let (status, body) = app
        .json(
            "PUT",
            &format!("/{id}"),
            json!({"status": "In Progress", "category": "Personal"}),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Task updated!");
    assert_eq!(body["doc"]["status"], "In Progress");
    assert_eq!(body["doc"]["category"], "Personal");
    assert_eq!(body["doc"]["completionFlag"], false);
    assert_eq!(body["doc"]["title"], "Review budget");
}

#[tokio::test]
async fn test_update_with_invalid_field_changes_nothing() {
    let app = TestApp::new();
    let doc = app.create("Review budget", json!({})).await;
    let id = doc["_id"].as_str().unwrap();

    let (status, _) = app
        .json(
            "PUT",
            &format!("/{id}"),
            json!({"title": "Review budget again", "priority": "Urgent"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app.get(&format!("/{id}")).await;
    assert_eq!(body["doc"]["title"], "Review budget");
}

#[tokio::test]
async fn test_update_replaces_image() {
    let app = TestApp::new();
    let doc = app.create("Swap the banner", json!({})).await;
    let id = doc["_id"].as_str().unwrap();

    let request = multipart_request(
        "PUT",
        &format!("/{id}"),
        multipart_body(&[], Some(("banner.jpg", "image/jpeg", b"jpeg"))),
    );
    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::OK, "{body}");
    let url = body["doc"]["image"].as_str().unwrap();
    assert!(url.contains("/img/banner.jpg-"));
}

#[tokio::test]
async fn test_update_unknown_task() {
    let app = TestApp::new();
    let (status, _) = app
        .json("PUT", &format!("/{}", Uuid::now_v7()), json!({"status": "Done"}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_unknown_task_discards_upload() {
    let app = TestApp::new();
    let request = multipart_request(
        "PUT",
        &format!("/{}", Uuid::now_v7()),
        multipart_body(&[], Some(("banner.png", "image/png", b"png"))),
    );

    let (status, _) = app.send(request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(std::fs::read_dir(app.images.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_mark_done_ignores_body() {
    let app = TestApp::new();
    let doc = app.create("Water plants", json!({"category": "Errands"})).await;
    let id = doc["_id"].as_str().unwrap();

    let (status, body) = app
        .json("PATCH", &format!("/{id}"), json!({"status": "To Do"}))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["doc"]["status"], "Done");
    assert_eq!(body["doc"]["completionFlag"], true);
    assert_eq!(body["doc"]["category"], "Errands");
}

#[tokio::test]
async fn test_delete_task() {
    let app = TestApp::new();
    let doc = app.create("Throwaway task", json!({})).await;
    let uri = format!("/{}", doc["_id"].as_str().unwrap());

    let request = || Request::delete(uri.as_str()).body(Body::empty()).unwrap();

    let (status, body) = app.send(request()).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, _) = app.send(request()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bulk_delete_both_spellings() {
    let app = TestApp::new();
    let a = app.create("First to go", json!({})).await;
    let b = app.create("Second to go", json!({})).await;
    let c = app.create("Third to go", json!({})).await;

    let (status, body) = app
        .json(
            "DELETE",
            "/deteleMultiple",
            json!({"ids": [a["_id"], b["_id"], a["_id"], Uuid::now_v7()]}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "2 tasks deleted", "deletedCount": 2}));

    let (status, body) = app
        .json("DELETE", "/deleteMultiple", json!({"ids": [c["_id"]]}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deletedCount"], 1);

    let (_, body) = app.get("/statistics/totalTasks").await;
    assert_eq!(body, json!({"totalTaskCount": 0}));
}

#[tokio::test]
async fn test_bulk_delete_rejects_bad_ids() {
    let app = TestApp::new();
    for bad in [json!({}), json!({"ids": []}), json!({"ids": ["nope"]})] {
        let (status, body) = app.json("DELETE", "/deteleMultiple", bad).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid task ids array");
    }
}

#[tokio::test]
async fn test_list_paginates_in_creation_order() {
    let app = TestApp::new();
    for i in 1..=3 {
        app.create(&format!("Task number {i}"), json!({})).await;
    }

    let (status, body) = app.get("/?page=2&pageSize=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["page"], 2);
    assert_eq!(body["pageSize"], 2);
    assert_eq!(body["totalItems"], 1);
    assert_eq!(body["totalCount"], 3);
    assert_eq!(body["data"][0]["title"], "Task number 3");

    let (_, body) = app.get("/?page=abc&pageSize=1000").await;
    assert_eq!(body["page"], 1);
    assert_eq!(body["pageSize"], 100);
    assert_eq!(body["totalItems"], 3);
}

#[tokio::test]
async fn test_malformed_query_string_is_json_error() {
    let app = TestApp::new();
    for uri in ["/?page=1&page=2", "/filter?status=Done&status=Done"] {
        let (status, body) = app.get(uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "QUERY_EXTRACTION", "{body}");
    }
}

#[tokio::test]
async fn test_search_is_literal_and_case_insensitive() {
    let app = TestApp::new();
    app.create("Fix a.b parser", json!({})).await;
    app.create("Fix axb parser", json!({})).await;
    app.create("Unrelated chore", json!({})).await;

    let (status, body) = app.get("/search?keyword=A.B").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalCount"], 1);
    assert_eq!(body["data"][0]["title"], "Fix a.b parser");

    let (status, _) = app.get("/search").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_filter_and_sort() {
    let app = TestApp::new();
    app.create("Early work", json!({"priority": "High", "dueDate": "2024-03-10"}))
        .await;
    app.create("Later work", json!({"priority": "High", "dueDate": "2024-03-20"}))
        .await;
    app.create("Low priority", json!({"priority": "Low"})).await;

    let (status, body) = app
        .get("/filter?priority=High&sortBy=dueDate&sortOrder=desc")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalCount"], 2);
    assert_eq!(body["data"][0]["title"], "Later work");
    assert_eq!(body["data"][1]["title"], "Early work");

    let (_, body) = app.get("/filter?dueDate=2024-03-15").await;
    assert_eq!(body["totalCount"], 1);

    let (status, body) = app.get("/filter?status=Finished&sortBy=secret").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"].get("status").is_some());
    assert!(body["details"].get("sortBy").is_some());
}

#[tokio::test]
async fn test_statistics() {
    let app = TestApp::new();
    app.create("Started already", json!({"status": "In Progress"})).await;
    app.create("Not started yet", json!({})).await;
    app.create("Not started either", json!({})).await;

    let (status, body) = app.get("/statistics/status/in%20progress").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"field": "status", "value": "In Progress", "count": 1, "percentage": 33.33})
    );

    let (_, body) = app.get("/statistics/category/work").await;
    assert_eq!(body["count"], 3);
    assert_eq!(body["percentage"], 100.0);

    let (status, _) = app.get("/statistics/priority/urgent").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_legacy_statistics_labels() {
    let app = TestApp::with_config(TaskServiceConfig {
        legacy_stats_labels: true,
        ..Default::default()
    });
    app.create("Urgent thing", json!({"priority": "High"})).await;

    let (_, body) = app.get("/statistics/priority/HIGH").await;
    assert_eq!(body, json!({"high priority Tasks": {"count": 1, "percentage": 100.0}}));

    let (_, body) = app.get("/statistics/status/Done").await;
    assert_eq!(body, json!({"Done Tasks": {"count": 0, "percentage": 0.0}}));
}
