/// Task endpoints
///
/// # Endpoints
///
/// - `GET /api/tasks` - Paginated, filtered listing (public)
/// - `POST /api/tasks` - Create; named projects gain the task
/// - `GET /api/tasks/:id` - One task with person and projects expanded
/// - `PUT /api/tasks/:id` - Patch; a new project set moves the links
/// - `DELETE /api/tasks/:id` - Delete after pulling it from its projects
/// - `GET /api/admin/tasks` - Every task with full documents (admin)
/// - `GET /api/admin/consistency` - One-sided project/task references (admin)
///
/// # Listing query
///
/// ```text
/// GET /api/tasks?page=2&limit=20&finished=false&personId=<uuid>&projectId=<uuid>
/// ```
///
/// `page` and `limit` fall back to 1 and 10 when missing or unparsable;
/// `limit` is capped at 100. Results are newest first.

use crate::{
    app::AppState,
    error::{ApiError, ApiJson, ApiPath, ApiQuery, ApiResult},
};
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tasklist_shared::{
    models::task::{CreateTask, Page, Task, TaskFilter, TaskPatch},
    populate::{self, TaskDetail, TaskView},
    relations::{self, LinkIssue},
};
use uuid::Uuid;
use validator::Validate;

/// Raw listing query; values are parsed leniently
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub finished: Option<String>,
    pub person_id: Option<String>,
    pub project_id: Option<String>,
}

fn parse_id(name: &str, value: Option<&str>) -> ApiResult<Option<Uuid>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => Uuid::parse_str(raw)
            .map(Some)
            .map_err(|_| ApiError::BadRequest(format!("Invalid {}: {}", name, raw))),
    }
}

impl TaskListQuery {
    pub fn page(&self) -> Page {
        let number = self.page.as_deref().and_then(|p| p.trim().parse().ok());
        let size = self.limit.as_deref().and_then(|l| l.trim().parse().ok());
        Page::new(number, size)
    }

    /// Any non-empty `finished` other than `true` means unfinished
    pub fn filter(&self) -> ApiResult<TaskFilter> {
        let finished = self
            .finished
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(|f| f == "true");

        Ok(TaskFilter {
            finished,
            person_id: parse_id("personId", self.person_id.as_deref())?,
            project_id: parse_id("projectId", self.project_id.as_deref())?,
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[validate(
        required(message = "Title is required"),
        length(min = 3, max = 100, message = "Title must be between 3 and 100 characters")
    )]
    pub title: Option<String>,

    pub description: Option<String>,

    pub finished: Option<bool>,

    pub person_id: Option<Uuid>,

    #[serde(default, alias = "projects")]
    pub project_ids: Vec<Uuid>,
}

impl TryFrom<CreateTaskRequest> for CreateTask {
    type Error = validator::ValidationErrors;

    fn try_from(req: CreateTaskRequest) -> Result<Self, Self::Error> {
        req.validate()?;
        Ok(CreateTask {
            title: req.title.unwrap_or_default(),
            description: req.description,
            finished: req.finished.unwrap_or(false),
            person_id: req.person_id,
            projects: req.project_ids,
        })
    }
}

/// Partial update; omitted fields keep their values
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[validate(length(min = 3, max = 100, message = "Title must be between 3 and 100 characters"))]
    pub title: Option<String>,

    pub description: Option<String>,

    pub finished: Option<bool>,

    pub person_id: Option<Uuid>,

    /// `[]` detaches the task from every project
    #[serde(alias = "projects")]
    pub project_ids: Option<Vec<Uuid>>,
}

impl From<UpdateTaskRequest> for TaskPatch {
    fn from(req: UpdateTaskRequest) -> Self {
        TaskPatch {
            title: req.title,
            description: req.description,
            finished: req.finished,
            person_id: req.person_id,
            projects: req.project_ids,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListResponse {
    pub success: bool,
    pub count: usize,
    pub total: i64,
    pub total_pages: i64,
    pub current_page: i64,
    pub tasks: Vec<TaskView>,
}

#[derive(Debug, Serialize)]
pub struct TaskDetailResponse {
    pub success: bool,
    pub task: TaskView,
}

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub success: bool,
    pub message: String,
    pub task: Task,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct AdminTaskListResponse {
    pub success: bool,
    pub count: usize,
    pub tasks: Vec<TaskDetail>,
}

#[derive(Debug, Serialize)]
pub struct ConsistencyResponse {
    pub success: bool,
    pub consistent: bool,
    pub count: usize,
    pub issues: Vec<LinkIssue>,
}

pub async fn list_tasks(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<TaskListQuery>,
) -> ApiResult<Json<TaskListResponse>> {
    let filter = query.filter()?;
    let page = query.page();

    let total = state.store.count_tasks(filter).await?;
    let tasks = state.store.list_tasks(filter, Some(page)).await?;
    let tasks = populate::tasks(state.store.as_ref(), tasks).await?;

    Ok(Json(TaskListResponse {
        success: true,
        count: tasks.len(),
        total,
        total_pages: page.total_pages(total),
        current_page: page.number,
        tasks,
    }))
}

/// Creates a task; 404 when `personId` or any of `projectIds` does not resolve
pub async fn create_task(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<TaskResponse>)> {
    let data = CreateTask::try_from(req)?;
    let task = relations::create_task(state.store.as_ref(), data).await?;

    tracing::debug!(task_id = %task.id, projects = task.projects.len(), "Task created");

    Ok((
        StatusCode::CREATED,
        Json(TaskResponse {
            success: true,
            message: "Task created successfully!".to_string(),
            task,
        }),
    ))
}

pub async fn get_task(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<TaskDetailResponse>> {
    let task = state
        .store
        .find_task(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found.".to_string()))?;

    let task = populate::tasks(state.store.as_ref(), vec![task])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::NotFound("Task not found.".to_string()))?;

    Ok(Json(TaskDetailResponse {
        success: true,
        task,
    }))
}

pub async fn update_task(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateTaskRequest>,
) -> ApiResult<Json<TaskResponse>> {
    req.validate()?;
    let task = relations::edit_task(state.store.as_ref(), id, req.into()).await?;

    Ok(Json(TaskResponse {
        success: true,
        message: "Task updated successfully!".to_string(),
        task,
    }))
}

pub async fn delete_task(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    relations::delete_task(state.store.as_ref(), id).await?;

    Ok(Json(MessageResponse {
        success: true,
        message: "Task deleted successfully!".to_string(),
    }))
}

/// Every task with full person and project documents
pub async fn list_tasks_admin(
    State(state): State<AppState>,
) -> ApiResult<Json<AdminTaskListResponse>> {
    let tasks = state.store.list_tasks(TaskFilter::default(), None).await?;
    let tasks = populate::task_details(state.store.as_ref(), tasks).await?;

    Ok(Json(AdminTaskListResponse {
        success: true,
        count: tasks.len(),
        tasks,
    }))
}

/// Reports one-sided project/task references
pub async fn consistency_report(
    State(state): State<AppState>,
) -> ApiResult<Json<ConsistencyResponse>> {
    let issues = relations::check_links(state.store.as_ref()).await?;
    if !issues.is_empty() {
        tracing::warn!(count = issues.len(), "Inconsistent project/task links");
    }

    Ok(Json(ConsistencyResponse {
        success: true,
        consistent: issues.is_empty(),
        count: issues.len(),
        issues,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> TaskListQuery {
        let map: serde_json::Map<String, serde_json::Value> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
            .collect();
        serde_json::from_value(serde_json::Value::Object(map)).unwrap()
    }

    #[test]
    fn test_page_defaults_and_fallbacks() {
        assert_eq!(TaskListQuery::default().page(), Page::new(Some(1), Some(10)));

        let q = query(&[("page", "abc"), ("limit", "-4")]);
        assert_eq!(q.page(), Page::new(Some(1), Some(10)));

        let q = query(&[("page", "3"), ("limit", "500")]);
        assert_eq!(q.page().number, 3);
        assert_eq!(q.page().size, 100);
    }

    #[test]
    fn test_finished_filter() {
        assert_eq!(query(&[("finished", "true")]).filter().unwrap().finished, Some(true));
        assert_eq!(query(&[("finished", "false")]).filter().unwrap().finished, Some(false));
        assert_eq!(query(&[("finished", "")]).filter().unwrap().finished, None);
    }

    #[test]
    fn test_id_filters() {
        let id = Uuid::new_v4();
        let q = query(&[("personId", &id.to_string())]);
        assert_eq!(q.filter().unwrap().person_id, Some(id));

        let q = query(&[("projectId", "nope")]);
        assert!(matches!(q.filter(), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_create_request_defaults() {
        let req: CreateTaskRequest =
            serde_json::from_value(serde_json::json!({ "title": "Write docs" })).unwrap();
        let data = CreateTask::try_from(req).unwrap();

        assert!(!data.finished);
        assert!(data.projects.is_empty());
        assert!(data.person_id.is_none());
    }

    #[test]
    fn test_update_distinguishes_empty_and_absent_projects() {
        let absent: UpdateTaskRequest =
            serde_json::from_value(serde_json::json!({ "finished": true })).unwrap();
        assert!(TaskPatch::from(absent).projects.is_none());

        let empty: UpdateTaskRequest =
            serde_json::from_value(serde_json::json!({ "projectIds": [] })).unwrap();
        assert_eq!(TaskPatch::from(empty).projects, Some(vec![]));
    }

    #[test]
    fn test_update_title_length_checked_when_present() {
        let req: UpdateTaskRequest =
            serde_json::from_value(serde_json::json!({ "title": "ab" })).unwrap();
        assert!(req.validate().is_err());

        assert!(UpdateTaskRequest::default().validate().is_ok());
    }
}
