/// Project endpoints
///
/// # Endpoints
///
/// - `GET /api/projects` - All projects with their tasks expanded
/// - `POST /api/projects` - Create; listed tasks gain the project
/// - `PUT /api/projects/:id` - Patch; a new task list moves the links
/// - `DELETE /api/projects/:id` - Delete; tasks lose the project
/// - `POST /api/projects/:project_id/tasks` - Create a task inside the project
/// - `PUT /api/projects/:project_id/tasks/:task_id` - Set or toggle `finished`
/// - `DELETE /api/projects/:project_id/tasks/:task_id` - Detach, deleting orphans
///
/// Link bookkeeping lives in `tasklist_shared::relations`; handlers only
/// validate and shape responses.

use crate::{
    app::AppState,
    error::{ApiJson, ApiPath, ApiResult},
};
use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tasklist_shared::{
    models::{
        project::{CreateProject, Project, ProjectPatch},
        task::{CreateTask, Task},
    },
    populate::{self, ProjectView},
    relations,
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    #[validate(
        required(message = "Name is required"),
        length(min = 1, message = "Name is required")
    )]
    pub name: Option<String>,

    pub description: Option<String>,

    /// Defaults to now
    pub start_date: Option<DateTime<Utc>>,

    #[validate(required(message = "End date is required"))]
    pub end_date: Option<DateTime<Utc>>,

    #[serde(default, alias = "tasksIds")]
    pub task_ids: Vec<Uuid>,
}

impl TryFrom<CreateProjectRequest> for CreateProject {
    type Error = validator::ValidationErrors;

    fn try_from(req: CreateProjectRequest) -> Result<Self, Self::Error> {
        req.validate()?;
        Ok(CreateProject {
            name: req.name.unwrap_or_default(),
            description: req.description,
            start_date: req.start_date,
            end_date: req.end_date.unwrap_or_else(Utc::now),
            tasks: req.task_ids,
        })
    }
}

/// Partial update; omitted fields keep their values
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: Option<String>,

    pub description: Option<String>,

    pub start_date: Option<DateTime<Utc>>,

    pub end_date: Option<DateTime<Utc>>,

    /// Replaces the task list when present
    #[serde(alias = "tasksIds", alias = "tasks")]
    pub task_ids: Option<Vec<Uuid>>,
}

impl From<UpdateProjectRequest> for ProjectPatch {
    fn from(req: UpdateProjectRequest) -> Self {
        ProjectPatch {
            name: req.name,
            description: req.description,
            start_date: req.start_date,
            end_date: req.end_date,
            tasks: req.task_ids,
        }
    }
}

/// Body of `POST /projects/:project_id/tasks`
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProjectTaskRequest {
    #[validate(
        required(message = "Title is required"),
        length(min = 3, max = 100, message = "Title must be between 3 and 100 characters")
    )]
    pub title: Option<String>,

    pub description: Option<String>,

    pub person_id: Option<Uuid>,
}

/// Body of `PUT /projects/:project_id/tasks/:task_id`
#[derive(Debug, Default, Deserialize)]
pub struct TaskStatusRequest {
    /// Omitted flips the current value
    pub finished: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ProjectResponse {
    pub success: bool,
    pub message: String,
    pub project: Project,
}

#[derive(Debug, Serialize)]
pub struct ProjectTaskResponse {
    pub success: bool,
    pub message: String,
    pub task: Task,
}

#[derive(Debug, Serialize)]
pub struct DetachResponse {
    pub success: bool,
    pub message: String,

    /// True when the task had no other project and was deleted
    pub deleted: bool,
}

pub async fn list_projects(State(state): State<AppState>) -> ApiResult<Json<Vec<ProjectView>>> {
    let projects = state.store.list_projects().await?;
    let views = populate::projects(state.store.as_ref(), projects).await?;
    Ok(Json(views))
}

/// Creates a project; 404 lists task ids that do not resolve
pub async fn create_project(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<ProjectResponse>)> {
    let data = CreateProject::try_from(req)?;
    let project = relations::create_project(state.store.as_ref(), data).await?;

    tracing::debug!(project_id = %project.id, tasks = project.tasks.len(), "Project created");

    Ok((
        StatusCode::CREATED,
        Json(ProjectResponse {
            success: true,
            message: "Project created successfully!".to_string(),
            project,
        }),
    ))
}

pub async fn update_project(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateProjectRequest>,
) -> ApiResult<Json<ProjectResponse>> {
    req.validate()?;
    let project = relations::edit_project(state.store.as_ref(), id, req.into()).await?;

    Ok(Json(ProjectResponse {
        success: true,
        message: "Project updated successfully!".to_string(),
        project,
    }))
}

pub async fn delete_project(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    relations::delete_project(state.store.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Creates a task that belongs to this project
pub async fn add_task(
    State(state): State<AppState>,
    ApiPath(project_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<ProjectTaskRequest>,
) -> ApiResult<(StatusCode, Json<ProjectTaskResponse>)> {
    req.validate()?;

    let data = CreateTask {
        title: req.title.unwrap_or_default(),
        description: req.description,
        finished: false,
        person_id: req.person_id,
        projects: vec![],
    };
    let task = relations::create_task_in_project(state.store.as_ref(), project_id, data).await?;

    Ok((
        StatusCode::CREATED,
        Json(ProjectTaskResponse {
            success: true,
            message: "Task added to project successfully!".to_string(),
            task,
        }),
    ))
}

/// Sets `finished`, or flips it when the body omits the field
pub async fn set_task_status(
    State(state): State<AppState>,
    ApiPath((project_id, task_id)): ApiPath<(Uuid, Uuid)>,
    body: Option<ApiJson<TaskStatusRequest>>,
) -> ApiResult<Json<ProjectTaskResponse>> {
    let finished = body.and_then(|ApiJson(req)| req.finished);

    let task =
        relations::set_task_finished(state.store.as_ref(), project_id, task_id, finished).await?;

    Ok(Json(ProjectTaskResponse {
        success: true,
        message: "Task status updated successfully!".to_string(),
        task,
    }))
}

/// Detaches a task from the project on both sides
pub async fn remove_task(
    State(state): State<AppState>,
    ApiPath((project_id, task_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<DetachResponse>> {
    let detached =
        relations::detach_task_from_project(state.store.as_ref(), project_id, task_id).await?;

    let message = if detached.deleted {
        "Task removed from project and deleted."
    } else {
        "Task removed from project."
    };

    Ok(Json(DetachResponse {
        success: true,
        message: message.to_string(),
        deleted: detached.deleted,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_accepts_legacy_tasks_ids() {
        let task = Uuid::new_v4();
        let req: CreateProjectRequest = serde_json::from_value(serde_json::json!({
            "name": "Launch",
            "endDate": "2030-01-01T00:00:00Z",
            "tasksIds": [task]
        }))
        .unwrap();

        let data = CreateProject::try_from(req).unwrap();
        assert_eq!(data.tasks, vec![task]);
        assert!(data.start_date.is_none());
    }

    #[test]
    fn test_create_requires_name_and_end_date() {
        let req: CreateProjectRequest =
            serde_json::from_value(serde_json::json!({ "description": "x" })).unwrap();

        let errors = CreateProject::try_from(req).unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("end_date"));
    }

    #[test]
    fn test_update_keeps_task_list_when_absent() {
        let req: UpdateProjectRequest =
            serde_json::from_value(serde_json::json!({ "name": "Renamed" })).unwrap();
        let patch = ProjectPatch::from(req);

        assert_eq!(patch.name.as_deref(), Some("Renamed"));
        assert!(patch.tasks.is_none());
    }

    #[test]
    fn test_project_task_title_length() {
        let req: ProjectTaskRequest =
            serde_json::from_value(serde_json::json!({ "title": "ab" })).unwrap();
        assert!(req.validate().is_err());

        let req: ProjectTaskRequest =
            serde_json::from_value(serde_json::json!({ "title": "abc" })).unwrap();
        assert!(req.validate().is_ok());
    }
}
