/// Task model and database operations
///
/// Tasks are standalone documents. Each task lists the projects it belongs
/// to, and each of those projects lists the task back. Project-scoped routes
/// create and remove tasks through the same model.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY,
///     title VARCHAR(100) NOT NULL,
///     description TEXT,
///     finished BOOLEAN NOT NULL DEFAULT FALSE,
///     person_id UUID REFERENCES persons(id) ON DELETE SET NULL,
///     projects UUID[] NOT NULL DEFAULT '{}',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::dedup_ids;

/// Default page size for task listings
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Largest page size a client may request
pub const MAX_PAGE_SIZE: i64 = 100;

/// A task, optionally assigned to a person and linked to projects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,

    pub title: String,

    pub description: Option<String>,

    pub finished: bool,

    /// Assignee
    pub person_id: Option<Uuid>,

    /// Projects listing this task, without duplicates
    pub projects: Vec<Uuid>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating a task
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTask {
    pub title: String,

    pub description: Option<String>,

    pub finished: bool,

    pub person_id: Option<Uuid>,

    pub projects: Vec<Uuid>,
}

/// Partial update; `None` keeps the stored value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskPatch {
    pub title: Option<String>,

    pub description: Option<String>,

    pub finished: Option<bool>,

    pub person_id: Option<Uuid>,

    /// Replaces the whole project set
    pub projects: Option<Vec<Uuid>>,
}

/// Listing filter; every `None` field matches all tasks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub finished: Option<bool>,

    pub person_id: Option<Uuid>,

    /// Matches tasks whose project set contains this id
    pub project_id: Option<Uuid>,
}

impl TaskFilter {
    /// Checks a task against the filter
    pub fn matches(&self, task: &Task) -> bool {
        self.finished.map_or(true, |f| task.finished == f)
            && self.person_id.map_or(true, |p| task.person_id == Some(p))
            && self.project_id.map_or(true, |p| task.projects.contains(&p))
    }
}

/// Skip/limit window over a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// 1-based page number
    pub number: i64,

    /// Page size
    pub size: i64,
}

impl Page {
    /// Builds a page, falling back to defaults for missing or out-of-range values
    pub fn new(number: Option<i64>, size: Option<i64>) -> Self {
        let number = number.filter(|n| *n >= 1).unwrap_or(1);
        let size = size
            .filter(|s| *s >= 1)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE);
        Self { number, size }
    }

    /// Number of records to skip, saturating for page numbers past any listing
    pub fn offset(&self) -> i64 {
        (self.number - 1).saturating_mul(self.size)
    }

    /// Number of pages needed for `total` records
    pub fn total_pages(&self, total: i64) -> i64 {
        (total + self.size - 1) / self.size
    }
}

impl Default for Page {
    fn default() -> Self {
        Page::new(None, None)
    }
}

const TASK_COLUMNS: &str =
    "id, title, description, finished, person_id, projects, created_at, updated_at";

impl Task {
    pub fn new(data: CreateTask) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: data.title,
            description: data.description,
            finished: data.finished,
            person_id: data.person_id,
            projects: dedup_ids(&data.projects),
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a patch in memory, field by field
    pub fn apply(&mut self, patch: TaskPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(finished) = patch.finished {
            self.finished = finished;
        }
        if let Some(person_id) = patch.person_id {
            self.person_id = Some(person_id);
        }
        if let Some(projects) = patch.projects {
            self.projects = dedup_ids(&projects);
        }
        self.updated_at = Utc::now();
    }

    pub fn link_project(&mut self, project_id: Uuid) -> bool {
        if self.projects.contains(&project_id) {
            return false;
        }
        self.projects.push(project_id);
        self.updated_at = Utc::now();
        true
    }

    pub fn unlink_project(&mut self, project_id: Uuid) -> bool {
        let before = self.projects.len();
        self.projects.retain(|id| *id != project_id);
        let changed = self.projects.len() != before;
        if changed {
            self.updated_at = Utc::now();
        }
        changed
    }

    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let draft = Task::new(data);

        sqlx::query_as::<_, Task>(&format!(
            "INSERT INTO tasks (id, title, description, finished, person_id, projects, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {}",
            TASK_COLUMNS
        ))
        .bind(draft.id)
        .bind(draft.title)
        .bind(draft.description)
        .bind(draft.finished)
        .bind(draft.person_id)
        .bind(draft.projects)
        .bind(draft.created_at)
        .bind(draft.updated_at)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_ids(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<Self>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks WHERE id = ANY($1)",
            TASK_COLUMNS
        ))
        .bind(ids)
        .fetch_all(pool)
        .await
    }

    /// Lists tasks matching `filter`, newest first
    ///
    /// With `page = None` every matching task is returned.
    pub async fn list(
        pool: &PgPool,
        filter: TaskFilter,
        page: Option<Page>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let (offset, limit) = match page {
            Some(p) => (p.offset(), Some(p.size)),
            None => (0, None),
        };

        sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks
             WHERE ($1::BOOLEAN IS NULL OR finished = $1)
               AND ($2::UUID IS NULL OR person_id = $2)
               AND ($3::UUID IS NULL OR $3 = ANY(projects))
             ORDER BY created_at DESC
             OFFSET $4
             LIMIT $5",
            TASK_COLUMNS
        ))
        .bind(filter.finished)
        .bind(filter.person_id)
        .bind(filter.project_id)
        .bind(offset)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Counts tasks matching `filter`
    pub async fn count(pool: &PgPool, filter: TaskFilter) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM tasks
             WHERE ($1::BOOLEAN IS NULL OR finished = $1)
               AND ($2::UUID IS NULL OR person_id = $2)
               AND ($3::UUID IS NULL OR $3 = ANY(projects))",
        )
        .bind(filter.finished)
        .bind(filter.person_id)
        .bind(filter.project_id)
        .fetch_one(pool)
        .await
    }

    /// Applies a partial update
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        patch: TaskPatch,
    ) -> Result<Option<Self>, sqlx::Error> {
        let projects = patch.projects.map(|ids| dedup_ids(&ids));

        sqlx::query_as::<_, Task>(&format!(
            "UPDATE tasks SET
                 title = COALESCE($2, title),
                 description = COALESCE($3, description),
                 finished = COALESCE($4, finished),
                 person_id = COALESCE($5, person_id),
                 projects = COALESCE($6, projects),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {}",
            TASK_COLUMNS
        ))
        .bind(id)
        .bind(patch.title)
        .bind(patch.description)
        .bind(patch.finished)
        .bind(patch.person_id)
        .bind(projects)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            "DELETE FROM tasks WHERE id = $1 RETURNING {}",
            TASK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Adds `project_id` to every listed task that does not already hold it
    pub async fn add_project(
        pool: &PgPool,
        project_id: Uuid,
        task_ids: &[Uuid],
    ) -> Result<u64, sqlx::Error> {
        if task_ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            "UPDATE tasks
             SET projects = array_append(projects, $1), updated_at = NOW()
             WHERE id = ANY($2) AND NOT ($1 = ANY(projects))",
        )
        .bind(project_id)
        .bind(task_ids)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Removes `project_id` from every listed task
    pub async fn remove_project(
        pool: &PgPool,
        project_id: Uuid,
        task_ids: &[Uuid],
    ) -> Result<u64, sqlx::Error> {
        if task_ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            "UPDATE tasks
             SET projects = array_remove(projects, $1), updated_at = NOW()
             WHERE id = ANY($2) AND $1 = ANY(projects)",
        )
        .bind(project_id)
        .bind(task_ids)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }
}
