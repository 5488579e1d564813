/// Project model and database operations
///
/// A project keeps an ordered list of task ids. Each listed task keeps the
/// project's id in its own `projects` set; the `relations` module maintains both
/// sides. The link operations here only touch the project side.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE projects (
///     id UUID PRIMARY KEY,
///     name VARCHAR(255) NOT NULL,
///     description TEXT,
///     start_date TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     end_date TIMESTAMPTZ NOT NULL,
///     tasks UUID[] NOT NULL DEFAULT '{}',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use tasklist_shared::models::project::{CreateProject, Project};
/// use chrono::{Duration, Utc};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, task_id: Uuid) -> Result<(), sqlx::Error> {
/// let project = Project::create(&pool, CreateProject {
///     name: "Launch".to_string(),
///     description: None,
///     start_date: None,
///     end_date: Utc::now() + Duration::days(30),
///     tasks: vec![],
/// }).await?;
///
/// // Idempotent: a second call does not duplicate the id
/// Project::add_task(&pool, task_id, &[project.id]).await?;
/// Project::add_task(&pool, task_id, &[project.id]).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::dedup_ids;

/// A project with its ordered task list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,

    pub name: String,

    pub description: Option<String>,

    pub start_date: DateTime<Utc>,

    pub end_date: DateTime<Utc>,

    /// Task ids in insertion order, without duplicates
    pub tasks: Vec<Uuid>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProject {
    pub name: String,

    pub description: Option<String>,

    /// Defaults to now
    pub start_date: Option<DateTime<Utc>>,

    pub end_date: DateTime<Utc>,

    /// Initial task list (the caller links the task side)
    pub tasks: Vec<Uuid>,
}

/// Partial update; `None` keeps the stored value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectPatch {
    pub name: Option<String>,

    pub description: Option<String>,

    pub start_date: Option<DateTime<Utc>>,

    pub end_date: Option<DateTime<Utc>>,

    /// Replaces the whole task list
    pub tasks: Option<Vec<Uuid>>,
}

const PROJECT_COLUMNS: &str =
    "id, name, description, start_date, end_date, tasks, created_at, updated_at";

impl Project {
    pub fn new(data: CreateProject) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: data.name,
            description: data.description,
            start_date: data.start_date.unwrap_or(now),
            end_date: data.end_date,
            tasks: dedup_ids(&data.tasks),
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a patch in memory, field by field
    pub fn apply(&mut self, patch: ProjectPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(start_date) = patch.start_date {
            self.start_date = start_date;
        }
        if let Some(end_date) = patch.end_date {
            self.end_date = end_date;
        }
        if let Some(tasks) = patch.tasks {
            self.tasks = dedup_ids(&tasks);
        }
        self.updated_at = Utc::now();
    }

    /// Adds a task id to the project's list unless already present
    ///
    /// Returns true if the list changed.
    pub fn link_task(&mut self, task_id: Uuid) -> bool {
        if self.tasks.contains(&task_id) {
            return false;
        }
        self.tasks.push(task_id);
        self.updated_at = Utc::now();
        true
    }

    /// Removes a task id from the project's list
    ///
    /// Returns true if the list changed.
    pub fn unlink_task(&mut self, task_id: Uuid) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|id| *id != task_id);
        let changed = self.tasks.len() != before;
        if changed {
            self.updated_at = Utc::now();
        }
        changed
    }

    pub async fn create(pool: &PgPool, data: CreateProject) -> Result<Self, sqlx::Error> {
        let draft = Project::new(data);

        sqlx::query_as::<_, Project>(&format!(
            "INSERT INTO projects (id, name, description, start_date, end_date, tasks, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {}",
            PROJECT_COLUMNS
        ))
        .bind(draft.id)
        .bind(draft.name)
        .bind(draft.description)
        .bind(draft.start_date)
        .bind(draft.end_date)
        .bind(draft.tasks)
        .bind(draft.created_at)
        .bind(draft.updated_at)
        .fetch_one(pool)
        .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>(&format!(
            "SELECT {} FROM projects ORDER BY created_at ASC",
            PROJECT_COLUMNS
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>(&format!(
            "SELECT {} FROM projects WHERE id = $1",
            PROJECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_ids(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<Self>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        sqlx::query_as::<_, Project>(&format!(
            "SELECT {} FROM projects WHERE id = ANY($1)",
            PROJECT_COLUMNS
        ))
        .bind(ids)
        .fetch_all(pool)
        .await
    }

    /// Applies a partial update
    ///
    /// Fields left `None` keep their stored value (`COALESCE`).
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        patch: ProjectPatch,
    ) -> Result<Option<Self>, sqlx::Error> {
        let tasks = patch.tasks.map(|ids| dedup_ids(&ids));

        sqlx::query_as::<_, Project>(&format!(
            "UPDATE projects SET
                 name = COALESCE($2, name),
                 description = COALESCE($3, description),
                 start_date = COALESCE($4, start_date),
                 end_date = COALESCE($5, end_date),
                 tasks = COALESCE($6, tasks),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {}",
            PROJECT_COLUMNS
        ))
        .bind(id)
        .bind(patch.name)
        .bind(patch.description)
        .bind(patch.start_date)
        .bind(patch.end_date)
        .bind(tasks)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>(&format!(
            "DELETE FROM projects WHERE id = $1 RETURNING {}",
            PROJECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Appends `task_id` to every listed project that does not already hold it
    ///
    /// Returns the number of projects changed.
    pub async fn add_task(
        pool: &PgPool,
        task_id: Uuid,
        project_ids: &[Uuid],
    ) -> Result<u64, sqlx::Error> {
        if project_ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            "UPDATE projects
             SET tasks = array_append(tasks, $1), updated_at = NOW()
             WHERE id = ANY($2) AND NOT ($1 = ANY(tasks))",
        )
        .bind(task_id)
        .bind(project_ids)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Removes `task_id` from every listed project
    ///
    /// Returns the number of projects changed.
    pub async fn remove_task(
        pool: &PgPool,
        task_id: Uuid,
        project_ids: &[Uuid],
    ) -> Result<u64, sqlx::Error> {
        if project_ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            "UPDATE projects
             SET tasks = array_remove(tasks, $1), updated_at = NOW()
             WHERE id = ANY($2) AND $1 = ANY(tasks)",
        )
        .bind(task_id)
        .bind(project_ids)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }
}
