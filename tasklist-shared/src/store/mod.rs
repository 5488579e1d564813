/// Persistence interface
///
/// Handlers and the relationship logic talk to storage only through the
/// [`Store`] trait object. Two backends implement it:
///
/// - [`postgres::PgStore`]: PostgreSQL through a sqlx pool, reference arrays
///   stored as `UUID[]` columns
/// - [`memory::MemoryStore`]: in-process collections, used by tests and by
///   `memory://` connection strings
///
/// Each collection has its own trait so callers can ask for only what they
/// need (`S: TaskStore + ProjectStore`). [`Store`] bundles them all plus the
/// connection lifecycle.
///
/// # Example
///
/// ```no_run
/// use tasklist_shared::store::open_store;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = open_store("memory://", 10).await?;
/// store.ping().await?;
/// let persons = store.list_persons().await?;
/// assert!(persons.is_empty());
/// store.close().await;
/// # Ok(())
/// # }
/// ```

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::person::{CreatePerson, Person, UpdatePerson};
use crate::models::profile::{CreateProfile, Profile, UpdateProfile};
use crate::models::project::{CreateProject, Project, ProjectPatch};
use crate::models::task::{CreateTask, Page, Task, TaskFilter, TaskPatch};
use crate::models::user::{CreateUser, User};

pub use memory::{FailPoint, MemoryStore};
pub use postgres::PgStore;

/// Storage failure
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique field already holds this value (`username` or `email`)
    #[error("Duplicate value for {0}")]
    Duplicate(&'static str),

    /// Database driver error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failure while opening the store
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Backend cannot serve the request
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Connection string names no known backend
    #[error("Unsupported database URL scheme: {0}")]
    UnsupportedUrl(String),
}

impl StoreError {
    /// Maps unique-constraint violations on `users` to [`StoreError::Duplicate`]
    pub(crate) fn from_insert(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.constraint() {
                Some("users_username_key") => return StoreError::Duplicate("username"),
                Some("users_email_key") => return StoreError::Duplicate("email"),
                _ => {}
            }
        }
        StoreError::Database(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(&self, data: CreateUser) -> StoreResult<User>;

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Finds a user holding either the email or the username
    async fn find_user_by_login(&self, email: &str, username: &str) -> StoreResult<Option<User>>;
}

#[async_trait]
pub trait PersonStore: Send + Sync {
    async fn insert_person(&self, data: CreatePerson) -> StoreResult<Person>;

    /// All persons in insertion order
    async fn list_persons(&self) -> StoreResult<Vec<Person>>;

    async fn find_person(&self, id: Uuid) -> StoreResult<Option<Person>>;

    async fn find_persons_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Person>>;

    async fn update_person(&self, id: Uuid, data: UpdatePerson) -> StoreResult<Option<Person>>;

    /// Sets or clears a person's profile pointer; false if the person is absent
    async fn set_person_profile(&self, id: Uuid, profile_id: Option<Uuid>) -> StoreResult<bool>;

    /// Deletes a person and clears `person_id` on its profile and tasks
    async fn delete_person(&self, id: Uuid) -> StoreResult<Option<Person>>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn insert_profile(&self, data: CreateProfile) -> StoreResult<Profile>;

    async fn list_profiles(&self) -> StoreResult<Vec<Profile>>;

    async fn find_profile(&self, id: Uuid) -> StoreResult<Option<Profile>>;

    async fn find_profiles_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Profile>>;

    async fn update_profile(&self, id: Uuid, data: UpdateProfile) -> StoreResult<Option<Profile>>;

    /// Clears `profile_id` on every person pointing at `profile_id`, except `keep`
    async fn clear_profile_links(&self, profile_id: Uuid, keep: Option<Uuid>) -> StoreResult<u64>;

    /// Clears `person_id` on every profile owned by `person_id`, except `keep`
    async fn release_person(&self, person_id: Uuid, keep: Uuid) -> StoreResult<u64>;

    /// Deletes a profile and clears the owning person's pointer
    async fn delete_profile(&self, id: Uuid) -> StoreResult<Option<Profile>>;
}

#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn insert_project(&self, data: CreateProject) -> StoreResult<Project>;

    async fn list_projects(&self) -> StoreResult<Vec<Project>>;

    async fn find_project(&self, id: Uuid) -> StoreResult<Option<Project>>;

    async fn find_projects_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Project>>;

    async fn update_project(&self, id: Uuid, patch: ProjectPatch) -> StoreResult<Option<Project>>;

    async fn delete_project(&self, id: Uuid) -> StoreResult<Option<Project>>;

    /// Adds `task_id` to each listed project's task list (add-to-set)
    async fn add_task_to_projects(&self, task_id: Uuid, project_ids: &[Uuid]) -> StoreResult<u64>;

    /// Pulls `task_id` from each listed project's task list
    async fn remove_task_from_projects(
        &self,
        task_id: Uuid,
        project_ids: &[Uuid],
    ) -> StoreResult<u64>;
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn insert_task(&self, data: CreateTask) -> StoreResult<Task>;

    /// Tasks matching `filter`, newest first, optionally windowed by `page`
    async fn list_tasks(&self, filter: TaskFilter, page: Option<Page>) -> StoreResult<Vec<Task>>;

    async fn count_tasks(&self, filter: TaskFilter) -> StoreResult<i64>;

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>>;

    async fn find_tasks_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Task>>;

    async fn update_task(&self, id: Uuid, patch: TaskPatch) -> StoreResult<Option<Task>>;

    async fn delete_task(&self, id: Uuid) -> StoreResult<Option<Task>>;

    /// Adds `project_id` to each listed task's project set (add-to-set)
    async fn add_project_to_tasks(&self, project_id: Uuid, task_ids: &[Uuid]) -> StoreResult<u64>;

    /// Pulls `project_id` from each listed task's project set
    async fn remove_project_from_tasks(
        &self,
        project_id: Uuid,
        task_ids: &[Uuid],
    ) -> StoreResult<u64>;
}

/// Complete persistence interface
#[async_trait]
pub trait Store: UserStore + PersonStore + ProfileStore + ProjectStore + TaskStore {
    /// Backend name for logs and health output
    fn backend(&self) -> &'static str;

    /// Verifies the backend is reachable
    async fn ping(&self) -> StoreResult<()>;

    /// Releases connections; called once at shutdown
    async fn close(&self);
}

/// Opens the backend named by a connection string
///
/// `postgres://` and `postgresql://` URLs open a pooled [`PgStore`] and apply
/// migrations. `memory://` opens an empty [`MemoryStore`].
pub async fn open_store(url: &str, max_connections: u32) -> StoreResult<Arc<dyn Store>> {
    if url.starts_with("memory://") {
        tracing::info!("Using in-memory store");
        return Ok(Arc::new(MemoryStore::new()));
    }

    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        let store = PgStore::connect(url, max_connections).await?;
        return Ok(Arc::new(store));
    }

    let scheme = url.split("://").next().unwrap_or(url).to_string();
    Err(StoreError::UnsupportedUrl(scheme))
}
