/// PostgreSQL backend
///
/// Every operation delegates to the model methods. Back-reference arrays use
/// `array_append`/`array_remove` updates guarded so they behave as
/// add-to-set and pull.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    PersonStore, ProfileStore, ProjectStore, Store, StoreError, StoreResult, TaskStore, UserStore,
};
use crate::db::migrations::run_migrations;
use crate::db::pool::{close_pool, create_pool, health_check, DatabaseConfig};
use crate::models::person::{CreatePerson, Person, UpdatePerson};
use crate::models::profile::{CreateProfile, Profile, UpdateProfile};
use crate::models::project::{CreateProject, Project, ProjectPatch};
use crate::models::task::{CreateTask, Page, Task, TaskFilter, TaskPatch};
use crate::models::user::{CreateUser, User};

/// Store backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connects, checks health, and applies pending migrations
    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = create_pool(DatabaseConfig {
            url: url.to_string(),
            max_connections,
            ..Default::default()
        })
        .await?;

        run_migrations(&pool).await?;

        Ok(Self { pool })
    }

    /// Wraps an existing pool without running migrations
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, data: CreateUser) -> StoreResult<User> {
        User::create(&self.pool, data)
            .await
            .map_err(StoreError::from_insert)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn find_user_by_login(&self, email: &str, username: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_login(&self.pool, email, username).await?)
    }
}

#[async_trait]
impl PersonStore for PgStore {
    async fn insert_person(&self, data: CreatePerson) -> StoreResult<Person> {
        Ok(Person::create(&self.pool, data).await?)
    }

    async fn list_persons(&self) -> StoreResult<Vec<Person>> {
        Ok(Person::list(&self.pool).await?)
    }

    async fn find_person(&self, id: Uuid) -> StoreResult<Option<Person>> {
        Ok(Person::find_by_id(&self.pool, id).await?)
    }

    async fn find_persons_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Person>> {
        Ok(Person::find_by_ids(&self.pool, ids).await?)
    }

    async fn update_person(&self, id: Uuid, data: UpdatePerson) -> StoreResult<Option<Person>> {
        Ok(Person::update(&self.pool, id, data).await?)
    }

    async fn set_person_profile(&self, id: Uuid, profile_id: Option<Uuid>) -> StoreResult<bool> {
        Ok(Person::set_profile(&self.pool, id, profile_id).await?)
    }

    async fn delete_person(&self, id: Uuid) -> StoreResult<Option<Person>> {
        // profiles.person_id and tasks.person_id are ON DELETE SET NULL
        Ok(Person::delete(&self.pool, id).await?)
    }
}

#[async_trait]
impl ProfileStore for PgStore {
    async fn insert_profile(&self, data: CreateProfile) -> StoreResult<Profile> {
        Ok(Profile::create(&self.pool, data).await?)
    }

    async fn list_profiles(&self) -> StoreResult<Vec<Profile>> {
        Ok(Profile::list(&self.pool).await?)
    }

    async fn find_profile(&self, id: Uuid) -> StoreResult<Option<Profile>> {
        Ok(Profile::find_by_id(&self.pool, id).await?)
    }

    async fn find_profiles_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Profile>> {
        Ok(Profile::find_by_ids(&self.pool, ids).await?)
    }

    async fn update_profile(&self, id: Uuid, data: UpdateProfile) -> StoreResult<Option<Profile>> {
        Ok(Profile::update(&self.pool, id, data).await?)
    }

    async fn clear_profile_links(&self, profile_id: Uuid, keep: Option<Uuid>) -> StoreResult<u64> {
        Ok(Person::clear_profile(&self.pool, profile_id, keep).await?)
    }

    async fn release_person(&self, person_id: Uuid, keep: Uuid) -> StoreResult<u64> {
        Ok(Profile::release_person(&self.pool, person_id, keep).await?)
    }

    async fn delete_profile(&self, id: Uuid) -> StoreResult<Option<Profile>> {
        Ok(Profile::delete(&self.pool, id).await?)
    }
}

#[async_trait]
impl ProjectStore for PgStore {
    async fn insert_project(&self, data: CreateProject) -> StoreResult<Project> {
        Ok(Project::create(&self.pool, data).await?)
    }

    async fn list_projects(&self) -> StoreResult<Vec<Project>> {
        Ok(Project::list(&self.pool).await?)
    }

    async fn find_project(&self, id: Uuid) -> StoreResult<Option<Project>> {
        Ok(Project::find_by_id(&self.pool, id).await?)
    }

    async fn find_projects_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Project>> {
        Ok(Project::find_by_ids(&self.pool, ids).await?)
    }

    async fn update_project(&self, id: Uuid, patch: ProjectPatch) -> StoreResult<Option<Project>> {
        Ok(Project::update(&self.pool, id, patch).await?)
    }

    async fn delete_project(&self, id: Uuid) -> StoreResult<Option<Project>> {
        Ok(Project::delete(&self.pool, id).await?)
    }

    async fn add_task_to_projects(&self, task_id: Uuid, project_ids: &[Uuid]) -> StoreResult<u64> {
        Ok(Project::add_task(&self.pool, task_id, project_ids).await?)
    }

    async fn remove_task_from_projects(
        &self,
        task_id: Uuid,
        project_ids: &[Uuid],
    ) -> StoreResult<u64> {
        Ok(Project::remove_task(&self.pool, task_id, project_ids).await?)
    }
}

#[async_trait]
impl TaskStore for PgStore {
    async fn insert_task(&self, data: CreateTask) -> StoreResult<Task> {
        Ok(Task::create(&self.pool, data).await?)
    }

    async fn list_tasks(&self, filter: TaskFilter, page: Option<Page>) -> StoreResult<Vec<Task>> {
        Ok(Task::list(&self.pool, filter, page).await?)
    }

    async fn count_tasks(&self, filter: TaskFilter) -> StoreResult<i64> {
        Ok(Task::count(&self.pool, filter).await?)
    }

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        Ok(Task::find_by_id(&self.pool, id).await?)
    }

    async fn find_tasks_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Task>> {
        Ok(Task::find_by_ids(&self.pool, ids).await?)
    }

    async fn update_task(&self, id: Uuid, patch: TaskPatch) -> StoreResult<Option<Task>> {
        Ok(Task::update(&self.pool, id, patch).await?)
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        Ok(Task::delete(&self.pool, id).await?)
    }

    async fn add_project_to_tasks(&self, project_id: Uuid, task_ids: &[Uuid]) -> StoreResult<u64> {
        Ok(Task::add_project(&self.pool, project_id, task_ids).await?)
    }

    async fn remove_project_from_tasks(
        &self,
        project_id: Uuid,
        task_ids: &[Uuid],
    ) -> StoreResult<u64> {
        Ok(Task::remove_project(&self.pool, project_id, task_ids).await?)
    }
}

#[async_trait]
impl Store for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(health_check(&self.pool).await?)
    }

    async fn close(&self) {
        close_pool(&self.pool).await;
    }
}
