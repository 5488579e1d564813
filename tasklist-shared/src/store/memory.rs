/// In-memory backend
///
/// Collections are vectors in insertion order behind one `RwLock`. The
/// foreign-key side effects of the PostgreSQL schema (`ON DELETE SET NULL`,
/// unique usernames and emails) are reproduced by hand.
///
/// [`MemoryStore::fail_next`] arms a one-shot failure on a chosen operation so
/// tests can observe what happens when a multi-step update stops halfway.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{
    PersonStore, ProfileStore, ProjectStore, Store, StoreError, StoreResult, TaskStore, UserStore,
};
use crate::models::person::{CreatePerson, Person, UpdatePerson};
use crate::models::profile::{CreateProfile, Profile, UpdateProfile};
use crate::models::project::{CreateProject, Project, ProjectPatch};
use crate::models::task::{CreateTask, Page, Task, TaskFilter, TaskPatch};
use crate::models::user::{CreateUser, User};

/// Operation that can be made to fail once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    FindUser,
    InsertTask,
    UpdateTask,
    DeleteTask,
    InsertProject,
    UpdateProject,
    DeleteProject,
    AddTaskToProjects,
    RemoveTaskFromProjects,
    AddProjectToTasks,
    RemoveProjectFromTasks,
    SetPersonProfile,
}

#[derive(Debug, Default)]
struct Collections {
    users: Vec<User>,
    persons: Vec<Person>,
    profiles: Vec<Profile>,
    projects: Vec<Project>,
    tasks: Vec<Task>,
}

/// Store holding every document in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<Collections>,
    armed: Mutex<Option<FailPoint>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next call of `point` fail with [`StoreError::Unavailable`]
    pub fn fail_next(&self, point: FailPoint) {
        *self.armed.lock().unwrap_or_else(|e| e.into_inner()) = Some(point);
    }

    fn trip(&self, point: FailPoint) -> StoreResult<()> {
        let mut armed = self.armed.lock().unwrap_or_else(|e| e.into_inner());
        if *armed == Some(point) {
            *armed = None;
            debug!(?point, "Injected store failure");
            return Err(StoreError::Unavailable(format!("injected failure at {:?}", point)));
        }
        Ok(())
    }
}

fn pick<T: Clone>(items: &[T], ids: &[Uuid], id_of: impl Fn(&T) -> Uuid) -> Vec<T> {
    items
        .iter()
        .filter(|item| ids.contains(&id_of(item)))
        .cloned()
        .collect()
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, data: CreateUser) -> StoreResult<User> {
        let mut db = self.data.write().await;

        if db.users.iter().any(|u| u.username == data.username) {
            return Err(StoreError::Duplicate("username"));
        }
        if db.users.iter().any(|u| u.email == data.email) {
            return Err(StoreError::Duplicate("email"));
        }

        let user = User::new(data);
        db.users.push(user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        self.trip(FailPoint::FindUser)?;
        let db = self.data.read().await;
        Ok(db.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let db = self.data.read().await;
        Ok(db.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_login(&self, email: &str, username: &str) -> StoreResult<Option<User>> {
        let db = self.data.read().await;
        Ok(db
            .users
            .iter()
            .find(|u| u.email == email || u.username == username)
            .cloned())
    }
}

#[async_trait]
impl PersonStore for MemoryStore {
    async fn insert_person(&self, data: CreatePerson) -> StoreResult<Person> {
        let person = Person::new(data);
        self.data.write().await.persons.push(person.clone());
        Ok(person)
    }

    async fn list_persons(&self) -> StoreResult<Vec<Person>> {
        Ok(self.data.read().await.persons.clone())
    }

    async fn find_person(&self, id: Uuid) -> StoreResult<Option<Person>> {
        let db = self.data.read().await;
        Ok(db.persons.iter().find(|p| p.id == id).cloned())
    }

    async fn find_persons_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Person>> {
        Ok(pick(&self.data.read().await.persons, ids, |p| p.id))
    }

    async fn update_person(&self, id: Uuid, data: UpdatePerson) -> StoreResult<Option<Person>> {
        let mut db = self.data.write().await;
        Ok(db.persons.iter_mut().find(|p| p.id == id).map(|person| {
            person.name = data.name;
            person.age = data.age;
            person.updated_at = Utc::now();
            person.clone()
        }))
    }

    async fn set_person_profile(&self, id: Uuid, profile_id: Option<Uuid>) -> StoreResult<bool> {
        self.trip(FailPoint::SetPersonProfile)?;
        let mut db = self.data.write().await;
        match db.persons.iter_mut().find(|p| p.id == id) {
            Some(person) => {
                person.profile_id = profile_id;
                person.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_person(&self, id: Uuid) -> StoreResult<Option<Person>> {
        let mut db = self.data.write().await;
        let Some(index) = db.persons.iter().position(|p| p.id == id) else {
            return Ok(None);
        };
        let person = db.persons.remove(index);

        for profile in db.profiles.iter_mut().filter(|p| p.person_id == Some(id)) {
            profile.person_id = None;
        }
        for task in db.tasks.iter_mut().filter(|t| t.person_id == Some(id)) {
            task.person_id = None;
        }

        Ok(Some(person))
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn insert_profile(&self, data: CreateProfile) -> StoreResult<Profile> {
        let profile = Profile::new(data);
        self.data.write().await.profiles.push(profile.clone());
        Ok(profile)
    }

    async fn list_profiles(&self) -> StoreResult<Vec<Profile>> {
        Ok(self.data.read().await.profiles.clone())
    }

    async fn find_profile(&self, id: Uuid) -> StoreResult<Option<Profile>> {
        let db = self.data.read().await;
        Ok(db.profiles.iter().find(|p| p.id == id).cloned())
    }

    async fn find_profiles_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Profile>> {
        Ok(pick(&self.data.read().await.profiles, ids, |p| p.id))
    }

    async fn update_profile(&self, id: Uuid, data: UpdateProfile) -> StoreResult<Option<Profile>> {
        let mut db = self.data.write().await;
        Ok(db.profiles.iter_mut().find(|p| p.id == id).map(|profile| {
            profile.occupation = data.occupation;
            profile.phone = data.phone;
            profile.address = data.address;
            profile.person_id = Some(data.person_id);
            profile.updated_at = Utc::now();
            profile.clone()
        }))
    }

    async fn clear_profile_links(&self, profile_id: Uuid, keep: Option<Uuid>) -> StoreResult<u64> {
        let mut db = self.data.write().await;
        let mut changed = 0;
        for person in db
            .persons
            .iter_mut()
            .filter(|p| p.profile_id == Some(profile_id) && Some(p.id) != keep)
        {
            person.profile_id = None;
            person.updated_at = Utc::now();
            changed += 1;
        }
        Ok(changed)
    }

    async fn release_person(&self, person_id: Uuid, keep: Uuid) -> StoreResult<u64> {
        let mut db = self.data.write().await;
        let mut changed = 0;
        for profile in db
            .profiles
            .iter_mut()
            .filter(|p| p.person_id == Some(person_id) && p.id != keep)
        {
            profile.person_id = None;
            profile.updated_at = Utc::now();
            changed += 1;
        }
        Ok(changed)
    }

    async fn delete_profile(&self, id: Uuid) -> StoreResult<Option<Profile>> {
        let mut db = self.data.write().await;
        let Some(index) = db.profiles.iter().position(|p| p.id == id) else {
            return Ok(None);
        };
        let profile = db.profiles.remove(index);

        for person in db.persons.iter_mut().filter(|p| p.profile_id == Some(id)) {
            person.profile_id = None;
        }

        Ok(Some(profile))
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn insert_project(&self, data: CreateProject) -> StoreResult<Project> {
        self.trip(FailPoint::InsertProject)?;
        let project = Project::new(data);
        self.data.write().await.projects.push(project.clone());
        Ok(project)
    }

    async fn list_projects(&self) -> StoreResult<Vec<Project>> {
        Ok(self.data.read().await.projects.clone())
    }

    async fn find_project(&self, id: Uuid) -> StoreResult<Option<Project>> {
        let db = self.data.read().await;
        Ok(db.projects.iter().find(|p| p.id == id).cloned())
    }

    async fn find_projects_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Project>> {
        Ok(pick(&self.data.read().await.projects, ids, |p| p.id))
    }

    async fn update_project(&self, id: Uuid, patch: ProjectPatch) -> StoreResult<Option<Project>> {
        self.trip(FailPoint::UpdateProject)?;
        let mut db = self.data.write().await;
        Ok(db.projects.iter_mut().find(|p| p.id == id).map(|project| {
            project.apply(patch);
            project.clone()
        }))
    }

    async fn delete_project(&self, id: Uuid) -> StoreResult<Option<Project>> {
        self.trip(FailPoint::DeleteProject)?;
        let mut db = self.data.write().await;
        Ok(db
            .projects
            .iter()
            .position(|p| p.id == id)
            .map(|index| db.projects.remove(index)))
    }

    async fn add_task_to_projects(&self, task_id: Uuid, project_ids: &[Uuid]) -> StoreResult<u64> {
        self.trip(FailPoint::AddTaskToProjects)?;
        let mut db = self.data.write().await;
        let mut changed = 0;
        for project in db.projects.iter_mut().filter(|p| project_ids.contains(&p.id)) {
            if project.link_task(task_id) {
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn remove_task_from_projects(
        &self,
        task_id: Uuid,
        project_ids: &[Uuid],
    ) -> StoreResult<u64> {
        self.trip(FailPoint::RemoveTaskFromProjects)?;
        let mut db = self.data.write().await;
        let mut changed = 0;
        for project in db.projects.iter_mut().filter(|p| project_ids.contains(&p.id)) {
            if project.unlink_task(task_id) {
                changed += 1;
            }
        }
        Ok(changed)
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn insert_task(&self, data: CreateTask) -> StoreResult<Task> {
        self.trip(FailPoint::InsertTask)?;
        let task = Task::new(data);
        self.data.write().await.tasks.push(task.clone());
        Ok(task)
    }

    async fn list_tasks(&self, filter: TaskFilter, page: Option<Page>) -> StoreResult<Vec<Task>> {
        let db = self.data.read().await;
        // Insertion order stands in for creation time
        let matching = db.tasks.iter().rev().filter(|t| filter.matches(t));

        Ok(match page {
            Some(page) => matching
                .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
                .take(usize::try_from(page.size).unwrap_or(0))
                .cloned()
                .collect(),
            None => matching.cloned().collect(),
        })
    }

    async fn count_tasks(&self, filter: TaskFilter) -> StoreResult<i64> {
        let db = self.data.read().await;
        Ok(db.tasks.iter().filter(|t| filter.matches(t)).count() as i64)
    }

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        let db = self.data.read().await;
        Ok(db.tasks.iter().find(|t| t.id == id).cloned())
    }

    async fn find_tasks_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Task>> {
        Ok(pick(&self.data.read().await.tasks, ids, |t| t.id))
    }

    async fn update_task(&self, id: Uuid, patch: TaskPatch) -> StoreResult<Option<Task>> {
        self.trip(FailPoint::UpdateTask)?;
        let mut db = self.data.write().await;
        Ok(db.tasks.iter_mut().find(|t| t.id == id).map(|task| {
            task.apply(patch);
            task.clone()
        }))
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        self.trip(FailPoint::DeleteTask)?;
        let mut db = self.data.write().await;
        Ok(db
            .tasks
            .iter()
            .position(|t| t.id == id)
            .map(|index| db.tasks.remove(index)))
    }

    async fn add_project_to_tasks(&self, project_id: Uuid, task_ids: &[Uuid]) -> StoreResult<u64> {
        self.trip(FailPoint::AddProjectToTasks)?;
        let mut db = self.data.write().await;
        let mut changed = 0;
        for task in db.tasks.iter_mut().filter(|t| task_ids.contains(&t.id)) {
            if task.link_project(project_id) {
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn remove_project_from_tasks(
        &self,
        project_id: Uuid,
        task_ids: &[Uuid],
    ) -> StoreResult<u64> {
        self.trip(FailPoint::RemoveProjectFromTasks)?;
        let mut db = self.data.write().await;
        let mut changed = 0;
        for task in db.tasks.iter_mut().filter(|t| task_ids.contains(&t.id)) {
            if task.unlink_project(project_id) {
                changed += 1;
            }
        }
        Ok(changed)
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn close(&self) {
        debug!("In-memory store closed");
    }
}
