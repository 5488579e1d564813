/// Reference expansion for read endpoints
///
/// Documents store references as ids. These helpers fetch the referenced
/// documents in one batch per collection and return view structs carrying the
/// full objects. Reference order is preserved; ids that no longer resolve are
/// dropped.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::dedup_ids;
use crate::models::person::Person;
use crate::models::profile::Profile;
use crate::models::project::Project;
use crate::models::task::Task;
use crate::store::{PersonStore, ProfileStore, ProjectStore, StoreResult, TaskStore};

fn index<T>(items: Vec<T>, id_of: impl Fn(&T) -> Uuid) -> HashMap<Uuid, T> {
    items.into_iter().map(|item| (id_of(&item), item)).collect()
}

fn collect_ids<'a>(ids: impl Iterator<Item = &'a Uuid>) -> Vec<Uuid> {
    dedup_ids(&ids.copied().collect::<Vec<_>>())
}

/// Person with its profile expanded
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonView {
    pub id: Uuid,
    pub name: String,
    pub age: i32,
    pub profile: Option<Profile>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile with its person expanded
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub id: Uuid,
    pub occupation: String,
    pub phone: String,
    pub address: String,
    pub person: Option<Person>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Project with its tasks expanded
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectView {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub tasks: Vec<Task>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonSummary {
    pub id: Uuid,
    pub name: String,
    pub age: i32,
}

impl From<Person> for PersonSummary {
    fn from(p: Person) -> Self {
        Self {
            id: p.id,
            name: p.name,
            age: p.age,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectSummary {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

impl From<Project> for ProjectSummary {
    fn from(p: Project) -> Self {
        Self {
            id: p.id,
            name: p.name,
            description: p.description,
        }
    }
}

/// Task with person and projects expanded
///
/// Public listings use the summary shapes; admin listings use the full
/// documents (`TaskView<Person, Project>`).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView<P = PersonSummary, J = ProjectSummary> {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub finished: bool,
    pub person: Option<P>,
    pub projects: Vec<J>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Admin view with full documents
pub type TaskDetail = TaskView<Person, Project>;

pub async fn persons<S>(store: &S, persons: Vec<Person>) -> StoreResult<Vec<PersonView>>
where
    S: ProfileStore + ?Sized,
{
    let ids = collect_ids(persons.iter().filter_map(|p| p.profile_id.as_ref()));
    let profiles = index(store.find_profiles_by_ids(&ids).await?, |p| p.id);

    Ok(persons
        .into_iter()
        .map(|p| PersonView {
            profile: p.profile_id.and_then(|id| profiles.get(&id).cloned()),
            id: p.id,
            name: p.name,
            age: p.age,
            created_at: p.created_at,
            updated_at: p.updated_at,
        })
        .collect())
}

pub async fn profiles<S>(store: &S, profiles: Vec<Profile>) -> StoreResult<Vec<ProfileView>>
where
    S: PersonStore + ?Sized,
{
    let ids = collect_ids(profiles.iter().filter_map(|p| p.person_id.as_ref()));
    let persons = index(store.find_persons_by_ids(&ids).await?, |p| p.id);

    Ok(profiles
        .into_iter()
        .map(|p| ProfileView {
            person: p.person_id.and_then(|id| persons.get(&id).cloned()),
            id: p.id,
            occupation: p.occupation,
            phone: p.phone,
            address: p.address,
            created_at: p.created_at,
            updated_at: p.updated_at,
        })
        .collect())
}

pub async fn projects<S>(store: &S, projects: Vec<Project>) -> StoreResult<Vec<ProjectView>>
where
    S: TaskStore + ?Sized,
{
    let ids = collect_ids(projects.iter().flat_map(|p| p.tasks.iter()));
    let tasks = index(store.find_tasks_by_ids(&ids).await?, |t| t.id);

    Ok(projects
        .into_iter()
        .map(|p| ProjectView {
            tasks: p.tasks.iter().filter_map(|id| tasks.get(id).cloned()).collect(),
            id: p.id,
            name: p.name,
            description: p.description,
            start_date: p.start_date,
            end_date: p.end_date,
            created_at: p.created_at,
            updated_at: p.updated_at,
        })
        .collect())
}

async fn expand_tasks<S, P, J>(store: &S, tasks: Vec<Task>) -> StoreResult<Vec<TaskView<P, J>>>
where
    S: PersonStore + ProjectStore + ?Sized,
    P: From<Person> + Clone,
    J: From<Project> + Clone,
{
    let person_ids = collect_ids(tasks.iter().filter_map(|t| t.person_id.as_ref()));
    let project_ids = collect_ids(tasks.iter().flat_map(|t| t.projects.iter()));

    let persons: HashMap<Uuid, P> = store
        .find_persons_by_ids(&person_ids)
        .await?
        .into_iter()
        .map(|p| (p.id, P::from(p)))
        .collect();
    let projects: HashMap<Uuid, J> = store
        .find_projects_by_ids(&project_ids)
        .await?
        .into_iter()
        .map(|p| (p.id, J::from(p)))
        .collect();

    Ok(tasks
        .into_iter()
        .map(|t| TaskView {
            person: t.person_id.and_then(|id| persons.get(&id).cloned()),
            projects: t
                .projects
                .iter()
                .filter_map(|id| projects.get(id).cloned())
                .collect(),
            id: t.id,
            title: t.title,
            description: t.description,
            finished: t.finished,
            created_at: t.created_at,
            updated_at: t.updated_at,
        })
        .collect())
}

/// Expands tasks to person and project summaries
pub async fn tasks<S>(store: &S, tasks: Vec<Task>) -> StoreResult<Vec<TaskView>>
where
    S: PersonStore + ProjectStore + ?Sized,
{
    expand_tasks(store, tasks).await
}

/// Expands tasks to full person and project documents
pub async fn task_details<S>(store: &S, tasks: Vec<Task>) -> StoreResult<Vec<TaskDetail>>
where
    S: PersonStore + ProjectStore + ?Sized,
{
    expand_tasks(store, tasks).await
}
