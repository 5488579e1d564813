/// Back-reference maintenance
///
/// Projects list their tasks and tasks list their projects. Both sides are
/// stored, so every write touching one side must update the other. The same
/// holds for a person's `profile_id` and a profile's `person_id`.
///
/// Each step is a separate store call. There is no transaction: if a step
/// fails, the error is returned and earlier steps stay applied. [`check_links`]
/// finds the one-sided references such a failure leaves behind.
///
/// All input is validated before the first write, so a rejected request
/// changes nothing.
///
/// # Example
///
/// ```no_run
/// use tasklist_shared::models::task::CreateTask;
/// use tasklist_shared::relations::{check_links, create_task};
/// use tasklist_shared::store::MemoryStore;
/// use uuid::Uuid;
///
/// # async fn example(project_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// let task = create_task(&store, CreateTask {
///     title: "Write docs".to_string(),
///     projects: vec![project_id],
///     ..Default::default()
/// }).await?;
///
/// assert!(check_links(&store).await?.is_empty());
/// # Ok(())
/// # }
/// ```

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::dedup_ids;
use crate::models::profile::{CreateProfile, Profile, UpdateProfile};
use crate::models::project::{CreateProject, Project, ProjectPatch};
use crate::models::task::{CreateTask, Task, TaskFilter, TaskPatch};
use crate::store::{PersonStore, ProfileStore, ProjectStore, StoreError, TaskStore};

#[derive(Debug, Error)]
pub enum RelationError {
    #[error("Task not found")]
    TaskNotFound,

    #[error("Project not found")]
    ProjectNotFound,

    #[error("Person not found")]
    PersonNotFound,

    #[error("Profile not found")]
    ProfileNotFound,

    /// Referenced projects that do not exist
    #[error("Projects not found: {0:?}")]
    MissingProjects(Vec<Uuid>),

    /// Referenced tasks that do not exist
    #[error("Tasks not found: {0:?}")]
    MissingTasks(Vec<Uuid>),

    #[error("End date must not be before start date")]
    EndBeforeStart,

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type RelationResult<T> = Result<T, RelationError>;

/// Outcome of detaching a task from one project
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detached {
    /// True when the task belonged to no other project and was deleted
    pub deleted: bool,
}

/// A one-sided reference between a project and a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum LinkIssue {
    /// The project lists the task, but the task does not list the project
    TaskMissingProject { task_id: Uuid, project_id: Uuid },

    /// The task lists the project, but the project does not list the task
    ProjectMissingTask { project_id: Uuid, task_id: Uuid },

    /// The project lists a task that does not exist
    DanglingTask { project_id: Uuid, task_id: Uuid },

    /// The task lists a project that does not exist
    DanglingProject { task_id: Uuid, project_id: Uuid },
}

fn missing(requested: &[Uuid], found: impl IntoIterator<Item = Uuid>) -> Vec<Uuid> {
    let found: HashSet<Uuid> = found.into_iter().collect();
    requested
        .iter()
        .filter(|id| !found.contains(id))
        .copied()
        .collect()
}

async fn ensure_projects<S>(store: &S, ids: &[Uuid]) -> RelationResult<()>
where
    S: ProjectStore + ?Sized,
{
    let found = store.find_projects_by_ids(ids).await?;
    let absent = missing(ids, found.iter().map(|p| p.id));
    if absent.is_empty() {
        Ok(())
    } else {
        Err(RelationError::MissingProjects(absent))
    }
}

async fn ensure_tasks<S>(store: &S, ids: &[Uuid]) -> RelationResult<()>
where
    S: TaskStore + ?Sized,
{
    let found = store.find_tasks_by_ids(ids).await?;
    let absent = missing(ids, found.iter().map(|t| t.id));
    if absent.is_empty() {
        Ok(())
    } else {
        Err(RelationError::MissingTasks(absent))
    }
}

async fn ensure_person<S>(store: &S, id: Uuid) -> RelationResult<()>
where
    S: PersonStore + ?Sized,
{
    match store.find_person(id).await? {
        Some(_) => Ok(()),
        None => Err(RelationError::PersonNotFound),
    }
}

/// Creates a task and adds it to each of its projects
pub async fn create_task<S>(store: &S, mut data: CreateTask) -> RelationResult<Task>
where
    S: TaskStore + ProjectStore + PersonStore + ?Sized,
{
    data.projects = dedup_ids(&data.projects);

    if let Some(person_id) = data.person_id {
        ensure_person(store, person_id).await?;
    }
    ensure_projects(store, &data.projects).await?;

    let task = store.insert_task(data).await?;
    store.add_task_to_projects(task.id, &task.projects).await?;

    debug!(task_id = %task.id, projects = task.projects.len(), "Task created");
    Ok(task)
}

/// Creates a task inside one project
pub async fn create_task_in_project<S>(
    store: &S,
    project_id: Uuid,
    mut data: CreateTask,
) -> RelationResult<Task>
where
    S: TaskStore + ProjectStore + PersonStore + ?Sized,
{
    if store.find_project(project_id).await?.is_none() {
        return Err(RelationError::ProjectNotFound);
    }

    data.projects = vec![project_id];
    create_task(store, data).await
}

/// Applies a patch to a task and moves its project links
///
/// The task is removed from every project it currently belongs to and then
/// added to every project of its new set. Without `patch.projects` the new set
/// is the current one. `Some(vec![])` detaches the task from all projects.
pub async fn edit_task<S>(store: &S, id: Uuid, mut patch: TaskPatch) -> RelationResult<Task>
where
    S: TaskStore + ProjectStore + PersonStore + ?Sized,
{
    let current = store
        .find_task(id)
        .await?
        .ok_or(RelationError::TaskNotFound)?;

    if let Some(person_id) = patch.person_id {
        ensure_person(store, person_id).await?;
    }
    if let Some(projects) = patch.projects.as_mut() {
        let deduped = dedup_ids(projects);
        *projects = deduped;
        ensure_projects(store, projects).await?;
    }

    let target = patch
        .projects
        .clone()
        .unwrap_or_else(|| current.projects.clone());

    store.remove_task_from_projects(id, &current.projects).await?;

    let task = store
        .update_task(id, patch)
        .await?
        .ok_or(RelationError::TaskNotFound)?;

    store.add_task_to_projects(id, &target).await?;

    debug!(task_id = %id, projects = target.len(), "Task updated");
    Ok(task)
}

/// Removes a task from its projects, then deletes it
pub async fn delete_task<S>(store: &S, id: Uuid) -> RelationResult<Task>
where
    S: TaskStore + ProjectStore + ?Sized,
{
    let task = store
        .find_task(id)
        .await?
        .ok_or(RelationError::TaskNotFound)?;

    store.remove_task_from_projects(id, &task.projects).await?;

    let deleted = store
        .delete_task(id)
        .await?
        .ok_or(RelationError::TaskNotFound)?;

    debug!(task_id = %id, "Task deleted");
    Ok(deleted)
}

/// Sets a task's `finished` flag, or flips it when `finished` is `None`
///
/// Fails with [`RelationError::TaskNotFound`] unless the project lists the task.
pub async fn set_task_finished<S>(
    store: &S,
    project_id: Uuid,
    task_id: Uuid,
    finished: Option<bool>,
) -> RelationResult<Task>
where
    S: TaskStore + ProjectStore + ?Sized,
{
    let project = store
        .find_project(project_id)
        .await?
        .ok_or(RelationError::ProjectNotFound)?;
    if !project.tasks.contains(&task_id) {
        return Err(RelationError::TaskNotFound);
    }

    let task = store
        .find_task(task_id)
        .await?
        .ok_or(RelationError::TaskNotFound)?;

    let patch = TaskPatch {
        finished: Some(finished.unwrap_or(!task.finished)),
        ..Default::default()
    };

    store
        .update_task(task_id, patch)
        .await?
        .ok_or(RelationError::TaskNotFound)
}

/// Detaches a task from one project, deleting it when no project is left
pub async fn detach_task_from_project<S>(
    store: &S,
    project_id: Uuid,
    task_id: Uuid,
) -> RelationResult<Detached>
where
    S: TaskStore + ProjectStore + ?Sized,
{
    let project = store
        .find_project(project_id)
        .await?
        .ok_or(RelationError::ProjectNotFound)?;
    if !project.tasks.contains(&task_id) {
        return Err(RelationError::TaskNotFound);
    }

    store.remove_task_from_projects(task_id, &[project_id]).await?;

    let Some(task) = store.find_task(task_id).await? else {
        // The project pointed at a task that no longer exists
        return Err(RelationError::TaskNotFound);
    };

    store.remove_project_from_tasks(project_id, &[task_id]).await?;

    let orphaned = task.projects.iter().all(|id| *id == project_id);
    if orphaned {
        store.delete_task(task_id).await?;
    }

    debug!(%project_id, %task_id, deleted = orphaned, "Task detached from project");
    Ok(Detached { deleted: orphaned })
}

fn check_dates(project: &CreateProject) -> RelationResult<()> {
    match project.start_date {
        Some(start) if project.end_date < start => Err(RelationError::EndBeforeStart),
        _ => Ok(()),
    }
}

/// Creates a project and adds it to each listed task
pub async fn create_project<S>(store: &S, mut data: CreateProject) -> RelationResult<Project>
where
    S: TaskStore + ProjectStore + ?Sized,
{
    data.tasks = dedup_ids(&data.tasks);
    check_dates(&data)?;
    ensure_tasks(store, &data.tasks).await?;

    let project = store.insert_project(data).await?;
    store.add_project_to_tasks(project.id, &project.tasks).await?;

    debug!(project_id = %project.id, tasks = project.tasks.len(), "Project created");
    Ok(project)
}

/// Applies a patch to a project
///
/// When `patch.tasks` is supplied, tasks dropped from the list lose the
/// project and every listed task gains it.
pub async fn edit_project<S>(store: &S, id: Uuid, mut patch: ProjectPatch) -> RelationResult<Project>
where
    S: TaskStore + ProjectStore + ?Sized,
{
    let current = store
        .find_project(id)
        .await?
        .ok_or(RelationError::ProjectNotFound)?;

    let start = patch.start_date.unwrap_or(current.start_date);
    let end = patch.end_date.unwrap_or(current.end_date);
    if end < start {
        return Err(RelationError::EndBeforeStart);
    }

    if let Some(tasks) = patch.tasks.as_mut() {
        let deduped = dedup_ids(tasks);
        *tasks = deduped;
        ensure_tasks(store, tasks).await?;
    }
    let listed = patch.tasks.clone();

    if let Some(listed) = &listed {
        let dropped: Vec<Uuid> = current
            .tasks
            .iter()
            .filter(|t| !listed.contains(t))
            .copied()
            .collect();
        store.remove_project_from_tasks(id, &dropped).await?;
    }

    let project = store
        .update_project(id, patch)
        .await?
        .ok_or(RelationError::ProjectNotFound)?;

    if let Some(listed) = &listed {
        store.add_project_to_tasks(id, listed).await?;
    }

    debug!(project_id = %id, "Project updated");
    Ok(project)
}

/// Pulls the project from every task listing it, then deletes it
pub async fn delete_project<S>(store: &S, id: Uuid) -> RelationResult<Project>
where
    S: TaskStore + ProjectStore + ?Sized,
{
    let project = store
        .find_project(id)
        .await?
        .ok_or(RelationError::ProjectNotFound)?;

    let filter = TaskFilter {
        project_id: Some(id),
        ..Default::default()
    };
    let mut holders: Vec<Uuid> = store
        .list_tasks(filter, None)
        .await?
        .into_iter()
        .map(|t| t.id)
        .collect();
    holders.extend_from_slice(&project.tasks);
    let holders = dedup_ids(&holders);

    store.remove_project_from_tasks(id, &holders).await?;

    let deleted = store
        .delete_project(id)
        .await?
        .ok_or(RelationError::ProjectNotFound)?;

    debug!(project_id = %id, "Project deleted");
    Ok(deleted)
}

/// Creates a profile and points its person at it
///
/// A profile the person owned before is released: its `person_id` is cleared.
pub async fn create_profile<S>(store: &S, data: CreateProfile) -> RelationResult<Profile>
where
    S: ProfileStore + PersonStore + ?Sized,
{
    let person_id = data.person_id;
    ensure_person(store, person_id).await?;

    let profile = store.insert_profile(data).await?;
    store.release_person(person_id, profile.id).await?;
    store.set_person_profile(person_id, Some(profile.id)).await?;

    Ok(profile)
}

/// Replaces a profile, moving the person pointer if the owner changed
pub async fn edit_profile<S>(store: &S, id: Uuid, data: UpdateProfile) -> RelationResult<Profile>
where
    S: ProfileStore + PersonStore + ?Sized,
{
    if store.find_profile(id).await?.is_none() {
        return Err(RelationError::ProfileNotFound);
    }
    let person_id = data.person_id;
    ensure_person(store, person_id).await?;

    let profile = store
        .update_profile(id, data)
        .await?
        .ok_or(RelationError::ProfileNotFound)?;

    store.clear_profile_links(id, Some(person_id)).await?;
    store.release_person(person_id, id).await?;
    store.set_person_profile(person_id, Some(id)).await?;

    Ok(profile)
}

/// Deletes a profile; the owner's pointer is cleared by the store
pub async fn delete_profile<S>(store: &S, id: Uuid) -> RelationResult<Profile>
where
    S: ProfileStore + ?Sized,
{
    store
        .delete_profile(id)
        .await?
        .ok_or(RelationError::ProfileNotFound)
}

/// Reports every one-sided project/task reference
pub async fn check_links<S>(store: &S) -> RelationResult<Vec<LinkIssue>>
where
    S: TaskStore + ProjectStore + ?Sized,
{
    let projects = store.list_projects().await?;
    let tasks = store.list_tasks(TaskFilter::default(), None).await?;

    let task_index: HashMap<Uuid, &Task> = tasks.iter().map(|t| (t.id, t)).collect();
    let project_index: HashMap<Uuid, &Project> = projects.iter().map(|p| (p.id, p)).collect();

    let mut issues = Vec::new();

    for project in &projects {
        for task_id in &project.tasks {
            match task_index.get(task_id) {
                None => issues.push(LinkIssue::DanglingTask {
                    project_id: project.id,
                    task_id: *task_id,
                }),
                Some(task) if !task.projects.contains(&project.id) => {
                    issues.push(LinkIssue::TaskMissingProject {
                        task_id: *task_id,
                        project_id: project.id,
                    })
                }
                Some(_) => {}
            }
        }
    }

    for task in &tasks {
        for project_id in &task.projects {
            match project_index.get(project_id) {
                None => issues.push(LinkIssue::DanglingProject {
                    task_id: task.id,
                    project_id: *project_id,
                }),
                Some(project) if !project.tasks.contains(&task.id) => {
                    issues.push(LinkIssue::ProjectMissingTask {
                        project_id: *project_id,
                        task_id: task.id,
                    })
                }
                Some(_) => {}
            }
        }
    }

    if !issues.is_empty() {
        info!(count = issues.len(), "Found one-sided project/task references");
    }

    Ok(issues)
}
