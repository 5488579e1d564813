/// Integration tests for the Tasklist API
///
/// These drive the full router (auth layers, handlers, store) end to end:
/// - Registration, login, and token checks
/// - Person and profile CRUD with back-references
/// - Project/task link maintenance across create, edit, and delete
/// - Project-scoped task routes
/// - Listing pagination and filters
/// - Admin gate and the consistency report

mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use common::{id_of, TestContext, SECRET};
use serde_json::json;
use tasklist_shared::auth::jwt::{create_token, issue_token, Claims};
use tasklist_shared::store::{FailPoint, PersonStore, TaskStore};
use uuid::Uuid;

#[tokio::test]
async fn test_health_check() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx.send(Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
    assert_eq!(body["backend"], "memory");
}

#[tokio::test]
async fn test_register_login_and_profile() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/register",
            None,
            Some(json!({
                "username": "ana",
                "email": "ana@example.com",
                "password": "secret1"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["username"], "ana");
    assert_eq!(body["user"]["role"], "user");
    assert!(body["user"].get("passwordHash").is_none());

    // The token's subject resolves back to the new user
    let token = body["token"].as_str().unwrap().to_string();
    let (status, profile) = ctx.send(Method::GET, "/api/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["user"]["email"], "ana@example.com");
    assert_eq!(profile["user"]["id"], body["user"]["id"]);

    let (status, login) = ctx
        .send(
            Method::POST,
            "/api/login",
            None,
            Some(json!({ "email": "ana@example.com", "password": "secret1" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(login["user"]["id"], body["user"]["id"]);
    assert!(login["token"].is_string());

    let (status, wrong) = ctx
        .send(
            Method::POST,
            "/api/login",
            None,
            Some(json!({ "email": "ana@example.com", "password": "nope123" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong["message"], "Invalid email or password.");

    let (status, unknown) = ctx
        .send(
            Method::POST,
            "/api/login",
            None,
            Some(json!({ "email": "nobody@example.com", "password": "secret1" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown["message"], wrong["message"]);
}

#[tokio::test]
async fn test_register_rejects_duplicates() {
    let ctx = TestContext::new().await;

    // "member" is seeded by the context
    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/register",
            None,
            Some(json!({
                "username": "member",
                "email": "fresh@example.com",
                "password": "secret1"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "conflict");

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/register",
            None,
            Some(json!({
                "username": "fresh",
                "email": "member@example.com",
                "password": "secret1"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn test_register_validation_lists_fields() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/register",
            None,
            Some(json!({ "username": "al", "email": "bad", "password": "123" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "validation_error");
    let fields: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["email", "password", "username"]);
}

#[tokio::test]
async fn test_token_failures_have_distinct_messages() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx.send(Method::GET, "/api/persons", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Unauthorized access. Token not provided.");

    let (status, body) = ctx
        .send(Method::GET, "/api/persons", Some("not.a.token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid token.");

    let forged = issue_token(ctx.user.id, Duration::hours(1), "another-secret-that-is-32-bytes-long").unwrap();
    let (status, body) = ctx.send(Method::GET, "/api/persons", Some(&forged), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid token.");

    let now = Utc::now();
    let expired = create_token(
        &Claims {
            sub: ctx.user.id,
            iss: "tasklist".to_string(),
            iat: (now - Duration::hours(3)).timestamp(),
            nbf: (now - Duration::hours(3)).timestamp(),
            exp: (now - Duration::hours(2)).timestamp(),
        },
        SECRET,
    )
    .unwrap();
    let (status, body) = ctx.send(Method::GET, "/api/persons", Some(&expired), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Token expired. Please log in again.");

    let stranger = issue_token(Uuid::new_v4(), Duration::hours(1), SECRET).unwrap();
    let (status, body) = ctx.send(Method::GET, "/api/persons", Some(&stranger), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "User not found or invalid token.");
}

#[tokio::test]
async fn test_subject_lookup_failure_is_internal() {
    let ctx = TestContext::new().await;

    ctx.store.fail_next(FailPoint::FindUser);
    let (status, body) = ctx.get("/api/persons").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "An internal error occurred");
}

#[tokio::test]
async fn test_admin_routes_require_admin_role() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx.get("/api/admin/tasks").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Access denied. Administrator permission required.");

    let (status, _) = ctx.send(Method::GET, "/api/admin/tasks", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let project = ctx.create_project("P").await;
    ctx.create_task("Admin view", &[project]).await;

    let (status, body) = ctx
        .send(Method::GET, "/api/admin/tasks", Some(&ctx.admin_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    // Full project documents, not summaries
    assert!(body["tasks"][0]["projects"][0]["endDate"].is_string());
}

#[tokio::test]
async fn test_person_crud_and_age_bounds() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx.post("/api/persons", json!({ "name": "Kid", "age": 14 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "age");

    let (status, body) = ctx.post("/api/persons", json!({ "name": "Teen", "age": 15 })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["person"]["age"], 15);
    let id = id_of(&body["person"]);

    let (status, body) = ctx
        .put(&format!("/api/persons/{}", id), json!({ "name": "Adult", "age": 30 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["person"]["name"], "Adult");

    let (status, _) = ctx
        .put(
            &format!("/api/persons/{}", Uuid::new_v4()),
            json!({ "name": "Ghost", "age": 30 }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = ctx.delete(&format!("/api/persons/{}", id)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());

    let (status, _) = ctx.delete(&format!("/api/persons/{}", id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_profile_links_person_both_ways() {
    let ctx = TestContext::new().await;

    let (_, body) = ctx.post("/api/persons", json!({ "name": "Maria", "age": 30 })).await;
    let person_id = id_of(&body["person"]);

    let (status, _) = ctx
        .post(
            "/api/profiles",
            json!({
                "occupation": "Engineer",
                "phone": "555-0100",
                "address": "Main St",
                "personId": Uuid::new_v4()
            }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = ctx
        .post(
            "/api/profiles",
            json!({
                "occupation": "Engineer",
                "phone": "555-0100",
                "address": "Main St",
                "personId": person_id
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let profile_id = id_of(&body["profile"]);

    let (_, persons) = ctx.get("/api/persons").await;
    assert_eq!(persons[0]["profile"]["id"], profile_id.to_string());

    let (_, profiles) = ctx.get("/api/profiles").await;
    assert_eq!(profiles[0]["person"]["name"], "Maria");

    let (status, _) = ctx.delete(&format!("/api/profiles/{}", profile_id)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let person = ctx.store.find_person(person_id).await.unwrap().unwrap();
    assert!(person.profile_id.is_none());
}

#[tokio::test]
async fn test_person_keeps_a_single_profile() {
    let ctx = TestContext::new().await;

    let (_, body) = ctx.post("/api/persons", json!({ "name": "Maria", "age": 30 })).await;
    let person_id = id_of(&body["person"]);

    let mut profile_ids = Vec::new();
    for occupation in ["Engineer", "Manager"] {
        let (status, body) = ctx
            .post(
                "/api/profiles",
                json!({
                    "occupation": occupation,
                    "phone": "555-0100",
                    "address": "Main St",
                    "personId": person_id
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        profile_ids.push(id_of(&body["profile"]));
    }

    let (_, profiles) = ctx.get("/api/profiles").await;
    let owned: Vec<Uuid> = profiles
        .as_array()
        .unwrap()
        .iter()
        .filter(|p| !p["person"].is_null())
        .map(id_of)
        .collect();
    assert_eq!(owned, vec![profile_ids[1]]);

    let (_, persons) = ctx.get("/api/persons").await;
    assert_eq!(persons[0]["profile"]["id"], profile_ids[1].to_string());
}

#[tokio::test]
async fn test_delete_missing_profile_is_not_found() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx.delete(&format!("/api/profiles/{}", Uuid::new_v4())).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_task_edit_moves_project_links() {
    let ctx = TestContext::new().await;
    let p1 = ctx.create_project("P1").await;
    let p2 = ctx.create_project("P2").await;
    let p3 = ctx.create_project("P3").await;

    let task = ctx.create_task("Write docs", &[p1, p2]).await;
    assert_eq!(ctx.project_task_ids(p1).await, vec![task]);
    assert_eq!(ctx.project_task_ids(p2).await, vec![task]);
    assert!(ctx.link_issues().await.is_empty());

    let (status, body) = ctx
        .put(&format!("/api/tasks/{}", task), json!({ "projectIds": [p2, p3] }))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    assert!(ctx.project_task_ids(p1).await.is_empty());
    assert_eq!(ctx.project_task_ids(p2).await, vec![task]);
    assert_eq!(ctx.project_task_ids(p3).await, vec![task]);
    assert!(ctx.link_issues().await.is_empty());

    // No projectIds: links stay where they are
    let (status, body) = ctx
        .put(&format!("/api/tasks/{}", task), json!({ "finished": true }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["task"]["finished"], true);
    assert_eq!(body["task"]["title"], "Write docs");
    assert_eq!(ctx.project_task_ids(p2).await, vec![task]);
    assert_eq!(ctx.project_task_ids(p3).await, vec![task]);

    // Empty list detaches everywhere
    let (status, _) = ctx
        .put(&format!("/api/tasks/{}", task), json!({ "projectIds": [] }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(ctx.project_task_ids(p2).await.is_empty());
    assert!(ctx.project_task_ids(p3).await.is_empty());
    assert!(ctx.link_issues().await.is_empty());
}

#[tokio::test]
async fn test_rejected_edit_changes_nothing() {
    let ctx = TestContext::new().await;
    let p1 = ctx.create_project("P1").await;
    let task = ctx.create_task("Keep me", &[p1]).await;

    let (status, _) = ctx
        .put(
            &format!("/api/tasks/{}", task),
            json!({ "projectIds": [p1, Uuid::new_v4()] }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(ctx.project_task_ids(p1).await, vec![task]);

    let (status, _) = ctx
        .put(&format!("/api/tasks/{}", task), json!({ "title": "no" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = ctx.get(&format!("/api/tasks/{}", task)).await;
    assert_eq!(body["task"]["title"], "Keep me");
}

#[tokio::test]
async fn test_create_task_validates_references() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx
        .post("/api/tasks", json!({ "title": "Orphan", "personId": Uuid::new_v4() }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Person not found.");

    let missing = Uuid::new_v4();
    let (status, body) = ctx
        .post("/api/tasks", json!({ "title": "Orphan", "projectIds": [missing] }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"].as_str().unwrap().contains(&missing.to_string()));

    let (status, _) = ctx.post("/api/tasks", json!({ "title": "ab" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, list) = ctx.send(Method::GET, "/api/tasks", None, None).await;
    assert_eq!(list["total"], 0);
}

#[tokio::test]
async fn test_delete_task_cleans_projects() {
    let ctx = TestContext::new().await;
    let p1 = ctx.create_project("P1").await;
    let p2 = ctx.create_project("P2").await;
    let task = ctx.create_task("Short lived", &[p1, p2]).await;

    let (status, body) = ctx.delete(&format!("/api/tasks/{}", task)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    assert!(ctx.project_task_ids(p1).await.is_empty());
    assert!(ctx.project_task_ids(p2).await.is_empty());
    assert!(ctx.store.find_task(task).await.unwrap().is_none());

    let (status, _) = ctx.delete(&format!("/api/tasks/{}", task)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_project_create_edit_delete_keeps_tasks_in_step() {
    let ctx = TestContext::new().await;
    let t1 = ctx.create_task("First", &[]).await;
    let t2 = ctx.create_task("Second", &[]).await;

    // Legacy field name
    let (status, body) = ctx
        .post(
            "/api/projects",
            json!({ "name": "Launch", "endDate": "2030-01-01T00:00:00Z", "tasksIds": [t1] }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let project = id_of(&body["project"]);

    let task = ctx.store.find_task(t1).await.unwrap().unwrap();
    assert_eq!(task.projects, vec![project]);

    let (status, _) = ctx
        .put(&format!("/api/projects/{}", project), json!({ "taskIds": [t2] }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(ctx.store.find_task(t1).await.unwrap().unwrap().projects.is_empty());
    assert_eq!(ctx.store.find_task(t2).await.unwrap().unwrap().projects, vec![project]);
    assert!(ctx.link_issues().await.is_empty());

    let (status, _) = ctx.delete(&format!("/api/projects/{}", project)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(ctx.store.find_task(t2).await.unwrap().unwrap().projects.is_empty());
    assert!(ctx.link_issues().await.is_empty());

    let (status, _) = ctx.delete(&format!("/api/projects/{}", project)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_project_rejects_end_before_start() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx
        .post(
            "/api/projects",
            json!({
                "name": "Backwards",
                "startDate": "2030-01-02T00:00:00Z",
                "endDate": "2030-01-01T00:00:00Z"
            }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "endDate");
}

#[tokio::test]
async fn test_project_scoped_task_lifecycle() {
    let ctx = TestContext::new().await;
    let p1 = ctx.create_project("P1").await;
    let p2 = ctx.create_project("P2").await;

    let (status, body) = ctx
        .post(&format!("/api/projects/{}/tasks", p1), json!({ "title": "Inside" }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let task = id_of(&body["task"]);
    assert_eq!(ctx.project_task_ids(p1).await, vec![task]);

    // Omitted flag toggles
    let (status, body) = ctx
        .send(
            Method::PUT,
            &format!("/api/projects/{}/tasks/{}", p1, task),
            Some(&ctx.user_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["task"]["finished"], true);

    let (_, body) = ctx
        .put(&format!("/api/projects/{}/tasks/{}", p1, task), json!({ "finished": true }))
        .await;
    assert_eq!(body["task"]["finished"], true);

    // Wrong project
    let (status, _) = ctx
        .put(&format!("/api/projects/{}/tasks/{}", p2, task), json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Shared with another project: detach only
    ctx.put(&format!("/api/tasks/{}", task), json!({ "projectIds": [p1, p2] }))
        .await;
    let (status, body) = ctx.delete(&format!("/api/projects/{}/tasks/{}", p1, task)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], false);
    assert!(ctx.project_task_ids(p1).await.is_empty());
    assert_eq!(ctx.project_task_ids(p2).await, vec![task]);

    // Last project: the task goes away
    let (_, body) = ctx.delete(&format!("/api/projects/{}/tasks/{}", p2, task)).await;
    assert_eq!(body["deleted"], true);
    assert!(ctx.store.find_task(task).await.unwrap().is_none());
    assert!(ctx.link_issues().await.is_empty());
}

#[tokio::test]
async fn test_task_listing_pagination_and_filters() {
    let ctx = TestContext::new().await;
    let project = ctx.create_project("P").await;
    let (_, body) = ctx.post("/api/persons", json!({ "name": "Maria", "age": 30 })).await;
    let person = id_of(&body["person"]);

    for i in 0..12 {
        ctx.create_task(&format!("Task {:02}", i), &[]).await;
    }
    let (status, _) = ctx
        .post(
            "/api/tasks",
            json!({
                "title": "Assigned",
                "finished": true,
                "personId": person,
                "projectIds": [project]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    // Public route
    let (status, body) = ctx.send(Method::GET, "/api/tasks", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 10);
    assert_eq!(body["total"], 13);
    assert_eq!(body["totalPages"], 2);
    assert_eq!(body["currentPage"], 1);
    assert_eq!(body["tasks"][0]["title"], "Assigned");
    assert_eq!(body["tasks"][0]["person"]["name"], "Maria");
    assert_eq!(body["tasks"][0]["projects"][0]["name"], "P");

    let (_, body) = ctx
        .send(Method::GET, "/api/tasks?page=2&limit=10", None, None)
        .await;
    assert_eq!(body["count"], 3);
    assert_eq!(body["currentPage"], 2);
    assert_eq!(body["tasks"][2]["title"], "Task 00");

    let (_, body) = ctx
        .send(Method::GET, "/api/tasks?page=x&limit=y", None, None)
        .await;
    assert_eq!(body["count"], 10);
    assert_eq!(body["currentPage"], 1);

    let (status, body) = ctx
        .send(Method::GET, "/api/tasks?page=9223372036854775807&limit=10", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
    assert_eq!(body["total"], 13);

    let (_, body) = ctx
        .send(Method::GET, "/api/tasks?finished=true", None, None)
        .await;
    assert_eq!(body["total"], 1);

    let (_, body) = ctx
        .send(Method::GET, "/api/tasks?finished=false&limit=50", None, None)
        .await;
    assert_eq!(body["total"], 12);
    assert_eq!(body["count"], 12);

    let (_, body) = ctx
        .send(Method::GET, &format!("/api/tasks?personId={}", person), None, None)
        .await;
    assert_eq!(body["total"], 1);

    let (_, body) = ctx
        .send(Method::GET, &format!("/api/tasks?projectId={}", project), None, None)
        .await;
    assert_eq!(body["total"], 1);

    let (status, _) = ctx
        .send(Method::GET, "/api/tasks?personId=nope", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_task_expands_references() {
    let ctx = TestContext::new().await;
    let project = ctx.create_project("Docs").await;
    let task = ctx.create_task("Write", &[project]).await;

    let (status, body) = ctx.get(&format!("/api/tasks/{}", task)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["task"]["projects"][0]["name"], "Docs");
    assert_eq!(body["task"]["projects"][0]["description"], "Docs description");
    assert!(body["task"]["person"].is_null());

    let (status, _) = ctx.get(&format!("/api/tasks/{}", Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_deleting_person_clears_task_assignee() {
    let ctx = TestContext::new().await;
    let (_, body) = ctx.post("/api/persons", json!({ "name": "Maria", "age": 30 })).await;
    let person = id_of(&body["person"]);

    let (_, body) = ctx
        .post("/api/tasks", json!({ "title": "Assigned", "personId": person }))
        .await;
    let task = id_of(&body["task"]);

    ctx.delete(&format!("/api/persons/{}", person)).await;

    let stored = ctx.store.find_task(task).await.unwrap().unwrap();
    assert!(stored.person_id.is_none());
}

#[tokio::test]
async fn test_partial_failure_is_reported_not_rolled_back() {
    let ctx = TestContext::new().await;
    let project = ctx.create_project("P").await;

    // The task insert succeeds, adding it to the project fails
    ctx.store.fail_next(FailPoint::AddTaskToProjects);
    let (status, body) = ctx
        .post("/api/tasks", json!({ "title": "Half done", "projectIds": [project] }))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "An internal error occurred");

    let issues = ctx.link_issues().await;
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0]["kind"], "projectMissingTask");
    assert_eq!(issues[0]["projectId"], project.to_string());

    let (_, report) = ctx
        .send(Method::GET, "/api/admin/consistency", Some(&ctx.admin_token), None)
        .await;
    assert_eq!(report["consistent"], false);
}

#[tokio::test]
async fn test_retried_delete_after_failure() {
    let ctx = TestContext::new().await;
    let project = ctx.create_project("P").await;
    let task = ctx.create_task("Sticky", &[project]).await;

    // Cleanup ran, the delete itself failed
    ctx.store.fail_next(FailPoint::DeleteTask);
    let (status, _) = ctx.delete(&format!("/api/tasks/{}", task)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(ctx.project_task_ids(project).await.is_empty());

    let (status, _) = ctx.delete(&format!("/api/tasks/{}", task)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(ctx.link_issues().await.is_empty());
}

#[tokio::test]
async fn test_malformed_requests_are_bad_requests() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx.get("/api/tasks/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");

    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/api/persons")
        .header("authorization", format!("Bearer {}", ctx.user_token))
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{ not json"))
        .unwrap();
    let response = tower::ServiceExt::oneshot(ctx.app.clone(), request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let count = ctx.store.list_persons().await.unwrap().len();
    assert_eq!(count, 0);
}
