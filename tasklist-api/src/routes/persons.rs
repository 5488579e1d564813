/// Person endpoints
///
/// - `GET /api/persons` - All persons with their profile expanded
/// - `POST /api/persons` - Create
/// - `PUT /api/persons/:id` - Replace name and age
/// - `DELETE /api/persons/:id` - Delete; profile and tasks lose the reference

use crate::{
    app::AppState,
    error::{ApiError, ApiJson, ApiPath, ApiResult},
};
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tasklist_shared::{
    models::person::{CreatePerson, Person, UpdatePerson},
    populate::{self, PersonView},
};
use uuid::Uuid;
use validator::Validate;

/// Create and replace body
#[derive(Debug, Deserialize, Validate)]
pub struct PersonRequest {
    #[validate(
        required(message = "Name is required"),
        length(min = 1, message = "Name is required")
    )]
    pub name: Option<String>,

    #[validate(
        required(message = "Age is required"),
        range(min = 15, max = 99, message = "Age must be between 15 and 99")
    )]
    pub age: Option<i32>,
}

impl PersonRequest {
    /// Validates and returns `(name, age)`
    fn into_fields(self) -> ApiResult<(String, i32)> {
        self.validate()?;
        Ok((
            self.name.unwrap_or_default().trim().to_string(),
            self.age.unwrap_or_default(),
        ))
    }
}

#[derive(Debug, Serialize)]
pub struct PersonResponse {
    pub success: bool,
    pub message: String,
    pub person: Person,
}

pub async fn list_persons(State(state): State<AppState>) -> ApiResult<Json<Vec<PersonView>>> {
    let persons = state.store.list_persons().await?;
    let views = populate::persons(state.store.as_ref(), persons).await?;
    Ok(Json(views))
}

pub async fn create_person(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<PersonRequest>,
) -> ApiResult<(StatusCode, Json<PersonResponse>)> {
    let (name, age) = req.into_fields()?;

    let person = state.store.insert_person(CreatePerson { name, age }).await?;
    tracing::debug!(person_id = %person.id, "Person created");

    Ok((
        StatusCode::CREATED,
        Json(PersonResponse {
            success: true,
            message: "Person created successfully!".to_string(),
            person,
        }),
    ))
}

pub async fn update_person(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<PersonRequest>,
) -> ApiResult<Json<PersonResponse>> {
    let (name, age) = req.into_fields()?;

    let person = state
        .store
        .update_person(id, UpdatePerson { name, age })
        .await?
        .ok_or_else(|| ApiError::NotFound("Person not found.".to_string()))?;

    Ok(Json(PersonResponse {
        success: true,
        message: "Person updated successfully!".to_string(),
        person,
    }))
}

pub async fn delete_person(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    state
        .store
        .delete_person(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Person not found.".to_string()))?;

    tracing::debug!(person_id = %id, "Person deleted");
    Ok(StatusCode::NO_CONTENT)
}
