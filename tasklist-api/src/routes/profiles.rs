/// Profile endpoints
///
/// A profile belongs to one person and that person points back at it.
/// Create and replace keep both pointers in step.

use crate::{
    app::AppState,
    error::{ApiJson, ApiPath, ApiResult},
};
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tasklist_shared::{
    models::profile::{CreateProfile, Profile},
    populate::{self, ProfileView},
    relations,
};
use uuid::Uuid;
use validator::Validate;

/// Create and replace body; every field is required
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRequest {
    #[validate(
        required(message = "Occupation is required"),
        length(min = 1, message = "Occupation is required")
    )]
    pub occupation: Option<String>,

    #[validate(
        required(message = "Phone is required"),
        length(min = 1, message = "Phone is required")
    )]
    pub phone: Option<String>,

    #[validate(
        required(message = "Address is required"),
        length(min = 1, message = "Address is required")
    )]
    pub address: Option<String>,

    #[validate(required(message = "Person id is required"))]
    pub person_id: Option<Uuid>,
}

impl TryFrom<ProfileRequest> for CreateProfile {
    type Error = validator::ValidationErrors;

    fn try_from(req: ProfileRequest) -> Result<Self, Self::Error> {
        req.validate()?;
        Ok(CreateProfile {
            occupation: req.occupation.unwrap_or_default(),
            phone: req.phone.unwrap_or_default(),
            address: req.address.unwrap_or_default(),
            person_id: req.person_id.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub message: String,
    pub profile: Profile,
}

pub async fn list_profiles(State(state): State<AppState>) -> ApiResult<Json<Vec<ProfileView>>> {
    let profiles = state.store.list_profiles().await?;
    let views = populate::profiles(state.store.as_ref(), profiles).await?;
    Ok(Json(views))
}

/// Creates a profile; 404 when `personId` does not resolve
pub async fn create_profile(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ProfileRequest>,
) -> ApiResult<(StatusCode, Json<ProfileResponse>)> {
    let data = CreateProfile::try_from(req)?;
    let profile = relations::create_profile(state.store.as_ref(), data).await?;

    tracing::debug!(profile_id = %profile.id, "Profile created");

    Ok((
        StatusCode::CREATED,
        Json(ProfileResponse {
            success: true,
            message: "Profile created successfully!".to_string(),
            profile,
        }),
    ))
}

pub async fn update_profile(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<ProfileRequest>,
) -> ApiResult<Json<ProfileResponse>> {
    let data = CreateProfile::try_from(req)?;
    let profile = relations::edit_profile(state.store.as_ref(), id, data).await?;

    Ok(Json(ProfileResponse {
        success: true,
        message: "Profile updated successfully!".to_string(),
        profile,
    }))
}

pub async fn delete_profile(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    relations::delete_profile(state.store.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_fields_required() {
        let req: ProfileRequest = serde_json::from_value(serde_json::json!({
            "occupation": "Engineer"
        }))
        .unwrap();

        let errors = CreateProfile::try_from(req).unwrap_err();
        let fields = errors.field_errors();
        assert_eq!(fields.len(), 3);
        assert!(fields.contains_key("person_id"));
    }

    #[test]
    fn test_camel_case_person_id() {
        let person_id = Uuid::new_v4();
        let req: ProfileRequest = serde_json::from_value(serde_json::json!({
            "occupation": "Engineer",
            "phone": "555-0100",
            "address": "Main St",
            "personId": person_id
        }))
        .unwrap();

        let data = CreateProfile::try_from(req).unwrap();
        assert_eq!(data.person_id, person_id);
    }
}
