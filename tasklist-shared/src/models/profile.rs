/// Profile model and database operations
///
/// A profile holds contact details for one person. The person side keeps a
/// `profile_id` back-reference maintained by `relations`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE profiles (
///     id UUID PRIMARY KEY,
///     occupation VARCHAR(255) NOT NULL,
///     phone VARCHAR(50) NOT NULL,
///     address VARCHAR(512) NOT NULL,
///     person_id UUID REFERENCES persons(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Contact details for a person
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,

    pub occupation: String,

    pub phone: String,

    pub address: String,

    /// Owning person; cleared when that person is deleted
    pub person_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating a profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProfile {
    pub occupation: String,
    pub phone: String,
    pub address: String,
    pub person_id: Uuid,
}

/// Full replacement of a profile's fields
pub type UpdateProfile = CreateProfile;

const PROFILE_COLUMNS: &str = "id, occupation, phone, address, person_id, created_at, updated_at";

impl Profile {
    pub fn new(data: CreateProfile) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            occupation: data.occupation,
            phone: data.phone,
            address: data.address,
            person_id: Some(data.person_id),
            created_at: now,
            updated_at: now,
        }
    }

    pub async fn create(pool: &PgPool, data: CreateProfile) -> Result<Self, sqlx::Error> {
        let draft = Profile::new(data);

        sqlx::query_as::<_, Profile>(&format!(
            "INSERT INTO profiles (id, occupation, phone, address, person_id, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {}",
            PROFILE_COLUMNS
        ))
        .bind(draft.id)
        .bind(draft.occupation)
        .bind(draft.phone)
        .bind(draft.address)
        .bind(draft.person_id)
        .bind(draft.created_at)
        .bind(draft.updated_at)
        .fetch_one(pool)
        .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Profile>(&format!(
            "SELECT {} FROM profiles ORDER BY created_at ASC",
            PROFILE_COLUMNS
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Profile>(&format!(
            "SELECT {} FROM profiles WHERE id = $1",
            PROFILE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_ids(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<Self>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        sqlx::query_as::<_, Profile>(&format!(
            "SELECT {} FROM profiles WHERE id = ANY($1)",
            PROFILE_COLUMNS
        ))
        .bind(ids)
        .fetch_all(pool)
        .await
    }

    /// Replaces every editable field
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateProfile,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Profile>(&format!(
            "UPDATE profiles
             SET occupation = $2, phone = $3, address = $4, person_id = $5, updated_at = NOW()
             WHERE id = $1
             RETURNING {}",
            PROFILE_COLUMNS
        ))
        .bind(id)
        .bind(data.occupation)
        .bind(data.phone)
        .bind(data.address)
        .bind(data.person_id)
        .fetch_optional(pool)
        .await
    }

    /// Clears `person_id` on every profile owned by `person_id`, except `keep`
    pub async fn release_person(
        pool: &PgPool,
        person_id: Uuid,
        keep: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE profiles SET person_id = NULL, updated_at = NOW()
             WHERE person_id = $1 AND id <> $2",
        )
        .bind(person_id)
        .bind(keep)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Deletes a profile; `persons.profile_id` is cleared by the foreign key
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Profile>(&format!(
            "DELETE FROM profiles WHERE id = $1 RETURNING {}",
            PROFILE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }
}
