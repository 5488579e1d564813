/// Person model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE persons (
///     id UUID PRIMARY KEY,
///     name VARCHAR(255) NOT NULL,
///     age INTEGER NOT NULL CHECK (age BETWEEN 15 AND 99),
///     profile_id UUID REFERENCES profiles(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Youngest accepted age
pub const MIN_AGE: i32 = 15;

/// Oldest accepted age
pub const MAX_AGE: i32 = 99;

/// A person tasks can be assigned to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: Uuid,

    pub name: String,

    /// Age in years, between [`MIN_AGE`] and [`MAX_AGE`]
    pub age: i32,

    /// Profile describing this person, if one was linked
    pub profile_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating a person
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePerson {
    pub name: String,
    pub age: i32,
}

/// Full replacement of a person's editable fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePerson {
    pub name: String,
    pub age: i32,
}

const PERSON_COLUMNS: &str = "id, name, age, profile_id, created_at, updated_at";

impl Person {
    /// Builds a person document with a fresh id and timestamps
    pub fn new(data: CreatePerson) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: data.name,
            age: data.age,
            profile_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub async fn create(pool: &PgPool, data: CreatePerson) -> Result<Self, sqlx::Error> {
        let draft = Person::new(data);

        sqlx::query_as::<_, Person>(&format!(
            "INSERT INTO persons (id, name, age, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {}",
            PERSON_COLUMNS
        ))
        .bind(draft.id)
        .bind(draft.name)
        .bind(draft.age)
        .bind(draft.created_at)
        .bind(draft.updated_at)
        .fetch_one(pool)
        .await
    }

    /// Lists every person, oldest first
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Person>(&format!(
            "SELECT {} FROM persons ORDER BY created_at ASC",
            PERSON_COLUMNS
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Person>(&format!(
            "SELECT {} FROM persons WHERE id = $1",
            PERSON_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Fetches the persons whose ids are listed; order is unspecified
    pub async fn find_by_ids(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<Self>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        sqlx::query_as::<_, Person>(&format!(
            "SELECT {} FROM persons WHERE id = ANY($1)",
            PERSON_COLUMNS
        ))
        .bind(ids)
        .fetch_all(pool)
        .await
    }

    /// Replaces name and age
    ///
    /// Returns `None` if the person does not exist.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdatePerson,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Person>(&format!(
            "UPDATE persons SET name = $2, age = $3, updated_at = NOW()
             WHERE id = $1
             RETURNING {}",
            PERSON_COLUMNS
        ))
        .bind(id)
        .bind(data.name)
        .bind(data.age)
        .fetch_optional(pool)
        .await
    }

    /// Points a person at a profile, or clears the pointer with `None`
    ///
    /// Returns true if the person exists.
    pub async fn set_profile(
        pool: &PgPool,
        id: Uuid,
        profile_id: Option<Uuid>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE persons SET profile_id = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(profile_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Clears the pointer on every person referencing `profile_id`, except `keep`
    pub async fn clear_profile(
        pool: &PgPool,
        profile_id: Uuid,
        keep: Option<Uuid>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE persons SET profile_id = NULL, updated_at = NOW()
             WHERE profile_id = $1 AND ($2::UUID IS NULL OR id <> $2)",
        )
        .bind(profile_id)
        .bind(keep)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Deletes a person and returns the removed document
    ///
    /// Foreign keys clear `profiles.person_id` and `tasks.person_id`.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Person>(&format!(
            "DELETE FROM persons WHERE id = $1 RETURNING {}",
            PERSON_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }
}
