use serde::Serialize;
use sqlx::{FromRow, PgPool};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::nutrition::{ActivityLevel, Gender, Goal, UserProfile};
use crate::validation::ValidProfile;

/// User record in the database. Profile enums are stored as text.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub gender: String,
    pub age: i32,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub activity_level: String,
    pub goal: String,
    pub created_at: OffsetDateTime,
}

/// Failure of an insert or update that sets a username.
#[derive(Debug, Error)]
pub enum UserWriteError {
    #[error("username already registered")]
    UsernameTaken,
    #[error("user write failed: {0}")]
    Db(sqlx::Error),
}

impl From<sqlx::Error> for UserWriteError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                return Self::UsernameTaken;
            }
        }
        Self::Db(e)
    }
}

const USER_COLUMNS: &str = "id, username, password_hash, gender, age, height_cm, weight_kg, \
                            activity_level, goal, created_at";

impl User {
    /// Estimator input. Values outside the known sets fall back instead of failing.
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            gender: Gender::from(self.gender.as_str()),
            age: self.age.max(0) as u32,
            height_cm: self.height_cm,
            weight_kg: self.weight_kg,
            activity_level: ActivityLevel::from(self.activity_level.as_str()),
            goal: Goal::from(self.goal.as_str()),
        }
    }

    pub async fn find_by_username(db: &PgPool, username: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn create(
        db: &PgPool,
        form: &ValidProfile,
        password_hash: &str,
    ) -> Result<User, UserWriteError> {
        let p = &form.profile;
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, username, password_hash, gender, age, height_cm, weight_kg,
                               activity_level, goal)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (username) DO NOTHING
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&form.username)
        .bind(password_hash)
        .bind(p.gender.as_str())
        .bind(p.age as i32)
        .bind(p.height_cm)
        .bind(p.weight_kg)
        .bind(p.activity_level.as_str())
        .bind(p.goal.as_str())
        .fetch_optional(db)
        .await?;
        user.ok_or(UserWriteError::UsernameTaken)
    }

    /// Replaces every profile field, including credentials. `None` when the
    /// user no longer exists.
    pub async fn update(
        db: &PgPool,
        id: Uuid,
        form: &ValidProfile,
        password_hash: &str,
    ) -> Result<Option<User>, UserWriteError> {
        let p = &form.profile;
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET username = $2, password_hash = $3, gender = $4, age = $5,
                   height_cm = $6, weight_kg = $7, activity_level = $8, goal = $9
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&form.username)
        .bind(password_hash)
        .bind(p.gender.as_str())
        .bind(p.age as i32)
        .bind(p.height_cm)
        .bind(p.weight_kg)
        .bind(p.activity_level.as_str())
        .bind(p.goal.as_str())
        .fetch_optional(db)
        .await?;
        Ok(user)
    }
}
