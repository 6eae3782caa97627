use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{jwt::TokenPair, repo::User};
use crate::nutrition::{ActivityLevel, Gender, Goal};

/// Request body for token refresh.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Returned after register, login or refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub user: PublicUser,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub gender: Gender,
    pub age: i32,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub activity_level: ActivityLevel,
    pub goal: Goal,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        let profile = u.profile();
        Self {
            id: u.id,
            username: u.username,
            gender: profile.gender,
            age: u.age,
            height_cm: u.height_cm,
            weight_kg: u.weight_kg,
            activity_level: profile.activity_level,
            goal: profile.goal,
        }
    }
}
