//! In-memory repositories for development and tests.
//!
//! All data is lost on restart; a restarted node re-creates every user on
//! next login. Use the Postgres backend for anything beyond local use.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    error::{DbError, DbResult},
    repos::{OauthProfileRepo, UserRepo},
};
use crate::models::{OauthProfile, Profile, User};

#[derive(Default)]
pub struct MemoryUserRepo {
    users: RwLock<Vec<User>>,
}

impl MemoryUserRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepo for MemoryUserRepo {
    async fn get_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn create(&self, email: &str, profile: &Profile) -> DbResult<User> {
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: profile.display_name(),
            created_at: Utc::now(),
        };

        let mut users = self.users.write().await;
        users.push(user.clone());
        Ok(user)
    }

    async fn update_from_profile(&self, user_id: Uuid, profile: &OauthProfile) -> DbResult<User> {
        let parsed: Profile = serde_json::from_value(profile.profile_json.clone())
            .map_err(|e| DbError::Serialization(e.to_string()))?;

        let mut users = self.users.write().await;
        let user = users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or(DbError::NotFound)?;

        if let Some(name) = parsed.display_name() {
            user.name = Some(name);
        }
        Ok(user.clone())
    }
}

#[derive(Default)]
pub struct MemoryOauthProfileRepo {
    profiles: RwLock<HashMap<(String, Uuid), OauthProfile>>,
}

impl MemoryOauthProfileRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OauthProfileRepo for MemoryOauthProfileRepo {
    async fn get_by_sub(&self, sub: &str) -> DbResult<Option<OauthProfile>> {
        let profiles = self.profiles.read().await;
        Ok(profiles
            .values()
            .filter(|p| p.sub == sub)
            .max_by_key(|p| p.updated_at)
            .cloned())
    }

    async fn upsert(
        &self,
        sub: &str,
        user_id: Uuid,
        profile_json: serde_json::Value,
    ) -> DbResult<OauthProfile> {
        let profile = OauthProfile {
            sub: sub.to_string(),
            user_id,
            profile_json,
            updated_at: Utc::now(),
        };

        let mut profiles = self.profiles.write().await;
        profiles.insert((sub.to_string(), user_id), profile.clone());
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(sub: &str, email: Option<&str>) -> Profile {
        serde_json::from_value(serde_json::json!({
            "sub": sub,
            "email": email,
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn create_and_look_up_by_email() {
        let repo = MemoryUserRepo::new();

        let created = repo
            .create("a@x.com", &profile("p1", Some("a@x.com")))
            .await
            .unwrap();
        let found = repo.get_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);

        assert!(repo.get_by_email("b@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_overwrites_profile_json() {
        let repo = MemoryOauthProfileRepo::new();
        let user_id = Uuid::new_v4();

        repo.upsert("p1", user_id, serde_json::json!({"sub": "p1", "v": 1}))
            .await
            .unwrap();
        repo.upsert("p1", user_id, serde_json::json!({"sub": "p1", "v": 2}))
            .await
            .unwrap();

        let stored = repo.get_by_sub("p1").await.unwrap().unwrap();
        assert_eq!(stored.profile_json["v"], 2);
    }
}
