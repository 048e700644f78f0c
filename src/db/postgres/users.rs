use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    db::{
        error::{DbError, DbResult},
        repos::UserRepo,
    },
    models::{OauthProfile, Profile, User},
};

pub struct PostgresUserRepo {
    pool: PgPool,
}

impl PostgresUserRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepo for PostgresUserRepo {
    async fn get_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, name, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create(&self, email: &str, profile: &Profile) -> DbResult<User> {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (id, email, name) \
             VALUES ($1, $2, $3) \
             RETURNING id, email, name, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(profile.display_name())
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(user_id = %user.id, sub = %profile.sub, "Created user");
        Ok(user)
    }

    async fn update_from_profile(&self, user_id: Uuid, profile: &OauthProfile) -> DbResult<User> {
        let parsed: Profile = serde_json::from_value(profile.profile_json.clone())
            .map_err(|e| DbError::Serialization(e.to_string()))?;

        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET name = COALESCE($2, name) \
             WHERE id = $1 \
             RETURNING id, email, name, created_at",
        )
        .bind(user_id)
        .bind(parsed.display_name())
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }
}
