use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    db::{error::DbResult, repos::OauthProfileRepo},
    models::OauthProfile,
};

pub struct PostgresOauthProfileRepo {
    pool: PgPool,
}

impl PostgresOauthProfileRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OauthProfileRepo for PostgresOauthProfileRepo {
    async fn get_by_sub(&self, sub: &str) -> DbResult<Option<OauthProfile>> {
        let profile = sqlx::query_as::<_, OauthProfile>(
            "SELECT sub, user_id, profile_json, updated_at FROM oauth_profiles \
             WHERE sub = $1 \
             ORDER BY updated_at DESC \
             LIMIT 1",
        )
        .bind(sub)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn upsert(
        &self,
        sub: &str,
        user_id: Uuid,
        profile_json: serde_json::Value,
    ) -> DbResult<OauthProfile> {
        let profile = sqlx::query_as::<_, OauthProfile>(
            "INSERT INTO oauth_profiles (sub, user_id, profile_json) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (sub, user_id) \
             DO UPDATE SET profile_json = EXCLUDED.profile_json, updated_at = now() \
             RETURNING sub, user_id, profile_json, updated_at",
        )
        .bind(sub)
        .bind(user_id)
        .bind(profile_json)
        .fetch_one(&self.pool)
        .await?;

        Ok(profile)
    }
}
