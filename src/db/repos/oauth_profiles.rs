use async_trait::async_trait;
use uuid::Uuid;

use crate::{db::error::DbResult, models::OauthProfile};

/// Provider-profile snapshot persistence consumed by the resolver.
#[async_trait]
pub trait OauthProfileRepo: Send + Sync {
    /// Look up the stored profile for a provider subject.
    async fn get_by_sub(&self, sub: &str) -> DbResult<Option<OauthProfile>>;

    /// Insert or overwrite the profile snapshot for a (subject, user)
    /// pairing. Returns the stored row.
    async fn upsert(
        &self,
        sub: &str,
        user_id: Uuid,
        profile_json: serde_json::Value,
    ) -> DbResult<OauthProfile>;
}
