use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    db::error::DbResult,
    models::{OauthProfile, Profile, User},
};

/// User persistence consumed by the resolver.
#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Look up a user by exact email. Users created from email-less
    /// profiles carry an empty email and are never matched here.
    async fn get_by_email(&self, email: &str) -> DbResult<Option<User>>;

    /// Create a user keyed by email (possibly empty), seeding attributes
    /// from the downloaded provider profile.
    async fn create(&self, email: &str, profile: &Profile) -> DbResult<User>;

    /// Reconcile an existing user's attributes from the freshly upserted
    /// profile row.
    async fn update_from_profile(&self, user_id: Uuid, profile: &OauthProfile) -> DbResult<User>;
}
