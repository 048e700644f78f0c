use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A local user record.
///
/// Created exactly once per distinct email (or, for email-less provider
/// profiles, once per distinct subject). Never deleted by this subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct User {
    pub id: Uuid,

    /// Empty string for users created from email-less provider profiles.
    pub email: String,

    /// Display name, seeded from the provider profile at creation time.
    #[serde(default)]
    pub name: Option<String>,

    pub created_at: DateTime<Utc>,
}
