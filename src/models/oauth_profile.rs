use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Snapshot of a provider profile bound to a local user.
///
/// One row per (provider subject, local user) pairing. `profile_json` holds
/// the full serialized profile and is overwritten on every successful
/// authentication; no history is kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct OauthProfile {
    /// Provider-stable subject identifier.
    pub sub: String,

    /// The local user this subject is bound to.
    pub user_id: Uuid,

    /// Full serialized profile as last downloaded from the provider.
    pub profile_json: serde_json::Value,

    pub updated_at: DateTime<Utc>,
}
