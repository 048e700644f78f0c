//! User-identity resolution.
//!
//! Given a downloaded profile, finds or creates the local user and keeps
//! the stored profile snapshot fresh. The exact step order matters for
//! correctness under concurrent first logins; see `resolve_or_create_user`.

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::{DbError, DbResult, OauthProfileRepo, UserRepo},
    models::Profile,
};

/// Finds-or-creates local users from downloaded provider profiles.
pub struct UserResolver {
    users: Arc<dyn UserRepo>,
    profiles: Arc<dyn OauthProfileRepo>,
    reconcile_on_login: bool,
}

impl UserResolver {
    pub fn new(
        users: Arc<dyn UserRepo>,
        profiles: Arc<dyn OauthProfileRepo>,
        reconcile_on_login: bool,
    ) -> Self {
        Self {
            users,
            profiles,
            reconcile_on_login,
        }
    }

    /// Resolve the local user for a downloaded profile, creating one on
    /// first login.
    ///
    /// - No email in the profile: reuse the user already bound to this
    ///   subject, else create a fresh user keyed by empty email. Email-less
    ///   identities get one local user per distinct subject and are never
    ///   merged by anything else.
    /// - Email present: find the user by email, else create one seeded from
    ///   the full profile.
    ///
    /// The profile snapshot is upserted unconditionally so it stays fresh
    /// for returning users. Reconciliation runs only for users that were
    /// not just created in this call; a brand-new user is already seeded
    /// from the same profile.
    ///
    /// Any store error aborts the whole resolution; nothing is retried.
    pub async fn resolve_or_create_user(&self, profile: &Profile) -> DbResult<Uuid> {
        let email = profile.email.as_deref().filter(|e| !e.is_empty());

        let mut created = false;
        let user_id = match email {
            None => match self.profiles.get_by_sub(&profile.sub).await? {
                Some(saved) => saved.user_id,
                None => {
                    let user = self.users.create("", profile).await?;
                    created = true;
                    user.id
                }
            },
            Some(email) => match self.users.get_by_email(email).await? {
                Some(user) => user.id,
                None => {
                    let user = self.users.create(email, profile).await?;
                    created = true;
                    user.id
                }
            },
        };

        let profile_json =
            serde_json::to_value(profile).map_err(|e| DbError::Serialization(e.to_string()))?;
        let stored = self
            .profiles
            .upsert(&profile.sub, user_id, profile_json)
            .await?;

        if self.reconcile_on_login && !created {
            self.users.update_from_profile(user_id, &stored).await?;
        }

        tracing::debug!(user_id = %user_id, sub = %profile.sub, created, "Resolved user");
        Ok(user_id)
    }
}
