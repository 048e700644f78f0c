use serde::{Deserialize, Serialize};

/// Profile document returned by the provider's profile endpoint.
///
/// `sub` is always present; every other field is provider-dependent. Some
/// providers do not disclose an email at all, which drives the email-less
/// branch of user resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub sub: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Profile {
    /// Best-effort display name: `name`, else given + family name joined.
    pub fn display_name(&self) -> Option<String> {
        if let Some(name) = &self.name {
            return Some(name.clone());
        }
        match (&self.given_name, &self.family_name) {
            (Some(given), Some(family)) => Some(format!("{} {}", given, family)),
            (Some(given), None) => Some(given.clone()),
            (None, Some(family)) => Some(family.clone()),
            (None, None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_prefers_full_name() {
        let profile: Profile = serde_json::from_value(serde_json::json!({
            "sub": "p1",
            "name": "Ada Lovelace",
            "given_name": "Ada",
            "family_name": "Lovelace",
        }))
        .unwrap();
        assert_eq!(profile.display_name().as_deref(), Some("Ada Lovelace"));
    }

    #[test]
    fn display_name_joins_given_and_family() {
        let profile: Profile = serde_json::from_value(serde_json::json!({
            "sub": "p1",
            "given_name": "Ada",
            "family_name": "Lovelace",
        }))
        .unwrap();
        assert_eq!(profile.display_name().as_deref(), Some("Ada Lovelace"));
    }

    #[test]
    fn unknown_provider_fields_are_tolerated() {
        let profile: Profile = serde_json::from_value(serde_json::json!({
            "sub": "p1",
            "email": "a@x.com",
            "locale": "en-AU",
            "custom_claim": 42,
        }))
        .unwrap();
        assert_eq!(profile.sub, "p1");
        assert_eq!(profile.email.as_deref(), Some("a@x.com"));
    }
}
