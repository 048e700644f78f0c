mod oauth_profile;
mod profile;
mod user;

pub use oauth_profile::OauthProfile;
pub use profile::Profile;
pub use user::User;
