mod oauth_profiles;
mod users;

pub use oauth_profiles::OauthProfileRepo;
pub use users::UserRepo;
