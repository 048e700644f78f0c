mod oauth_profiles;
mod users;

pub use oauth_profiles::PostgresOauthProfileRepo;
pub use users::PostgresUserRepo;
