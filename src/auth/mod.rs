mod client;
mod error;
mod identity;
mod path_policy;
mod resolver;
mod session;
mod state_store;

pub use client::{ProviderClient, TokenResponse};
pub use error::{AuthError, ErrorHandler, default_error_handler};
pub use identity::RequestIdentity;
pub use path_policy::{PathPolicy, PathRule};
pub use resolver::UserResolver;
pub use session::{
    CacheSessionStore, MemorySessionStore, Session, SessionStore, SessionUser, StoreError,
    StoreResult, create_session_store, load_valid_session,
};
pub use state_store::{
    CacheStateStore, RedirectStateStore, SessionStateStore, create_state_store,
};
