mod authorize;
mod bearer;
mod forwarded;
mod timing;

pub use authorize::authorize_middleware;
pub(crate) use authorize::{build_session_cookie, load_session_from_cookie, redirect_found};
pub use bearer::bearer_middleware;
pub use forwarded::forwarded_base_url;
pub use timing::timing_middleware;
