use std::convert::Infallible;

use warp::{Filter, Rejection};

use crate::auth::CallbackParams;
use crate::core::types::SessionId;

pub const SESSION_COOKIE: &str = "sid";

pub fn session_id() -> impl Filter<Extract = (Option<SessionId>,), Error = Infallible> + Clone {
    warp::cookie::optional::<String>(SESSION_COOKIE).map(|c: Option<String>| c.map(SessionId))
}

/// Provider callback parameters. Malformed or missing query strings yield
/// empty parameters instead of a rejection.
pub fn callback_params() -> impl Filter<Extract = (CallbackParams,), Error = Rejection> + Clone {
    warp::query::<Vec<(String, String)>>().map(CallbackParams::from_pairs)
}
