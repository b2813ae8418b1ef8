use crate::auth::Redirect;
use crate::core::types::SessionId;

use warp::http::{header, HeaderValue, StatusCode};
use warp::reply::{Reply, Response};

impl Reply for Redirect {
    fn into_response(self) -> Response {
        match HeaderValue::from_str(&self.location) {
            Ok(location) => {
                let mut response = Response::new(warp::hyper::Body::empty());
                *response.status_mut() = StatusCode::FOUND;
                response.headers_mut().insert(header::LOCATION, location);
                response
            }
            Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

/// `secure` adds the `Secure` attribute; only plain-HTTP development setups
/// turn it off.
pub fn with_session_cookie(mut response: Response, id: &SessionId, secure: bool) -> Response {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        super::encoding::SESSION_COOKIE,
        id.0
    );
    if secure {
        cookie.push_str("; Secure");
    }
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    response
}
