use std::net::SocketAddr;
use std::sync::Arc;

use warp::reply::{Reply, Response};
use warp::Filter;

use crate::auth::{AuthorizationInitiator, CallbackHandler};
use crate::session::{SessionHandle, SessionRegistry};

mod endpoints;

use endpoints::login::login_endpoint;

use super::response::with_session_cookie;

/// Everything the login routes need for one request.
pub struct LoginService {
    pub initiator: AuthorizationInitiator,
    pub callback: CallbackHandler,
    pub sessions: SessionRegistry,
    /// Send the session cookie with `Secure`.
    pub secure_cookie: bool,
}

impl LoginService {
    /// Saves the session and attaches the cookie for new sessions.
    pub(crate) fn commit(&self, session: SessionHandle, reply: impl Reply) -> Response {
        self.sessions.save(&session);
        let response = reply.into_response();
        if session.fresh {
            with_session_cookie(response, &session.id, self.secure_cookie)
        } else {
            response
        }
    }
}

pub struct Server {
    service: Arc<LoginService>,
}

impl Server {
    pub fn new(service: Arc<LoginService>) -> Self {
        Self {
            service: Arc::clone(&service),
        }
    }

    pub fn routes(
        &self,
    ) -> impl Filter<Extract = (impl Reply,), Error = warp::Rejection> + Clone {
        login_endpoint(self.service.clone()).with(warp::log("http-api"))
    }

    pub async fn serve(self, addr: SocketAddr) {
        let routes = self.routes();
        warp::serve(routes).run(addr).await;
    }
}
