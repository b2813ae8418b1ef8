use std::sync::Arc;

use tracing::{event, Level};
use warp::Filter;

use crate::auth::callback::AUTHENTICATION_FAILED;
use crate::auth::{AuthResult, Message, MessageLevel, Provisioning, Redirect, SessionStore};
use crate::core::types::SessionId;
use crate::http::encoding;
use crate::http::server::LoginService;
use crate::session::{push_message, take_messages, ACCOUNT_KEY};

pub fn login_endpoint(
    service: Arc<LoginService>,
) -> impl warp::Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let with_service = warp::any().map(move || service.clone());

    let redirect_to_google = warp::path!("user" / "login" / "google")
        .and(warp::get())
        .and(with_service.clone())
        .and(encoding::session_id())
        .map(|service: Arc<LoginService>, sid: Option<SessionId>| {
            let mut session = service.sessions.load(sid);
            let redirect = match service.initiator.begin_authorization(&mut session) {
                Ok(redirect) => redirect,
                Err(e) => {
                    event!(Level::ERROR, error = %e, "Cannot start authorization");
                    push_message(&mut session, Message::error(AUTHENTICATION_FAILED));
                    Redirect::to(service.initiator.settings().login_path.clone())
                }
            };
            service.commit(session, redirect)
        });

    let callback = warp::path!("user" / "login" / "google" / "callback")
        .and(warp::get())
        .and(with_service.clone())
        .and(encoding::session_id())
        .and(encoding::callback_params())
        .and_then(
            |service: Arc<LoginService>, sid: Option<SessionId>, params| async move {
                let mut session = service.sessions.load(sid);
                let result = service.callback.handle_callback(&mut session, params).await;

                match &result {
                    AuthResult::Provisioned(Provisioning::LoggedIn { account, .. }) => {
                        service.sessions.regenerate(&mut session);
                        session.set(ACCOUNT_KEY, account.0.clone());
                    }
                    AuthResult::Provisioned(Provisioning::Rejected { message, .. }) => {
                        push_message(&mut session, message.clone());
                    }
                    AuthResult::Failed(failure) => {
                        push_message(&mut session, failure.message.clone());
                    }
                }

                let redirect = result.redirect().clone();
                Ok::<_, warp::Rejection>(service.commit(session, redirect))
            },
        );

    let login_page = warp::path!("user" / "login")
        .and(warp::get())
        .and(with_service)
        .and(encoding::session_id())
        .map(|service: Arc<LoginService>, sid: Option<SessionId>| {
            let mut session = service.sessions.load(sid);
            let body = render_login_page(&take_messages(&mut session), session.get(ACCOUNT_KEY));
            service.commit(session, body)
        });

    redirect_to_google.or(callback).or(login_page)
}

fn render_login_page(messages: &[Message], account: Option<String>) -> String {
    let mut body = String::new();
    for message in messages {
        let level = match message.level {
            MessageLevel::Status => "status",
            MessageLevel::Error => "error",
        };
        body.push_str(&format!("[{}] {}\n", level, message.text));
    }
    match account {
        Some(account) => body.push_str(&format!("Logged in as account {}\n", account)),
        None => body.push_str("Log in with Google: /user/login/google\n"),
    }
    body
}
