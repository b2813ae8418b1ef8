pub mod auth;
pub mod core;
pub mod http;
pub mod provider;
pub mod session;
pub mod util;
