mod auth;
mod error_handler;

pub use auth::{TOKEN_COOKIE, auth_middleware};
pub use error_handler::log_errors;
