mod jwt;
mod session;

pub use jwt::*;
pub use session::*;

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error(transparent)]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("session storage error: {0}")]
    Io(#[from] std::io::Error),
    #[error("session storage error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Invalid(&'static str),
    #[error("Session token is expired")]
    Expired,
    #[error("No session user found")]
    NoSession,
}
