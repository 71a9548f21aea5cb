use thiserror::Error;

/// Authentication and authorization failures.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("user '{0}' not found")]
    UnknownUser(String),

    #[error("invalid password for user '{0}'")]
    BadPassword(String),

    #[error("user not authenticated")]
    NotAuthenticated,

    #[error("access denied: path '{path}' is outside user's allowed path '{home}'")]
    OutsideHome { path: String, home: String },

    #[error("access denied: user '{0}' has read-only permissions")]
    ReadOnly(String),
}
