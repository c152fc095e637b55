use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no credential supplied")]
    MissingCredential,

    #[error("credential rejected: {0}")]
    InvalidCredential(String),

    #[error("credential expired")]
    Expired,

    #[error("signing secret is not configured")]
    MissingSecret,

    #[error("failed to sign credential: {0}")]
    Signing(String),

    #[error("password hashing failed: {0}")]
    Hashing(String),
}
