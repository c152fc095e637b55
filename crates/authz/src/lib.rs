//! Identity and access for vidly.
//!
//! [`TokenService`] signs and verifies the bearer credentials handed out at login, and
//! [`password`] hashes and checks stored user passwords.

pub mod error;
pub mod password;
pub mod token;

pub use error::AuthError;
pub use token::{Claims, Principal, TokenService};
