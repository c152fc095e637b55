//! Signed bearer credentials.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use vidly_db::ObjectId;

use crate::AuthError;

/// The authenticated caller, as carried by a verified credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: ObjectId,
    pub is_admin: bool,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.is_admin
    }
}

/// JWT claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: ObjectId,

    #[serde(rename = "isAdmin")]
    pub is_admin: bool,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// Issues and verifies HS256 credentials with one signing secret.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    /// Build a service from the configured secret. An empty secret is refused.
    pub fn new(secret: &str, lifetime: Duration) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::MissingSecret);
        }

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime,
        })
    }

    /// Sign a credential for `principal`.
    pub fn issue(&self, principal: &Principal) -> Result<String, AuthError> {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: principal.user_id,
            is_admin: principal.is_admin,
            iat: now.unix_timestamp(),
            exp: (now + self.lifetime).unix_timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Check signature and expiry and extract the principal.
    pub fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingCredential);
        }

        let mut validation = Validation::default();
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidCredential(e.to_string()),
            }
        })?;

        Ok(Principal {
            user_id: data.claims.sub,
            is_admin: data.claims.is_admin,
        })
    }
}
