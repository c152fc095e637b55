use serde::{Deserialize, Serialize};
use validator::Validate;
use vidly_db::ObjectId;

/// Stored account. `password` holds the argon2 PHC hash.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub is_admin: bool,
}

/// Outward view of a user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            is_admin: user.is_admin,
        }
    }
}

/// Registration response body.
#[derive(Debug, Clone, Serialize)]
pub struct Registered {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UserInput {
    #[serde(default)]
    #[validate(length(min = 5, max = 50))]
    pub name: String,
    #[serde(default)]
    #[validate(length(min = 5, max = 255), email)]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 5, max = 255))]
    pub password: String,
}
