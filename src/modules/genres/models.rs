use serde::{Deserialize, Serialize};
use validator::Validate;
use vidly_db::ObjectId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Genre {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
}

/// Copy of a genre embedded in a movie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreSnapshot {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
}

impl From<&Genre> for GenreSnapshot {
    fn from(genre: &Genre) -> Self {
        Self {
            id: genre.id,
            name: genre.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GenreInput {
    #[serde(default)]
    #[validate(length(min = 5, max = 50))]
    pub name: String,
}
