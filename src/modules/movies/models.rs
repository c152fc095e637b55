use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use validator::{Validate, ValidationError};
use vidly_db::ObjectId;
use vidly_http::validate::object_id;
use vidly_http::AppError;

use crate::modules::genres::models::GenreSnapshot;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    pub genre: GenreSnapshot,
    pub number_in_stock: i64,
    pub daily_rental_rate: f64,
}

impl Movie {
    pub fn in_stock(&self) -> bool {
        self.number_in_stock > 0
    }
}

impl<'r> FromRow<'r, SqliteRow> for Movie {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            genre: GenreSnapshot {
                id: row.try_get("genre_id")?,
                name: row.try_get("genre_name")?,
            },
            number_in_stock: row.try_get("number_in_stock")?,
            daily_rental_rate: row.try_get("daily_rental_rate")?,
        })
    }
}

const TITLE_MIN: usize = 5;
const TITLE_MAX: usize = 255;

/// Title length is measured after trimming surrounding whitespace.
fn trimmed_title(title: &str) -> Result<(), ValidationError> {
    let len = title.trim().chars().count();
    let message = if len < TITLE_MIN {
        format!("length must be at least {TITLE_MIN} characters long")
    } else if len > TITLE_MAX {
        format!("length must be less than or equal to {TITLE_MAX} characters long")
    } else {
        return Ok(());
    };

    let mut err = ValidationError::new("length");
    err.message = Some(Cow::Owned(message));
    Err(err)
}

/// Request body for creating or replacing a movie. The genre is referenced by id and
/// resolved into a [`GenreSnapshot`] by the handler.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MovieInput {
    #[serde(default)]
    #[validate(custom(function = "trimmed_title"))]
    pub title: String,
    #[serde(default)]
    #[validate(custom(function = "object_id"))]
    pub genre_id: String,
    #[validate(required, range(min = 0, max = 255))]
    pub number_in_stock: Option<i64>,
    #[validate(required, range(min = 0.0, max = 255.0))]
    pub daily_rental_rate: Option<f64>,
}

impl MovieInput {
    pub fn genre_id(&self) -> Result<ObjectId, AppError> {
        vidly_http::validate::parse_object_id("genreId", &self.genre_id)
    }

    pub fn into_movie(self, id: ObjectId, genre: GenreSnapshot) -> Movie {
        Movie {
            id,
            title: self.title.trim().to_string(),
            genre,
            number_in_stock: self.number_in_stock.unwrap_or_default(),
            daily_rental_rate: self.daily_rental_rate.unwrap_or_default(),
        }
    }
}
