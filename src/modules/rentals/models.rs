use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use time::OffsetDateTime;
use validator::Validate;
use vidly_db::ObjectId;
use vidly_http::validate::{object_id, parse_object_id};
use vidly_http::AppError;

use crate::modules::customers::models::Customer;
use crate::modules::movies::models::Movie;

const MILLIS_PER_DAY: i128 = 24 * 60 * 60 * 1000;

/// Customer as it was when the rental was created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSnapshot {
    #[serde(rename = "_id")]
    id: ObjectId,
    name: String,
    phone: String,
    is_gold: bool,
}

impl CustomerSnapshot {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn is_gold(&self) -> bool {
        self.is_gold
    }
}

impl From<&Customer> for CustomerSnapshot {
    fn from(customer: &Customer) -> Self {
        Self {
            id: customer.id,
            name: customer.name.clone(),
            phone: customer.phone.clone(),
            is_gold: customer.is_gold,
        }
    }
}

/// Movie as it was when the rental was created. The rate is the one the fee is priced at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieSnapshot {
    #[serde(rename = "_id")]
    id: ObjectId,
    title: String,
    daily_rental_rate: f64,
}

impl MovieSnapshot {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn daily_rental_rate(&self) -> f64 {
        self.daily_rental_rate
    }
}

impl From<&Movie> for MovieSnapshot {
    fn from(movie: &Movie) -> Self {
        Self {
            id: movie.id,
            title: movie.title.clone(),
            daily_rental_rate: movie.daily_rental_rate,
        }
    }
}

/// The rental was already returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlreadyReturned;

/// One checkout of one movie by one customer.
///
/// A rental is open until [`Rental::mark_returned`] sets `dateReturned` and `rentalFee`
/// together. Once returned it never changes again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rental {
    #[serde(rename = "_id")]
    id: ObjectId,
    customer: CustomerSnapshot,
    movie: MovieSnapshot,
    #[serde(with = "time::serde::rfc3339")]
    date_out: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    date_returned: Option<OffsetDateTime>,
    #[serde(default)]
    rental_fee: Option<f64>,
}

impl Rental {
    pub fn open(customer: CustomerSnapshot, movie: MovieSnapshot, now: OffsetDateTime) -> Self {
        Self {
            id: ObjectId::new(),
            customer,
            movie,
            date_out: now,
            date_returned: None,
            rental_fee: None,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn customer(&self) -> &CustomerSnapshot {
        &self.customer
    }

    pub fn movie(&self) -> &MovieSnapshot {
        &self.movie
    }

    pub fn date_out(&self) -> OffsetDateTime {
        self.date_out
    }

    pub fn date_returned(&self) -> Option<OffsetDateTime> {
        self.date_returned
    }

    pub fn rental_fee(&self) -> Option<f64> {
        self.rental_fee
    }

    pub fn is_returned(&self) -> bool {
        self.date_returned.is_some()
    }

    /// Close the rental at `now`, pricing it from the movie snapshot.
    pub fn mark_returned(&mut self, now: OffsetDateTime) -> Result<(), AlreadyReturned> {
        if self.is_returned() {
            return Err(AlreadyReturned);
        }
        let days = days_rented(self.date_out, now);
        self.rental_fee = Some(fee_for(days, self.movie.daily_rental_rate));
        self.date_returned = Some(now);
        Ok(())
    }
}

impl<'r> FromRow<'r, SqliteRow> for Rental {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            customer: CustomerSnapshot {
                id: row.try_get("customer_id")?,
                name: row.try_get("customer_name")?,
                phone: row.try_get("customer_phone")?,
                is_gold: row.try_get("customer_is_gold")?,
            },
            movie: MovieSnapshot {
                id: row.try_get("movie_id")?,
                title: row.try_get("movie_title")?,
                daily_rental_rate: row.try_get("movie_daily_rental_rate")?,
            },
            date_out: row.try_get("date_out")?,
            date_returned: row.try_get("date_returned")?,
            rental_fee: row.try_get("rental_fee")?,
        })
    }
}

/// `days` at `daily_rate`, rounded to whole cents.
pub fn fee_for(days: i64, daily_rate: f64) -> f64 {
    (days as f64 * daily_rate * 100.0).round() / 100.0
}

/// Whole days billed between checkout and return: partial days round up, at least one.
pub fn days_rented(date_out: OffsetDateTime, date_returned: OffsetDateTime) -> i64 {
    let millis = (date_returned - date_out).whole_milliseconds().max(0);
    let days = (millis + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY;
    i64::try_from(days).unwrap_or(i64::MAX).max(1)
}

/// Body of both the checkout and the return request.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RentalRequest {
    #[serde(default)]
    #[validate(custom(function = "object_id"))]
    pub customer_id: String,
    #[serde(default)]
    #[validate(custom(function = "object_id"))]
    pub movie_id: String,
}

impl RentalRequest {
    /// Customer and movie ids of a request that passed validation.
    pub fn ids(&self) -> Result<(ObjectId, ObjectId), AppError> {
        Ok((
            parse_object_id("customerId", &self.customer_id)?,
            parse_object_id("movieId", &self.movie_id)?,
        ))
    }
}
