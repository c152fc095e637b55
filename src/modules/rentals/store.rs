use sqlx::{SqliteConnection, SqlitePool};
use vidly_db::{Database, ObjectId, StoreError};

use super::models::Rental;

const COLUMNS: &str = "id, customer_id, customer_name, customer_phone, customer_is_gold, \
                       movie_id, movie_title, movie_daily_rental_rate, \
                       date_out, date_returned, rental_fee";

/// Queries over the `rentals` table. Timestamps are RFC 3339 text, so ordering goes
/// through `julianday`.
#[derive(Debug, Clone)]
pub struct RentalStore {
    pool: SqlitePool,
}

impl RentalStore {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    pub async fn insert(conn: &mut SqliteConnection, rental: &Rental) -> Result<(), StoreError> {
        let customer = rental.customer();
        let movie = rental.movie();
        sqlx::query(&format!(
            "INSERT INTO rentals ({COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(rental.id())
        .bind(customer.id())
        .bind(customer.name())
        .bind(customer.phone())
        .bind(customer.is_gold())
        .bind(movie.id())
        .bind(movie.title())
        .bind(movie.daily_rental_rate())
        .bind(rental.date_out())
        .bind(rental.date_returned())
        .bind(rental.rental_fee())
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Every rental, most recent checkout first.
    pub async fn list(&self) -> Result<Vec<Rental>, StoreError> {
        let rentals = sqlx::query_as::<_, Rental>(&format!(
            "SELECT {COLUMNS} FROM rentals ORDER BY julianday(date_out) DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rentals)
    }

    pub async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Rental>, StoreError> {
        let rental =
            sqlx::query_as::<_, Rental>(&format!("SELECT {COLUMNS} FROM rentals WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(rental)
    }

    /// Latest open rental for the pair, or failing that the latest returned one.
    pub async fn latest_for(
        &self,
        customer_id: &ObjectId,
        movie_id: &ObjectId,
    ) -> Result<Option<Rental>, StoreError> {
        let rental = sqlx::query_as::<_, Rental>(&format!(
            "SELECT {COLUMNS} FROM rentals WHERE customer_id = ? AND movie_id = ? \
             ORDER BY date_returned IS NULL DESC, julianday(date_out) DESC, id DESC LIMIT 1"
        ))
        .bind(customer_id)
        .bind(movie_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(rental)
    }

    /// Store the return stamp and fee of `returned`, but only if the stored rental is still
    /// open. False when it is missing or was already returned.
    pub async fn mark_returned(&self, returned: &Rental) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE rentals SET date_returned = ?, rental_fee = ? \
             WHERE id = ? AND date_returned IS NULL",
        )
        .bind(returned.date_returned())
        .bind(returned.rental_fee())
        .bind(returned.id())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
