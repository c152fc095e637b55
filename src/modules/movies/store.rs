use sqlx::{SqliteConnection, SqlitePool};
use vidly_db::{Database, ObjectId, StoreError};

use super::models::Movie;

const COLUMNS: &str = "id, title, genre_id, genre_name, number_in_stock, daily_rental_rate";

/// Queries over the `movies` table, including the stock adjustments the rental ledger makes.
#[derive(Debug, Clone)]
pub struct MovieStore {
    pool: SqlitePool,
}

impl MovieStore {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    /// Every movie, ordered by title.
    pub async fn list(&self) -> Result<Vec<Movie>, StoreError> {
        let movies =
            sqlx::query_as::<_, Movie>(&format!("SELECT {COLUMNS} FROM movies ORDER BY title, id"))
                .fetch_all(&self.pool)
                .await?;
        Ok(movies)
    }

    pub async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Movie>, StoreError> {
        let movie = sqlx::query_as::<_, Movie>(&format!("SELECT {COLUMNS} FROM movies WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(movie)
    }

    pub async fn insert(&self, movie: &Movie) -> Result<(), StoreError> {
        sqlx::query(&format!("INSERT INTO movies ({COLUMNS}) VALUES (?, ?, ?, ?, ?, ?)"))
            .bind(movie.id)
            .bind(&movie.title)
            .bind(movie.genre.id)
            .bind(&movie.genre.name)
            .bind(movie.number_in_stock)
            .bind(movie.daily_rental_rate)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Returns false when no movie has that id.
    pub async fn replace(&self, movie: &Movie) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE movies SET title = ?, genre_id = ?, genre_name = ?, number_in_stock = ?, \
             daily_rental_rate = ? WHERE id = ?",
        )
        .bind(&movie.title)
        .bind(movie.genre.id)
        .bind(&movie.genre.name)
        .bind(movie.number_in_stock)
        .bind(movie.daily_rental_rate)
        .bind(movie.id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn delete(&self, id: &ObjectId) -> Result<Option<Movie>, StoreError> {
        let movie =
            sqlx::query_as::<_, Movie>(&format!("DELETE FROM movies WHERE id = ? RETURNING {COLUMNS}"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(movie)
    }

    /// Take one copy out of stock. False when the movie is missing or has no copies left;
    /// the count never drops below zero.
    pub async fn take_copy(conn: &mut SqliteConnection, id: &ObjectId) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE movies SET number_in_stock = number_in_stock - 1 \
             WHERE id = ? AND number_in_stock > 0",
        )
        .bind(id)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Put one copy back. `Ok(None)` when the movie no longer exists.
    pub async fn return_copy(&self, id: &ObjectId) -> Result<Option<i64>, StoreError> {
        let stock: Option<(i64,)> = sqlx::query_as(
            "UPDATE movies SET number_in_stock = number_in_stock + 1 WHERE id = ? \
             RETURNING number_in_stock",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(stock.map(|(stock,)| stock))
    }
}
