use sqlx::SqlitePool;
use vidly_db::{Database, ObjectId, StoreError};

use super::models::Genre;

/// Queries over the `genres` table.
#[derive(Debug, Clone)]
pub struct GenreStore {
    pool: SqlitePool,
}

impl GenreStore {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    pub async fn list(&self) -> Result<Vec<Genre>, StoreError> {
        let genres = sqlx::query_as::<_, Genre>("SELECT id, name FROM genres ORDER BY name, id")
            .fetch_all(&self.pool)
            .await?;
        Ok(genres)
    }

    pub async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Genre>, StoreError> {
        let genre = sqlx::query_as::<_, Genre>("SELECT id, name FROM genres WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(genre)
    }

    pub async fn insert(&self, genre: &Genre) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO genres (id, name) VALUES (?, ?)")
            .bind(genre.id)
            .bind(&genre.name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Returns false when no genre has that id.
    pub async fn replace(&self, genre: &Genre) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE genres SET name = ? WHERE id = ?")
            .bind(&genre.name)
            .bind(genre.id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn delete(&self, id: &ObjectId) -> Result<Option<Genre>, StoreError> {
        let genre = sqlx::query_as::<_, Genre>("DELETE FROM genres WHERE id = ? RETURNING id, name")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(genre)
    }
}
