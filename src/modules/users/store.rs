use sqlx::SqlitePool;
use vidly_db::{Database, ObjectId, StoreError};

use super::models::User;

const COLUMNS: &str = "id, name, email, password, is_admin";

/// Queries over the `users` table. Emails are unique.
#[derive(Debug, Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

impl UserStore {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    /// Every user, ordered by email.
    pub async fn list(&self) -> Result<Vec<User>, StoreError> {
        let users = sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users ORDER BY email"))
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    pub async fn find_by_id(&self, id: &ObjectId) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE email = ?"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Fails with [`StoreError::DuplicateKey`] when the email is taken.
    pub async fn insert(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(&format!("INSERT INTO users ({COLUMNS}) VALUES (?, ?, ?, ?, ?)"))
            .bind(user.id)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password)
            .bind(user.is_admin)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete(&self, id: &ObjectId) -> Result<Option<User>, StoreError> {
        let user =
            sqlx::query_as::<_, User>(&format!("DELETE FROM users WHERE id = ? RETURNING {COLUMNS}"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(user)
    }
}
