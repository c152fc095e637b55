use sqlx::SqlitePool;
use vidly_db::{Database, ObjectId, StoreError};

use super::models::Customer;

/// Queries over the `customers` table.
#[derive(Debug, Clone)]
pub struct CustomerStore {
    pool: SqlitePool,
}

impl CustomerStore {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    /// Every customer, ordered by name.
    pub async fn list(&self) -> Result<Vec<Customer>, StoreError> {
        let customers = sqlx::query_as::<_, Customer>(
            "SELECT id, name, phone, is_gold FROM customers ORDER BY name, id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(customers)
    }

    pub async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Customer>, StoreError> {
        let customer = sqlx::query_as::<_, Customer>(
            "SELECT id, name, phone, is_gold FROM customers WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(customer)
    }

    pub async fn insert(&self, customer: &Customer) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO customers (id, name, phone, is_gold) VALUES (?, ?, ?, ?)")
            .bind(customer.id)
            .bind(&customer.name)
            .bind(&customer.phone)
            .bind(customer.is_gold)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Overwrite an existing customer. Returns false when no row has that id.
    pub async fn replace(&self, customer: &Customer) -> Result<bool, StoreError> {
        let result =
            sqlx::query("UPDATE customers SET name = ?, phone = ?, is_gold = ? WHERE id = ?")
                .bind(&customer.name)
                .bind(&customer.phone)
                .bind(customer.is_gold)
                .bind(customer.id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn delete(&self, id: &ObjectId) -> Result<Option<Customer>, StoreError> {
        let customer = sqlx::query_as::<_, Customer>(
            "DELETE FROM customers WHERE id = ? RETURNING id, name, phone, is_gold",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(customer)
    }
}
