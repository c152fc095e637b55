use serde::{Deserialize, Serialize};
use validator::Validate;
use vidly_db::ObjectId;

/// A store customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub is_gold: bool,
}

/// Request body for creating or replacing a customer.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInput {
    #[serde(default)]
    #[validate(length(min = 5, max = 50))]
    pub name: String,
    #[serde(default)]
    #[validate(length(min = 5, max = 50))]
    pub phone: String,
    #[serde(default)]
    pub is_gold: bool,
}

impl CustomerInput {
    pub fn into_customer(self, id: ObjectId) -> Customer {
        Customer {
            id,
            name: self.name,
            phone: self.phone,
            is_gold: self.is_gold,
        }
    }
}
