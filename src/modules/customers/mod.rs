pub mod models;
pub mod store;

use async_trait::async_trait;
use axum::{
    extract::{Path, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::json;
use vidly_db::ObjectId;
use vidly_http::{AppError, Pipeline, Valid};
use vidly_kernel::{InitCtx, Module};

use crate::context::AppContext;
use models::{Customer, CustomerInput};
use store::CustomerStore;

const NOT_FOUND: &str = "The customer with the given ID was not found.";

/// Customers module: plain CRUD over the customers table
pub struct CustomersModule {
    ctx: AppContext,
}

impl CustomersModule {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Module for CustomersModule {
    fn name(&self) -> &'static str {
        "customers"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "customers module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        let tokens = self.ctx.tokens.clone();

        Router::new()
            .route("/", get(list_customers))
            .route(
                "/",
                post(create_customer).route_layer(
                    Pipeline::new()
                        .authenticate(tokens.clone())
                        .validate::<CustomerInput>()
                        .into_layer(),
                ),
            )
            .route(
                "/{id}",
                get(get_customer).route_layer(Pipeline::new().object_id("id").into_layer()),
            )
            .route(
                "/{id}",
                put(update_customer).route_layer(
                    Pipeline::new()
                        .authenticate(tokens.clone())
                        .object_id("id")
                        .validate::<CustomerInput>()
                        .into_layer(),
                ),
            )
            .route(
                "/{id}",
                delete(delete_customer).route_layer(
                    Pipeline::new()
                        .authenticate(tokens)
                        .require_admin()
                        .object_id("id")
                        .into_layer(),
                ),
            )
            .with_state(self.ctx.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List customers ordered by name",
                        "tags": ["Customers"],
                        "responses": { "200": { "description": "List of customers" } }
                    },
                    "post": {
                        "summary": "Create a customer",
                        "tags": ["Customers"],
                        "security": [{ "authToken": [] }],
                        "responses": {
                            "200": { "description": "Created customer" },
                            "400": { "description": "Invalid body" },
                            "401": { "description": "Unauthenticated" }
                        }
                    }
                },
                "/{id}": {
                    "get": {
                        "summary": "Get a customer",
                        "tags": ["Customers"],
                        "responses": {
                            "200": { "description": "Customer" },
                            "404": { "description": "Malformed id or no such customer" }
                        }
                    },
                    "put": {
                        "summary": "Replace a customer",
                        "tags": ["Customers"],
                        "security": [{ "authToken": [] }],
                        "responses": {
                            "200": { "description": "Updated customer" },
                            "400": { "description": "Invalid body" },
                            "404": { "description": "No such customer" }
                        }
                    },
                    "delete": {
                        "summary": "Delete a customer (admin)",
                        "tags": ["Customers"],
                        "security": [{ "authToken": [] }],
                        "responses": {
                            "200": { "description": "Deleted customer" },
                            "403": { "description": "Not an administrator" },
                            "404": { "description": "No such customer" }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Customer": {
                        "type": "object",
                        "properties": {
                            "_id": { "type": "string" },
                            "name": { "type": "string", "minLength": 5, "maxLength": 50 },
                            "phone": { "type": "string", "minLength": 5, "maxLength": 50 },
                            "isGold": { "type": "boolean" }
                        },
                        "required": ["_id", "name", "phone", "isGold"]
                    }
                }
            }
        }))
    }
}

async fn list_customers(State(ctx): State<AppContext>) -> Result<Json<Vec<Customer>>, AppError> {
    let customers = CustomerStore::new(&ctx.db).list().await?;
    Ok(Json(customers))
}

async fn get_customer(
    State(ctx): State<AppContext>,
    Path(id): Path<ObjectId>,
) -> Result<Json<Customer>, AppError> {
    CustomerStore::new(&ctx.db)
        .find_by_id(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(NOT_FOUND))
}

async fn create_customer(
    State(ctx): State<AppContext>,
    Valid(input): Valid<CustomerInput>,
) -> Result<Json<Customer>, AppError> {
    let customer = input.into_customer(ObjectId::new());
    CustomerStore::new(&ctx.db).insert(&customer).await?;

    tracing::info!(customer_id = %customer.id, "customer created");
    Ok(Json(customer))
}

async fn update_customer(
    State(ctx): State<AppContext>,
    Path(id): Path<ObjectId>,
    Valid(input): Valid<CustomerInput>,
) -> Result<Json<Customer>, AppError> {
    let customer = input.into_customer(id);
    if !CustomerStore::new(&ctx.db).replace(&customer).await? {
        return Err(AppError::not_found(NOT_FOUND));
    }
    Ok(Json(customer))
}

async fn delete_customer(
    State(ctx): State<AppContext>,
    Path(id): Path<ObjectId>,
) -> Result<Json<Customer>, AppError> {
    let customer = CustomerStore::new(&ctx.db)
        .delete(&id)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;

    tracing::info!(customer_id = %id, "customer deleted");
    Ok(Json(customer))
}

/// Create a new instance of the customers module
pub fn create_module(ctx: AppContext) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(CustomersModule::new(ctx))
}
