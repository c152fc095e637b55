pub mod ledger;
pub mod models;
pub mod store;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use vidly_db::ObjectId;
use vidly_http::{AppError, Pipeline, Valid};
use vidly_kernel::{InitCtx, Module};

use crate::context::AppContext;
use models::{Rental, RentalRequest};

/// Rentals module: checkout and the rental history
pub struct RentalsModule {
    ctx: AppContext,
}

impl RentalsModule {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Module for RentalsModule {
    fn name(&self) -> &'static str {
        "rentals"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let healthy = ctx.db.health_check().await;
        tracing::info!(
            module = self.name(),
            healthy = healthy,
            "rentals module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/", get(list_rentals))
            .route(
                "/",
                post(create_rental).route_layer(
                    Pipeline::new()
                        .authenticate(self.ctx.tokens.clone())
                        .validate::<RentalRequest>()
                        .into_layer(),
                ),
            )
            .route(
                "/{id}",
                get(get_rental).route_layer(Pipeline::new().object_id("id").into_layer()),
            )
            .with_state(self.ctx.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List rentals, most recent checkout first",
                        "tags": ["Rentals"],
                        "responses": { "200": { "description": "List of rentals" } }
                    },
                    "post": {
                        "summary": "Check a movie out to a customer",
                        "tags": ["Rentals"],
                        "security": [{ "authToken": [] }],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/RentalRequest" }
                                }
                            }
                        },
                        "responses": {
                            "200": { "description": "Created rental" },
                            "400": { "description": "Invalid body, unknown customer or movie, or movie not in stock" },
                            "401": { "description": "Unauthenticated" },
                            "503": { "description": "Store unavailable; safe to retry" }
                        }
                    }
                },
                "/{id}": {
                    "get": {
                        "summary": "Get a rental",
                        "tags": ["Rentals"],
                        "responses": {
                            "200": { "description": "Rental" },
                            "404": { "description": "Malformed id or no such rental" }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "RentalRequest": {
                        "type": "object",
                        "properties": {
                            "customerId": { "type": "string", "pattern": "^[0-9a-fA-F]{24}$" },
                            "movieId": { "type": "string", "pattern": "^[0-9a-fA-F]{24}$" }
                        },
                        "required": ["customerId", "movieId"]
                    },
                    "Rental": {
                        "type": "object",
                        "properties": {
                            "_id": { "type": "string" },
                            "customer": { "type": "object" },
                            "movie": { "type": "object" },
                            "dateOut": { "type": "string", "format": "date-time" },
                            "dateReturned": { "type": ["string", "null"], "format": "date-time" },
                            "rentalFee": { "type": ["number", "null"] }
                        },
                        "required": ["_id", "customer", "movie", "dateOut"]
                    }
                }
            }
        }))
    }
}

async fn list_rentals(State(ctx): State<AppContext>) -> Result<Json<Vec<Rental>>, AppError> {
    Ok(Json(ctx.ledger.list().await?))
}

async fn get_rental(
    State(ctx): State<AppContext>,
    Path(id): Path<ObjectId>,
) -> Result<Json<Rental>, AppError> {
    ctx.ledger
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("The rental with the given ID was not found."))
}

async fn create_rental(
    State(ctx): State<AppContext>,
    Valid(request): Valid<RentalRequest>,
) -> Result<Json<Rental>, AppError> {
    let (customer_id, movie_id) = request.ids()?;
    let rental = ctx.ledger.create(customer_id, movie_id).await?;
    Ok(Json(rental))
}

pub fn create_module(ctx: AppContext) -> Arc<dyn Module> {
    Arc::new(RentalsModule::new(ctx))
}
