use std::sync::Arc;

use async_trait::async_trait;
use axum::{extract::State, routing::post, Json, Router};
use serde_json::json;
use vidly_http::{AppError, Pipeline, Valid};
use vidly_kernel::{InitCtx, Module};

use crate::context::AppContext;
use crate::modules::rentals::models::{Rental, RentalRequest};

/// Returns module: closes the open rental for a customer and movie
pub struct ReturnsModule {
    ctx: AppContext,
}

impl ReturnsModule {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Module for ReturnsModule {
    fn name(&self) -> &'static str {
        "returns"
    }

    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "returns module initialized");
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route(
                "/",
                post(return_rental).route_layer(
                    Pipeline::new()
                        .authenticate(self.ctx.tokens.clone())
                        .validate::<RentalRequest>()
                        .into_layer(),
                ),
            )
            .with_state(self.ctx.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/": {
                    "post": {
                        "summary": "Return a rented movie",
                        "tags": ["Returns"],
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
                            "200": { "description": "The returned rental with its fee" },
                            "400": { "description": "Invalid body or return already processed" },
                            "401": { "description": "Unauthenticated" },
                            "404": { "description": "No rental for this customer and movie" }
                        }
                    }
                }
            }
        }))
    }
}

async fn return_rental(
    State(ctx): State<AppContext>,
    Valid(request): Valid<RentalRequest>,
) -> Result<Json<Rental>, AppError> {
    let (customer_id, movie_id) = request.ids()?;
    let rental = ctx.ledger.return_rental(customer_id, movie_id).await?;
    Ok(Json(rental))
}

pub fn create_module(ctx: AppContext) -> Arc<dyn Module> {
    Arc::new(ReturnsModule::new(ctx))
}
