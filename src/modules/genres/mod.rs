pub mod models;
pub mod store;

use std::sync::Arc;

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
use models::{Genre, GenreInput};
use store::GenreStore;

const NOT_FOUND: &str = "The genre with the given ID was not found.";

pub struct GenresModule {
    ctx: AppContext,
}

impl GenresModule {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Module for GenresModule {
    fn name(&self) -> &'static str {
        "genres"
    }

    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "genres module initialized");
        Ok(())
    }

    fn routes(&self) -> Router {
        let tokens = self.ctx.tokens.clone();

        Router::new()
            .route("/", get(list_genres))
            .route(
                "/",
                post(create_genre).route_layer(
                    Pipeline::new()
                        .authenticate(tokens.clone())
                        .validate::<GenreInput>()
                        .into_layer(),
                ),
            )
            .route(
                "/{id}",
                get(get_genre).route_layer(Pipeline::new().object_id("id").into_layer()),
            )
            .route(
                "/{id}",
                put(update_genre).route_layer(
                    Pipeline::new()
                        .authenticate(tokens.clone())
                        .object_id("id")
                        .validate::<GenreInput>()
                        .into_layer(),
                ),
            )
            .route(
                "/{id}",
                delete(delete_genre).route_layer(
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
                        "summary": "List genres ordered by name",
                        "tags": ["Genres"],
                        "responses": { "200": { "description": "List of genres" } }
                    },
                    "post": {
                        "summary": "Create a genre",
                        "tags": ["Genres"],
                        "security": [{ "authToken": [] }],
                        "responses": {
                            "200": { "description": "Created genre" },
                            "400": { "description": "Invalid body" },
                            "401": { "description": "Unauthenticated" }
                        }
                    }
                },
                "/{id}": {
                    "get": {
                        "summary": "Get a genre",
                        "tags": ["Genres"],
                        "responses": {
                            "200": { "description": "Genre" },
                            "404": { "description": "Malformed id or no such genre" }
                        }
                    },
                    "put": {
                        "summary": "Rename a genre",
                        "tags": ["Genres"],
                        "security": [{ "authToken": [] }],
                        "responses": {
                            "200": { "description": "Updated genre" },
                            "404": { "description": "No such genre" }
                        }
                    },
                    "delete": {
                        "summary": "Delete a genre (admin)",
                        "tags": ["Genres"],
                        "security": [{ "authToken": [] }],
                        "responses": {
                            "200": { "description": "Deleted genre" },
                            "403": { "description": "Not an administrator" },
                            "404": { "description": "No such genre" }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Genre": {
                        "type": "object",
                        "properties": {
                            "_id": { "type": "string" },
                            "name": { "type": "string", "minLength": 5, "maxLength": 50 }
                        },
                        "required": ["_id", "name"]
                    }
                }
            }
        }))
    }
}

async fn list_genres(State(ctx): State<AppContext>) -> Result<Json<Vec<Genre>>, AppError> {
    let genres = GenreStore::new(&ctx.db).list().await?;
    Ok(Json(genres))
}

async fn get_genre(
    State(ctx): State<AppContext>,
    Path(id): Path<ObjectId>,
) -> Result<Json<Genre>, AppError> {
    GenreStore::new(&ctx.db)
        .find_by_id(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(NOT_FOUND))
}

async fn create_genre(
    State(ctx): State<AppContext>,
    Valid(input): Valid<GenreInput>,
) -> Result<Json<Genre>, AppError> {
    let genre = Genre {
        id: ObjectId::new(),
        name: input.name,
    };
    GenreStore::new(&ctx.db).insert(&genre).await?;
    Ok(Json(genre))
}

async fn update_genre(
    State(ctx): State<AppContext>,
    Path(id): Path<ObjectId>,
    Valid(input): Valid<GenreInput>,
) -> Result<Json<Genre>, AppError> {
    let genre = Genre {
        id,
        name: input.name,
    };
    if !GenreStore::new(&ctx.db).replace(&genre).await? {
        return Err(AppError::not_found(NOT_FOUND));
    }
    Ok(Json(genre))
}

async fn delete_genre(
    State(ctx): State<AppContext>,
    Path(id): Path<ObjectId>,
) -> Result<Json<Genre>, AppError> {
    GenreStore::new(&ctx.db)
        .delete(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(NOT_FOUND))
}

pub fn create_module(ctx: AppContext) -> Arc<dyn Module> {
    Arc::new(GenresModule::new(ctx))
}
