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
use crate::modules::genres::models::GenreSnapshot;
use crate::modules::genres::store::GenreStore;
use models::{Movie, MovieInput};
use store::MovieStore;

const NOT_FOUND: &str = "The movie with the given ID was not found.";

/// Movies module: catalogue entries with their embedded genre and stock count
pub struct MoviesModule {
    ctx: AppContext,
}

impl MoviesModule {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Module for MoviesModule {
    fn name(&self) -> &'static str {
        "movies"
    }

    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "movies module initialized");
        Ok(())
    }

    fn routes(&self) -> Router {
        let tokens = self.ctx.tokens.clone();

        Router::new()
            .route("/", get(list_movies))
            .route(
                "/",
                post(create_movie).route_layer(
                    Pipeline::new()
                        .authenticate(tokens.clone())
                        .validate::<MovieInput>()
                        .into_layer(),
                ),
            )
            .route(
                "/{id}",
                get(get_movie).route_layer(Pipeline::new().object_id("id").into_layer()),
            )
            .route(
                "/{id}",
                put(update_movie).route_layer(
                    Pipeline::new()
                        .authenticate(tokens.clone())
                        .object_id("id")
                        .validate::<MovieInput>()
                        .into_layer(),
                ),
            )
            .route(
                "/{id}",
                delete(delete_movie).route_layer(
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
                        "summary": "List movies ordered by title",
                        "tags": ["Movies"],
                        "responses": { "200": { "description": "List of movies" } }
                    },
                    "post": {
                        "summary": "Create a movie",
                        "tags": ["Movies"],
                        "security": [{ "authToken": [] }],
                        "responses": {
                            "200": { "description": "Created movie" },
                            "400": { "description": "Invalid body or unknown genre" },
                            "401": { "description": "Unauthenticated" }
                        }
                    }
                },
                "/{id}": {
                    "get": {
                        "summary": "Get a movie",
                        "tags": ["Movies"],
                        "responses": {
                            "200": { "description": "Movie" },
                            "404": { "description": "Malformed id or no such movie" }
                        }
                    },
                    "put": {
                        "summary": "Replace a movie",
                        "tags": ["Movies"],
                        "security": [{ "authToken": [] }],
                        "responses": {
                            "200": { "description": "Updated movie" },
                            "400": { "description": "Invalid body or unknown genre" },
                            "404": { "description": "No such movie" }
                        }
                    },
                    "delete": {
                        "summary": "Delete a movie (admin)",
                        "tags": ["Movies"],
                        "security": [{ "authToken": [] }],
                        "responses": {
                            "200": { "description": "Deleted movie" },
                            "403": { "description": "Not an administrator" },
                            "404": { "description": "No such movie" }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Movie": {
                        "type": "object",
                        "properties": {
                            "_id": { "type": "string" },
                            "title": { "type": "string", "minLength": 5, "maxLength": 255 },
                            "genre": { "$ref": "#/components/schemas/Genre" },
                            "numberInStock": { "type": "integer", "minimum": 0, "maximum": 255 },
                            "dailyRentalRate": { "type": "number", "minimum": 0, "maximum": 255 }
                        },
                        "required": ["_id", "title", "genre", "numberInStock", "dailyRentalRate"]
                    }
                }
            }
        }))
    }
}

/// Resolve the referenced genre into the snapshot embedded in the movie.
async fn resolve_genre(ctx: &AppContext, input: &MovieInput) -> Result<GenreSnapshot, AppError> {
    GenreStore::new(&ctx.db)
        .find_by_id(&input.genre_id()?)
        .await?
        .map(|genre| GenreSnapshot::from(&genre))
        .ok_or_else(|| AppError::bad_request("Invalid genre."))
}

async fn list_movies(State(ctx): State<AppContext>) -> Result<Json<Vec<Movie>>, AppError> {
    let movies = MovieStore::new(&ctx.db).list().await?;
    Ok(Json(movies))
}

async fn get_movie(
    State(ctx): State<AppContext>,
    Path(id): Path<ObjectId>,
) -> Result<Json<Movie>, AppError> {
    MovieStore::new(&ctx.db)
        .find_by_id(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(NOT_FOUND))
}

async fn create_movie(
    State(ctx): State<AppContext>,
    Valid(input): Valid<MovieInput>,
) -> Result<Json<Movie>, AppError> {
    let genre = resolve_genre(&ctx, &input).await?;
    let movie = input.into_movie(ObjectId::new(), genre);
    MovieStore::new(&ctx.db).insert(&movie).await?;

    tracing::info!(movie_id = %movie.id, stock = movie.number_in_stock, "movie created");
    Ok(Json(movie))
}

async fn update_movie(
    State(ctx): State<AppContext>,
    Path(id): Path<ObjectId>,
    Valid(input): Valid<MovieInput>,
) -> Result<Json<Movie>, AppError> {
    let genre = resolve_genre(&ctx, &input).await?;
    let movie = input.into_movie(id, genre);
    if !MovieStore::new(&ctx.db).replace(&movie).await? {
        return Err(AppError::not_found(NOT_FOUND));
    }
    Ok(Json(movie))
}

async fn delete_movie(
    State(ctx): State<AppContext>,
    Path(id): Path<ObjectId>,
) -> Result<Json<Movie>, AppError> {
    let movie = MovieStore::new(&ctx.db)
        .delete(&id)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;

    tracing::info!(movie_id = %id, "movie deleted");
    Ok(Json(movie))
}

pub fn create_module(ctx: AppContext) -> Arc<dyn Module> {
    Arc::new(MoviesModule::new(ctx))
}
