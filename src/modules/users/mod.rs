pub mod models;
pub mod store;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Path, State},
    response::{AppendHeaders, IntoResponse},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;
use vidly_authz::password;
use vidly_db::{ObjectId, StoreError};
use vidly_http::guard::AUTH_TOKEN_HEADER;
use vidly_http::{AppError, CurrentUser, Pipeline, Valid};
use vidly_kernel::{InitCtx, Module};

use crate::context::AppContext;
use crate::modules::auth::issue_token;
use models::{PublicUser, Registered, User, UserInput};
use store::UserStore;

const ALREADY_REGISTERED: &str = "User already registered.";

/// Users module: registration, the caller's own profile and admin removal
pub struct UsersModule {
    ctx: AppContext,
}

impl UsersModule {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Module for UsersModule {
    fn name(&self) -> &'static str {
        "users"
    }

    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "users module initialized");
        Ok(())
    }

    fn routes(&self) -> Router {
        let tokens = self.ctx.tokens.clone();

        Router::new()
            .route("/", get(list_users))
            .route(
                "/",
                post(register_user)
                    .route_layer(Pipeline::new().validate::<UserInput>().into_layer()),
            )
            .route(
                "/me",
                get(current_user)
                    .route_layer(Pipeline::new().authenticate(tokens.clone()).into_layer()),
            )
            .route(
                "/{id}",
                delete(delete_user).route_layer(
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
                        "summary": "List users ordered by email",
                        "tags": ["Users"],
                        "responses": { "200": { "description": "List of users" } }
                    },
                    "post": {
                        "summary": "Register a user",
                        "tags": ["Users"],
                        "responses": {
                            "200": {
                                "description": "Registered user; the credential is in the x-auth-token header"
                            },
                            "400": { "description": "Invalid body or email already registered" }
                        }
                    }
                },
                "/me": {
                    "get": {
                        "summary": "The authenticated user",
                        "tags": ["Users"],
                        "security": [{ "authToken": [] }],
                        "responses": {
                            "200": { "description": "User" },
                            "401": { "description": "Unauthenticated" }
                        }
                    }
                },
                "/{id}": {
                    "delete": {
                        "summary": "Delete a user (admin)",
                        "tags": ["Users"],
                        "security": [{ "authToken": [] }],
                        "responses": {
                            "200": { "description": "Deleted user" },
                            "403": { "description": "Not an administrator" },
                            "404": { "description": "No such user" }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "User": {
                        "type": "object",
                        "properties": {
                            "_id": { "type": "string" },
                            "name": { "type": "string", "minLength": 5, "maxLength": 50 },
                            "email": { "type": "string", "format": "email" },
                            "isAdmin": { "type": "boolean" }
                        },
                        "required": ["_id", "name", "email"]
                    }
                }
            }
        }))
    }
}

async fn list_users(State(ctx): State<AppContext>) -> Result<Json<Vec<PublicUser>>, AppError> {
    let users = UserStore::new(&ctx.db).list().await?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

async fn current_user(
    State(ctx): State<AppContext>,
    CurrentUser(principal): CurrentUser,
) -> Result<Json<PublicUser>, AppError> {
    UserStore::new(&ctx.db)
        .find_by_id(&principal.user_id)
        .await?
        .map(|user| Json(PublicUser::from(user)))
        .ok_or_else(|| AppError::not_found("The user with the given ID was not found."))
}

async fn register_user(
    State(ctx): State<AppContext>,
    Valid(input): Valid<UserInput>,
) -> Result<impl IntoResponse, AppError> {
    let users = UserStore::new(&ctx.db);

    if users.find_by_email(&input.email).await?.is_some() {
        return Err(AppError::bad_request(ALREADY_REGISTERED));
    }

    let plaintext = input.password;
    let hashed = tokio::task::spawn_blocking(move || password::hash(&plaintext))
        .await
        .map_err(|e| AppError::Internal(e.into()))?
        .map_err(|e| AppError::Internal(e.into()))?;

    let user = User {
        id: ObjectId::new(),
        name: input.name,
        email: input.email,
        password: hashed,
        is_admin: false,
    };

    match users.insert(&user).await {
        Ok(()) => {}
        Err(StoreError::DuplicateKey { .. }) => {
            return Err(AppError::bad_request(ALREADY_REGISTERED));
        }
        Err(err) => return Err(err.into()),
    }

    let token = issue_token(&ctx, &user)?;
    tracing::info!(user_id = %user.id, "user registered");

    let body = Registered {
        id: user.id,
        name: user.name,
        email: user.email,
    };
    Ok((AppendHeaders([(AUTH_TOKEN_HEADER, token)]), Json(body)))
}

async fn delete_user(
    State(ctx): State<AppContext>,
    Path(id): Path<ObjectId>,
) -> Result<Json<PublicUser>, AppError> {
    let user = UserStore::new(&ctx.db)
        .delete(&id)
        .await?
        .ok_or_else(|| AppError::not_found("The user with the given ID was not found."))?;

    tracing::info!(user_id = %id, "user deleted");
    Ok(Json(PublicUser::from(user)))
}

pub fn create_module(ctx: AppContext) -> Arc<dyn Module> {
    Arc::new(UsersModule::new(ctx))
}
