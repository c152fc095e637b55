//! Login: exchange an email and password for a signed credential.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::State,
    response::{AppendHeaders, IntoResponse},
    routing::post,
    Router,
};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;
use vidly_authz::{password, Principal};
use vidly_http::guard::AUTH_TOKEN_HEADER;
use vidly_http::{AppError, Pipeline, Valid};
use vidly_kernel::{InitCtx, Module};

use crate::context::AppContext;
use crate::modules::users::models::User;
use crate::modules::users::store::UserStore;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginInput {
    #[serde(default)]
    #[validate(length(min = 5, max = 255))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 5, max = 255))]
    pub password: String,
}

/// Sign a credential for `user`.
pub(crate) fn issue_token(ctx: &AppContext, user: &User) -> Result<String, AppError> {
    ctx.tokens
        .issue(&Principal {
            user_id: user.id,
            is_admin: user.is_admin,
        })
        .map_err(|e| AppError::Internal(e.into()))
}

pub struct AuthModule {
    ctx: AppContext,
}

impl AuthModule {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Module for AuthModule {
    fn name(&self) -> &'static str {
        "auth"
    }

    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "auth module initialized");
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route(
                "/",
                post(login).route_layer(Pipeline::new().validate::<LoginInput>().into_layer()),
            )
            .with_state(self.ctx.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/": {
                    "post": {
                        "summary": "Log in",
                        "tags": ["Auth"],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "object",
                                        "properties": {
                                            "email": { "type": "string" },
                                            "password": { "type": "string" }
                                        },
                                        "required": ["email", "password"]
                                    }
                                }
                            }
                        },
                        "responses": {
                            "200": { "description": "The credential is in the x-auth-token header" },
                            "400": { "description": "Invalid body, email or password" }
                        }
                    }
                }
            }
        }))
    }
}

async fn login(
    State(ctx): State<AppContext>,
    Valid(input): Valid<LoginInput>,
) -> Result<impl IntoResponse, AppError> {
    let user = UserStore::new(&ctx.db)
        .find_by_email(&input.email)
        .await?
        .ok_or_else(|| AppError::bad_request("Invalid email."))?;

    let plaintext = input.password;
    let stored = user.password.clone();
    let matches = tokio::task::spawn_blocking(move || password::verify(&plaintext, &stored))
        .await
        .map_err(|e| AppError::Internal(e.into()))?;
    if !matches {
        return Err(AppError::bad_request("Invalid password."));
    }

    let token = issue_token(&ctx, &user)?;
    tracing::info!(user_id = %user.id, "user logged in");

    Ok(AppendHeaders([(AUTH_TOKEN_HEADER, token)]))
}

pub fn create_module(ctx: AppContext) -> Arc<dyn Module> {
    Arc::new(AuthModule::new(ctx))
}
