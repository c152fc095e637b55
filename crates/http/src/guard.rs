//! Per-route request guards.
//!
//! A [`Pipeline`] is an ordered list of [`Guard`]s assembled when a route is registered and
//! installed with `route_layer`. Guards run in declaration order before the handler; the
//! first one to fail answers the request with its [`AppError`] and the handler never runs.
//!
//! ```ignore
//! let create = post(create_rental).route_layer(
//!     Pipeline::new()
//!         .authenticate(tokens.clone())
//!         .validate::<RentalRequest>()
//!         .into_layer(),
//! );
//! ```

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::{Body, Bytes},
    extract::{FromRequestParts, RawPathParams, Request},
    http::{header, request::Parts, Extensions, HeaderMap},
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use serde_json::json;
use tower::{Layer, Service};
use validator::Validate;
use vidly_authz::{AuthError, Principal, TokenService};
use vidly_db::ObjectId;

use crate::error::AppError;

/// Header carrying the credential issued at login.
pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";

/// Largest request body a validating pipeline will buffer.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// What a guard may inspect about the request.
pub struct GuardCtx<'a> {
    headers: &'a HeaderMap,
    path_params: &'a [(String, String)],
    body: &'a [u8],
    extensions: &'a mut Extensions,
}

impl GuardCtx<'_> {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn body(&self) -> &[u8] {
        self.body
    }

    pub fn extensions(&mut self) -> &mut Extensions {
        self.extensions
    }
}

/// One check in a pipeline. `Ok(())` hands the request to the next guard.
pub trait Guard: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Whether the guard reads the request body.
    fn reads_body(&self) -> bool {
        false
    }

    fn check(&self, ctx: &mut GuardCtx<'_>) -> Result<(), AppError>;
}

/// Requires a valid bearer credential and records the [`Principal`] for later guards and
/// handlers.
pub struct Authenticate {
    tokens: Arc<TokenService>,
}

impl Authenticate {
    pub fn new(tokens: Arc<TokenService>) -> Self {
        Self { tokens }
    }
}

/// Credential from `x-auth-token`, or from `Authorization: Bearer`.
fn credential<'a>(ctx: &'a GuardCtx<'_>) -> Option<&'a str> {
    ctx.header(AUTH_TOKEN_HEADER)
        .or_else(|| {
            ctx.header(header::AUTHORIZATION.as_str())
                .and_then(|value| value.strip_prefix("Bearer "))
        })
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

impl Guard for Authenticate {
    fn name(&self) -> &'static str {
        "authenticate"
    }

    fn check(&self, ctx: &mut GuardCtx<'_>) -> Result<(), AppError> {
        let token = credential(ctx)
            .ok_or_else(|| AppError::unauthorized("Access denied. No token provided."))?;

        let principal = self.tokens.verify(token).map_err(|err| match err {
            AuthError::Expired => AppError::unauthorized("Token expired."),
            _ => AppError::unauthorized("Invalid token."),
        })?;

        ctx.extensions().insert(principal);
        Ok(())
    }
}

/// Requires the authenticated principal to be an administrator.
pub struct RequireAdmin;

impl Guard for RequireAdmin {
    fn name(&self) -> &'static str {
        "require_admin"
    }

    fn check(&self, ctx: &mut GuardCtx<'_>) -> Result<(), AppError> {
        match ctx.extensions().get::<Principal>() {
            None => Err(AppError::unauthorized("Access denied. No token provided.")),
            Some(principal) if !principal.is_admin() => Err(AppError::forbidden("Access denied.")),
            Some(_) => Ok(()),
        }
    }
}

/// Rejects a malformed identifier path segment as not found.
pub struct ObjectIdParam {
    param: &'static str,
}

impl ObjectIdParam {
    pub fn new(param: &'static str) -> Self {
        Self { param }
    }
}

impl Guard for ObjectIdParam {
    fn name(&self) -> &'static str {
        "object_id"
    }

    fn check(&self, ctx: &mut GuardCtx<'_>) -> Result<(), AppError> {
        match ctx.path_param(self.param) {
            Some(value) if ObjectId::is_valid(value) => Ok(()),
            _ => Err(AppError::not_found("Invalid ID.")),
        }
    }
}

/// Parses the JSON body as `T`, checks its field rules, and hands it to the handler as
/// [`Valid<T>`].
pub struct ValidateBody<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> ValidateBody<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for ValidateBody<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Guard for ValidateBody<T>
where
    T: Validate + DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        "validate_body"
    }

    fn reads_body(&self) -> bool {
        true
    }

    fn check(&self, ctx: &mut GuardCtx<'_>) -> Result<(), AppError> {
        let value: T = serde_json::from_slice(ctx.body()).map_err(|err| {
            AppError::validation(
                vec![json!({ "error": err.to_string() })],
                "request body does not match the expected shape",
            )
        })?;
        value.validate()?;
        ctx.extensions().insert(Valid(value));
        Ok(())
    }
}

/// A request body that passed [`ValidateBody`].
#[derive(Debug, Clone)]
pub struct Valid<T>(pub T);

impl<S, T> FromRequestParts<S> for Valid<T>
where
    S: Send + Sync,
    T: Clone + Send + Sync + 'static,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.remove::<Valid<T>>().ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!(
                "route is missing its body validation guard"
            ))
        })
    }
}

/// The caller recorded by [`Authenticate`].
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub Principal);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .copied()
            .map(CurrentUser)
            .ok_or_else(|| AppError::unauthorized("Access denied. No token provided."))
    }
}

/// Ordered guard list for one route.
#[derive(Clone, Default)]
pub struct Pipeline {
    guards: Vec<Arc<dyn Guard>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append any guard.
    pub fn with(mut self, guard: impl Guard) -> Self {
        self.guards.push(Arc::new(guard));
        self
    }

    pub fn authenticate(self, tokens: Arc<TokenService>) -> Self {
        self.with(Authenticate::new(tokens))
    }

    pub fn require_admin(self) -> Self {
        self.with(RequireAdmin)
    }

    pub fn object_id(self, param: &'static str) -> Self {
        self.with(ObjectIdParam::new(param))
    }

    pub fn validate<T>(self) -> Self
    where
        T: Validate + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        self.with(ValidateBody::<T>::new())
    }

    pub fn guard_names(&self) -> Vec<&'static str> {
        self.guards.iter().map(|guard| guard.name()).collect()
    }

    pub fn into_layer(self) -> PipelineLayer {
        PipelineLayer {
            pipeline: Arc::new(self),
        }
    }

    /// Run every guard against `request`, returning it ready for the handler.
    async fn admit(&self, request: Request) -> Result<Request, AppError> {
        let (mut parts, body) = request.into_parts();

        let path_params: Vec<(String, String)> =
            match RawPathParams::from_request_parts(&mut parts, &()).await {
                Ok(params) => params
                    .iter()
                    .map(|(key, value)| (key.to_string(), value.to_string()))
                    .collect(),
                Err(_) => Vec::new(),
            };

        let (body, bytes) = if self.guards.iter().any(|guard| guard.reads_body()) {
            let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
                .await
                .map_err(|_| AppError::bad_request("request body could not be read"))?;
            (Body::from(bytes.clone()), bytes)
        } else {
            (body, Bytes::new())
        };

        let mut ctx = GuardCtx {
            headers: &parts.headers,
            path_params: &path_params,
            body: &bytes,
            extensions: &mut parts.extensions,
        };

        for guard in &self.guards {
            if let Err(rejection) = guard.check(&mut ctx) {
                tracing::debug!(guard = guard.name(), %rejection, "request rejected by guard");
                return Err(rejection);
            }
        }

        Ok(Request::from_parts(parts, body))
    }
}

/// Tower layer running a [`Pipeline`] in front of a route.
#[derive(Clone)]
pub struct PipelineLayer {
    pipeline: Arc<Pipeline>,
}

impl<S> Layer<S> for PipelineLayer {
    type Service = PipelineService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        PipelineService {
            pipeline: Arc::clone(&self.pipeline),
            inner,
        }
    }
}

#[derive(Clone)]
pub struct PipelineService<S> {
    pipeline: Arc<Pipeline>,
    inner: S,
}

impl<S> Service<Request> for PipelineService<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let pipeline = Arc::clone(&self.pipeline);
        // Take the service that was driven to readiness and leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            match pipeline.admit(request).await {
                Ok(request) => inner.call(request).await,
                Err(rejection) => Ok(rejection.into_response()),
            }
        })
    }
}
