//! HTTP server facade for vidly with Axum, error handling, request guards and OpenAPI
//! support.

use anyhow::Context;
use axum::{extract::Request, http::HeaderValue, routing::get, Router};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::{Timestamp, Uuid};

use vidly_kernel::settings::Settings;
use vidly_kernel::ModuleRegistry;

pub mod error;
pub mod guard;
pub mod router;
pub mod validate;

pub use error::AppError;
pub use guard::{CurrentUser, Pipeline, Valid};
use router::RouterBuilder;

/// Start the HTTP server and serve until `shutdown` resolves
pub async fn start_server<F>(
    registry: &ModuleRegistry,
    settings: &Settings,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    tracing::info!("starting HTTP server on {}", addr);

    let app = build_router(registry, settings);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    tracing::info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

/// Build the main HTTP router with all module routes mounted
pub fn build_router(registry: &ModuleRegistry, settings: &Settings) -> Router {
    let mut router_builder = RouterBuilder::new().route("/healthz", get(health_check));

    for module in registry.modules() {
        let module_name = module.name();
        tracing::info!(
            module = module_name,
            "mounting module routes under /api/{}",
            module_name
        );
        router_builder = router_builder.mount_module(module_name, module.routes());
    }

    // Layers wrap everything mounted above, so they are added last.
    router_builder
        .with_openapi(registry)
        .with_timeout(settings.server.request_timeout_ms)
        .with_cors()
        .with_tracing()
        .with_request_id()
        .build()
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "ok"
}

/// Time-ordered request ids for tracing
#[derive(Clone, Copy, Default)]
pub(crate) struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let timestamp = Timestamp::now(uuid::NoContext);
        let request_id = Uuid::new_v7(timestamp)
            .to_string()
            .parse::<HeaderValue>()
            .ok()?;
        Some(RequestId::new(request_id))
    }
}
