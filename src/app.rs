use axum::Router;
use vidly_kernel::settings::Settings;
use vidly_kernel::{InitCtx, ModuleRegistry};

use crate::context::AppContext;
use crate::modules;
use crate::utils::shutdown_signal;

/// A fully wired application: modules registered and initialized over a migrated database.
pub struct Application {
    settings: Settings,
    ctx: AppContext,
    registry: ModuleRegistry,
}

impl Application {
    /// Validate settings, open the database and wire every module.
    pub async fn build(settings: Settings) -> anyhow::Result<Self> {
        settings.validate()?;
        let ctx = AppContext::from_settings(&settings).await?;
        Self::with_context(settings, ctx).await
    }

    /// Wire every module around an existing context.
    pub async fn with_context(settings: Settings, ctx: AppContext) -> anyhow::Result<Self> {
        let mut registry = ModuleRegistry::new();
        modules::register_all(&mut registry, &ctx)?;

        let init_ctx = InitCtx {
            settings: &settings,
            db: &ctx.db,
        };
        registry.init_modules(&init_ctx).await?;

        Ok(Self {
            settings,
            ctx,
            registry,
        })
    }

    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn router(&self) -> Router {
        vidly_http::build_router(&self.registry, &self.settings)
    }

    /// Start modules, serve until a shutdown signal arrives, then stop modules.
    pub async fn run(self) -> anyhow::Result<()> {
        let init_ctx = InitCtx {
            settings: &self.settings,
            db: &self.ctx.db,
        };
        self.registry.start_modules(&init_ctx).await?;

        let served =
            vidly_http::start_server(&self.registry, &self.settings, shutdown_signal()).await;

        self.registry.stop_modules().await?;
        self.ctx.db.close().await;
        served
    }
}
