use anyhow::Context;
use vidly_app::Application;
use vidly_kernel::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load vidly settings")?;
    vidly_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        db = %settings.database.url,
        "vidly-app bootstrap starting"
    );

    let app = Application::build(settings).await?;
    tracing::info!(modules = app.registry().len(), "vidly-app bootstrap complete");

    app.run().await
}
