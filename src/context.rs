use std::sync::Arc;

use anyhow::Context;
use vidly_authz::TokenService;
use vidly_db::Database;
use vidly_kernel::settings::Settings;

use crate::modules::rentals::ledger::{Clock, RentalLedger, SystemClock};

/// Shared handles passed to every module at construction.
#[derive(Clone)]
pub struct AppContext {
    pub db: Database,
    pub tokens: Arc<TokenService>,
    pub ledger: Arc<RentalLedger>,
}

impl AppContext {
    /// Open the database, applying pending migrations, and build the token service.
    pub async fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let db = Database::connect(&settings.database.db_config())
            .await
            .context("failed to open database")?;
        let tokens = TokenService::new(
            &settings.auth.jwt_private_key,
            time::Duration::seconds(settings.auth.token_ttl_secs),
        )
        .context("failed to build token service")?;

        Ok(Self::new(db, Arc::new(tokens), Arc::new(SystemClock)))
    }

    pub fn new(db: Database, tokens: Arc<TokenService>, clock: Arc<dyn Clock>) -> Self {
        let ledger = Arc::new(RentalLedger::with_clock(&db, clock));
        Self { db, tokens, ledger }
    }
}
