//! Coin Top-up webhook service
//!
//! ```text
//! Stripe ──POST──▶ Gateway ──▶ SignatureVerifier ──▶ classify ──▶ TopUpFinalizer
//!                                                                 │         │
//!                                                          coin_topups  user_coins
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{error, info};

use coin_topup::config::{AppConfig, Secrets};
use coin_topup::db::Database;
use coin_topup::gateway::{self, state::AppState};
use coin_topup::logging::init_logging;
use coin_topup::topup::{PgBalanceStore, PgTopUpLedger, TopUpFinalizer};
use coin_topup::webhook::SignatureVerifier;

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let config =
        AppConfig::load(&env).with_context(|| format!("loading config for env '{}'", env))?;
    let _guard = init_logging(&config);

    info!("Coin Top-up {} (env: {})", env!("GIT_HASH"), env);

    // Never start without a signing secret: an unverified webhook could mint coins
    let secrets = match Secrets::from_env() {
        Ok(s) => s,
        Err(e) => {
            error!(code = e.code(), "Refusing to start: {}", e);
            return Err(e.into());
        }
    };
    info!(stripe_mode = secrets.stripe_mode(), "Stripe credentials loaded");

    let verifier = SignatureVerifier::new(
        secrets.webhook_secret(),
        Duration::from_secs(config.webhook.tolerance_secs),
    )?;
    if config.webhook.tolerance_secs == 0 {
        tracing::warn!("Webhook timestamp tolerance is disabled");
    }

    let ledger_db = Arc::new(
        Database::connect(secrets.database_url(), &config.database)
            .await
            .context("connecting to ledger database")?,
    );
    if config.database.run_migrations {
        ledger_db.migrate().await.context("applying migrations")?;
        info!("Migrations applied");
    }

    let balance_pool = match secrets.balance_database_url() {
        Some(url) => {
            info!("Using separate balance database");
            Database::connect(url, &config.database)
                .await
                .context("connecting to balance database")?
                .pool()
                .clone()
        }
        None => ledger_db.pool().clone(),
    };

    let finalizer = TopUpFinalizer::new(
        Arc::new(PgTopUpLedger::new(ledger_db.pool().clone())),
        Arc::new(PgBalanceStore::new(balance_pool)),
    );

    let state = Arc::new(AppState::new(
        Arc::new(verifier),
        Arc::new(finalizer),
        Some(ledger_db),
    ));

    gateway::run_server(&config.gateway, state)
        .await
        .context("gateway server")?;

    info!("Coin Top-up stopped");
    Ok(())
}
