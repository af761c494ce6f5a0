//! Shop Sync
//!
//! Prepares the shop catalog for serving: applies schema migrations, makes
//! sure the search index exists and copies pre-existing shops into it once.
//! The backfill can also be triggered by hand and its state inspected.

use clap::{Parser, Subcommand};
use core_config::FromEnv;
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_shops::{
    BackfillJob, ElasticShopIndex, PgBackfillJob, PgProductDirectory, PgShopRepository,
    PgShopService, PgSyncStatusStore, ShopSearchIndex, ShopService, SyncStatusStore,
};
use eyre::Result;
use migration::Migrator;
use tracing::info;

mod config;
mod status;

use config::Config;
use status::StatusReport;

#[derive(Parser)]
#[command(name = "shop-sync")]
#[command(about = "Keep the shop search index in step with the primary database")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate the schema, ensure the search index and run the backfill once
    Init,

    /// Copy every shop into the search index
    Backfill {
        /// Run even if the backfill is already recorded as complete
        #[arg(short, long)]
        force: bool,
    },

    /// Show backfill state and row/document counts as JSON
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    install_color_eyre();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    init_tracing(&config.environment);

    info!("Connecting to database...");
    let db = database::postgres::connect_with_retry(config.database.clone(), None)
        .await
        .map_err(|e| eyre::eyre!("Database connection failed: {}", e))?;

    let index = ElasticShopIndex::new(config.search.clone())?;
    let service: PgShopService = ShopService::new(
        PgShopRepository::new(db.clone()),
        PgProductDirectory::new(db.clone()),
        index,
    );
    let job: PgBackfillJob = BackfillJob::new(service.clone(), PgSyncStatusStore::new(db.clone()));

    match cli.command {
        Commands::Init => {
            database::postgres::run_migrations::<Migrator>(&db, "shop-sync").await?;
            service.index().ensure_index().await?;

            if config.backfill_on_startup {
                let report = job.run().await?;
                info!(
                    "Backfill {}: {} indexed, {} failed",
                    if report.skipped { "skipped" } else { "complete" },
                    report.indexed,
                    report.failed
                );
            } else {
                info!("Backfill on startup disabled");
            }

            info!("Shop catalog ready");
        }

        Commands::Backfill { force } => {
            service.index().ensure_index().await?;

            let report = if force {
                job.run_forced().await?
            } else {
                job.run().await?
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::Status => {
            let report = StatusReport::new(
                job.migration().to_string(),
                job.status_store().get(job.migration()).await?,
                service.count_shops().await?,
                service.count_indexed().await?,
                database::postgres::check_health_detailed(&db).await,
            );
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
