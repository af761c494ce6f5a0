use crate::Environment;
use tracing::{debug, info};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Default filter for development when `RUST_LOG` is not set
const DEVELOPMENT_FILTER: &str = "debug,sea_orm=info,sqlx=warn,hyper_util=info,reqwest=info";

/// Default filter for production when `RUST_LOG` is not set
const PRODUCTION_FILTER: &str = "info,sea_orm=warn,sqlx=warn";

/// Install color-eyre for the binaries' top-level `eyre::Result`.
///
/// Safe to call more than once; later calls are ignored.
pub fn install_color_eyre() {
    let _ = color_eyre::config::HookBuilder::default()
        .display_location_section(true)
        .display_env_section(false)
        .install();
}

/// Initialize the global tracing subscriber.
///
/// - **Production** (`APP_ENV=production`): flattened JSON events for log
///   aggregation, no module targets.
/// - **Development** (default): pretty, human-readable output.
///
/// Both variants include [`tracing_error::ErrorLayer`] so `color-eyre` reports
/// carry span traces, and both honor `RUST_LOG` when it is set.
///
/// Calling this twice is harmless (the second call only logs at debug level),
/// which keeps tests that initialize tracing independent of each other.
pub fn init_tracing(environment: &Environment) {
    let is_production = environment.is_production();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if is_production {
            EnvFilter::new(PRODUCTION_FILTER)
        } else {
            EnvFilter::new(DEVELOPMENT_FILTER)
        }
    });

    let result = if is_production {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .flatten_event(true),
            )
            .with(tracing_error::ErrorLayer::default())
            .with(filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_file(false)
                    .with_line_number(false)
                    .pretty(),
            )
            .with(tracing_error::ErrorLayer::default())
            .with(filter)
            .try_init()
    };

    match result {
        Ok(_) => info!(?environment, "Tracing initialized"),
        Err(_) => debug!("Tracing already initialized, skipping re-initialization"),
    }
}
