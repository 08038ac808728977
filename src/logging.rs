//! Log output setup for the binary

use tracing_subscriber::{EnvFilter, prelude::*};

/// Install the global subscriber. `RUST_LOG` wins over `default_level` when set.
pub fn init_logging(default_level: &str) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("refinery_sim={}", default_level)))?;

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
