//! Logging initialization for test binaries.
//!
//! Configures `tracing-subscriber` from the `[general]` section of
//! `HarnessSettings`. Supports JSON structured logging and the
//! human-readable pretty format.

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use switchyard_core::config::{GeneralSettings, HarnessSettings};

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `settings.log_level`. Fails if a global
/// subscriber is already installed.
///
/// # Formats
///
/// * `"json"` - one JSON object per line
/// * `"pretty"` - multi-line colored output
pub fn init_tracing(settings: &GeneralSettings) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_level));

    match settings.log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .map_err(|e| {
                    anyhow::anyhow!("failed to initialize JSON tracing subscriber: {}", e)
                })?;
        }
        "pretty" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()
                .map_err(|e| {
                    anyhow::anyhow!("failed to initialize pretty tracing subscriber: {}", e)
                })?;
        }
        other => {
            return Err(anyhow::anyhow!(
                "unknown log format '{}', expected 'json' or 'pretty'",
                other
            ));
        }
    }

    Ok(())
}

/// Install a compact subscriber that writes through the test harness' capture.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_test_tracing() {
    let settings = HarnessSettings::from_env().general;
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_level));
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().compact().with_test_writer())
        .try_init();
}
