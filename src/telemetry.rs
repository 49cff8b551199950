//! Tracing setup for binaries and tests.
//!
//! Library code only ever emits through `tracing`; installing a subscriber
//! is the embedding application's choice. `init` wires the conventional
//! stack: env-filtered fmt output plus span traces on errors.

use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the default subscriber, honoring `RUST_LOG` and falling back to
/// `info`. Safe to call more than once; later calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(ErrorLayer::default())
        .try_init();
}
