//! Tracing subscriber setup for the binary.
//!
//! The library only emits `tracing` events; installing a subscriber is the
//! caller's choice. `RUST_LOG` wins when set, otherwise the `-v` count
//! raises the level for this crate from `warn`.

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Level for this crate's events given the number of `-v` flags.
pub fn level_for_verbosity(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Install the stderr subscriber. Later calls are no-ops.
pub fn init(verbose: u8) {
    INIT.call_once(|| {
        let filter = match std::env::var("RUST_LOG") {
            Ok(_) => EnvFilter::from_default_env(),
            Err(_) => EnvFilter::new(format!(
                "opscover={}",
                level_for_verbosity(verbose).as_str().to_lowercase()
            )),
        };

        // try_init: an embedding program may already own the global subscriber
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .try_init();
    });
}
