use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global fmt subscriber. `RUST_LOG` takes precedence over `verbose`.
///
/// Returns `false` when another subscriber was already installed, e.g. by an
/// embedding application; that subscriber keeps receiving events.
pub fn init(verbose: bool) -> bool {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match fmt().with_env_filter(filter).with_target(false).try_init() {
        Ok(()) => true,
        Err(e) => {
            debug!("Keeping existing tracing subscriber: {}", e);
            false
        }
    }
}
