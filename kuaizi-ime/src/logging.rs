//! Tracing setup for hosts and demos.
//!
//! The core only emits `tracing` events; installing a subscriber is up to the
//! host. [`init_tracing`] installs the default one: `RUST_LOG` when set,
//! otherwise errors everywhere and info for this crate. Set
//! `RUST_LOG=kuaizi_ime::tree_log=debug` to see the nested dispatch logs.

use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

/// Directives used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_DIRECTIVES: &str = "error,kuaizi_ime=info";

/// Installs a pretty printing subscriber.
///
/// Does nothing when a global subscriber is already set.
pub fn init_tracing() {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => match EnvFilter::try_new(DEFAULT_DIRECTIVES) {
            Ok(filter) => filter,
            Err(_) => EnvFilter::new("error"),
        },
    };

    let _ = tracing_subscriber::fmt()
        .pretty()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_parse() {
        assert!(EnvFilter::try_new(DEFAULT_DIRECTIVES).is_ok());
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_tracing();
        init_tracing();
    }
}
