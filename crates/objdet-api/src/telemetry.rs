//! Tracing initialisation for the server binaries.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default filter when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "info,objdet_api=info,objdet_vision=info,objdet_storage=info,objdet_client=info,tower_http=warn";

/// Install the global subscriber: ANSI text for development, JSON when
/// `LOG_FORMAT=json`.
pub fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_names_crate_targets() {
        let filter = EnvFilter::new(DEFAULT_FILTER).to_string();
        for target in ["objdet_api", "objdet_vision", "objdet_storage", "objdet_client"] {
            assert!(filter.contains(target), "missing {} in {}", target, filter);
        }
        assert!(!DEFAULT_FILTER.split(',').any(|d| d.starts_with("objdet=")));
    }
}
