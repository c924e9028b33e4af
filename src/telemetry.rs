use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_LEVEL: &str = "info";

/// Structured JSON logging to stdout, filtered by `RUST_LOG` (default `info`).
///
/// Records emitted through the `log` crate (request logger, actix, sqlx) are
/// forwarded into the same subscriber.
pub fn init_telemetry() {
    let formatting_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .json();

    let result = tracing_subscriber::registry()
        .with(env_filter(DEFAULT_LOG_LEVEL))
        .with(formatting_layer)
        .try_init();

    if let Err(e) = result {
        eprintln!("Telemetry already initialized: {}", e);
    }
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_does_not_panic() {
        init_telemetry();
        init_telemetry();
        tracing::info!("telemetry initialized");
    }

    #[test]
    fn test_default_filter() {
        if std::env::var("RUST_LOG").is_err() {
            assert_eq!(env_filter("warn").to_string(), "warn");
        }
    }
}
