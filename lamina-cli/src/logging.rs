use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber, writing to stderr.
///
/// `RUST_LOG` wins over `-v` flags, which win over the config's `log_filter`.
pub fn setup_logging(verbose: u8, config_filter: Option<&str>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directive = match verbose {
            0 => config_filter.unwrap_or("warn"),
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        EnvFilter::new(directive)
    });

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
