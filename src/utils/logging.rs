use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// `RUST_LOG` wins when set; otherwise `info`, or `debug` with `--debug`.
pub fn init(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let fmt_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
