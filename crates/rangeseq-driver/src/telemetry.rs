//! Log output for the driver.
//!
//! Events from the `rangeseq` library (range rotations at `debug`, spin waits
//! at `trace`) and the driver's own summary are written to stderr through
//! `tracing_subscriber::fmt`. Verbosity is controlled with `RUST_LOG` and
//! defaults to `info`:
//!
//! ```bash
//! RUST_LOG=info,rangeseq=debug cargo run -p rangeseq-driver
//! ```

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_telemetry() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_thread_ids(true)
                .with_thread_names(true)
                .with_line_number(true)
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339()),
        )
        .try_init()?;

    Ok(())
}
