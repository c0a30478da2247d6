//! Logging setup (C12), in the manner of the host project's `init_runtime`:
//! an `EnvFilter` layer plus an optional hierarchical tree layer for `-D`.

use eyre::Result;
use tracing::trace;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_tree::HierarchicalLayer;

/// `verbose` is the `-v` count (0 = info, 1 = debug, 2+ = trace); `debug`
/// is `-D`/`--debug`, a shorthand for trace plus the hierarchical layer
/// (§4.12). `RUST_LOG` always takes precedence when set.
pub fn init_runtime(verbose: u8, debug: bool) -> Result<()> {
    let default_level = if debug || verbose >= 2 {
        "trace"
    } else if verbose == 1 {
        "debug"
    } else {
        "info"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if debug {
        let tree = HierarchicalLayer::new(2)
            .with_ansi(true)
            .with_span_retrace(true)
            .with_span_modes(true)
            .with_targets(true)
            .with_verbose_entry(true)
            .with_verbose_exit(true)
            .with_bracketed_fields(true);

        tracing_subscriber::registry().with(filter).with(tree).init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    trace!("logging initialised");
    Ok(())
}
