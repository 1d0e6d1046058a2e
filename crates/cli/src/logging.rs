//! Diagnostic logging setup
//!
//! Logs go to stderr so task output and listings on stdout stay clean.
//! `RUST_LOG` wins; otherwise `--verbose` or `DROVER_VERBOSE` enables debug logs for
//! drover itself, and everything else stays at warn.

use drover_core::text::bool_env_var;
use tracing_subscriber::EnvFilter;

const VERBOSE_FILTER: &str = "warn,drover_core=debug,drover_cli=debug";
const DEFAULT_FILTER: &str = "warn";

fn default_filter(verbose: bool) -> &'static str {
    if verbose || bool_env_var("DROVER_VERBOSE") {
        VERBOSE_FILTER
    } else {
        DEFAULT_FILTER
    }
}

pub fn init(verbose: bool) {
    let env_filter = match std::env::var("RUST_LOG").ok() {
        Some(val) => EnvFilter::new(val),
        None => EnvFilter::new(default_filter(verbose)),
    };

    // A subscriber may already be installed when embedded; keep the existing one
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}
