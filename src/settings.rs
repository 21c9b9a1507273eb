//! Internal settings for civindex.
//!
//! This module initializes the logging configuration for the crate at startup,
//! gated behind the `setup_tracing` feature. The logging behavior is controlled
//! by the `CIVINDEX_DEBUG` environment variable. If `CIVINDEX_DEBUG` is not set
//! or is set to a falsy value ("0", "false", or empty), logging stays disabled.
//! Otherwise, a `tracing_subscriber` is installed at `DEBUG` level.
#![cfg(feature = "setup_tracing")]

use ctor::ctor;
use tracing::Level;

#[ctor]
fn set_debug_level() {
    if std::env::var("CIVINDEX_DEBUG").map_or(true, |v| v == "0" || v == "false" || v.is_empty())
    {
        // Leave the default no-op subscriber in place.
    } else {
        tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .init();
    }
}
