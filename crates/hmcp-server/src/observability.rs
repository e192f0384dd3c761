//! Tracing setup.
//!
//! The filter comes from `RUST_LOG` when set, else from `logging.level`. It
//! sits behind a reload layer so [`set_log_level`] can change it later.

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

static FILTER_HANDLE: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

/// Installs the global subscriber. Later calls are ignored.
pub fn init_tracing(level: &str) {
    let rust_log = std::env::var("RUST_LOG").ok();
    let (filter, handle) = reload::Layer::new(build_filter(level, rust_log.as_deref()));

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init()
        .is_ok();
    if installed {
        let _ = FILTER_HANDLE.set(handle);
    }
}

/// Replaces the active filter with `level`.
///
/// Returns `false` when tracing was not initialized here or `RUST_LOG` is set.
pub fn set_log_level(level: &str) -> bool {
    if std::env::var_os("RUST_LOG").is_some() {
        return false;
    }
    FILTER_HANDLE
        .get()
        .is_some_and(|handle| handle.reload(build_filter(level, None)).is_ok())
}

fn build_filter(level: &str, rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_new(level).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}
