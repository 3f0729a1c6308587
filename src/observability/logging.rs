//! # Structured Logging
//!
//! Subscriber setup and span macros using the tracing ecosystem.

use tracing_subscriber::EnvFilter;

use crate::config::{InjectConfig, ObservabilityConfig};

/// Create a tracing span for a trust store operation.
///
/// ```rust,ignore
/// let _span = store_span!("clean", TrustStoreType::Nss).entered();
/// ```
#[macro_export]
macro_rules! store_span {
    ($operation:expr, $store_type:expr) => {
        tracing::info_span!(
            "store_operation",
            operation = %$operation,
            store_type = %$store_type,
            operation_id = %uuid::Uuid::new_v4()
        )
    };
    ($operation:expr, $store_type:expr, $($field:tt)*) => {
        tracing::info_span!(
            "store_operation",
            operation = %$operation,
            store_type = %$store_type,
            operation_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Install the global fmt subscriber.
///
/// `RUST_LOG` wins over the configured level; `verbose` forces `debug` when
/// `RUST_LOG` is unset. A subscriber installed earlier (tests, embedding
/// applications) is left in place.
pub fn init_logging(config: &ObservabilityConfig, verbose: bool) {
    let default_level = if verbose { "debug" } else { config.log_level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Subscriber already set elsewhere; ignore.
    let _ = if config.json_logging {
        tracing_subscriber::fmt().json().with_env_filter(filter).try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init()
    };
}

/// Log configuration at startup
pub fn log_config_info(config: &InjectConfig) {
    tracing::info!(
        stores = ?config.stores,
        expire_seconds = config.expire_seconds,
        cryptoapi_scope = %config.cryptoapi.scope,
        cryptoapi_logical_store = %config.cryptoapi.logical_store,
        nss_cert_dir = %config.nss.cert_dir.display(),
        nss_db_dir = %config.nss.db_dir.display(),
        "certinject configuration"
    );
}
