//! # Configuration Management
//!
//! Settings are layered with the `config` crate: built-in defaults, then an
//! optional TOML file, then `CERTINJECT__*` environment variables
//! (`CERTINJECT__NSS__CERT_DIR`, `CERTINJECT__STORES=nss,cryptoapi`, ...).

pub mod settings;

use std::path::Path;

use crate::errors::Result;

pub use settings::{
    CryptoApiConfig, InjectConfig, NssConfig, ObservabilityConfig, DEFAULT_EXPIRE_SECONDS,
};

/// Prefix of configuration environment variables
pub const ENV_PREFIX: &str = "CERTINJECT";

/// Separator between the prefix and nested keys
pub const ENV_SEPARATOR: &str = "__";

impl InjectConfig {
    /// Load and validate configuration from `path` (if any) and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator(ENV_SEPARATOR)
                .separator(ENV_SEPARATOR)
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("stores"),
        );

        let config: InjectConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        tracing::debug!(stores = ?config.stores, expire_seconds = config.expire_seconds, "Loaded configuration");
        Ok(config)
    }
}
