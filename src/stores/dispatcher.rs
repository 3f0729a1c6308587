//! Trust store dispatcher
//!
//! Single entry point for inject and clean across the enabled stores.

use tracing::{debug, info};

use super::backend::{TrustStore, TrustStoreType};
use super::expiry::ExpiryPolicy;
use super::nss::NssStore;
use crate::config::InjectConfig;
use crate::errors::{CertInjectError, Result};

/// Ordered set of enabled trust stores
#[derive(Default)]
pub struct TrustStoreDispatcher {
    stores: Vec<Box<dyn TrustStore>>,
}

impl std::fmt::Debug for TrustStoreDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustStoreDispatcher").field("stores", &self.registered_stores()).finish()
    }
}

impl TrustStoreDispatcher {
    /// Create a dispatcher with no stores
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the stores enabled in `config`
    ///
    /// The configuration is validated first. Selecting `cryptoapi` on a
    /// target without a registry is a configuration error.
    pub fn from_config(config: &InjectConfig) -> Result<Self> {
        config.validate()?;

        let expiry = ExpiryPolicy::from_seconds(config.expire_seconds);
        let mut dispatcher = Self::new();

        for store_type in &config.stores {
            match store_type {
                TrustStoreType::Nss => {
                    dispatcher.register(Box::new(NssStore::with_certutil(config.nss.clone(), expiry)));
                }
                TrustStoreType::CryptoApi => {
                    #[cfg(windows)]
                    {
                        use super::cryptoapi::{CryptoApiStore, WindowsRegistry};
                        dispatcher.register(Box::new(CryptoApiStore::new(
                            WindowsRegistry,
                            config.cryptoapi.clone(),
                            expiry,
                        )));
                    }
                    #[cfg(not(windows))]
                    {
                        return Err(CertInjectError::config(
                            "the cryptoapi store is only available on Windows",
                        ));
                    }
                }
            }
        }

        Ok(dispatcher)
    }

    /// Register a store; stores run in registration order
    pub fn register(&mut self, store: Box<dyn TrustStore>) {
        info!(store_type = %store.store_type(), "Registering trust store");
        self.stores.push(store);
    }

    /// Get list of registered store types
    pub fn registered_stores(&self) -> Vec<TrustStoreType> {
        self.stores.iter().map(|s| s.store_type()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    /// Inject a certificate (DER, or PEM-wrapped DER) into every enabled store
    ///
    /// Stops at the first store that fails and returns its error.
    pub fn inject(&self, der_bytes: &[u8]) -> Result<()> {
        if self.stores.is_empty() {
            return Err(CertInjectError::NoStoreSelected);
        }
        for store in &self.stores {
            debug!(store_type = %store.store_type(), "Dispatching inject");
            store.inject(der_bytes)?;
        }
        Ok(())
    }

    /// Sweep stale entries from every enabled store
    pub fn clean(&self) -> Result<()> {
        if self.stores.is_empty() {
            return Err(CertInjectError::NoStoreSelected);
        }
        for store in &self.stores {
            debug!(store_type = %store.store_type(), "Dispatching clean");
            store.clean()?;
        }
        Ok(())
    }
}
