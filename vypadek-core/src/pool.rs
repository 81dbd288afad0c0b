//! Fixed, ordered pool of per-address fetchers.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::stream::{self, StreamExt};
use tracing::{debug, error};

use crate::config::ConfigError;
use crate::model::{AddressQuery, OutagePayload};
use crate::ports::OutagePort;

/// Fetcher for a single address that remembers the outcome of its last lookup.
pub struct AddressFetcher {
    port: Arc<dyn OutagePort>,
    last_value: Mutex<Option<OutagePayload>>,
}

impl AddressFetcher {
    /// Wrap a port; the last-known value starts out unknown.
    #[must_use]
    pub fn new(port: Arc<dyn OutagePort>) -> Self {
        Self {
            port,
            last_value: Mutex::new(None),
        }
    }

    /// Address handled by this fetcher.
    #[must_use]
    pub fn query(&self) -> &AddressQuery {
        self.port.query()
    }

    /// Payload of the last lookup, `None` if it failed or never ran.
    #[must_use]
    pub fn last_value(&self) -> Option<OutagePayload> {
        self.lock_last_value().clone()
    }

    /// Run one lookup and remember its outcome.
    ///
    /// Failures are logged and clear the last-known value instead of keeping stale data.
    pub async fn update(&self) -> Option<OutagePayload> {
        let value = match self.port.fetch().await {
            Ok(payload) => {
                debug!(request = %self.port.describe(), ?payload, "raw outage payload");
                Some(payload)
            }
            Err(err) => {
                error!(request = %self.port.describe(), error = %err, "error fetching outage data");
                None
            }
        };

        self.lock_last_value().clone_from(&value);
        value
    }

    fn lock_last_value(&self) -> MutexGuard<'_, Option<OutagePayload>> {
        self.last_value.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Every monitored address, in configured order. Built once, never mutated.
pub struct AddressPool {
    fetchers: Vec<AddressFetcher>,
    max_concurrent: usize,
}

impl AddressPool {
    /// Build a pool from the provided ports.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoStreets`] when `ports` is empty.
    pub fn new(ports: Vec<Arc<dyn OutagePort>>) -> Result<Self, ConfigError> {
        if ports.is_empty() {
            return Err(ConfigError::NoStreets);
        }

        let fetchers: Vec<_> = ports.into_iter().map(AddressFetcher::new).collect();
        let max_concurrent = fetchers.len();
        Ok(Self {
            fetchers,
            max_concurrent,
        })
    }

    /// Cap the number of lookups in flight during one cycle.
    #[must_use]
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Fetchers in configured order.
    #[must_use]
    pub fn fetchers(&self) -> &[AddressFetcher] {
        &self.fetchers
    }

    /// Iterator over the monitored addresses.
    pub fn queries(&self) -> impl Iterator<Item = &AddressQuery> {
        self.fetchers.iter().map(AddressFetcher::query)
    }

    /// Number of monitored addresses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fetchers.len()
    }

    /// Always false for a constructed pool.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fetchers.is_empty()
    }

    /// Stable identifier: the configured streets joined with commas.
    #[must_use]
    pub fn unique_id(&self) -> String {
        self.queries()
            .map(|query| query.street.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Look up every address once and return the outcomes in configured order.
    ///
    /// Lookups run concurrently up to the configured cap; a failure never stops the others.
    pub async fn fetch_all(&self) -> Vec<Option<OutagePayload>> {
        let lookups: Vec<_> = self.fetchers.iter().map(AddressFetcher::update).collect();
        stream::iter(lookups)
            .buffered(self.max_concurrent)
            .collect()
            .await
    }
}
