use std::sync::Arc;

use tracing::{info, warn};

use crate::cache::SpaCache;
use crate::client::SpaClient;
use crate::config::SpaConfig;
use crate::types::SpaState;
use crate::{Error, Result};

pub const MANUFACTURER: &str = "Balboa";

/// Identity of the spa as presented to the host's device registry.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceInfo {
    pub serial_number: String,
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    pub sw_version: String,
}

impl DeviceInfo {
    pub fn from_state(state: &SpaState) -> Self {
        Self {
            serial_number: state.serial_number.clone(),
            name: "Spa".to_string(),
            manufacturer: MANUFACTURER.to_string(),
            model: "Spa Model Unknown".to_string(),
            sw_version: state.controller_software_version.clone(),
        }
    }
}

/// One configured spa: the client, its cache and the device identity.
///
/// Entity adapters receive `cache()` (and through it `client()`) at
/// construction; nothing is stored globally.
pub struct Integration {
    cache: SpaCache,
    device_info: DeviceInfo,
}

impl Integration {
    /// Log in, load the profile, pick the spa, read its first state and start polling.
    /// Any failure here is a hard stop for setup.
    pub async fn setup(config: SpaConfig) -> Result<Self> {
        config.validate()?;
        let client = Arc::new(config.client_builder().build()?);

        client.login().await?;
        client.fetch_who_am_i().await?;

        if client.spa_id().is_none() {
            let spas = client.list_owned_spas().await?;
            let first = spas
                .first()
                .ok_or_else(|| Error::Config("account owns no spa".to_string()))?;
            if spas.len() > 1 {
                warn!(count = spas.len(), "account owns several spas, using the first");
            }
            client.select_spa(first.id.clone());
        }

        let cache = SpaCache::new(client, config.on_refresh_failure);
        let state = cache.try_refresh().await?;
        let device_info = DeviceInfo::from_state(&state);

        cache.start_periodic_refresh(config.update_interval());
        info!(
            serial = %device_info.serial_number,
            interval_minutes = config.update_interval_minutes,
            "integration ready"
        );

        Ok(Self { cache, device_info })
    }

    pub fn cache(&self) -> &SpaCache {
        &self.cache
    }

    pub fn client(&self) -> &Arc<SpaClient> {
        self.cache.client()
    }

    pub fn device_info(&self) -> &DeviceInfo {
        &self.device_info
    }

    /// Tear down the poller. The cache keeps its last state for readers still holding it.
    pub fn shutdown(&self) {
        self.cache.shutdown();
        info!(serial = %self.device_info.serial_number, "integration unloaded");
    }
}

impl Drop for Integration {
    fn drop(&mut self) {
        self.cache.shutdown();
    }
}
