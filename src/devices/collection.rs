//! Local mirror of the backend device registry

use std::collections::HashSet;

use powerflow_auth::OpaqueId;

use super::filter::FilterState;
use super::stats::{aggregate_with, top_devices, AggregateStats, TopDevices};
use super::types::Device;
use super::DevicesClient;
use crate::error::{Error, Result};
use crate::validation::DeviceForm;

/// Cached device list, replaced wholesale from the backend after every
/// mutation and never patched locally
#[derive(Debug, Clone, Default)]
pub struct DeviceCollection {
    devices: Vec<Device>,
    loaded: bool,
}

impl DeviceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// False until the first successful fetch
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn get(&self, id: &OpaqueId) -> Option<&Device> {
        self.devices.iter().find(|d| &d.id == id)
    }

    /// Replace the whole list; a repeated id keeps its first occurrence
    pub fn replace(&mut self, devices: Vec<Device>) {
        let mut seen = HashSet::new();
        let mut unique = Vec::with_capacity(devices.len());

        for device in devices {
            if seen.insert(device.id.clone()) {
                unique.push(device);
            } else {
                log::warn!("Dropping duplicate device id {}", device.id);
            }
        }

        self.devices = unique;
        self.loaded = true;
    }

    /// Forget everything, as after a logout
    pub fn clear(&mut self) {
        self.devices.clear();
        self.loaded = false;
    }

    pub fn filtered(&self, filter: &FilterState) -> Vec<&Device> {
        filter.apply(&self.devices)
    }

    /// Top-devices card; placeholder rows until something is registered
    pub fn top(&self, n: usize, usage_hours: f64) -> TopDevices<'_> {
        top_devices(Some(self.devices.as_slice()), n, usage_hours)
    }

    pub fn stats(&self, usage_hours: f64, rate_per_kwh: f64) -> AggregateStats {
        aggregate_with(&self.devices, usage_hours, rate_per_kwh)
    }

    /// A 401 clears the collection along with the session
    fn forget_on_logout<T>(&mut self, result: Result<T>) -> Result<T> {
        if matches!(result, Err(Error::Unauthorized)) {
            self.clear();
        }
        result
    }

    /// Re-fetch the list from the backend
    pub async fn refresh(&mut self, client: &DevicesClient) -> Result<()> {
        let devices = self.forget_on_logout(client.list().await)?;
        log::debug!("Fetched {} devices", devices.len());
        self.replace(devices);
        Ok(())
    }

    /// Validate `form`, create the device, then refresh
    pub async fn create(&mut self, client: &DevicesClient, form: &DeviceForm) -> Result<Device> {
        let input = form.to_input().map_err(Error::Validation)?;
        let created = self.forget_on_logout(client.create(&input).await)?;
        self.refresh(client).await?;
        Ok(created)
    }

    /// Validate `form`, update device `id`, then refresh
    pub async fn update(
        &mut self,
        client: &DevicesClient,
        id: &OpaqueId,
        form: &DeviceForm,
    ) -> Result<()> {
        let input = form.to_input().map_err(Error::Validation)?;
        self.forget_on_logout(client.update(id, &input).await)?;
        self.refresh(client).await
    }

    /// Delete device `id`, then refresh
    pub async fn delete(&mut self, client: &DevicesClient, id: &OpaqueId) -> Result<()> {
        self.forget_on_logout(client.delete(id).await)?;
        self.refresh(client).await
    }
}
