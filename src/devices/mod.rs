//! Device registry: CRUD client, local collection, filtering and ranking

pub mod collection;
pub mod filter;
pub mod stats;
pub mod types;

pub use collection::DeviceCollection;
pub use filter::{filter, CategoryFilter, FilterState, ALL_CATEGORIES_LABEL};
pub use stats::{
    aggregate, aggregate_with, top_devices, top_n, AggregateStats, PlaceholderDevice,
    RankedDevice, TopDevices, PLACEHOLDER_TOP_DEVICES,
};
pub use types::{Category, Device, DeviceInput, UnknownCategory, DEFAULT_DAILY_USAGE_HOURS};

use reqwest::StatusCode;
use serde_json::Value;

use powerflow_auth::OpaqueId;

use crate::error::{Error, Result};
use crate::fetch::Gateway;
use types::DeviceEnvelope;

const DEVICES_PATH: &str = "/api/dispositivos";

/// Statuses meaning "no device listing here", read as an empty registry
const EMPTY_LISTING_STATUSES: [StatusCode; 3] = [
    StatusCode::NOT_FOUND,
    StatusCode::METHOD_NOT_ALLOWED,
    StatusCode::NOT_IMPLEMENTED,
];

/// Client for `/api/dispositivos`; every call needs a session
#[derive(Debug, Clone)]
pub struct DevicesClient {
    gateway: Gateway,
}

impl DevicesClient {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    fn item_path(id: &OpaqueId) -> String {
        format!("{}/{}", DEVICES_PATH, id)
    }

    /// Every device of the logged-in user
    ///
    /// An object body (the backend's `{"mensaje": ...}` when there is
    /// nothing to list) and a missing listing endpoint both yield an empty
    /// list.
    pub async fn list(&self) -> Result<Vec<Device>> {
        let value = match self.gateway.get(DEVICES_PATH).authenticated().execute_value().await {
            Ok(value) => value,
            Err(Error::Api { status, .. })
                if EMPTY_LISTING_STATUSES
                    .iter()
                    .any(|s| s.as_u16() == status) =>
            {
                log::debug!("device listing unavailable ({}), treating as empty", status);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        match value {
            Value::Array(_) => {
                let devices: Vec<Device> = serde_json::from_value(value)
                    .map_err(|e| Error::malformed(format!("device list: {}", e)))?;
                for device in &devices {
                    device.check().map_err(Error::malformed)?;
                }
                Ok(devices)
            }
            Value::Object(_) | Value::Null => Ok(Vec::new()),
            other => Err(Error::malformed(format!(
                "device list: expected an array, got {}",
                other
            ))),
        }
    }

    /// Register a device; returns it with its new id
    pub async fn create(&self, input: &DeviceInput) -> Result<Device> {
        let envelope: DeviceEnvelope = self
            .gateway
            .post(DEVICES_PATH)
            .authenticated()
            .json(input)?
            .execute()
            .await?;

        let device = envelope.into_device();
        device.check().map_err(Error::malformed)?;
        log::info!("Created device {} ({})", device.id, device.name);
        Ok(device)
    }

    /// Replace every field of device `id`
    ///
    /// Returns the updated device when the backend echoes it; an empty or
    /// message-only body yields `None`.
    pub async fn update(&self, id: &OpaqueId, input: &DeviceInput) -> Result<Option<Device>> {
        let value = self
            .gateway
            .put(&Self::item_path(id))
            .authenticated()
            .json(input)?
            .execute_value()
            .await?;
        log::info!("Updated device {}", id);

        let echoed = match &value {
            Value::Object(map) => map.contains_key("dispositivo") || map.contains_key("id"),
            _ => false,
        };
        if !echoed {
            return Ok(None);
        }

        let device = serde_json::from_value::<DeviceEnvelope>(value)
            .map_err(|e| Error::malformed(format!("updated device: {}", e)))?
            .into_device();
        device.check().map_err(Error::malformed)?;
        Ok(Some(device))
    }

    pub async fn delete(&self, id: &OpaqueId) -> Result<()> {
        self.gateway
            .delete(&Self::item_path(id))
            .authenticated()
            .send()
            .await?;

        log::info!("Deleted device {}", id);
        Ok(())
    }
}
