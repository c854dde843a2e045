//! Types for devices and their wire format

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use powerflow_auth::OpaqueId;

/// Hours assumed when the backend omits `horas_uso_dia`
pub const DEFAULT_DAILY_USAGE_HOURS: f64 = 6.0;

/// Device category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Lighting,
    Climate,
    Appliances,
    Electronics,
    Other,
}

/// A category string outside the enumerated set
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown category: {0}")]
pub struct UnknownCategory(pub String);

impl Category {
    /// Every category, in display order
    pub const ALL: [Category; 5] = [
        Category::Lighting,
        Category::Climate,
        Category::Appliances,
        Category::Electronics,
        Category::Other,
    ];

    /// Wire and display name
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Lighting => "Iluminación",
            Category::Climate => "Climatización",
            Category::Appliances => "Electrodomésticos",
            Category::Electronics => "Electrónica",
            Category::Other => "Otros",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Category::Lighting => "💡",
            Category::Climate => "❄️",
            Category::Appliances => "🧊",
            Category::Electronics => "💻",
            Category::Other => "⚡",
        }
    }

    /// Icon for an optional category; uncategorised devices use the
    /// [`Category::Other`] icon
    pub fn icon_for(category: Option<Category>) -> &'static str {
        category.unwrap_or(Category::Other).icon()
    }
}

/// Lowercase and strip the Spanish accents so "electronica" matches
/// "Electrónica"
pub(crate) fn fold(value: &str) -> String {
    value
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' => 'a',
            'é' => 'e',
            'í' => 'i',
            'ó' => 'o',
            'ú' | 'ü' => 'u',
            other => other,
        })
        .collect()
}

impl FromStr for Category {
    type Err = UnknownCategory;

    /// Case- and accent-insensitive
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded = fold(s);
        Category::ALL
            .iter()
            .copied()
            .find(|c| fold(c.as_str()) == folded)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

/// `null`, a missing field and `""` all mean "no category"; a name outside
/// the fixed set is dropped with a warning so the row still lists
fn optional_category<'de, D>(deserializer: D) -> Result<Option<Category>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => match s.parse::<Category>() {
            Ok(category) => Ok(Some(category)),
            Err(e) => {
                log::warn!("Ignoring device category: {}", e);
                Ok(None)
            }
        },
    }
}

fn default_daily_usage_hours() -> f64 {
    DEFAULT_DAILY_USAGE_HOURS
}

/// A registered household appliance, as stored by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: OpaqueId,

    #[serde(rename = "nombre")]
    pub name: String,

    #[serde(rename = "categoria", default, deserialize_with = "optional_category")]
    pub category: Option<Category>,

    /// Power rating in watts; `None` when unknown
    #[serde(rename = "potencia_watts", default)]
    pub power_watts: Option<f64>,

    #[serde(rename = "horas_uso_dia", default = "default_daily_usage_hours")]
    pub daily_usage_hours: f64,
}

impl Device {
    /// Check the invariants a decoded device must hold
    pub fn check(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err(format!("device {} has an empty name", self.id));
        }
        if let Some(watts) = self.power_watts {
            if !watts.is_finite() || watts < 0.0 {
                return Err(format!("device {} has invalid power {}", self.id, watts));
            }
        }
        if !(0.0..=24.0).contains(&self.daily_usage_hours) {
            return Err(format!(
                "device {} has invalid daily usage {}",
                self.id, self.daily_usage_hours
            ));
        }
        Ok(())
    }

    /// Monthly energy using this device's own daily hours
    pub fn monthly_kwh(&self) -> Option<f64> {
        crate::estimator::estimate_monthly_energy(self.power_watts, self.daily_usage_hours)
    }
}

/// Body sent on create and update
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceInput {
    #[serde(rename = "nombre")]
    pub name: String,

    #[serde(rename = "categoria")]
    pub category: Category,

    /// Serialized as `null` when unknown
    #[serde(rename = "potencia_watts")]
    pub power_watts: Option<f64>,

    #[serde(rename = "horas_uso_dia")]
    pub daily_usage_hours: f64,
}

/// Single-device responses come either bare or wrapped with a message
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum DeviceEnvelope {
    Wrapped {
        #[serde(rename = "dispositivo")]
        device: Device,
    },
    Bare(Device),
}

impl DeviceEnvelope {
    pub(crate) fn into_device(self) -> Device {
        match self {
            DeviceEnvelope::Wrapped { device } | DeviceEnvelope::Bare(device) => device,
        }
    }
}
