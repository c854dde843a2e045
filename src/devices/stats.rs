//! Ranking and summary figures for the dashboard

use std::cmp::Ordering;

use super::types::Device;
use crate::estimator::{
    estimate_monthly_cost, estimate_monthly_energy, DEFAULT_RATE_PER_KWH, SUMMARY_USAGE_HOURS,
};

/// Stand-in row for the top-devices card when there is no data
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaceholderDevice {
    pub name: &'static str,
    pub monthly_kwh: f64,
}

/// Representative device types shown before any device is registered
pub const PLACEHOLDER_TOP_DEVICES: [PlaceholderDevice; 3] = [
    PlaceholderDevice {
        name: "Aire acondicionado",
        monthly_kwh: 90.0,
    },
    PlaceholderDevice {
        name: "Refrigerador",
        monthly_kwh: 60.0,
    },
    PlaceholderDevice {
        name: "Iluminación",
        monthly_kwh: 25.0,
    },
];

/// A real device in the ranking, with its summary estimate
#[derive(Debug, Clone, PartialEq)]
pub struct RankedDevice<'a> {
    pub device: &'a Device,
    pub monthly_kwh: Option<f64>,
}

/// Contents of the top-devices card
#[derive(Debug, Clone, PartialEq)]
pub enum TopDevices<'a> {
    Ranked(Vec<RankedDevice<'a>>),
    /// Display-only sample rows; not user data
    Placeholder(Vec<PlaceholderDevice>),
}

impl TopDevices<'_> {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, TopDevices::Placeholder(_))
    }

    /// `(name, monthly kWh)` rows for rendering
    pub fn rows(&self) -> Vec<(String, Option<f64>)> {
        match self {
            TopDevices::Ranked(ranked) => ranked
                .iter()
                .map(|r| (r.device.name.clone(), r.monthly_kwh))
                .collect(),
            TopDevices::Placeholder(rows) => rows
                .iter()
                .map(|p| (p.name.to_string(), Some(p.monthly_kwh)))
                .collect(),
        }
    }
}

fn power_key(device: &Device) -> f64 {
    device.power_watts.unwrap_or(f64::NEG_INFINITY)
}

/// The `n` most powerful devices, highest first
///
/// Works on a copy of the references; ties and unknown ratings keep their
/// input order, unknown ratings after every known one.
pub fn top_n(devices: &[Device], n: usize) -> Vec<&Device> {
    let mut ranked: Vec<&Device> = devices.iter().collect();
    ranked.sort_by(|a, b| {
        power_key(b)
            .partial_cmp(&power_key(a))
            .unwrap_or(Ordering::Equal)
    });
    ranked.truncate(n);
    ranked
}

/// [`top_n`] with summary estimates, falling back to
/// [`PLACEHOLDER_TOP_DEVICES`] when there are no devices
pub fn top_devices(devices: Option<&[Device]>, n: usize, usage_hours: f64) -> TopDevices<'_> {
    match devices {
        Some(devices) if !devices.is_empty() => TopDevices::Ranked(
            top_n(devices, n)
                .into_iter()
                .map(|device| RankedDevice {
                    device,
                    monthly_kwh: estimate_monthly_energy(device.power_watts, usage_hours),
                })
                .collect(),
        ),
        _ => TopDevices::Placeholder(PLACEHOLDER_TOP_DEVICES.iter().take(n).copied().collect()),
    }
}

/// Summary card figures
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateStats {
    pub count: usize,
    pub total_monthly_kwh: f64,
    pub total_monthly_cost: f64,
}

/// Summary over `devices` at the fixed [`SUMMARY_USAGE_HOURS`] and
/// [`DEFAULT_RATE_PER_KWH`]
///
/// Every device is assumed to run 6 hours a day here, whatever hours it
/// stores. Devices with unknown power contribute nothing.
pub fn aggregate(devices: &[Device]) -> AggregateStats {
    aggregate_with(devices, SUMMARY_USAGE_HOURS, DEFAULT_RATE_PER_KWH)
}

/// [`aggregate`] with explicit assumed hours and tariff
pub fn aggregate_with(devices: &[Device], usage_hours: f64, rate_per_kwh: f64) -> AggregateStats {
    let total_monthly_kwh: f64 = devices
        .iter()
        .filter_map(|d| estimate_monthly_energy(d.power_watts, usage_hours))
        .sum();

    AggregateStats {
        count: devices.len(),
        total_monthly_kwh,
        total_monthly_cost: estimate_monthly_cost(total_monthly_kwh, rate_per_kwh),
    }
}
