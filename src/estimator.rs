//! Naive monthly consumption and cost estimates
//!
//! Values are never rounded here; use the `format_*` helpers when
//! displaying them.

/// Days in the estimation month
pub const DAYS_PER_MONTH: f64 = 30.0;

/// Default tariff, Lempiras per kWh
pub const DEFAULT_RATE_PER_KWH: f64 = 3.7;

/// Daily usage assumed for every device in the summary figures,
/// regardless of the hours stored on the device
pub const SUMMARY_USAGE_HOURS: f64 = 6.0;

/// Currency prefix used when formatting costs
pub const CURRENCY_PREFIX: &str = "L";

/// Monthly energy in kWh, or `None` when the power rating is unknown
///
/// Inputs are assumed non-negative; form validation rejects anything else
/// before it gets here.
pub fn estimate_monthly_energy(power_watts: Option<f64>, daily_usage_hours: f64) -> Option<f64> {
    power_watts.map(|watts| watts * daily_usage_hours * DAYS_PER_MONTH / 1000.0)
}

/// Monthly cost for `kwh` at `rate_per_kwh`
pub fn estimate_monthly_cost(kwh: f64, rate_per_kwh: f64) -> f64 {
    kwh * rate_per_kwh
}

/// Monthly cost at [`DEFAULT_RATE_PER_KWH`]
pub fn estimate_monthly_cost_default(kwh: f64) -> f64 {
    estimate_monthly_cost(kwh, DEFAULT_RATE_PER_KWH)
}

/// "12.35 kWh", or "N/A" for an unknown estimate
pub fn format_kwh(kwh: Option<f64>) -> String {
    match kwh {
        Some(kwh) => format!("{:.2} kWh", kwh),
        None => "N/A".to_string(),
    }
}

/// "L 45.69"
pub fn format_cost(cost: f64) -> String {
    format!("{} {:.2}", CURRENCY_PREFIX, cost)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_energy_formula() {
        assert_eq!(estimate_monthly_energy(Some(60.0), 5.0), Some(9.0));
        assert_eq!(estimate_monthly_energy(Some(1500.0), 6.0), Some(270.0));
        assert_eq!(estimate_monthly_energy(None, 6.0), None);
    }

    #[test]
    fn test_zero_inputs_are_zero_not_unknown() {
        for h in [0.0, 0.5, 6.0, 24.0] {
            assert_eq!(estimate_monthly_energy(Some(0.0), h), Some(0.0));
        }
        for p in [0.0, 1.0, 60.0, 3500.0] {
            assert_eq!(estimate_monthly_energy(Some(p), 0.0), Some(0.0));
        }
    }

    #[test]
    fn test_energy_is_monotone() {
        let powers = [0.0, 1.0, 10.0, 60.0, 100.0, 1500.0, 5000.0];
        let hours = [0.0, 0.5, 1.0, 6.0, 12.0, 23.5, 24.0];

        for pair in powers.windows(2) {
            for h in hours {
                let lower = estimate_monthly_energy(Some(pair[0]), h).unwrap();
                let upper = estimate_monthly_energy(Some(pair[1]), h).unwrap();
                assert!(lower <= upper, "power {:?} at {}h", pair, h);
            }
        }

        for pair in hours.windows(2) {
            for p in powers {
                let lower = estimate_monthly_energy(Some(p), pair[0]).unwrap();
                let upper = estimate_monthly_energy(Some(p), pair[1]).unwrap();
                assert!(lower <= upper, "hours {:?} at {}W", pair, p);
            }
        }
    }

    #[test]
    fn test_cost() {
        assert_eq!(estimate_monthly_cost(100.0, 2.0), 200.0);
        assert!((estimate_monthly_cost_default(270.0) - 999.0).abs() < 1e-9);
    }

    #[test]
    fn test_formatting_rounds_only_for_display() {
        let kwh = estimate_monthly_energy(Some(33.0), 1.3).unwrap();
        assert!((kwh - 1.287).abs() < 1e-12);
        assert_eq!(format_kwh(Some(kwh)), "1.29 kWh");
        assert_eq!(format_kwh(None), "N/A");
        assert_eq!(format_cost(999.0), "L 999.00");
    }
}
