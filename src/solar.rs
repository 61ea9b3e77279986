//! Downstream arithmetic over logged PAR readings: irradiance conversion,
//! energy estimation, and solar panel output projection. Pure functions, no
//! protocol dependency.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Photon flux per unit energy for daylight, µmol J⁻¹. Dividing a PPFD
/// reading (µmol m⁻² s⁻¹) by this yields shortwave irradiance in W m⁻².
pub const SUNLIGHT_UMOL_PER_JOULE: f32 = 4.57;

/// Cadence of the on-device log; each retrieved entry covers one minute.
pub const LOG_INTERVAL: Duration = Duration::from_secs(60);

/// Converts a PPFD reading to irradiance in W m⁻².
pub fn ppfd_to_irradiance(ppfd: f32) -> f32 {
    ppfd / SUNLIGHT_UMOL_PER_JOULE
}

/// Panel parameters for output projection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PanelSpec {
    /// Panel surface in m².
    pub area_m2: f32,
    /// Module conversion efficiency, 0..1.
    pub efficiency: f32,
    /// System losses factor (inverter, wiring, soiling), 0..1.
    pub performance_ratio: f32,
}

impl Default for PanelSpec {
    fn default() -> Self {
        Self {
            area_m2: 1.6,
            efficiency: 0.20,
            performance_ratio: 0.75,
        }
    }
}

/// Integrates a series of PPFD readings taken at `sample_interval` into
/// incident energy per square meter, in kWh m⁻².
pub fn estimate_kwh_per_m2(ppfd_series: &[f32], sample_interval: Duration) -> f64 {
    let hours = sample_interval.as_secs_f64() / 3600.0;
    let watt_hours: f64 = ppfd_series
        .iter()
        .map(|&ppfd| f64::from(ppfd_to_irradiance(ppfd)) * hours)
        .sum();
    watt_hours / 1000.0
}

/// Projects the energy a panel would have produced from the incident energy.
pub fn project_panel_output_kwh(kwh_per_m2: f64, panel: &PanelSpec) -> f64 {
    kwh_per_m2
        * f64::from(panel.area_m2)
        * f64::from(panel.efficiency)
        * f64::from(panel.performance_ratio)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ppfd_to_irradiance() {
        assert!((ppfd_to_irradiance(457.0) - 100.0).abs() < 1e-3);
        assert_eq!(ppfd_to_irradiance(0.0), 0.0);
    }

    #[test]
    fn test_constant_series_matches_closed_form() {
        // One hour of one-minute samples at a constant 457 µmol m⁻² s⁻¹ is
        // 100 W m⁻² for an hour: 0.1 kWh m⁻².
        let series = vec![457.0f32; 60];
        let kwh = estimate_kwh_per_m2(&series, LOG_INTERVAL);
        assert!((kwh - 0.1).abs() < 1e-6, "got {kwh}");
    }

    #[test]
    fn test_empty_series_is_zero_energy() {
        assert_eq!(estimate_kwh_per_m2(&[], LOG_INTERVAL), 0.0);
    }

    #[test]
    fn test_panel_projection_scales_by_area_and_losses() {
        let panel = PanelSpec {
            area_m2: 2.0,
            efficiency: 0.25,
            performance_ratio: 0.8,
        };
        let out = project_panel_output_kwh(1.0, &panel);
        assert!((out - 0.4).abs() < 1e-9);
    }
}
