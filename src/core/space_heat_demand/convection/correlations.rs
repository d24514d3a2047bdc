//! Film coefficient correlations used by the adaptive convection algorithms.
//!
//! All functions return a convective heat transfer coefficient in W/(m2.K).

use crate::core::space_heat_demand::surface::SurfaceGeometry;
use crate::core::units::incidence_angle;
use crate::external_conditions::WeatherSample;
use strum::{Display, EnumString};

/// Below this temperature difference the natural convection term is zero (the cube root has an
/// infinite gradient at zero).
pub const MIN_NATURAL_DELTA_T: f64 = 1e-6;

/// Wind-driven (forced) correlations. These need a natural convection partner.
#[derive(Clone, Copy, Debug, Display, EnumString, Eq, PartialEq)]
pub enum ForcedCorrelation {
    SparrowWindward,
    SparrowLeeward,
    BlockenWindward,
    EmmelVertical,
    EmmelRoof,
    Mitchell,
}

impl ForcedCorrelation {
    /// Arguments:
    /// * `geometry` - the surface being exposed to wind
    /// * `weather` - current weather
    /// * `building_volume` - volume of the whole building, in m3 (only used by Mitchell)
    pub fn coefficient(
        &self,
        geometry: &SurfaceGeometry,
        weather: &WeatherSample,
        building_volume: f64,
    ) -> f64 {
        let wind_local = weather.wind_speed_local_ms.max(0.);
        let wind_10m = weather.wind_speed_10m_ms.max(0.);
        let theta = incidence_angle(weather.wind_direction_deg, geometry.azimuth);

        match self {
            Self::SparrowWindward => sparrow_windward(geometry, wind_local),
            Self::SparrowLeeward => 0.5 * sparrow_windward(geometry, wind_local),
            Self::BlockenWindward => {
                let (a, b) = if theta <= 11.25 {
                    (4.6, 0.89)
                } else if theta <= 33.75 {
                    (5.0, 0.80)
                } else if theta <= 56.25 {
                    (4.6, 0.84)
                } else {
                    (4.5, 0.81)
                };
                a * wind_10m.powf(b)
            }
            Self::EmmelVertical => {
                let (a, b) = if theta <= 22.5 {
                    (3.34, 0.84)
                } else if theta <= 67.5 {
                    (4.78, 0.71)
                } else if theta <= 112.5 {
                    (4.05, 0.77)
                } else if theta <= 157.5 {
                    (3.54, 0.16)
                } else {
                    (3.34, 0.84)
                };
                a * wind_10m.powf(b)
            }
            Self::EmmelRoof => {
                let (a, b) = if theta <= 22.5 {
                    (5.11, 0.78)
                } else if theta <= 67.5 {
                    (4.60, 0.79)
                } else {
                    (3.67, 0.85)
                };
                a * wind_10m.powf(b)
            }
            Self::Mitchell => {
                let characteristic_length = building_volume.cbrt();
                8.6 * wind_local.powf(0.6) / characteristic_length.powf(0.4)
            }
        }
    }
}

fn sparrow_windward(geometry: &SurfaceGeometry, wind_local: f64) -> f64 {
    let pv_over_a = geometry.perimeter * wind_local / geometry.area;
    if pv_over_a > 0. {
        2.537 * geometry.roughness.multiplier() * pv_over_a.sqrt()
    } else {
        0.
    }
}

/// Buoyancy-driven (natural) correlations.
#[derive(Clone, Copy, Debug, Display, EnumString, Eq, PartialEq)]
pub enum NaturalCorrelation {
    ASHRAEVerticalWall,
    WaltonUnstableHorizontalOrTilt,
    WaltonStableHorizontalOrTilt,
}

impl NaturalCorrelation {
    /// Arguments:
    /// * `delta_t` - surface temperature minus air temperature, in K (only the magnitude is used)
    /// * `tilt` - surface tilt, in degrees
    pub fn coefficient(&self, delta_t: f64, tilt: f64) -> f64 {
        let delta_t = delta_t.abs();
        if !(delta_t >= MIN_NATURAL_DELTA_T) {
            return 0.;
        }
        let cos_tilt = tilt.to_radians().cos().abs();

        match self {
            Self::ASHRAEVerticalWall => 1.31 * delta_t.cbrt(),
            Self::WaltonUnstableHorizontalOrTilt => 9.482 * delta_t.cbrt() / (7.238 - cos_tilt),
            Self::WaltonStableHorizontalOrTilt => 1.810 * delta_t.cbrt() / (1.382 + cos_tilt),
        }
    }
}

/// Correlations that already include both the forced and natural parts.
#[derive(Clone, Copy, Debug, Display, EnumString, Eq, PartialEq)]
pub enum CombinedCorrelation {
    MoWITTWindward,
    MoWITTLeeward,
    NusseltJurges,
    McAdams,
}

impl CombinedCorrelation {
    /// Arguments:
    /// * `delta_t` - surface temperature minus outdoor air temperature, in K
    /// * `wind_local` - wind speed at the surface, in m/s
    pub fn coefficient(&self, delta_t: f64, wind_local: f64) -> f64 {
        let wind_local = wind_local.max(0.);
        let mowitt_natural = || {
            let delta_t = delta_t.abs();
            if delta_t >= MIN_NATURAL_DELTA_T {
                0.84 * delta_t.cbrt()
            } else {
                0.
            }
        };

        match self {
            Self::MoWITTWindward => combine(3.26 * wind_local.powf(0.89), mowitt_natural()),
            Self::MoWITTLeeward => combine(3.55 * wind_local.powf(0.617), mowitt_natural()),
            Self::NusseltJurges => 5.8 + 3.94 * wind_local,
            Self::McAdams => 5.7 + 3.8 * wind_local,
        }
    }
}

/// Combine a forced and a natural coefficient as the root of the sum of squares.
pub fn combine(h_forced: f64, h_natural: f64) -> f64 {
    h_forced.hypot(h_natural)
}
