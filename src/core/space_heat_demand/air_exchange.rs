use crate::core::material_properties::AIR;
use crate::core::units::SECONDS_PER_HOUR;
use crate::errors::ConfigurationError;
use std::fmt::Debug;

/// Anything that moves outdoor air through the zone.
pub trait AirExchange: Debug + Send + Sync {
    /// Thermal conductance of the exchanged air, in W/K
    ///
    /// Arguments:
    /// * `temp_zone` - zone air temperature, in deg C
    /// * `temp_outside` - outdoor air temperature, in deg C
    /// * `wind_speed` - local wind speed, in m/s
    /// * `window_open_fraction` - fraction of openable window area that is open, 0 to 1
    /// * `hvac_is_heating` - whether the HVAC system is delivering heat this step
    fn conductance(
        &self,
        temp_zone: f64,
        temp_outside: f64,
        wind_speed: f64,
        window_open_fraction: f64,
        hvac_is_heating: bool,
    ) -> f64;
}

pub const DEFAULT_PRESSURE_EXPONENT: f64 = 0.65;
pub const DEFAULT_SHELTER_FACTOR: f64 = 1.0;

/// AIM-2 infiltration combined in quadrature with window ventilation.
///
/// Infiltration is suppressed while the HVAC system is heating.
#[derive(Clone, Debug, PartialEq)]
pub struct Aim2AirExchange {
    /// m3/(s.Pa^n)
    flow_coefficient: f64,
    pressure_exponent: f64,
    /// Pa/K
    stack_coefficient: f64,
    /// Pa.s2/m2
    wind_coefficient: f64,
    shelter_factor: f64,
    /// air changes per hour with windows fully open
    open_window_ach: f64,
    zone_volume: f64, // m3
}

impl Aim2AirExchange {
    pub fn new(
        flow_coefficient: f64,
        pressure_exponent: f64,
        stack_coefficient: f64,
        wind_coefficient: f64,
        shelter_factor: f64,
        open_window_ach: f64,
        zone_volume: f64,
    ) -> Result<Self, ConfigurationError> {
        for (parameter, value) in [
            ("flow_coefficient", flow_coefficient),
            ("stack_coefficient", stack_coefficient),
            ("wind_coefficient", wind_coefficient),
            ("shelter_factor", shelter_factor),
            ("open_window_ach", open_window_ach),
        ] {
            if !(value.is_finite() && value >= 0.) {
                return Err(ConfigurationError::invalid(
                    "air exchange",
                    parameter,
                    format!("must not be negative, got {value}"),
                ));
            }
        }
        if !(pressure_exponent > 0. && pressure_exponent <= 1.) {
            return Err(ConfigurationError::invalid(
                "air exchange",
                "pressure_exponent",
                format!("must be greater than 0 and at most 1, got {pressure_exponent}"),
            ));
        }
        if !(zone_volume.is_finite() && zone_volume > 0.) {
            return Err(ConfigurationError::invalid(
                "air exchange",
                "zone_volume",
                format!("must be positive, got {zone_volume}"),
            ));
        }

        Ok(Self {
            flow_coefficient,
            pressure_exponent,
            stack_coefficient,
            wind_coefficient,
            shelter_factor,
            open_window_ach,
            zone_volume,
        })
    }

    /// Infiltration flow from stack and wind pressure, in m3/s
    fn infiltration_rate(&self, temp_zone: f64, temp_outside: f64, wind_speed: f64) -> f64 {
        let delta_p_stack = self.stack_coefficient * (temp_zone - temp_outside).abs();
        let delta_p_wind = self.wind_coefficient * (self.shelter_factor * wind_speed).powi(2);
        let delta_p = delta_p_stack.hypot(delta_p_wind);

        self.flow_coefficient * delta_p.powf(self.pressure_exponent)
    }

    /// Ventilation flow through open windows, in m3/s
    fn ventilation_rate(&self, window_open_fraction: f64) -> f64 {
        if window_open_fraction > 0. {
            self.zone_volume * self.open_window_ach / SECONDS_PER_HOUR as f64
                * window_open_fraction.min(1.)
        } else {
            0.
        }
    }
}

impl AirExchange for Aim2AirExchange {
    fn conductance(
        &self,
        temp_zone: f64,
        temp_outside: f64,
        wind_speed: f64,
        window_open_fraction: f64,
        hvac_is_heating: bool,
    ) -> f64 {
        let infiltration = if hvac_is_heating {
            0.
        } else {
            self.infiltration_rate(temp_zone, temp_outside, wind_speed.max(0.))
        };
        let ventilation = self.ventilation_rate(window_open_fraction);

        infiltration.hypot(ventilation) * AIR.volumetric_heat_capacity()
    }
}
