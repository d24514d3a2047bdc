use crate::core::units::HOURS_PER_DAY;
use crate::simulation_time::{SimulationTime, SimulationTimeIteration};
use anyhow::bail;
use serde::{Deserialize, Serialize};
use serde_valid::Validate;
use std::f64::consts::PI;

/// Sky temperature depression below outdoor air used when no sky temperature is supplied, in K
pub const TEMP_DIFF_SKY: f64 = 11.0;

/// Outdoor conditions for a single timestep.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct WeatherSample {
    pub air_temp_c: f64,
    pub wind_speed_local_ms: f64,
    pub wind_speed_10m_ms: f64,
    /// direction the wind blows from, clockwise from North, in degrees
    pub wind_direction_deg: f64,
    pub solar_irradiance_w_m2: f64,
}

/// A repeating design day: sinusoidal air temperature, a half-cosine of solar irradiance peaking at
/// noon, and constant wind.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, Validate)]
#[serde(deny_unknown_fields, rename_all = "PascalCase")]
pub struct SyntheticWeather {
    /// deg C
    pub temp_base: f64,
    /// K
    #[validate(minimum = 0.)]
    pub temp_amplitude: f64,
    /// hour of day at which the air is warmest
    #[serde(default = "default_temp_phase_shift")]
    pub temp_phase_shift_hours: f64,
    /// W/m2
    #[validate(minimum = 0.)]
    pub solar_max_irradiance: f64,
    #[serde(default = "default_wind_speed_local")]
    #[validate(minimum = 0.)]
    pub wind_speed_local: f64,
    #[serde(default = "default_wind_speed_10m")]
    #[validate(minimum = 0.)]
    pub wind_speed_10m: f64,
    #[serde(default = "default_wind_direction")]
    pub wind_direction: f64,
}

fn default_temp_phase_shift() -> f64 {
    15.
}

fn default_wind_speed_local() -> f64 {
    3.
}

fn default_wind_speed_10m() -> f64 {
    2.5
}

fn default_wind_direction() -> f64 {
    180.
}

impl SyntheticWeather {
    pub fn sample_at(&self, time: f64) -> WeatherSample {
        let day_fraction = |hours: f64| 2. * PI * hours / HOURS_PER_DAY as f64;

        WeatherSample {
            air_temp_c: self.temp_base
                + self.temp_amplitude * day_fraction(time - self.temp_phase_shift_hours).cos(),
            wind_speed_local_ms: self.wind_speed_local,
            wind_speed_10m_ms: self.wind_speed_10m,
            wind_direction_deg: self.wind_direction,
            solar_irradiance_w_m2: (self.solar_max_irradiance * day_fraction(time - 12.).cos())
                .max(0.),
        }
    }
}

/// Per-timestep weather series, one entry per simulation timestep.
#[derive(Clone, Debug)]
pub struct ExternalConditions {
    air_temps: Vec<f64>,
    wind_speeds_local: Vec<f64>,
    wind_speeds_10m: Vec<f64>,
    wind_directions: Vec<f64>,
    solar_irradiances: Vec<f64>,
    sky_temps: Option<Vec<f64>>,
}

/// Arguments:
/// * `air_temps` - outdoor air temperatures, in deg C
/// * `wind_speeds_local` - wind speeds at the building, in m/s
/// * `wind_speeds_10m` - wind speeds at 10 m height, in m/s
/// * `wind_directions` - wind directions in degrees where North=0, East=90, South=180, West=270
/// * `solar_irradiances` - solar irradiance on the glazing, in W/m2
/// * `sky_temps` - effective sky temperatures, in deg C (defaults to air temperature less
///                 `TEMP_DIFF_SKY`)
impl ExternalConditions {
    pub fn new(
        air_temps: Vec<f64>,
        wind_speeds_local: Vec<f64>,
        wind_speeds_10m: Vec<f64>,
        wind_directions: Vec<f64>,
        solar_irradiances: Vec<f64>,
        sky_temps: Option<Vec<f64>>,
    ) -> anyhow::Result<Self> {
        let len = air_temps.len();
        if len == 0 {
            bail!("External conditions must contain at least one timestep");
        }
        for (name, series_len) in [
            ("wind_speeds_local", wind_speeds_local.len()),
            ("wind_speeds_10m", wind_speeds_10m.len()),
            ("wind_directions", wind_directions.len()),
            ("solar_irradiances", solar_irradiances.len()),
            ("sky_temps", sky_temps.as_ref().map_or(len, Vec::len)),
        ] {
            if series_len != len {
                bail!("External condition series '{name}' has {series_len} entries, expected {len} to match air temperatures");
            }
        }
        if air_temps
            .iter()
            .chain(wind_speeds_local.iter())
            .chain(wind_speeds_10m.iter())
            .chain(wind_directions.iter())
            .chain(solar_irradiances.iter())
            .chain(sky_temps.iter().flatten())
            .any(|value| !value.is_finite())
        {
            bail!("External conditions contain non-finite values");
        }
        if wind_speeds_local
            .iter()
            .chain(wind_speeds_10m.iter())
            .chain(solar_irradiances.iter())
            .any(|value| *value < 0.)
        {
            bail!("Wind speeds and solar irradiance cannot be negative");
        }

        Ok(Self {
            air_temps,
            wind_speeds_local,
            wind_speeds_10m,
            wind_directions,
            solar_irradiances,
            sky_temps,
        })
    }

    /// Constant conditions for `steps` timesteps
    pub fn constant(sample: WeatherSample, steps: usize) -> Self {
        Self {
            air_temps: vec![sample.air_temp_c; steps],
            wind_speeds_local: vec![sample.wind_speed_local_ms; steps],
            wind_speeds_10m: vec![sample.wind_speed_10m_ms; steps],
            wind_directions: vec![sample.wind_direction_deg; steps],
            solar_irradiances: vec![sample.solar_irradiance_w_m2; steps],
            sky_temps: None,
        }
    }

    /// Sample a synthetic design day at each timestep of the simulation
    pub fn synthetic(weather: &SyntheticWeather, simulation_time: &SimulationTime) -> Self {
        let samples: Vec<WeatherSample> = simulation_time
            .iter()
            .map(|t_it| weather.sample_at(t_it.time))
            .collect();

        Self {
            air_temps: samples.iter().map(|sample| sample.air_temp_c).collect(),
            wind_speeds_local: samples.iter().map(|sample| sample.wind_speed_local_ms).collect(),
            wind_speeds_10m: samples.iter().map(|sample| sample.wind_speed_10m_ms).collect(),
            wind_directions: samples.iter().map(|sample| sample.wind_direction_deg).collect(),
            solar_irradiances: samples
                .iter()
                .map(|sample| sample.solar_irradiance_w_m2)
                .collect(),
            sky_temps: None,
        }
    }

    pub fn len(&self) -> usize {
        self.air_temps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.air_temps.is_empty()
    }

    pub fn air_temp(&self, simulation_time: &SimulationTimeIteration) -> f64 {
        self.air_temps[simulation_time.index]
    }

    pub fn sample(&self, simulation_time: &SimulationTimeIteration) -> WeatherSample {
        self.sample_for_timestep_idx(simulation_time.index)
    }

    pub fn sample_for_timestep_idx(&self, timestep_idx: usize) -> WeatherSample {
        WeatherSample {
            air_temp_c: self.air_temps[timestep_idx],
            wind_speed_local_ms: self.wind_speeds_local[timestep_idx],
            wind_speed_10m_ms: self.wind_speeds_10m[timestep_idx],
            wind_direction_deg: self.wind_directions[timestep_idx],
            solar_irradiance_w_m2: self.solar_irradiances[timestep_idx],
        }
    }

    pub fn sky_temp_for_timestep_idx(&self, timestep_idx: usize) -> f64 {
        match &self.sky_temps {
            Some(sky_temps) => sky_temps[timestep_idx],
            None => self.air_temps[timestep_idx] - TEMP_DIFF_SKY,
        }
    }
}
