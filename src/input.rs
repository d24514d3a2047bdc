use crate::core::schedule::{NumericSchedule, OccupancySchedule};
use crate::core::space_heat_demand::surface::SurfaceType;
use crate::external_conditions::SyntheticWeather;
use crate::simulation_time::SimulationTime;
use anyhow::anyhow;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_valid::Validate;
use std::io::{BufReader, Read};

/// Read and validate a JSON project description.
pub fn ingest(json: impl Read) -> anyhow::Result<Input> {
    let reader = BufReader::new(json);
    let input: Input = serde_json::from_reader(reader)?;
    input
        .validate()
        .map_err(|errors| anyhow!("Input failed validation: {errors}"))?;
    for (name, material) in &input.materials {
        material
            .validate()
            .map_err(|errors| anyhow!("Material '{name}' failed validation: {errors}"))?;
    }

    Ok(input)
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct Input {
    #[validate]
    pub simulation_time: SimulationTime,
    #[validate]
    pub external_conditions: ExternalConditionsInput,
    /// validated per entry in [`ingest`]
    pub materials: IndexMap<String, MaterialInput>,
    /// material names for each construction, outside to inside
    pub constructions: IndexMap<String, Vec<String>>,
    #[validate]
    pub zone: ZoneInput,
    #[serde(default)]
    #[validate]
    pub windows: Vec<WindowInput>,
    #[validate]
    pub air_exchange: Option<AirExchangeInput>,
    #[serde(default)]
    pub convection: ConvectionInput,
    #[serde(rename = "HVAC")]
    #[validate]
    pub hvac: HvacInput,
    #[validate]
    pub control_schedule: ControlScheduleInput,
    #[serde(default = "default_warmup_days")]
    pub warmup_days: u32,
    #[serde(default)]
    #[validate]
    pub solver: SolverInput,
    #[serde(default)]
    #[validate]
    pub longwave: Vec<LongwaveInput>,
}

fn default_warmup_days() -> u32 {
    3
}

/// Either full per-step series or a synthetic design day.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct ExternalConditionsInput {
    pub air_temperatures: Option<Vec<f64>>,
    pub wind_speeds_local: Option<Vec<f64>>,
    pub wind_speeds_10m: Option<Vec<f64>>,
    pub wind_directions: Option<Vec<f64>>,
    pub solar_irradiances: Option<Vec<f64>>,
    pub sky_temperatures: Option<Vec<f64>>,
    #[validate]
    pub synthetic: Option<SyntheticWeather>,
}

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct MaterialInput {
    /// m
    #[validate(exclusive_minimum = 0.)]
    pub thickness: f64,
    /// W/(m.K)
    #[validate(exclusive_minimum = 0.)]
    pub conductivity: f64,
    /// kg/m3
    #[validate(exclusive_minimum = 0.)]
    pub density: f64,
    /// J/(kg.K)
    #[validate(exclusive_minimum = 0.)]
    pub specific_heat: f64,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct ZoneInput {
    /// m3; derived from the dimensions for a box zone
    #[validate(exclusive_minimum = 0.)]
    pub volume: Option<f64>,
    #[serde(default = "default_capacity_multiplier")]
    #[validate(exclusive_minimum = 0.)]
    pub capacity_multiplier: f64,
    #[validate]
    pub surfaces: Option<Vec<SurfaceInput>>,
    #[serde(rename = "Box")]
    #[validate]
    pub box_geometry: Option<BoxZoneInput>,
}

fn default_capacity_multiplier() -> f64 {
    1.
}

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct SurfaceInput {
    pub name: String,
    #[serde(rename = "Type")]
    pub surface_type: SurfaceType,
    #[validate(exclusive_minimum = 0.)]
    pub area: f64,
    #[validate(minimum = 0.)]
    pub perimeter: f64,
    #[validate(minimum = 0.)]
    #[validate(maximum = 180.)]
    pub tilt: f64,
    pub azimuth: f64,
    #[validate(minimum = 1)]
    #[validate(maximum = 6)]
    pub roughness: u8,
    #[serde(default)]
    pub exterior: bool,
    pub construction: String,
}

/// A rectangular zone with walls facing the four compass points.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct BoxZoneInput {
    /// east-west extent, in m
    #[validate(exclusive_minimum = 0.)]
    pub length: f64,
    /// north-south extent, in m
    #[validate(exclusive_minimum = 0.)]
    pub width: f64,
    #[validate(exclusive_minimum = 0.)]
    pub height: f64,
    pub construction: String,
    /// names of the generated surfaces exposed to outdoor air
    pub exterior_surfaces: Vec<String>,
}

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct WindowInput {
    pub name: String,
    #[validate(exclusive_minimum = 0.)]
    pub area: f64,
    #[serde(rename = "UValue")]
    #[validate(exclusive_minimum = 0.)]
    pub u_value: f64,
    #[serde(rename = "SHGC")]
    #[validate(exclusive_minimum = 0.)]
    #[validate(maximum = 1.)]
    pub shgc: f64,
    /// surface the window is set into; its area is reduced by the window area
    pub parent_surface: Option<String>,
    /// share of transmitted solar absorbed by each named surface
    #[serde(default)]
    pub solar_distribution: IndexMap<String, f64>,
}

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct AirExchangeInput {
    #[validate(minimum = 0.)]
    pub flow_coefficient: f64,
    #[serde(default = "default_pressure_exponent")]
    #[validate(exclusive_minimum = 0.)]
    #[validate(maximum = 1.)]
    pub pressure_exponent: f64,
    #[validate(minimum = 0.)]
    pub stack_coefficient: f64,
    #[validate(minimum = 0.)]
    pub wind_coefficient: f64,
    #[serde(default = "default_shelter_factor")]
    #[validate(minimum = 0.)]
    pub shelter_factor: f64,
    /// air changes per hour with windows fully open
    #[serde(default, rename = "OpenWindowACH")]
    #[validate(minimum = 0.)]
    pub open_window_ach: f64,
}

fn default_pressure_exponent() -> f64 {
    crate::core::space_heat_demand::air_exchange::DEFAULT_PRESSURE_EXPONENT
}

fn default_shelter_factor() -> f64 {
    crate::core::space_heat_demand::air_exchange::DEFAULT_SHELTER_FACTOR
}

/// Correlation names per classification; an empty map keeps the built-in assignment.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct ConvectionInput {
    #[serde(default)]
    pub exterior_forced: IndexMap<String, String>,
    #[serde(default)]
    pub exterior_natural: IndexMap<String, String>,
    #[serde(default)]
    pub interior: IndexMap<String, String>,
    /// m3; defaults to the zone volume
    pub building_volume: Option<f64>,
}

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct HvacInput {
    #[serde(rename = "type")]
    pub controller_type: String,
    /// W; unlimited when absent
    #[validate(minimum = 0.)]
    pub heating_capacity: Option<f64>,
    /// W; unlimited when absent
    #[validate(minimum = 0.)]
    pub cooling_capacity: Option<f64>,
    /// W/K
    pub proportional_gain: Option<f64>,
    /// K
    pub deadband: Option<f64>,
    pub min_off_steps: Option<u32>,
    pub min_run_steps: Option<u32>,
    pub ramp_steps: Option<u32>,
    pub kp: Option<f64>,
    pub ki: Option<f64>,
    pub kd: Option<f64>,
}

/// Per-step setpoints, gains and window openings, as an occupancy schedule or as series.
#[derive(Clone, Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct ControlScheduleInput {
    #[validate]
    pub occupancy: Option<OccupancySchedule>,
    pub(crate) heating_setpoint: Option<NumericSchedule>,
    pub(crate) cooling_setpoint: Option<NumericSchedule>,
    pub(crate) internal_gains: Option<NumericSchedule>,
    pub(crate) window_opening: Option<NumericSchedule>,
}

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct SolverInput {
    #[serde(default = "default_max_iterations")]
    #[validate(minimum = 1)]
    pub max_iterations: usize,
    /// K
    #[serde(default = "default_tolerance")]
    #[validate(exclusive_minimum = 0.)]
    pub tolerance: f64,
    #[serde(default = "default_fourier_number")]
    #[validate(exclusive_minimum = 0.)]
    pub fourier_number: f64,
}

fn default_max_iterations() -> usize {
    10
}

fn default_tolerance() -> f64 {
    0.01
}

fn default_fourier_number() -> f64 {
    crate::core::space_heat_demand::fabric::DEFAULT_FOURIER_NUMBER
}

impl Default for SolverInput {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
            fourier_number: default_fourier_number(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct LongwaveInput {
    pub surface: String,
    #[validate(minimum = 0.)]
    #[validate(maximum = 1.)]
    pub emissivity: f64,
    #[serde(default)]
    #[validate]
    pub ground: Vec<ViewedSurfaceInput>,
    #[serde(default)]
    #[validate]
    pub surrounding: Vec<ViewedSurfaceInput>,
}

#[derive(Clone, Copy, Debug, Deserialize, Validate)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct ViewedSurfaceInput {
    #[validate(minimum = 0.)]
    #[validate(maximum = 1.)]
    pub view_factor: f64,
    /// deg C; outdoor air temperature when absent
    pub temperature: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use serde_json::{json, Value};

    #[fixture]
    fn input_json() -> Value {
        json!({
            "SimulationTime": {"start": 0., "end": 24., "step": 0.25},
            "ExternalConditions": {
                "Synthetic": {"TempBase": 5., "TempAmplitude": 3., "SolarMaxIrradiance": 400.}
            },
            "Materials": {
                "brick": {"Thickness": 0.1, "Conductivity": 0.8, "Density": 1700., "SpecificHeat": 800.}
            },
            "Constructions": {"solid wall": ["brick"]},
            "Zone": {
                "Box": {
                    "Length": 4., "Width": 4., "Height": 2.5,
                    "Construction": "solid wall",
                    "ExteriorSurfaces": ["north_wall", "south_wall", "roof"]
                }
            },
            "Windows": [
                {"Name": "w1", "Area": 2., "UValue": 1.4, "SHGC": 0.6, "ParentSurface": "south_wall"}
            ],
            "HVAC": {"type": "Ideal", "HeatingCapacity": 3000.},
            "ControlSchedule": {
                "Occupancy": {
                    "OccupiedStartHour": 8., "OccupiedEndHour": 18.,
                    "HeatingSetpointOccupied": 21., "HeatingSetpointUnoccupied": 16.,
                    "CoolingSetpointOccupied": 25., "CoolingSetpointUnoccupied": 30.
                }
            }
        })
    }

    fn ingest_value(value: Value) -> anyhow::Result<Input> {
        ingest(value.to_string().as_bytes())
    }

    #[rstest]
    fn should_ingest_minimal_box_zone(input_json: Value) {
        let input = ingest_value(input_json).unwrap();

        assert_eq!(input.warmup_days, 3);
        assert_eq!(input.solver.max_iterations, 10);
        assert_eq!(input.zone.capacity_multiplier, 1.);
        assert_eq!(input.hvac.controller_type, "Ideal");
        assert_eq!(input.hvac.cooling_capacity, None);
        assert_eq!(
            input.windows[0].parent_surface.as_deref(),
            Some("south_wall")
        );
        assert!(input.convection.interior.is_empty());
    }

    #[rstest]
    fn should_reject_unknown_fields(mut input_json: Value) {
        input_json["Zone"]["Colour"] = json!("blue");
        assert!(ingest_value(input_json).is_err());
    }

    #[rstest]
    fn should_reject_out_of_range_values(mut input_json: Value) {
        input_json["Windows"][0]["SHGC"] = json!(1.2);
        assert!(ingest_value(input_json.clone()).is_err());

        input_json["Windows"][0]["SHGC"] = json!(0.6);
        input_json["Materials"]["brick"]["Conductivity"] = json!(0.);
        assert!(ingest_value(input_json).is_err());
    }

    #[rstest]
    fn should_read_explicit_surfaces_and_series_schedules(mut input_json: Value) {
        input_json["Zone"] = json!({
            "Volume": 40.,
            "Surfaces": [{
                "Name": "wall", "Type": "Wall", "Area": 10., "Perimeter": 13., "Tilt": 90.,
                "Azimuth": 180., "Roughness": 2, "Exterior": true, "Construction": "solid wall"
            }]
        });
        input_json["ControlSchedule"] = json!({
            "HeatingSetpoint": {"main": [{"value": 20., "repeat": 96}]},
            "CoolingSetpoint": {"main": [{"value": 25., "repeat": 96}]}
        });
        let input = ingest_value(input_json).unwrap();

        let surfaces = input.zone.surfaces.unwrap();
        assert_eq!(surfaces[0].surface_type, SurfaceType::Wall);
        assert!(surfaces[0].exterior);
        assert!(input.control_schedule.heating_setpoint.is_some());
        assert!(input.control_schedule.internal_gains.is_none());
    }

    #[rstest]
    fn should_reject_invalid_roughness(mut input_json: Value) {
        input_json["Zone"] = json!({
            "Volume": 40.,
            "Surfaces": [{
                "Name": "wall", "Type": "Wall", "Area": 10., "Perimeter": 13., "Tilt": 90.,
                "Azimuth": 180., "Roughness": 7, "Construction": "solid wall"
            }]
        });
        assert!(ingest_value(input_json).is_err());
    }
}
