use crate::core::controls::hvac_control::{
    ControlContext, HvacBehaviour, HvacController, HvacParameters,
};
use crate::core::material_properties::{Construction, Material};
use crate::core::schedule::{
    expand_numeric_schedule, reject_nulls, ControlSchedule, NumericSchedule, ScheduledValues,
};
use crate::core::space_heat_demand::air_exchange::Aim2AirExchange;
use crate::core::space_heat_demand::convection::exterior::ExteriorConvection;
use crate::core::space_heat_demand::convection::interior::InteriorConvection;
use crate::core::space_heat_demand::longwave::{ExteriorLongwaveRadiation, ViewedSurface};
use crate::core::space_heat_demand::surface::{Roughness, SurfaceGeometry, SurfaceType};
use crate::core::space_heat_demand::window::Window;
use crate::core::space_heat_demand::zone::{
    SolverSettings, StepConditions, StepResult, SurfaceDefinition, ZoneHeatBalanceSolver,
};
use crate::core::units::watts_over_step_to_kwh;
use crate::errors::ConfigurationError;
use crate::external_conditions::ExternalConditions;
use crate::input::{
    BoxZoneInput, ControlScheduleInput, ConvectionInput, ExternalConditionsInput, HvacInput,
    Input, MaterialInput, ViewedSurfaceInput, ZoneInput,
};
use crate::simulation_time::{SimulationTime, SimulationTimeIteration};
use anyhow::{anyhow, bail, Context};
use indexmap::IndexMap;
#[cfg(feature = "indicatif")]
use indicatif::ProgressIterator;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Everything needed to run one project: the zone, its HVAC controller and the boundary
/// conditions that drive them.
#[derive(Debug)]
pub struct Corpus {
    simulation_time: SimulationTime,
    external_conditions: ExternalConditions,
    zone: ZoneHeatBalanceSolver,
    hvac: HvacController,
    schedule: ControlSchedule,
    warmup_days: u32,
}

/// Per-timestep results of the main simulation, with energy totals.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RunResults {
    /// hours
    pub timestep_array: Vec<f64>,
    pub air_temperature: Vec<f64>,
    pub outdoor_air_temperature: Vec<f64>,
    pub heating_setpoint: Vec<f64>,
    pub cooling_setpoint: Vec<f64>,
    /// W; positive heats, negative cools
    pub hvac_power: Vec<f64>,
    pub fabric_loss: Vec<f64>,
    pub window_loss: Vec<f64>,
    pub air_exchange_loss: Vec<f64>,
    pub solar_gain_to_air: Vec<f64>,
    pub internal_gains: Vec<f64>,
    pub iterations: Vec<usize>,
    pub converged: Vec<bool>,
    pub totals: RunTotals,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RunTotals {
    pub heating_kwh: f64,
    pub cooling_kwh: f64,
    pub non_converged_steps: usize,
}

impl RunResults {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            timestep_array: Vec::with_capacity(capacity),
            air_temperature: Vec::with_capacity(capacity),
            outdoor_air_temperature: Vec::with_capacity(capacity),
            heating_setpoint: Vec::with_capacity(capacity),
            cooling_setpoint: Vec::with_capacity(capacity),
            hvac_power: Vec::with_capacity(capacity),
            fabric_loss: Vec::with_capacity(capacity),
            window_loss: Vec::with_capacity(capacity),
            air_exchange_loss: Vec::with_capacity(capacity),
            solar_gain_to_air: Vec::with_capacity(capacity),
            internal_gains: Vec::with_capacity(capacity),
            iterations: Vec::with_capacity(capacity),
            converged: Vec::with_capacity(capacity),
            totals: Default::default(),
        }
    }

    fn push(
        &mut self,
        t_it: &SimulationTimeIteration,
        scheduled: &ScheduledValues,
        temp_outside: f64,
        result: &StepResult,
        timestep_seconds: f64,
    ) {
        self.timestep_array.push(t_it.time);
        self.air_temperature.push(result.air_temperature);
        self.outdoor_air_temperature.push(temp_outside);
        self.heating_setpoint.push(scheduled.heating_setpoint);
        self.cooling_setpoint.push(scheduled.cooling_setpoint);
        self.hvac_power.push(result.hvac_power_w);
        self.fabric_loss.push(result.fabric_loss_w);
        self.window_loss.push(result.window_loss_w);
        self.air_exchange_loss.push(result.air_exchange_loss_w);
        self.solar_gain_to_air.push(result.solar_gain_to_air_w);
        self.internal_gains.push(result.internal_gains_w);
        self.iterations.push(result.iterations);
        self.converged.push(result.converged);

        let energy = watts_over_step_to_kwh(result.hvac_power_w, timestep_seconds);
        if energy > 0. {
            self.totals.heating_kwh += energy;
        } else {
            self.totals.cooling_kwh -= energy;
        }
        if !result.converged {
            self.totals.non_converged_steps += 1;
        }
    }
}

impl Corpus {
    pub fn from_inputs(input: Input) -> anyhow::Result<Self> {
        let simulation_time = input.simulation_time;
        let timestep = simulation_time.step_in_seconds();
        let total_steps = simulation_time.total_steps();
        if total_steps == 0 {
            bail!("Simulation time covers no timesteps");
        }

        let external_conditions =
            external_conditions_from_input(&input.external_conditions, &simulation_time)?;
        if external_conditions.len() < total_steps {
            bail!(
                "External conditions cover {} timesteps but the simulation has {total_steps}",
                external_conditions.len()
            );
        }

        let materials = materials_from_input(&input.materials)?;
        let constructions = constructions_from_input(&input.constructions, &materials)?;
        let (surface_definitions, volume) = surface_definitions_from_input(&input.zone)?;

        let interior = interior_convection_from_input(&input.convection)?;
        let exterior = exterior_convection_from_input(&input.convection, volume)?;

        let mut zone = ZoneHeatBalanceSolver::new(
            surface_definitions,
            &constructions,
            volume,
            input.zone.capacity_multiplier,
            timestep,
            input.solver.fourier_number,
            interior,
            exterior,
            SolverSettings {
                max_iterations: input.solver.max_iterations,
                tolerance: input.solver.tolerance,
            },
        )?;

        for window_input in &input.windows {
            if let Some(parent) = &window_input.parent_surface {
                zone.reduce_surface_area(parent, window_input.area)?;
            }
            let distribution: Vec<(&str, f64)> = window_input
                .solar_distribution
                .iter()
                .map(|(surface, ratio)| (surface.as_str(), *ratio))
                .collect();
            zone.add_window(
                Window::new(
                    &window_input.name,
                    window_input.area,
                    window_input.u_value,
                    window_input.shgc,
                )?,
                &distribution,
            )?;
        }

        if let Some(air_exchange) = &input.air_exchange {
            zone.set_air_exchange(Box::new(Aim2AirExchange::new(
                air_exchange.flow_coefficient,
                air_exchange.pressure_exponent,
                air_exchange.stack_coefficient,
                air_exchange.wind_coefficient,
                air_exchange.shelter_factor,
                air_exchange.open_window_ach,
                volume,
            )?));
        }

        for longwave_input in &input.longwave {
            let tilt = zone
                .surface(&longwave_input.surface)
                .ok_or_else(|| ConfigurationError::UnknownSurface(longwave_input.surface.clone()))?
                .geometry()
                .tilt;
            let longwave = ExteriorLongwaveRadiation::new(
                &longwave_input.surface,
                longwave_input.emissivity,
                tilt,
                viewed_surfaces(&longwave_input.ground),
                viewed_surfaces(&longwave_input.surrounding),
            )?;
            zone.set_longwave(&longwave_input.surface, longwave)?;
        }

        let hvac = hvac_from_input(&input.hvac)?;
        let schedule = control_schedule_from_input(&input.control_schedule, total_steps)?;

        Ok(Self {
            simulation_time,
            external_conditions,
            zone,
            hvac,
            schedule,
            warmup_days: input.warmup_days,
        })
    }

    pub fn zone(&self) -> &ZoneHeatBalanceSolver {
        &self.zone
    }

    /// Advance the zone one step: ask the controller for power, then solve and commit.
    fn step(
        &mut self,
        t_it: &SimulationTimeIteration,
        scheduled: &ScheduledValues,
        conditions: StepConditions,
        net_passive_power: f64,
    ) -> anyhow::Result<StepResult> {
        let context = ControlContext {
            timestep: self.zone.timestep(),
            air_thermal_mass: self.zone.air_thermal_mass(),
            net_passive_power,
        };
        let hvac_power_w = self.hvac.power(
            self.zone.air_temperature(),
            scheduled.heating_setpoint,
            scheduled.cooling_setpoint,
            &context,
        );

        self.zone
            .solve_step(&StepConditions {
                hvac_power_w,
                ..conditions
            })
            .with_context(|| format!("Zone heat balance failed at timestep {}", t_it.index))
    }

    fn conditions_for(&self, t_it: &SimulationTimeIteration, scheduled: &ScheduledValues) -> StepConditions {
        StepConditions {
            weather: self.external_conditions.sample(t_it),
            sky_temp_c: self.external_conditions.sky_temp_for_timestep_idx(t_it.index),
            internal_gains_w: scheduled.internal_gains_w,
            hvac_power_w: 0.,
            window_open_fraction: scheduled.window_open_fraction,
        }
    }

    /// Cycle the first day of boundary conditions to settle the fabric before the main run.
    ///
    /// Windows stay closed and solar gains are left out. Returns the passive power of the last
    /// warm-up step.
    fn warm_up(&mut self) -> anyhow::Result<f64> {
        let Some(first_step) = self.simulation_time.iter().next() else {
            return Ok(0.);
        };
        let first_values = self.schedule.values_at(&first_step);
        let initial_temperature = (first_values.heating_setpoint
            + self.external_conditions.air_temp(&first_step))
            / 2.;
        self.zone.set_initial_temperatures(initial_temperature);
        debug!(initial_temperature, "Starting warm-up");

        let steps_per_day = self.simulation_time.steps_per_day();
        let mut net_passive_power = 0.;
        for _ in 0..self.warmup_days {
            let first_day: Vec<SimulationTimeIteration> =
                self.simulation_time.iter().take(steps_per_day).collect();
            for t_it in first_day {
                let scheduled = ScheduledValues {
                    window_open_fraction: 0.,
                    ..self.schedule.values_at(&t_it)
                };
                let mut conditions = self.conditions_for(&t_it, &scheduled);
                conditions.weather.solar_irradiance_w_m2 = 0.;

                let result = self.step(&t_it, &scheduled, conditions, net_passive_power)?;
                net_passive_power = result.net_passive_power();
            }
        }

        info!(
            days = self.warmup_days,
            air_temperature = self.zone.air_temperature(),
            "Warm-up complete"
        );
        Ok(net_passive_power)
    }

    pub fn run(&mut self) -> anyhow::Result<RunResults> {
        let mut net_passive_power = self.warm_up()?;

        let timestep_seconds = self.zone.timestep();
        let total_steps = self.simulation_time.total_steps();
        let mut results = RunResults::with_capacity(total_steps);

        #[cfg(feature = "indicatif")]
        let simulation_time_iter = self.simulation_time.iter().progress_count(total_steps as u64);
        #[cfg(not(feature = "indicatif"))]
        let simulation_time_iter = self.simulation_time.iter();

        for t_it in simulation_time_iter {
            let scheduled = self.schedule.values_at(&t_it);
            let conditions = self.conditions_for(&t_it, &scheduled);

            let result = self.step(&t_it, &scheduled, conditions, net_passive_power)?;
            net_passive_power = result.net_passive_power();

            results.push(
                &t_it,
                &scheduled,
                conditions.weather.air_temp_c,
                &result,
                timestep_seconds,
            );
        }

        info!(
            heating_kwh = results.totals.heating_kwh,
            cooling_kwh = results.totals.cooling_kwh,
            non_converged_steps = results.totals.non_converged_steps,
            "Simulation complete"
        );
        Ok(results)
    }
}

fn external_conditions_from_input(
    input: &ExternalConditionsInput,
    simulation_time: &SimulationTime,
) -> anyhow::Result<ExternalConditions> {
    if let Some(synthetic) = &input.synthetic {
        if input.air_temperatures.is_some() {
            bail!("External conditions must be given either as series or as a synthetic day, not both");
        }
        return Ok(ExternalConditions::synthetic(synthetic, simulation_time));
    }

    let series = |name: &str, values: &Option<Vec<f64>>| {
        values
            .clone()
            .ok_or_else(|| anyhow!("External conditions are missing the {name} series"))
    };

    ExternalConditions::new(
        series("air temperature", &input.air_temperatures)?,
        series("local wind speed", &input.wind_speeds_local)?,
        series("10 m wind speed", &input.wind_speeds_10m)?,
        series("wind direction", &input.wind_directions)?,
        series("solar irradiance", &input.solar_irradiances)?,
        input.sky_temperatures.clone(),
    )
}

fn materials_from_input(
    input: &IndexMap<String, MaterialInput>,
) -> Result<IndexMap<String, Material>, ConfigurationError> {
    input
        .iter()
        .map(|(name, material)| {
            Ok((
                name.clone(),
                Material::new(
                    name,
                    material.thickness,
                    material.conductivity,
                    material.density,
                    material.specific_heat,
                )?,
            ))
        })
        .collect()
}

fn constructions_from_input(
    input: &IndexMap<String, Vec<String>>,
    materials: &IndexMap<String, Material>,
) -> Result<IndexMap<String, Arc<Construction>>, ConfigurationError> {
    input
        .iter()
        .map(|(name, layer_names)| {
            let layers = layer_names
                .iter()
                .map(|material| {
                    materials.get(material).cloned().ok_or_else(|| {
                        ConfigurationError::UndefinedMaterial {
                            construction: name.clone(),
                            material: material.clone(),
                        }
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            Ok((name.clone(), Arc::new(Construction::new(name, layers)?)))
        })
        .collect()
}

/// Names of the surfaces generated for a box zone
pub const BOX_SURFACE_NAMES: [&str; 6] = [
    "north_wall",
    "east_wall",
    "south_wall",
    "west_wall",
    "roof",
    "floor",
];

/// The six faces of a rectangular zone. Walls are rough (class 2), roof and floor medium rough.
fn box_surface_definitions(input: &BoxZoneInput) -> anyhow::Result<Vec<SurfaceDefinition>> {
    if let Some(unknown) = input
        .exterior_surfaces
        .iter()
        .find(|name| !BOX_SURFACE_NAMES.contains(&name.as_str()))
    {
        bail!(
            "Unknown exterior surface '{unknown}' for a box zone; expected one of {BOX_SURFACE_NAMES:?}"
        );
    }

    let BoxZoneInput {
        length,
        width,
        height,
        ..
    } = *input;
    let definitions = BOX_SURFACE_NAMES
        .iter()
        .map(|&name| {
            let (area, perimeter, tilt, azimuth, surface_type, roughness) = match name {
                "north_wall" => (width * height, 2. * (width + height), 90., 0., SurfaceType::Wall, Roughness::Rough),
                "east_wall" => (length * height, 2. * (length + height), 90., 90., SurfaceType::Wall, Roughness::Rough),
                "south_wall" => (width * height, 2. * (width + height), 90., 180., SurfaceType::Wall, Roughness::Rough),
                "west_wall" => (length * height, 2. * (length + height), 90., 270., SurfaceType::Wall, Roughness::Rough),
                "roof" => (length * width, 2. * (length + width), 0., 0., SurfaceType::Roof, Roughness::MediumRough),
                _ => (length * width, 2. * (length + width), 180., 0., SurfaceType::Floor, Roughness::MediumRough),
            };

            SurfaceDefinition {
                name: name.into(),
                geometry: SurfaceGeometry {
                    area,
                    perimeter,
                    tilt,
                    azimuth,
                    roughness,
                    surface_type,
                },
                exterior: input.exterior_surfaces.iter().any(|exposed| exposed == name),
                construction: input.construction.clone(),
            }
        })
        .collect();

    Ok(definitions)
}

/// Surface definitions and the zone air volume
fn surface_definitions_from_input(
    input: &ZoneInput,
) -> anyhow::Result<(Vec<SurfaceDefinition>, f64)> {
    match (&input.surfaces, &input.box_geometry) {
        (Some(surfaces), None) => {
            let volume = input
                .volume
                .ok_or_else(|| anyhow!("A zone given as a list of surfaces needs a Volume"))?;
            let definitions = surfaces
                .iter()
                .map(|surface| {
                    Ok(SurfaceDefinition {
                        name: surface.name.clone(),
                        geometry: SurfaceGeometry {
                            area: surface.area,
                            perimeter: surface.perimeter,
                            tilt: surface.tilt,
                            azimuth: surface.azimuth,
                            roughness: Roughness::try_from(surface.roughness)?,
                            surface_type: surface.surface_type,
                        },
                        exterior: surface.exterior,
                        construction: surface.construction.clone(),
                    })
                })
                .collect::<anyhow::Result<Vec<_>>>()?;
            Ok((definitions, volume))
        }
        (None, Some(box_geometry)) => {
            let volume = input
                .volume
                .unwrap_or(box_geometry.length * box_geometry.width * box_geometry.height);
            Ok((box_surface_definitions(box_geometry)?, volume))
        }
        _ => bail!("A zone must be given as exactly one of Surfaces or Box"),
    }
}

fn interior_convection_from_input(
    input: &ConvectionInput,
) -> Result<InteriorConvection, ConfigurationError> {
    if input.interior.is_empty() {
        return Ok(InteriorConvection::default());
    }

    InteriorConvection::from_names(str_pairs(&input.interior))
}

fn exterior_convection_from_input(
    input: &ConvectionInput,
    zone_volume: f64,
) -> Result<ExteriorConvection, ConfigurationError> {
    if input.exterior_forced.is_empty() && input.exterior_natural.is_empty() {
        return Ok(ExteriorConvection::default());
    }

    ExteriorConvection::from_names(
        str_pairs(&input.exterior_forced),
        str_pairs(&input.exterior_natural),
        input.building_volume.unwrap_or(zone_volume),
    )
}

fn str_pairs(map: &IndexMap<String, String>) -> impl Iterator<Item = (&str, &str)> {
    map.iter()
        .map(|(classification, name)| (classification.as_str(), name.as_str()))
}

fn hvac_from_input(input: &HvacInput) -> Result<HvacController, ConfigurationError> {
    let defaults = HvacParameters::default();
    let parameters = HvacParameters {
        heating_capacity: input.heating_capacity,
        cooling_capacity: input.cooling_capacity,
        proportional_gain: input.proportional_gain.unwrap_or(defaults.proportional_gain),
        deadband: input.deadband.unwrap_or(defaults.deadband),
        min_off_steps: input.min_off_steps.unwrap_or(defaults.min_off_steps),
        min_run_steps: input.min_run_steps.unwrap_or(defaults.min_run_steps),
        ramp_steps: input.ramp_steps.unwrap_or(defaults.ramp_steps),
        kp: input.kp.unwrap_or(defaults.kp),
        ki: input.ki.unwrap_or(defaults.ki),
        kd: input.kd.unwrap_or(defaults.kd),
    };

    HvacController::from_type_name(&input.controller_type, &parameters)
}

fn control_schedule_from_input(
    input: &ControlScheduleInput,
    total_steps: usize,
) -> anyhow::Result<ControlSchedule> {
    if let Some(occupancy) = &input.occupancy {
        if input.heating_setpoint.is_some() || input.cooling_setpoint.is_some() {
            bail!("Control schedule must be given either as an occupancy schedule or as series, not both");
        }
        return Ok(ControlSchedule::Occupancy(occupancy.clone()));
    }

    let expand = |name: &str, schedule: &Option<NumericSchedule>| -> anyhow::Result<Vec<f64>> {
        match schedule {
            Some(schedule) => reject_nulls(expand_numeric_schedule(schedule))
                .with_context(|| format!("Invalid {name} schedule")),
            None => Ok(vec![0.; total_steps]),
        }
    };
    let (Some(_), Some(_)) = (&input.heating_setpoint, &input.cooling_setpoint) else {
        bail!("A series control schedule needs both HeatingSetpoint and CoolingSetpoint");
    };

    let window_open_fractions = expand("window opening", &input.window_opening)?;
    if window_open_fractions
        .iter()
        .any(|fraction| !(0. ..=1.).contains(fraction))
    {
        bail!("Window opening fractions must be between 0 and 1");
    }

    ControlSchedule::from_series(
        expand("heating setpoint", &input.heating_setpoint)?,
        expand("cooling setpoint", &input.cooling_setpoint)?,
        expand("internal gains", &input.internal_gains)?,
        window_open_fractions,
        total_steps,
    )
}

fn viewed_surfaces(input: &[ViewedSurfaceInput]) -> Vec<ViewedSurface> {
    input
        .iter()
        .map(|viewed| ViewedSurface {
            view_factor: viewed.view_factor,
            temperature: viewed.temperature,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ingest;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use serde_json::{json, Value};

    #[fixture]
    fn input_json() -> Value {
        json!({
            "SimulationTime": {"start": 0., "end": 24., "step": 0.5},
            "ExternalConditions": {
                "Synthetic": {"TempBase": 5., "TempAmplitude": 3., "SolarMaxIrradiance": 300.}
            },
            "Materials": {
                "brick": {"Thickness": 0.1, "Conductivity": 0.8, "Density": 1700., "SpecificHeat": 800.},
                "insulation": {"Thickness": 0.08, "Conductivity": 0.04, "Density": 30., "SpecificHeat": 1400.}
            },
            "Constructions": {"cavity wall": ["brick", "insulation", "brick"]},
            "Zone": {
                "Box": {
                    "Length": 4., "Width": 4., "Height": 2.5,
                    "Construction": "cavity wall",
                    "ExteriorSurfaces": ["north_wall", "east_wall", "south_wall", "west_wall", "roof"]
                }
            },
            "Windows": [
                {"Name": "south glazing", "Area": 2., "UValue": 1.4, "SHGC": 0.6, "ParentSurface": "south_wall"}
            ],
            "AirExchange": {
                "FlowCoefficient": 0.005, "StackCoefficient": 0.5, "WindCoefficient": 0.2,
                "OpenWindowACH": 4.
            },
            "HVAC": {"type": "Ideal", "HeatingCapacity": 5000., "CoolingCapacity": 5000.},
            "ControlSchedule": {
                "Occupancy": {
                    "OccupiedStartHour": 7., "OccupiedEndHour": 22.,
                    "HeatingSetpointOccupied": 21., "HeatingSetpointUnoccupied": 16.,
                    "CoolingSetpointOccupied": 25., "CoolingSetpointUnoccupied": 28.,
                    "InternalGainsOccupied": 200.
                }
            },
            "WarmupDays": 1
        })
    }

    fn corpus_from(value: Value) -> anyhow::Result<Corpus> {
        Corpus::from_inputs(ingest(value.to_string().as_bytes())?)
    }

    #[rstest]
    fn should_build_box_zone(input_json: Value) {
        let corpus = corpus_from(input_json).unwrap();
        let zone = corpus.zone();

        assert_eq!(zone.surfaces().len(), 6);
        assert_relative_eq!(zone.volume(), 40.);
        assert_relative_eq!(zone.surface("south_wall").unwrap().area(), 8.);
        assert_relative_eq!(zone.surface("east_wall").unwrap().area(), 10.);
        assert!(zone.surface("roof").unwrap().is_exterior());
        assert!(!zone.surface("floor").unwrap().is_exterior());
        assert_eq!(
            zone.surface("floor").unwrap().geometry().roughness,
            Roughness::MediumRough
        );
    }

    #[rstest]
    fn should_run_and_follow_occupancy(input_json: Value) {
        let mut corpus = corpus_from(input_json).unwrap();
        let results = corpus.run().unwrap();

        assert_eq!(results.air_temperature.len(), 48);
        assert_eq!(results.timestep_array[1], 0.5);
        assert!(results.totals.heating_kwh > 0.);
        assert!(results.hvac_power.iter().all(|power| power.abs() <= 5000.));

        // Occupied afternoon sits well above the unoccupied early morning
        let mean = |values: &[f64]| values.iter().sum::<f64>() / values.len() as f64;
        assert!(mean(&results.air_temperature[30..40]) > mean(&results.air_temperature[0..10]) + 1.);
        assert!(results.air_temperature[30..40].iter().all(|temp| *temp < 21.5));
    }

    #[rstest]
    fn should_report_undefined_material(mut input_json: Value) {
        input_json["Constructions"]["cavity wall"] = json!(["brick", "mineral wool"]);
        let error = corpus_from(input_json).unwrap_err();

        assert_eq!(
            error.downcast_ref::<ConfigurationError>(),
            Some(&ConfigurationError::UndefinedMaterial {
                construction: "cavity wall".into(),
                material: "mineral wool".into(),
            })
        );
    }

    #[rstest]
    fn should_report_unknown_controller(mut input_json: Value) {
        input_json["HVAC"]["type"] = json!("Bang-bang");
        let error = corpus_from(input_json).unwrap_err();

        assert_eq!(
            error.downcast_ref::<ConfigurationError>(),
            Some(&ConfigurationError::UnknownControllerType("Bang-bang".into()))
        );
    }

    #[rstest]
    fn should_reject_unknown_correlation_name(mut input_json: Value) {
        input_json["Convection"] = json!({
            "ExteriorForced": {"RoofStable": "ClearRoof"}
        });
        let error = corpus_from(input_json).unwrap_err();

        assert!(matches!(
            error.downcast_ref::<ConfigurationError>(),
            Some(ConfigurationError::UnknownCorrelation { .. })
        ));
    }

    #[rstest]
    fn should_reject_unknown_box_surface(mut input_json: Value) {
        input_json["Zone"]["Box"]["ExteriorSurfaces"] = json!(["ceiling"]);
        assert!(corpus_from(input_json).is_err());
    }

    #[rstest]
    fn should_run_series_schedule(mut input_json: Value) {
        input_json["ControlSchedule"] = json!({
            "HeatingSetpoint": {"main": [{"value": 20., "repeat": 48}]},
            "CoolingSetpoint": {"main": [{"value": 26., "repeat": 48}]},
            "WindowOpening": {"main": [{"value": 0., "repeat": 24}, {"value": 0.5, "repeat": 24}]}
        });
        input_json["AirExchange"]["OpenWindowACH"] = json!(20.);
        let mut corpus = corpus_from(input_json).unwrap();
        let results = corpus.run().unwrap();

        assert_eq!(results.heating_setpoint, vec![20.; 48]);
        assert!(results.air_exchange_loss[30] > results.air_exchange_loss[10]);
    }

    #[rstest]
    fn should_reject_short_series_schedule(mut input_json: Value) {
        input_json["ControlSchedule"] = json!({
            "HeatingSetpoint": {"main": [{"value": 20., "repeat": 10}]},
            "CoolingSetpoint": {"main": [{"value": 26., "repeat": 48}]}
        });
        assert!(corpus_from(input_json).is_err());
    }
}
