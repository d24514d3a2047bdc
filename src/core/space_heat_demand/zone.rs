use crate::core::material_properties::{Construction, AIR};
use crate::core::space_heat_demand::air_exchange::AirExchange;
use crate::core::space_heat_demand::convection::exterior::ExteriorConvection;
use crate::core::space_heat_demand::convection::interior::InteriorConvection;
use crate::core::space_heat_demand::longwave::ExteriorLongwaveRadiation;
use crate::core::space_heat_demand::surface::{Surface, SurfaceGeometry};
use crate::core::space_heat_demand::window::Window;
use crate::errors::{
    ConfigurationError, DimensionMismatchError, NumericalFailureError, NumericalFailureReason,
    ZoneSimError,
};
use crate::external_conditions::WeatherSample;
use indexmap::IndexMap;
use nalgebra::{DMatrix, DVector};
use std::sync::Arc;
use tracing::{debug, warn};

/// Description of a surface before it is attached to a zone.
#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceDefinition {
    pub name: String,
    pub geometry: SurfaceGeometry,
    pub exterior: bool,
    /// name of the construction, looked up when the zone is built
    pub construction: String,
}

/// Controls for the Picard iteration over film coefficients.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolverSettings {
    pub max_iterations: usize,
    /// largest change in any temperature between iterations for the step to count as converged, in K
    pub tolerance: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            tolerance: 0.01,
        }
    }
}

/// Boundary conditions and inputs for one timestep.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepConditions {
    pub weather: WeatherSample,
    /// deg C
    pub sky_temp_c: f64,
    pub internal_gains_w: f64,
    /// positive heats the air, negative cools it
    pub hvac_power_w: f64,
    /// 0 to 1
    pub window_open_fraction: f64,
}

/// Heat flows at one surface at the end of a step.
#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceFlows {
    pub name: String,
    /// W/(m2.K)
    pub h_inside: f64,
    /// W/(m2.K); 0 for surfaces not exposed to outdoor air
    pub h_outside: f64,
    pub inside_face_temperature: f64,
    pub outside_face_temperature: f64,
    /// convective flow from the zone air into the inside face, in W
    pub heat_flow_from_air_w: f64,
    /// solar and longwave power absorbed at the outside face, in W
    pub outside_face_gain_w: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StepResult {
    /// every fabric node (surface by surface, inside-first) followed by the zone air, in deg C
    pub temperatures: Vec<f64>,
    pub air_temperature: f64,
    pub fabric_loss_w: f64,
    pub window_loss_w: f64,
    pub air_exchange_loss_w: f64,
    pub internal_gains_w: f64,
    pub solar_gain_to_air_w: f64,
    pub hvac_power_w: f64,
    /// W/K
    pub air_exchange_conductance: f64,
    pub surfaces: Vec<SurfaceFlows>,
    pub iterations: usize,
    pub converged: bool,
}

impl StepResult {
    /// Passive gains less losses from the zone air, excluding HVAC, in W
    pub fn net_passive_power(&self) -> f64 {
        self.internal_gains_w + self.solar_gain_to_air_w
            - self.fabric_loss_w
            - self.window_loss_w
            - self.air_exchange_loss_w
    }
}

#[derive(Clone, Debug)]
struct ZoneWindow {
    window: Window,
    /// surface index and share of transmitted solar absorbed at its outside face
    solar_distribution: Vec<(usize, f64)>,
}

impl ZoneWindow {
    fn fraction_to_air(&self) -> f64 {
        1. - self
            .solar_distribution
            .iter()
            .map(|(_, ratio)| ratio)
            .sum::<f64>()
    }
}

/// Film coefficients and air exchange used for one assembly of the system.
struct Coefficients {
    h_inside: Vec<f64>,
    h_outside: Vec<f64>,
    air_exchange_conductance: f64,
}

/// A single well-mixed air volume bounded by surfaces, solved as one implicit linear system per
/// timestep.
///
/// The unknowns are every fabric node of every surface (in surface order, inside face first)
/// followed by the zone air temperature.
#[derive(Debug)]
pub struct ZoneHeatBalanceSolver {
    surfaces: Vec<Surface>,
    surface_index: IndexMap<String, usize>,
    /// position of each surface's node 0 in the system
    row_offsets: Vec<usize>,
    air_node_index: usize,
    volume: f64,
    air_thermal_mass: f64, // J/K
    timestep: f64,
    temp_air: f64,
    interior: InteriorConvection,
    exterior: ExteriorConvection,
    windows: Vec<ZoneWindow>,
    air_exchange: Option<Box<dyn AirExchange>>,
    longwave: Vec<Option<ExteriorLongwaveRadiation>>,
    settings: SolverSettings,
}

impl ZoneHeatBalanceSolver {
    /// Arguments:
    /// * `surface_definitions` - surfaces bounding the zone, in the order their nodes appear in the system
    /// * `constructions` - constructions available to the surfaces, by name
    /// * `volume` - zone air volume, in m3
    /// * `capacity_multiplier` - multiplier on the air heat capacity to account for furnishings
    /// * `timestep` - in seconds
    /// * `fourier_number` - Fourier number for discretising each construction
    /// * `interior` - inside face convection correlations
    /// * `exterior` - outside face convection correlations
    /// * `settings` - Picard iteration limits
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        surface_definitions: Vec<SurfaceDefinition>,
        constructions: &IndexMap<String, Arc<Construction>>,
        volume: f64,
        capacity_multiplier: f64,
        timestep: f64,
        fourier_number: f64,
        interior: InteriorConvection,
        exterior: ExteriorConvection,
        settings: SolverSettings,
    ) -> Result<Self, ConfigurationError> {
        if !(volume.is_finite() && volume > 0.) {
            return Err(ConfigurationError::invalid(
                "zone",
                "volume",
                format!("must be positive, got {volume}"),
            ));
        }
        if !(capacity_multiplier.is_finite() && capacity_multiplier > 0.) {
            return Err(ConfigurationError::invalid(
                "zone",
                "capacity_multiplier",
                format!("must be positive, got {capacity_multiplier}"),
            ));
        }
        if settings.max_iterations == 0 {
            return Err(ConfigurationError::invalid(
                "zone",
                "max_iterations",
                "must be at least 1",
            ));
        }
        if !(settings.tolerance.is_finite() && settings.tolerance > 0.) {
            return Err(ConfigurationError::invalid(
                "zone",
                "tolerance",
                format!("must be positive, got {}", settings.tolerance),
            ));
        }

        let mut surfaces = Vec::with_capacity(surface_definitions.len());
        let mut surface_index = IndexMap::new();
        for definition in surface_definitions {
            let SurfaceDefinition {
                name,
                geometry,
                exterior: is_exterior,
                construction,
            } = definition;

            if surface_index.contains_key(&name) {
                return Err(ConfigurationError::invalid(
                    name,
                    "name",
                    "surface names must be unique within a zone",
                ));
            }
            let construction = constructions.get(&construction).ok_or_else(|| {
                ConfigurationError::UndefinedConstruction {
                    surface: name.clone(),
                    construction: construction.clone(),
                }
            })?;

            let surface = Surface::new(
                &name,
                geometry,
                is_exterior,
                construction.clone(),
                timestep,
                fourier_number,
            )?;
            interior.check_surface(surface.geometry())?;
            if surface.is_exterior() {
                exterior.check_surface(surface.name(), surface.geometry())?;
            }

            surface_index.insert(name, surfaces.len());
            surfaces.push(surface);
        }

        let mut row_offsets = Vec::with_capacity(surfaces.len());
        let mut next_row = 0;
        for surface in &surfaces {
            row_offsets.push(next_row);
            next_row += surface.fabric().node_count();
        }
        let longwave = vec![None; surfaces.len()];

        Ok(Self {
            surfaces,
            surface_index,
            row_offsets,
            air_node_index: next_row,
            volume,
            air_thermal_mass: volume * AIR.volumetric_heat_capacity() * capacity_multiplier,
            timestep,
            temp_air: 0.,
            interior,
            exterior,
            windows: vec![],
            air_exchange: None,
            longwave,
            settings,
        })
    }

    pub fn surfaces(&self) -> &[Surface] {
        &self.surfaces
    }

    pub fn surface(&self, name: &str) -> Option<&Surface> {
        self.surface_index.get(name).map(|&idx| &self.surfaces[idx])
    }

    fn surface_idx(&self, name: &str) -> Result<usize, ConfigurationError> {
        self.surface_index
            .get(name)
            .copied()
            .ok_or_else(|| ConfigurationError::UnknownSurface(name.into()))
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Heat capacity of the zone air, in J/K
    pub fn air_thermal_mass(&self) -> f64 {
        self.air_thermal_mass
    }

    pub fn timestep(&self) -> f64 {
        self.timestep
    }

    pub fn air_temperature(&self) -> f64 {
        self.temp_air
    }

    /// Number of unknowns in the heat balance system (fabric nodes plus the air node)
    pub fn system_size(&self) -> usize {
        self.air_node_index + 1
    }

    pub fn set_initial_temperatures(&mut self, temperature: f64) {
        for surface in self.surfaces.iter_mut() {
            surface.fabric_mut().set_initial_temperatures(temperature);
        }
        self.temp_air = temperature;
    }

    /// Remove opaque area from a surface, e.g. where a window is placed in it.
    pub fn reduce_surface_area(&mut self, name: &str, delta: f64) -> Result<(), ConfigurationError> {
        let idx = self.surface_idx(name)?;
        self.surfaces[idx].reduce_area(delta)
    }

    /// Attach a window to the zone.
    ///
    /// Arguments:
    /// * `window` - the glazing
    /// * `solar_distribution` - surface names with the share of transmitted solar each absorbs;
    ///                          whatever is left goes to the zone air
    pub fn add_window(
        &mut self,
        window: Window,
        solar_distribution: &[(&str, f64)],
    ) -> Result<(), ConfigurationError> {
        let mut distribution = Vec::with_capacity(solar_distribution.len());
        for (surface_name, ratio) in solar_distribution {
            let idx = self.surface_idx(surface_name)?;
            if !(0. ..=1.).contains(ratio) {
                return Err(ConfigurationError::invalid(
                    window.name(),
                    "solar_distribution",
                    format!("ratio for '{surface_name}' must be between 0 and 1, got {ratio}"),
                ));
            }
            distribution.push((idx, *ratio));
        }

        let zone_window = ZoneWindow {
            window,
            solar_distribution: distribution,
        };
        if zone_window.fraction_to_air() < -1e-9 {
            return Err(ConfigurationError::invalid(
                zone_window.window.name(),
                "solar_distribution",
                "ratios cannot sum to more than 1",
            ));
        }

        self.windows.push(zone_window);
        Ok(())
    }

    pub fn set_air_exchange(&mut self, air_exchange: Box<dyn AirExchange>) {
        self.air_exchange = Some(air_exchange);
    }

    /// Add longwave exchange with the sky and surroundings at an exterior surface.
    pub fn set_longwave(
        &mut self,
        surface_name: &str,
        longwave: ExteriorLongwaveRadiation,
    ) -> Result<(), ConfigurationError> {
        let idx = self.surface_idx(surface_name)?;
        if !self.surfaces[idx].is_exterior() {
            return Err(ConfigurationError::invalid(
                surface_name,
                "longwave",
                "only exterior surfaces see the sky",
            ));
        }

        self.longwave[idx] = Some(longwave);
        Ok(())
    }

    /// Temperatures currently held by the zone, laid out as in the system.
    fn committed_temperatures(&self) -> Vec<f64> {
        let mut temperatures = Vec::with_capacity(self.system_size());
        for surface in &self.surfaces {
            temperatures.extend(surface.fabric().nodes().iter().map(|node| node.temperature));
        }
        temperatures.push(self.temp_air);

        temperatures
    }

    /// Power absorbed at each surface's outside face, in W
    ///
    /// Longwave exchange is evaluated at the committed outside face temperature.
    fn outside_face_gains(&self, conditions: &StepConditions) -> Result<Vec<f64>, ZoneSimError> {
        let mut gains = vec![0.; self.surfaces.len()];

        for (idx, surface) in self.surfaces.iter().enumerate() {
            if let Some(longwave) = &self.longwave[idx] {
                gains[idx] += longwave.flux(
                    surface.fabric().outside_face_temperature(),
                    conditions.weather.air_temp_c,
                    conditions.sky_temp_c,
                )? * surface.area();
            }
        }
        for zone_window in &self.windows {
            let solar = zone_window
                .window
                .solar_gain(conditions.weather.solar_irradiance_w_m2);
            for (idx, ratio) in &zone_window.solar_distribution {
                gains[*idx] += solar * ratio;
            }
        }

        Ok(gains)
    }

    fn solar_gain_to_air(&self, solar_irradiance: f64) -> f64 {
        self.windows
            .iter()
            .map(|zone_window| {
                zone_window.window.solar_gain(solar_irradiance) * zone_window.fraction_to_air()
            })
            .sum()
    }

    fn window_conductance(&self) -> f64 {
        self.windows
            .iter()
            .map(|zone_window| zone_window.window.conductance())
            .sum()
    }

    fn coefficients(
        &self,
        guess: &[f64],
        conditions: &StepConditions,
    ) -> Result<Coefficients, ConfigurationError> {
        let temp_air = guess[self.air_node_index];
        let mut h_inside = Vec::with_capacity(self.surfaces.len());
        let mut h_outside = Vec::with_capacity(self.surfaces.len());

        for (surface, &offset) in self.surfaces.iter().zip(&self.row_offsets) {
            let geometry = surface.geometry();
            h_inside.push(self.interior.coefficient(geometry, guess[offset], temp_air)?);
            h_outside.push(if surface.is_exterior() {
                let outermost = offset + surface.fabric().node_count() - 1;
                self.exterior
                    .coefficient(geometry, guess[outermost], &conditions.weather)?
            } else {
                0.
            });
        }

        let air_exchange_conductance = match &self.air_exchange {
            Some(air_exchange) => air_exchange.conductance(
                temp_air,
                conditions.weather.air_temp_c,
                conditions.weather.wind_speed_local_ms,
                conditions.window_open_fraction,
                conditions.hvac_power_w > 0.,
            ),
            None => 0.,
        };

        Ok(Coefficients {
            h_inside,
            h_outside,
            air_exchange_conductance,
        })
    }

    fn assemble(
        &self,
        coefficients: &Coefficients,
        conditions: &StepConditions,
        outside_face_gains: &[f64],
        solar_gain_to_air: f64,
        window_conductance: f64,
    ) -> (DMatrix<f64>, DVector<f64>) {
        let size = self.system_size();
        let air = self.air_node_index;
        let temp_outside = conditions.weather.air_temp_c;

        let mut matrix_a: DMatrix<f64> = DMatrix::zeros(size, size);
        let mut vector_b: DVector<f64> = DVector::zeros(size);

        // Fabric node rows, per unit area
        for (idx, surface) in self.surfaces.iter().enumerate() {
            surface.fabric().populate_matrix_equations(
                &mut matrix_a,
                &mut vector_b,
                self.row_offsets[idx],
                air,
                coefficients.h_inside[idx],
                coefficients.h_outside[idx],
                temp_outside,
                surface.area(),
                outside_face_gains[idx],
            );
        }

        // Zone air row, in W
        let capacitance_rate = self.air_thermal_mass / self.timestep;
        let outdoor_conductance = window_conductance + coefficients.air_exchange_conductance;
        matrix_a[(air, air)] = capacitance_rate + outdoor_conductance;
        for (idx, surface) in self.surfaces.iter().enumerate() {
            let conductance = coefficients.h_inside[idx] * surface.area();
            matrix_a[(air, air)] += conductance;
            matrix_a[(air, self.row_offsets[idx])] = -conductance;
        }
        vector_b[air] = capacitance_rate * self.temp_air
            + conditions.internal_gains_w
            + solar_gain_to_air
            + conditions.hvac_power_w
            + outdoor_conductance * temp_outside;

        (matrix_a, vector_b)
    }

    /// Solve the heat balance for one step without changing the stored state.
    pub fn solve(&self, conditions: &StepConditions) -> Result<StepResult, ZoneSimError> {
        let outside_face_gains = self.outside_face_gains(conditions)?;
        let solar_gain_to_air = self.solar_gain_to_air(conditions.weather.solar_irradiance_w_m2);
        let window_conductance = self.window_conductance();

        let mut guess = self.committed_temperatures();
        let mut iteration = 0;
        loop {
            iteration += 1;

            let coefficients = self.coefficients(&guess, conditions)?;
            let (matrix_a, vector_b) = self.assemble(
                &coefficients,
                conditions,
                &outside_face_gains,
                solar_gain_to_air,
                window_conductance,
            );

            let vector_x = solve_linear_system(&matrix_a, &vector_b).map_err(|reason| {
                NumericalFailureError {
                    iteration,
                    reason,
                    last_valid_guess: guess.clone(),
                }
            })?;
            let temperatures: Vec<f64> = vector_x.iter().copied().collect();

            let max_change = temperatures
                .iter()
                .zip(&guess)
                .map(|(new, old)| (new - old).abs())
                .fold(0., f64::max);
            debug!(iteration, max_change, "Picard iteration");

            let converged = max_change < self.settings.tolerance;
            if converged || iteration >= self.settings.max_iterations {
                if !converged {
                    warn!(
                        iteration,
                        max_change,
                        tolerance = self.settings.tolerance,
                        "Zone heat balance did not converge; using last iterate"
                    );
                }

                return Ok(self.step_result(
                    temperatures,
                    coefficients,
                    conditions,
                    &outside_face_gains,
                    solar_gain_to_air,
                    iteration,
                    converged,
                ));
            }

            guess = temperatures;
        }
    }

    /// Flows at the solved state, from the coefficients the state was solved with.
    #[allow(clippy::too_many_arguments)]
    fn step_result(
        &self,
        temperatures: Vec<f64>,
        coefficients: Coefficients,
        conditions: &StepConditions,
        outside_face_gains: &[f64],
        solar_gain_to_air: f64,
        iterations: usize,
        converged: bool,
    ) -> StepResult {
        let temp_air = temperatures[self.air_node_index];
        let temp_outside = conditions.weather.air_temp_c;

        let surfaces: Vec<SurfaceFlows> = self
            .surfaces
            .iter()
            .enumerate()
            .map(|(idx, surface)| {
                let offset = self.row_offsets[idx];
                let outermost = offset + surface.fabric().node_count() - 1;
                SurfaceFlows {
                    name: surface.name().into(),
                    h_inside: coefficients.h_inside[idx],
                    h_outside: coefficients.h_outside[idx],
                    inside_face_temperature: temperatures[offset],
                    outside_face_temperature: temperatures[outermost],
                    heat_flow_from_air_w: coefficients.h_inside[idx]
                        * surface.area()
                        * (temp_air - temperatures[offset]),
                    outside_face_gain_w: outside_face_gains[idx],
                }
            })
            .collect();

        StepResult {
            air_temperature: temp_air,
            fabric_loss_w: surfaces.iter().map(|flows| flows.heat_flow_from_air_w).sum(),
            window_loss_w: self.window_conductance() * (temp_air - temp_outside),
            air_exchange_loss_w: coefficients.air_exchange_conductance * (temp_air - temp_outside),
            internal_gains_w: conditions.internal_gains_w,
            solar_gain_to_air_w: solar_gain_to_air,
            hvac_power_w: conditions.hvac_power_w,
            air_exchange_conductance: coefficients.air_exchange_conductance,
            surfaces,
            temperatures,
            iterations,
            converged,
        }
    }

    /// Store the temperatures of a solved step as the new zone state.
    pub fn commit(&mut self, result: &StepResult) -> Result<(), DimensionMismatchError> {
        if result.temperatures.len() != self.system_size() {
            return Err(DimensionMismatchError {
                owner: "zone".into(),
                expected: self.system_size(),
                actual: result.temperatures.len(),
            });
        }

        for (surface, &offset) in self.surfaces.iter_mut().zip(&self.row_offsets) {
            let node_count = surface.fabric().node_count();
            surface
                .fabric_mut()
                .update_temperatures(&result.temperatures[offset..offset + node_count])?;
        }
        self.temp_air = result.temperatures[self.air_node_index];

        Ok(())
    }

    /// Solve one step and commit it. On error the zone is left as it was.
    pub fn solve_step(&mut self, conditions: &StepConditions) -> Result<StepResult, ZoneSimError> {
        let result = self.solve(conditions)?;
        self.commit(&result)?;

        Ok(result)
    }
}

/// Largest accepted ||A.x - b|| relative to ||b|| (or to 1 when b is smaller)
const MAX_RELATIVE_RESIDUAL: f64 = 1e-6;

/// LU decomposition with partial pivoting, rejecting solutions that are non-finite or do not
/// satisfy the system.
fn solve_linear_system(
    matrix_a: &DMatrix<f64>,
    vector_b: &DVector<f64>,
) -> Result<DVector<f64>, NumericalFailureReason> {
    let vector_x = matrix_a
        .clone()
        .lu()
        .solve(vector_b)
        .ok_or(NumericalFailureReason::SingularMatrix)?;
    check_solution(matrix_a, &vector_x, vector_b)?;

    Ok(vector_x)
}

fn check_solution(
    matrix_a: &DMatrix<f64>,
    vector_x: &DVector<f64>,
    vector_b: &DVector<f64>,
) -> Result<(), NumericalFailureReason> {
    if vector_x.iter().any(|temp| !temp.is_finite()) {
        return Err(NumericalFailureReason::NonFiniteSolution);
    }

    let relative_residual = (matrix_a * vector_x - vector_b).norm() / vector_b.norm().max(1.);
    if relative_residual.is_nan() || relative_residual > MAX_RELATIVE_RESIDUAL {
        return Err(NumericalFailureReason::InaccurateSolution { relative_residual });
    }

    Ok(())
}
