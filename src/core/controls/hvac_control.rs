// This module provides controllers deciding the HVAC power delivered to the zone air each timestep

use crate::errors::ConfigurationError;
use std::str::FromStr;
use strum::{Display, EnumString};

/// Values the controllers may need besides temperatures and setpoints.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ControlContext {
    /// seconds
    pub timestep: f64,
    /// heat capacity of the zone air, in J/K
    pub air_thermal_mass: f64,
    /// passive gains less passive losses over the previous step, in W
    pub net_passive_power: f64,
}

#[derive(Clone, Copy, Debug, Default, Display, Eq, PartialEq)]
pub enum HvacMode {
    #[default]
    Off,
    Heating,
    Cooling,
}

pub trait HvacBehaviour: Send + Sync {
    /// Power to deliver to the zone air, in W (positive heats, negative cools)
    ///
    /// Arguments:
    /// * `temp_air_prev` - zone air temperature at the end of the previous step, in deg C
    /// * `heating_setpoint` - in deg C
    /// * `cooling_setpoint` - in deg C
    /// * `context` - timestep and passive balance of the zone
    fn power(
        &mut self,
        temp_air_prev: f64,
        heating_setpoint: f64,
        cooling_setpoint: f64,
        context: &ControlContext,
    ) -> f64;

    fn mode(&self) -> HvacMode {
        HvacMode::Off
    }
}

#[derive(Clone, Copy, Debug, Display, EnumString, Eq, PartialEq)]
#[strum(ascii_case_insensitive)]
pub enum HvacControllerType {
    Ideal,
    Proportional,
    Stateful,
    Pid,
}

#[derive(Clone, Debug)]
pub enum HvacController {
    Ideal(IdealHvac),
    Proportional(ProportionalHvac),
    Stateful(StatefulHvac),
    Pid(PidHvac),
}

// macro so accessing individual controllers through the enum isn't so repetitive
macro_rules! per_controller {
    ($val:expr, $pattern:pat => { $res:expr }) => {
        match $val {
            HvacController::Ideal($pattern) => $res,
            HvacController::Proportional($pattern) => $res,
            HvacController::Stateful($pattern) => $res,
            HvacController::Pid($pattern) => $res,
        }
    };
}

impl HvacBehaviour for HvacController {
    fn power(
        &mut self,
        temp_air_prev: f64,
        heating_setpoint: f64,
        cooling_setpoint: f64,
        context: &ControlContext,
    ) -> f64 {
        per_controller!(self, c => { c.power(temp_air_prev, heating_setpoint, cooling_setpoint, context) })
    }

    fn mode(&self) -> HvacMode {
        per_controller!(self, c => { c.mode() })
    }
}

/// Tuning values for all controller types; each type reads the ones it needs.
#[derive(Clone, Debug, PartialEq)]
pub struct HvacParameters {
    /// W; None for unlimited
    pub heating_capacity: Option<f64>,
    /// W; None for unlimited
    pub cooling_capacity: Option<f64>,
    /// W/K
    pub proportional_gain: f64,
    /// K
    pub deadband: f64,
    pub min_off_steps: u32,
    pub min_run_steps: u32,
    pub ramp_steps: u32,
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

impl Default for HvacParameters {
    fn default() -> Self {
        Self {
            heating_capacity: None,
            cooling_capacity: None,
            proportional_gain: 1000.,
            deadband: 0.5,
            min_off_steps: 0,
            min_run_steps: 0,
            ramp_steps: 1,
            kp: 1000.,
            ki: 0.,
            kd: 0.,
        }
    }
}

impl HvacController {
    /// Build a controller from its type name, as given in the input.
    pub fn from_type_name(
        type_name: &str,
        parameters: &HvacParameters,
    ) -> Result<Self, ConfigurationError> {
        let controller_type = HvacControllerType::from_str(type_name)
            .map_err(|_| ConfigurationError::UnknownControllerType(type_name.into()))?;

        Self::new(controller_type, parameters)
    }

    pub fn new(
        controller_type: HvacControllerType,
        parameters: &HvacParameters,
    ) -> Result<Self, ConfigurationError> {
        let heating_capacity = Capacity::new("heating_capacity", parameters.heating_capacity)?;
        let cooling_capacity = Capacity::new("cooling_capacity", parameters.cooling_capacity)?;

        Ok(match controller_type {
            HvacControllerType::Ideal => Self::Ideal(IdealHvac::new(heating_capacity, cooling_capacity)),
            HvacControllerType::Proportional => Self::Proportional(ProportionalHvac::new(
                heating_capacity,
                cooling_capacity,
                parameters.proportional_gain,
            )?),
            HvacControllerType::Stateful => Self::Stateful(StatefulHvac::new(
                heating_capacity,
                cooling_capacity,
                parameters.deadband,
                parameters.min_off_steps,
                parameters.min_run_steps,
                parameters.ramp_steps,
            )?),
            HvacControllerType::Pid => Self::Pid(PidHvac::new(
                heating_capacity,
                cooling_capacity,
                parameters.kp,
                parameters.ki,
                parameters.kd,
            )?),
        })
    }
}

/// Maximum output in one direction, in W
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Capacity(Option<f64>);

impl Capacity {
    pub const UNLIMITED: Self = Self(None);

    pub fn new(parameter: &'static str, capacity: Option<f64>) -> Result<Self, ConfigurationError> {
        match capacity {
            Some(value) if !(value >= 0.) => Err(ConfigurationError::invalid(
                "hvac",
                parameter,
                format!("must not be negative, got {value}"),
            )),
            _ => Ok(Self(capacity)),
        }
    }

    pub fn limited(value: f64) -> Self {
        Self(Some(value))
    }

    pub fn value(&self) -> f64 {
        self.0.unwrap_or(f64::INFINITY)
    }
}

/// Predictive controller delivering whatever the air needs to land on the setpoint this step.
#[derive(Clone, Debug)]
pub struct IdealHvac {
    heating_capacity: Capacity,
    cooling_capacity: Capacity,
    mode: HvacMode,
}

impl IdealHvac {
    pub fn new(heating_capacity: Capacity, cooling_capacity: Capacity) -> Self {
        Self {
            heating_capacity,
            cooling_capacity,
            mode: HvacMode::Off,
        }
    }
}

impl HvacBehaviour for IdealHvac {
    fn power(
        &mut self,
        temp_air_prev: f64,
        heating_setpoint: f64,
        cooling_setpoint: f64,
        context: &ControlContext,
    ) -> f64 {
        let temp_free_float = temp_air_prev
            + context.net_passive_power * context.timestep / context.air_thermal_mass;

        let setpoint = if temp_free_float < heating_setpoint {
            heating_setpoint
        } else if temp_free_float > cooling_setpoint {
            cooling_setpoint
        } else {
            self.mode = HvacMode::Off;
            return 0.;
        };

        let power = (context.air_thermal_mass * (setpoint - temp_air_prev) / context.timestep
            - context.net_passive_power)
            .clamp(-self.cooling_capacity.value(), self.heating_capacity.value());
        self.mode = mode_for_power(power);

        power
    }

    fn mode(&self) -> HvacMode {
        self.mode
    }
}

fn mode_for_power(power: f64) -> HvacMode {
    if power > 0. {
        HvacMode::Heating
    } else if power < 0. {
        HvacMode::Cooling
    } else {
        HvacMode::Off
    }
}

#[derive(Clone, Debug)]
pub struct ProportionalHvac {
    heating_capacity: Capacity,
    cooling_capacity: Capacity,
    gain: f64, // W/K
    mode: HvacMode,
}

impl ProportionalHvac {
    pub fn new(
        heating_capacity: Capacity,
        cooling_capacity: Capacity,
        gain: f64,
    ) -> Result<Self, ConfigurationError> {
        if !(gain.is_finite() && gain > 0.) {
            return Err(ConfigurationError::invalid(
                "hvac",
                "proportional_gain",
                format!("must be positive, got {gain}"),
            ));
        }

        Ok(Self {
            heating_capacity,
            cooling_capacity,
            gain,
            mode: HvacMode::Off,
        })
    }
}

impl HvacBehaviour for ProportionalHvac {
    fn power(
        &mut self,
        temp_air_prev: f64,
        heating_setpoint: f64,
        cooling_setpoint: f64,
        _context: &ControlContext,
    ) -> f64 {
        let power = if temp_air_prev < heating_setpoint {
            (self.gain * (heating_setpoint - temp_air_prev)).clamp(0., self.heating_capacity.value())
        } else if temp_air_prev > cooling_setpoint {
            -(self.gain * (temp_air_prev - cooling_setpoint))
                .clamp(0., self.cooling_capacity.value())
        } else {
            0.
        };
        self.mode = mode_for_power(power);

        power
    }

    fn mode(&self) -> HvacMode {
        self.mode
    }
}

/// On/off plant with a deadband, minimum off and run times, and a ramped output.
#[derive(Clone, Debug)]
pub struct StatefulHvac {
    heating_capacity: f64,
    cooling_capacity: f64,
    deadband: f64,
    min_off_steps: u32,
    min_run_steps: u32,
    ramp_increment: f64,
    mode: HvacMode,
    /// calls made since the last mode change, including the current one
    steps_in_mode: u32,
    output: f64,
}

impl StatefulHvac {
    pub fn new(
        heating_capacity: Capacity,
        cooling_capacity: Capacity,
        deadband: f64,
        min_off_steps: u32,
        min_run_steps: u32,
        ramp_steps: u32,
    ) -> Result<Self, ConfigurationError> {
        let (Some(heating_capacity), Some(cooling_capacity)) =
            (heating_capacity.0, cooling_capacity.0)
        else {
            return Err(ConfigurationError::invalid(
                "hvac",
                "capacity",
                "a stateful controller ramps towards its capacity, so both capacities must be given",
            ));
        };
        if ramp_steps == 0 {
            return Err(ConfigurationError::invalid(
                "hvac",
                "ramp_steps",
                "must be at least 1",
            ));
        }
        if !(deadband.is_finite() && deadband >= 0.) {
            return Err(ConfigurationError::invalid(
                "hvac",
                "deadband",
                format!("must not be negative, got {deadband}"),
            ));
        }

        Ok(Self {
            heating_capacity,
            cooling_capacity,
            deadband,
            min_off_steps,
            min_run_steps,
            ramp_increment: heating_capacity.max(cooling_capacity) / ramp_steps as f64,
            mode: HvacMode::Off,
            // a plant that has never run may start straight away
            steps_in_mode: min_off_steps,
            output: 0.,
        })
    }

    pub fn output(&self) -> f64 {
        self.output
    }

    fn transition(&mut self, mode: HvacMode) {
        self.mode = mode;
        self.steps_in_mode = 0;
    }
}

impl HvacBehaviour for StatefulHvac {
    fn power(
        &mut self,
        temp_air_prev: f64,
        heating_setpoint: f64,
        cooling_setpoint: f64,
        _context: &ControlContext,
    ) -> f64 {
        self.steps_in_mode = self.steps_in_mode.saturating_add(1);

        match self.mode {
            HvacMode::Off if self.steps_in_mode >= self.min_off_steps => {
                if temp_air_prev < heating_setpoint - self.deadband {
                    self.transition(HvacMode::Heating);
                } else if temp_air_prev > cooling_setpoint + self.deadband {
                    self.transition(HvacMode::Cooling);
                }
            }
            HvacMode::Heating
                if temp_air_prev >= heating_setpoint
                    && self.steps_in_mode >= self.min_run_steps =>
            {
                self.transition(HvacMode::Off);
            }
            HvacMode::Cooling
                if temp_air_prev <= cooling_setpoint
                    && self.steps_in_mode >= self.min_run_steps =>
            {
                self.transition(HvacMode::Off);
            }
            _ => {}
        }

        let target = match self.mode {
            HvacMode::Heating => self.heating_capacity,
            HvacMode::Cooling => -self.cooling_capacity,
            HvacMode::Off => 0.,
        };
        let step = (target - self.output).clamp(-self.ramp_increment, self.ramp_increment);
        self.output = (self.output + step).clamp(-self.cooling_capacity, self.heating_capacity);

        self.output
    }

    fn mode(&self) -> HvacMode {
        self.mode
    }
}

/// PID controller acting on the distance outside the violated setpoint.
#[derive(Clone, Debug)]
pub struct PidHvac {
    heating_capacity: Capacity,
    cooling_capacity: Capacity,
    kp: f64,
    ki: f64,
    kd: f64,
    mode: HvacMode,
    integral: f64,
    prev_error: f64,
}

impl PidHvac {
    pub fn new(
        heating_capacity: Capacity,
        cooling_capacity: Capacity,
        kp: f64,
        ki: f64,
        kd: f64,
    ) -> Result<Self, ConfigurationError> {
        for (parameter, value) in [("kp", kp), ("ki", ki), ("kd", kd)] {
            if !(value.is_finite() && value >= 0.) {
                return Err(ConfigurationError::invalid(
                    "hvac",
                    parameter,
                    format!("must not be negative, got {value}"),
                ));
            }
        }

        Ok(Self {
            heating_capacity,
            cooling_capacity,
            kp,
            ki,
            kd,
            mode: HvacMode::Off,
            integral: 0.,
            prev_error: 0.,
        })
    }

    /// Accumulated integral of the error, in K.s
    pub fn integral(&self) -> f64 {
        self.integral
    }
}

impl HvacBehaviour for PidHvac {
    fn power(
        &mut self,
        temp_air_prev: f64,
        heating_setpoint: f64,
        cooling_setpoint: f64,
        context: &ControlContext,
    ) -> f64 {
        let (mode, error) = if temp_air_prev < heating_setpoint {
            (HvacMode::Heating, heating_setpoint - temp_air_prev)
        } else if temp_air_prev > cooling_setpoint {
            (HvacMode::Cooling, temp_air_prev - cooling_setpoint)
        } else {
            (HvacMode::Off, 0.)
        };

        if mode != self.mode {
            self.mode = mode;
            self.integral = 0.;
            self.prev_error = error;
        }

        let capacity = match mode {
            HvacMode::Heating => self.heating_capacity.value(),
            HvacMode::Cooling => self.cooling_capacity.value(),
            HvacMode::Off => {
                self.prev_error = 0.;
                return 0.;
            }
        };

        let integral_increment = error * context.timestep;
        self.integral += integral_increment;
        let derivative = (error - self.prev_error) / context.timestep;
        self.prev_error = error;

        let unclamped = self.kp * error + self.ki * self.integral + self.kd * derivative;
        if !(0. ..=capacity).contains(&unclamped) {
            self.integral -= integral_increment;
        }
        let output = unclamped.clamp(0., capacity);

        match mode {
            HvacMode::Cooling => -output,
            _ => output,
        }
    }

    fn mode(&self) -> HvacMode {
        self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn context() -> ControlContext {
        ControlContext {
            timestep: 300.,
            air_thermal_mass: 49_000.,
            net_passive_power: -500.,
        }
    }

    #[rstest]
    fn should_resolve_controller_type_names() {
        let parameters = HvacParameters {
            heating_capacity: Some(3000.),
            cooling_capacity: Some(2000.),
            ..Default::default()
        };
        assert!(matches!(
            HvacController::from_type_name("Ideal", &parameters),
            Ok(HvacController::Ideal(_))
        ));
        assert!(matches!(
            HvacController::from_type_name("pid", &parameters),
            Ok(HvacController::Pid(_))
        ));
        assert_eq!(
            HvacController::from_type_name("Thermostatic", &parameters).unwrap_err(),
            ConfigurationError::UnknownControllerType("Thermostatic".into())
        );
    }

    #[rstest]
    fn should_calc_ideal_power(context: ControlContext) {
        let mut hvac = IdealHvac::new(Capacity::UNLIMITED, Capacity::UNLIMITED);

        // Free float drifts below the heating setpoint
        let power = hvac.power(19., 20., 24., &context);
        assert_relative_eq!(power, 49_000. * 1. / 300. + 500.);
        assert_eq!(hvac.mode(), HvacMode::Heating);

        // Free float above cooling setpoint
        let power = hvac.power(25., 20., 24., &context);
        assert_relative_eq!(power, 49_000. * -1. / 300. + 500.);
        assert_eq!(hvac.mode(), HvacMode::Cooling);

        // In band
        assert_eq!(hvac.power(22., 20., 24., &context), 0.);
        assert_eq!(hvac.mode(), HvacMode::Off);
    }

    #[rstest]
    fn should_clamp_ideal_power_to_capacity(context: ControlContext) {
        let mut hvac = IdealHvac::new(Capacity::limited(300.), Capacity::limited(100.));
        assert_eq!(hvac.power(10., 20., 24., &context), 300.);
        assert_eq!(hvac.power(30., 20., 24., &context), -100.);
    }

    #[rstest]
    fn should_calc_proportional_power(context: ControlContext) {
        let mut hvac =
            ProportionalHvac::new(Capacity::limited(3000.), Capacity::limited(2000.), 1000.)
                .unwrap();

        assert_relative_eq!(hvac.power(18.5, 20., 24., &context), 1500.);
        assert_eq!(hvac.power(10., 20., 24., &context), 3000.);
        assert_eq!(hvac.power(22., 20., 24., &context), 0.);
        assert_relative_eq!(hvac.power(24.5, 20., 24., &context), -500.);
        assert_eq!(hvac.power(30., 20., 24., &context), -2000.);
        assert!(ProportionalHvac::new(Capacity::UNLIMITED, Capacity::UNLIMITED, 0.).is_err());
    }

    fn stateful(min_off_steps: u32, min_run_steps: u32, ramp_steps: u32) -> StatefulHvac {
        StatefulHvac::new(
            Capacity::limited(2000.),
            Capacity::limited(1000.),
            0.5,
            min_off_steps,
            min_run_steps,
            ramp_steps,
        )
        .unwrap()
    }

    #[rstest]
    fn should_reject_restart_within_min_off_time(context: ControlContext) {
        let mut hvac = stateful(3, 1, 1);

        // First start is allowed straight away
        assert_eq!(hvac.power(18., 20., 24., &context), 2000.);
        assert_eq!(hvac.mode(), HvacMode::Heating);

        // Setpoint reached after the minimum run time
        assert_eq!(hvac.power(20.2, 20., 24., &context), 0.);
        assert_eq!(hvac.mode(), HvacMode::Off);

        // Cold again, but not off for long enough
        hvac.power(18., 20., 24., &context);
        assert_eq!(hvac.mode(), HvacMode::Off);
        hvac.power(18., 20., 24., &context);
        assert_eq!(hvac.mode(), HvacMode::Off);

        // Third step off
        assert_eq!(hvac.power(18., 20., 24., &context), 2000.);
        assert_eq!(hvac.mode(), HvacMode::Heating);
    }

    #[rstest]
    fn should_respect_deadband_and_min_run_time(context: ControlContext) {
        let mut hvac = stateful(0, 3, 1);

        // Inside the deadband nothing starts
        assert_eq!(hvac.power(19.6, 20., 24., &context), 0.);
        assert_eq!(hvac.mode(), HvacMode::Off);

        hvac.power(19.4, 20., 24., &context);
        assert_eq!(hvac.mode(), HvacMode::Heating);

        // Warm, but must keep running
        hvac.power(21., 20., 24., &context);
        hvac.power(21., 20., 24., &context);
        assert_eq!(hvac.mode(), HvacMode::Heating);
        hvac.power(21., 20., 24., &context);
        assert_eq!(hvac.mode(), HvacMode::Off);

        hvac.power(25., 20., 24., &context);
        assert_eq!(hvac.mode(), HvacMode::Cooling);
        assert_eq!(hvac.output(), -1000.);
    }

    #[rstest]
    fn should_ramp_without_overshoot(context: ControlContext) {
        // increment is max(2000, 1000) / 3
        let mut hvac = stateful(0, 0, 3);
        let outputs: Vec<f64> = (0..4).map(|_| hvac.power(18., 20., 24., &context)).collect();
        assert_relative_eq!(outputs[0], 2000. / 3.);
        assert_relative_eq!(outputs[1], 4000. / 3.);
        assert_relative_eq!(outputs[2], 2000.);
        assert_relative_eq!(outputs[3], 2000.);

        // Switch off and ramp back down
        assert_relative_eq!(hvac.power(21., 20., 24., &context), 4000. / 3.);

        // Switch straight to cooling, capped at the cooling capacity
        let outputs: Vec<f64> = (0..4).map(|_| hvac.power(26., 20., 24., &context)).collect();
        assert_relative_eq!(outputs[0], 2000. / 3.);
        assert_relative_eq!(outputs[1], 0., epsilon = 1e-9);
        assert_relative_eq!(outputs[2], -2000. / 3.);
        assert_relative_eq!(outputs[3], -1000.);
    }

    #[rstest]
    fn should_reject_invalid_stateful_configuration() {
        assert!(StatefulHvac::new(Capacity::limited(1.), Capacity::limited(1.), 0.5, 0, 0, 0).is_err());
        assert!(StatefulHvac::new(Capacity::UNLIMITED, Capacity::limited(1.), 0.5, 0, 0, 1).is_err());
    }

    #[rstest]
    fn should_calc_pid_terms(context: ControlContext) {
        let mut hvac =
            PidHvac::new(Capacity::limited(5000.), Capacity::limited(5000.), 100., 0.01, 1000.)
                .unwrap();

        // Entering heating: no derivative kick, integral of one step
        assert_relative_eq!(hvac.power(19., 20., 24., &context), 100. + 0.01 * 300.);
        assert_relative_eq!(hvac.integral(), 300.);

        // Error grows to 2 K
        assert_relative_eq!(
            hvac.power(18., 20., 24., &context),
            200. + 0.01 * 900. + 1000. * 1. / 300.
        );

        // Cooling output is negated and the integral restarts
        assert_relative_eq!(hvac.power(25., 20., 24., &context), -(100. + 0.01 * 300.));
        assert_relative_eq!(hvac.integral(), 300.);

        // Back in band
        assert_eq!(hvac.power(22., 20., 24., &context), 0.);
        assert_eq!(hvac.integral(), 0.);
    }

    #[rstest]
    fn should_not_wind_up_while_saturated(context: ControlContext) {
        let mut hvac =
            PidHvac::new(Capacity::limited(500.), Capacity::limited(500.), 100., 0.01, 0.).unwrap();

        // Far below setpoint: saturated every step, integral never grows
        for _ in 0..50 {
            assert_eq!(hvac.power(10., 20., 24., &context), 500.);
            assert_eq!(hvac.integral(), 0.);
        }

        // Close to setpoint the output drops immediately instead of unwinding a large integral
        let power = hvac.power(19.5, 20., 24., &context);
        assert_relative_eq!(power, 50. + 0.01 * 150.);
    }
}
