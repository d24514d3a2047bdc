use crate::core::units::{HOURS_PER_DAY, SECONDS_PER_HOUR};
use serde::Deserialize;
use serde_valid::Validate;

/// Simulation period, in hours from the start of the boundary condition series.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SimulationTime {
    #[serde(rename(deserialize = "start"))]
    #[validate(minimum = 0.)]
    start_time: f64,
    #[serde(rename(deserialize = "end"))]
    end_time: f64,
    #[validate(exclusive_minimum = 0.)]
    step: f64,
}

impl SimulationTime {
    pub fn new(start_time: f64, end_time: f64, step: f64) -> Self {
        Self {
            start_time,
            end_time,
            step,
        }
    }

    pub fn total_steps(&self) -> usize {
        ((self.end_time - self.start_time) / self.step).ceil().max(0.) as usize
    }

    /// Timestep length, in hours
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Timestep length, in seconds
    pub fn step_in_seconds(&self) -> f64 {
        self.step * SECONDS_PER_HOUR as f64
    }

    /// Number of whole timesteps in one day (at least 1)
    pub fn steps_per_day(&self) -> usize {
        ((HOURS_PER_DAY as f64 / self.step).round() as usize).max(1)
    }

    pub fn iter(&self) -> SimulationTimeIterator {
        SimulationTimeIterator::from(self.clone())
    }
}

#[derive(Clone)]
pub struct SimulationTimeIterator {
    current_index: usize,
    current_time: f64,
    started: bool,
    simulation_time: SimulationTime,
}

impl SimulationTimeIterator {
    fn from(simulation_time: SimulationTime) -> Self {
        SimulationTimeIterator {
            current_index: 0,
            current_time: simulation_time.start_time,
            started: false,
            simulation_time,
        }
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulationTimeIteration {
    pub index: usize,
    /// hours since the start of the boundary condition series
    pub time: f64,
    /// hours
    pub timestep: f64,
}

impl SimulationTimeIteration {
    pub fn current_hour(&self) -> u32 {
        self.time.floor() as u32
    }

    pub fn hour_of_day(&self) -> u32 {
        self.current_hour() % HOURS_PER_DAY
    }

    /// Time of day in fractional hours, 0 to 24
    pub fn time_of_day(&self) -> f64 {
        self.time.rem_euclid(HOURS_PER_DAY as f64)
    }

    pub fn current_day(&self) -> u32 {
        self.time as u32 / HOURS_PER_DAY
    }
}

impl Iterator for SimulationTimeIterator {
    type Item = SimulationTimeIteration;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.started && self.simulation_time.start_time < self.simulation_time.end_time {
            self.started = true;
            return Some(SimulationTimeIteration {
                index: 0,
                time: self.simulation_time.start_time,
                timestep: self.simulation_time.step,
            });
        }
        match self.started
            && self.current_time < (self.simulation_time.end_time - self.simulation_time.step)
        {
            true => {
                self.current_index += 1;
                self.current_time += self.simulation_time.step;
                Some(SimulationTimeIteration {
                    index: self.current_index,
                    time: self.current_time,
                    timestep: self.simulation_time.step,
                })
            }
            false => None,
        }
    }
}
