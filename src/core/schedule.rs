use crate::simulation_time::SimulationTimeIteration;
use anyhow::{anyhow, bail};
use serde::{Deserialize, Serialize};
use serde_valid::Validate;

pub(crate) use input::NumericSchedule;

pub(crate) fn reject_nulls<T>(vec_of_options: Vec<Option<T>>) -> anyhow::Result<Vec<T>> {
    vec_of_options
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| anyhow!("A null was in a schedule when it was not expected."))
}

pub(crate) fn expand_numeric_schedule(schedule: &NumericSchedule) -> Vec<Option<f64>> {
    schedule.expand()
}

/// Values driving the zone for one timestep.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScheduledValues {
    pub heating_setpoint: f64,
    pub cooling_setpoint: f64,
    pub internal_gains_w: f64,
    pub window_open_fraction: f64,
}

/// Setpoints and gains that switch between occupied and unoccupied values by time of day.
///
/// The occupied period may wrap past midnight (e.g. 17:00 to 08:00).
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, Validate)]
#[serde(deny_unknown_fields, rename_all = "PascalCase")]
pub struct OccupancySchedule {
    #[validate(minimum = 0.)]
    #[validate(maximum = 24.)]
    pub occupied_start_hour: f64,
    #[validate(minimum = 0.)]
    #[validate(maximum = 24.)]
    pub occupied_end_hour: f64,
    pub heating_setpoint_occupied: f64,
    pub heating_setpoint_unoccupied: f64,
    pub cooling_setpoint_occupied: f64,
    pub cooling_setpoint_unoccupied: f64,
    #[serde(default)]
    #[validate(minimum = 0.)]
    pub internal_gains_occupied: f64,
    #[serde(default)]
    #[validate(minimum = 0.)]
    pub internal_gains_unoccupied: f64,
    #[serde(default)]
    #[validate(minimum = 0.)]
    #[validate(maximum = 1.)]
    pub window_open_fraction_occupied: f64,
}

impl OccupancySchedule {
    pub fn is_occupied(&self, time_of_day: f64) -> bool {
        let (start, end) = (self.occupied_start_hour, self.occupied_end_hour);
        if start <= end {
            (start..end).contains(&time_of_day)
        } else {
            time_of_day >= start || time_of_day < end
        }
    }

    pub fn values_at(&self, simtime: &SimulationTimeIteration) -> ScheduledValues {
        if self.is_occupied(simtime.time_of_day()) {
            ScheduledValues {
                heating_setpoint: self.heating_setpoint_occupied,
                cooling_setpoint: self.cooling_setpoint_occupied,
                internal_gains_w: self.internal_gains_occupied,
                window_open_fraction: self.window_open_fraction_occupied,
            }
        } else {
            ScheduledValues {
                heating_setpoint: self.heating_setpoint_unoccupied,
                cooling_setpoint: self.cooling_setpoint_unoccupied,
                internal_gains_w: self.internal_gains_unoccupied,
                window_open_fraction: 0.,
            }
        }
    }
}

/// Where the per-step setpoints, gains and window openings come from.
#[derive(Clone, Debug, PartialEq)]
pub enum ControlSchedule {
    Occupancy(OccupancySchedule),
    Series {
        heating_setpoints: Vec<f64>,
        cooling_setpoints: Vec<f64>,
        internal_gains: Vec<f64>,
        window_open_fractions: Vec<f64>,
    },
}

impl ControlSchedule {
    /// Build from expanded series, each of which must cover `total_steps`.
    pub fn from_series(
        heating_setpoints: Vec<f64>,
        cooling_setpoints: Vec<f64>,
        internal_gains: Vec<f64>,
        window_open_fractions: Vec<f64>,
        total_steps: usize,
    ) -> anyhow::Result<Self> {
        for (name, series) in [
            ("heating setpoint", &heating_setpoints),
            ("cooling setpoint", &cooling_setpoints),
            ("internal gains", &internal_gains),
            ("window opening", &window_open_fractions),
        ] {
            if series.len() < total_steps {
                bail!(
                    "The {name} schedule has {} entries but the simulation has {total_steps} timesteps",
                    series.len()
                );
            }
        }
        if let Some((idx, (heating, cooling))) = heating_setpoints
            .iter()
            .zip(&cooling_setpoints)
            .enumerate()
            .find(|(_, (heating, cooling))| heating > cooling)
        {
            bail!("Heating setpoint {heating} is above cooling setpoint {cooling} at timestep {idx}");
        }

        Ok(Self::Series {
            heating_setpoints,
            cooling_setpoints,
            internal_gains,
            window_open_fractions,
        })
    }

    pub fn values_at(&self, simtime: &SimulationTimeIteration) -> ScheduledValues {
        match self {
            Self::Occupancy(schedule) => schedule.values_at(simtime),
            Self::Series {
                heating_setpoints,
                cooling_setpoints,
                internal_gains,
                window_open_fractions,
            } => ScheduledValues {
                heating_setpoint: heating_setpoints[simtime.index],
                cooling_setpoint: cooling_setpoints[simtime.index],
                internal_gains_w: internal_gains[simtime.index],
                window_open_fraction: window_open_fractions[simtime.index],
            },
        }
    }
}

/// Data structures representing how schedules can be provided as input (in JSON).
pub(crate) mod input {
    use itertools::Itertools;
    use serde::{Deserialize, Serialize};
    use std::collections::HashMap;

    /// A series given as a `main` list of entries, where entries may be values, nulls, named
    /// references to other lists in the same object, or `{"value": .., "repeat": n}` repeaters.
    #[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
    pub(crate) struct Schedule<T: Copy> {
        pub(crate) main: Vec<ScheduleEntry<T>>,
        #[serde(flatten)]
        pub(crate) references: HashMap<String, ScheduleReferenceEntry<T>>,
    }

    impl<T> Schedule<T>
    where
        T: Copy,
    {
        pub(super) fn expand(&self) -> Vec<Option<T>> {
            self.main
                .iter()
                .flat_map(|entry| self.expand_entry(entry))
                .collect()
        }

        fn expand_entry(&self, entry: &ScheduleEntry<T>) -> Vec<Option<T>> {
            match entry {
                ScheduleEntry::Null(_) => vec![None],
                ScheduleEntry::Value(v) => vec![Some(*v)],
                ScheduleEntry::Repeater(repeater) => {
                    let block = match &repeater.value {
                        ScheduleRepeaterValue::Reference(reference) => {
                            self.expand_reference(reference)
                        }
                        ScheduleRepeaterValue::Entry(ScheduleRepeaterEntry::Null(_)) => vec![None],
                        ScheduleRepeaterValue::Entry(ScheduleRepeaterEntry::Value(v)) => {
                            vec![Some(*v)]
                        }
                    };
                    std::iter::repeat(block)
                        .take(repeater.repeat)
                        .flatten()
                        .collect_vec()
                }
                ScheduleEntry::Reference(reference) => self.expand_reference(reference),
            }
        }

        /// Unknown references expand to a single null, which is rejected when nulls are not allowed.
        fn expand_reference(&self, reference: &str) -> Vec<Option<T>> {
            match self.references.get(reference) {
                Some(ScheduleReferenceEntry::Single(entry)) => self.expand_entry(entry),
                Some(ScheduleReferenceEntry::Multi(entries)) => entries
                    .iter()
                    .flat_map(|entry| self.expand_entry(entry))
                    .collect_vec(),
                None => vec![None],
            }
        }
    }

    #[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
    #[serde(untagged)]
    pub(crate) enum ScheduleEntry<T: Copy> {
        Null(()),
        Value(T),
        Repeater(ScheduleRepeater<T>),
        Reference(String),
    }

    #[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
    #[serde(untagged)]
    pub(crate) enum ScheduleReferenceEntry<T: Copy> {
        Multi(Vec<ScheduleEntry<T>>),
        Single(ScheduleEntry<T>),
    }

    #[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
    #[serde(untagged)]
    pub(crate) enum ScheduleRepeaterEntry<T> {
        Null(()),
        Value(T),
    }

    #[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
    pub(crate) struct ScheduleRepeater<T: Copy> {
        pub(crate) value: ScheduleRepeaterValue<T>,
        pub(crate) repeat: usize,
    }

    #[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
    #[serde(untagged)]
    pub(crate) enum ScheduleRepeaterValue<T: Copy> {
        Reference(String),
        Entry(ScheduleRepeaterEntry<T>),
    }

    pub(crate) type NumericSchedule = Schedule<f64>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use serde_json::json;

    #[fixture]
    fn setpoint_schedule() -> NumericSchedule {
        serde_json::from_value(json!({
            "main": [{"value": "day", "repeat": 2}],
            "day": [
                {"value": 16., "repeat": 7},
                {"value": 21., "repeat": 2},
                {"value": 18., "repeat": 8},
                {"value": 21., "repeat": 6},
                16.
            ]
        }))
        .unwrap()
    }

    #[rstest]
    fn should_expand_schedule_with_references_and_repeaters(setpoint_schedule: NumericSchedule) {
        let expanded = reject_nulls(expand_numeric_schedule(&setpoint_schedule)).unwrap();
        assert_eq!(expanded.len(), 48);
        assert_eq!(&expanded[..9], &[16., 16., 16., 16., 16., 16., 16., 21., 21.]);
        assert_eq!(expanded[23], 16.);
        assert_eq!(expanded[24 + 8], 21.);
    }

    #[rstest]
    fn should_reject_nulls_and_unknown_references() {
        let schedule: NumericSchedule =
            serde_json::from_value(json!({"main": [20., null, 20.]})).unwrap();
        assert!(reject_nulls(expand_numeric_schedule(&schedule)).is_err());

        let schedule: NumericSchedule =
            serde_json::from_value(json!({"main": [20., "weekend"]})).unwrap();
        assert!(reject_nulls(expand_numeric_schedule(&schedule)).is_err());
    }

    #[rstest]
    fn schedule_without_main_fails() {
        assert!(serde_json::from_value::<NumericSchedule>(json!({
            "day": [20., 21.]
        }))
        .is_err());
    }

    #[fixture]
    fn occupancy() -> OccupancySchedule {
        OccupancySchedule {
            occupied_start_hour: 17.,
            occupied_end_hour: 8.,
            heating_setpoint_occupied: 21.,
            heating_setpoint_unoccupied: 16.,
            cooling_setpoint_occupied: 24.,
            cooling_setpoint_unoccupied: 28.,
            internal_gains_occupied: 300.,
            internal_gains_unoccupied: 50.,
            window_open_fraction_occupied: 0.2,
        }
    }

    fn at_hour(time: f64) -> SimulationTimeIteration {
        SimulationTimeIteration {
            index: 0,
            time,
            timestep: 1.,
        }
    }

    #[rstest]
    fn should_wrap_occupied_period_past_midnight(occupancy: OccupancySchedule) {
        assert!(occupancy.is_occupied(17.));
        assert!(occupancy.is_occupied(23.5));
        assert!(occupancy.is_occupied(0.));
        assert!(occupancy.is_occupied(7.9));
        assert!(!occupancy.is_occupied(8.));
        assert!(!occupancy.is_occupied(12.));
    }

    #[rstest]
    fn should_switch_values_with_occupancy(occupancy: OccupancySchedule) {
        assert_eq!(
            occupancy.values_at(&at_hour(24. + 18.)),
            ScheduledValues {
                heating_setpoint: 21.,
                cooling_setpoint: 24.,
                internal_gains_w: 300.,
                window_open_fraction: 0.2,
            }
        );
        assert_eq!(
            occupancy.values_at(&at_hour(12.)),
            ScheduledValues {
                heating_setpoint: 16.,
                cooling_setpoint: 28.,
                internal_gains_w: 50.,
                window_open_fraction: 0.,
            }
        );
    }

    #[rstest]
    fn should_read_series_by_timestep_index() {
        let schedule = ControlSchedule::from_series(
            vec![20., 21.],
            vec![24., 25.],
            vec![100., 200.],
            vec![0., 0.5],
            2,
        )
        .unwrap();
        let simtime = SimulationTimeIteration {
            index: 1,
            time: 1.,
            timestep: 1.,
        };

        assert_eq!(
            schedule.values_at(&simtime),
            ScheduledValues {
                heating_setpoint: 21.,
                cooling_setpoint: 25.,
                internal_gains_w: 200.,
                window_open_fraction: 0.5,
            }
        );
    }

    #[rstest]
    fn should_reject_short_or_crossed_series() {
        assert!(ControlSchedule::from_series(vec![20.], vec![24.], vec![0.], vec![0.], 2).is_err());
        assert!(
            ControlSchedule::from_series(vec![25.], vec![24.], vec![0.], vec![0.], 1).is_err()
        );
    }
}
