use thiserror::Error;

pub const JOULES_PER_KILOWATT_HOUR: u32 = 3_600_000;
pub const SECONDS_PER_HOUR: u32 = 3_600;
pub const HOURS_PER_DAY: u32 = 24;
pub const STEFAN_BOLTZMANN: f64 = 5.670374419e-8; // W / (m2.K4)

pub(crate) fn celsius_to_kelvin(temp_c: f64) -> Result<f64, BelowAbsoluteZeroError> {
    if temp_c < -273.15 {
        Err(BelowAbsoluteZeroError::from_c(temp_c))
    } else {
        Ok(temp_c + 273.15)
    }
}

/// Convert a constant power held over a timestep into energy, in kWh
///
/// Arguments:
/// * `power_w` - power, in W
/// * `timestep_s` - duration over which the power is held, in seconds
pub fn watts_over_step_to_kwh(power_w: f64, timestep_s: f64) -> f64 {
    power_w * timestep_s / JOULES_PER_KILOWATT_HOUR as f64
}

/// Smallest angle between two compass bearings, in degrees (0 to 180 inclusive)
///
/// Bearings outside 0..360 are wrapped first, so that e.g. -10 and 350 are treated as the same.
pub fn incidence_angle(bearing1: f64, bearing2: f64) -> f64 {
    let diff = (bearing1.rem_euclid(360.) - bearing2.rem_euclid(360.)).abs();

    if diff > 180. {
        360. - diff
    } else {
        diff
    }
}

#[derive(Debug, Error)]
#[error("A temperature of {k}ºK/{}ºC was encountered, which is less than absolute zero", k - 273.15)]
pub struct BelowAbsoluteZeroError {
    k: f64,
}

impl BelowAbsoluteZeroError {
    fn from_c(c: f64) -> Self {
        Self { k: c + 273.15 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn should_do_correct_temperature_conversions() {
        assert_eq!(
            celsius_to_kelvin(20.0).unwrap(),
            293.15,
            "incorrect conversion of Celsius to Kelvin"
        );
        assert!(celsius_to_kelvin(-300.).is_err());
    }

    #[rstest]
    fn should_convert_step_power_to_kwh() {
        assert_relative_eq!(watts_over_step_to_kwh(1200., 300.), 0.1);
        assert_eq!(watts_over_step_to_kwh(0., 300.), 0.);
    }

    #[rstest]
    #[case(0., 0., 0.)]
    #[case(180., 0., 180.)]
    #[case(350., 10., 20.)]
    #[case(10., 350., 20.)]
    #[case(270., 0., 90.)]
    #[case(-10., 350., 0.)]
    #[case(45., 225., 180.)]
    fn should_calc_incidence_angle(
        #[case] bearing1: f64,
        #[case] bearing2: f64,
        #[case] expected: f64,
    ) {
        assert_relative_eq!(incidence_angle(bearing1, bearing2), expected);
    }
}
