//! Longwave radiation exchange between an exterior surface and the sky, air, ground and
//! surrounding surfaces.

use crate::core::units::{celsius_to_kelvin, BelowAbsoluteZeroError, STEFAN_BOLTZMANN};
use crate::errors::ConfigurationError;

/// A ground patch or neighbouring surface seen by an exterior surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewedSurface {
    pub view_factor: f64,
    /// deg C; None means the surface is at outdoor air temperature
    pub temperature: Option<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExteriorLongwaveRadiation {
    emissivity: f64,
    sky_view_factor: f64,
    /// splits the sky view between the sky itself and the air column
    beta: f64,
    ground: Vec<ViewedSurface>,
    surrounding: Vec<ViewedSurface>,
}

impl ExteriorLongwaveRadiation {
    /// Arguments:
    /// * `owner` - name of the surface (for error messages)
    /// * `emissivity` - longwave emissivity of the outside face, 0 to 1
    /// * `tilt` - surface tilt, in degrees (0 = facing up, 180 = facing down)
    /// * `ground` - ground patches in view
    /// * `surrounding` - other surfaces in view
    pub fn new(
        owner: &str,
        emissivity: f64,
        tilt: f64,
        ground: Vec<ViewedSurface>,
        surrounding: Vec<ViewedSurface>,
    ) -> Result<Self, ConfigurationError> {
        if !(0. ..=1.).contains(&emissivity) {
            return Err(ConfigurationError::invalid(
                owner,
                "emissivity",
                format!("must be between 0 and 1, got {emissivity}"),
            ));
        }
        if !(0. ..=180.).contains(&tilt) {
            return Err(ConfigurationError::invalid(
                owner,
                "tilt",
                format!("must be between 0 and 180 degrees, got {tilt}"),
            ));
        }

        let sky_view_factor = 0.5 * (1. + tilt.to_radians().cos());
        let beta = if sky_view_factor > 0. {
            sky_view_factor.sqrt()
        } else {
            0.
        };

        let viewed = ground.iter().chain(surrounding.iter());
        if viewed.clone().any(|surface| !(surface.view_factor >= 0.)) {
            return Err(ConfigurationError::invalid(
                owner,
                "view_factor",
                "view factors cannot be negative",
            ));
        }
        let total_view_factor =
            sky_view_factor + viewed.map(|surface| surface.view_factor).sum::<f64>();
        if !is_close!(total_view_factor, 1.0, rel_tol = 1e-5) {
            return Err(ConfigurationError::invalid(
                owner,
                "view_factor",
                format!(
                    "view factors must sum to 1, got {total_view_factor} (sky {sky_view_factor})"
                ),
            ));
        }

        Ok(Self {
            emissivity,
            sky_view_factor,
            beta,
            ground,
            surrounding,
        })
    }

    pub fn sky_view_factor(&self) -> f64 {
        self.sky_view_factor
    }

    /// Net longwave flux onto the surface, in W/m2 (positive is a gain to the surface)
    ///
    /// Arguments:
    /// * `temp_surface` - outside face temperature, in deg C
    /// * `temp_air` - outdoor air temperature, in deg C
    /// * `temp_sky` - effective sky temperature, in deg C
    pub fn flux(
        &self,
        temp_surface: f64,
        temp_air: f64,
        temp_sky: f64,
    ) -> Result<f64, BelowAbsoluteZeroError> {
        let t_surf_4 = celsius_to_kelvin(temp_surface)?.powi(4);
        let t_air_4 = celsius_to_kelvin(temp_air)?.powi(4);
        let t_sky_4 = celsius_to_kelvin(temp_sky)?.powi(4);

        let mut exchange = self.sky_view_factor * self.beta * (t_sky_4 - t_surf_4)
            + self.sky_view_factor * (1. - self.beta) * (t_air_4 - t_surf_4);
        for surface in self.ground.iter().chain(self.surrounding.iter()) {
            let t_4 = celsius_to_kelvin(surface.temperature.unwrap_or(temp_air))?.powi(4);
            exchange += surface.view_factor * (t_4 - t_surf_4);
        }

        Ok(self.emissivity * STEFAN_BOLTZMANN * exchange)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;

    fn ground(view_factor: f64, temperature: f64) -> ViewedSurface {
        ViewedSurface {
            view_factor,
            temperature: Some(temperature),
        }
    }

    #[rstest]
    fn should_calc_vertical_wall_flux() {
        let wall =
            ExteriorLongwaveRadiation::new("wall", 0.9, 90., vec![ground(0.5, 5.85)], vec![])
                .unwrap();
        let (t_surf, t_air, t_sky, t_gnd): (f64, f64, f64, f64) = (278.0, 280.0, 265.0, 279.0);
        let beta = 0.5_f64.sqrt();
        let expected = 0.9
            * STEFAN_BOLTZMANN
            * (0.5 * beta * (t_sky.powi(4) - t_surf.powi(4))
                + 0.5 * (1. - beta) * (t_air.powi(4) - t_surf.powi(4))
                + 0.5 * (t_gnd.powi(4) - t_surf.powi(4)));

        assert_relative_eq!(wall.sky_view_factor(), 0.5, max_relative = 1e-12);
        assert_relative_eq!(
            wall.flux(278.0 - 273.15, 280.0 - 273.15, 265.0 - 273.15)
                .unwrap(),
            expected,
            max_relative = 1e-9
        );
    }

    #[rstest]
    fn should_see_only_sky_from_flat_roof() {
        let roof = ExteriorLongwaveRadiation::new("roof", 0.9, 0., vec![], vec![]).unwrap();
        assert_eq!(roof.sky_view_factor(), 1.);
        // Surface at sky and air temperature exchanges nothing
        assert_eq!(roof.flux(-5., -5., -5.).unwrap(), 0.);
        assert!(roof.flux(5., 5., -6.).unwrap() < 0.);
    }

    #[rstest]
    fn should_use_outdoor_air_for_unspecified_ground_temperature() {
        let wall = ExteriorLongwaveRadiation::new(
            "wall",
            0.9,
            90.,
            vec![ViewedSurface {
                view_factor: 0.5,
                temperature: None,
            }],
            vec![],
        )
        .unwrap();
        let explicit =
            ExteriorLongwaveRadiation::new("wall", 0.9, 90., vec![ground(0.4, 7.)], vec![ground(0.1, 7.)])
                .unwrap();

        assert_relative_eq!(
            wall.flux(5., 7., -4.).unwrap(),
            explicit.flux(5., 7., -4.).unwrap(),
            max_relative = 1e-12
        );
    }

    #[rstest]
    fn should_reject_invalid_configuration() {
        assert!(ExteriorLongwaveRadiation::new("wall", 1.2, 90., vec![ground(0.5, 0.)], vec![]).is_err());
        assert!(ExteriorLongwaveRadiation::new("wall", 0.9, 200., vec![], vec![]).is_err());
        assert!(ExteriorLongwaveRadiation::new("wall", 0.9, 90., vec![ground(0.3, 0.)], vec![]).is_err());
        assert!(ExteriorLongwaveRadiation::new("wall", 0.9, 90., vec![ground(0.6, 0.), ground(-0.1, 0.)], vec![]).is_err());
    }

    #[rstest]
    fn should_reject_temperatures_below_absolute_zero() {
        let roof = ExteriorLongwaveRadiation::new("roof", 0.9, 0., vec![], vec![]).unwrap();
        assert!(roof.flux(5., 5., -300.).is_err());
    }
}
