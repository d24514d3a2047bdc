use crate::core::space_heat_demand::convection::correlations::{
    combine, CombinedCorrelation, ForcedCorrelation, NaturalCorrelation,
};
use crate::core::space_heat_demand::surface::{SurfaceGeometry, SurfaceType};
use crate::core::units::incidence_angle;
use crate::errors::ConfigurationError;
use crate::external_conditions::WeatherSample;
use std::str::FromStr;
use strum::{Display, EnumCount, EnumIter, EnumString, IntoEnumIterator};

const KIND: &str = "exterior";

#[derive(Clone, Copy, Debug, Display, EnumCount, EnumIter, EnumString, Eq, Hash, PartialEq)]
pub enum ExteriorClassification {
    RoofUnstable,
    RoofStable,
    VerticalWallWindward,
    VerticalWallLeeward,
}

impl ExteriorClassification {
    /// Arguments:
    /// * `geometry` - the surface being classified (must be a wall or roof)
    /// * `surface_temp` - outside face temperature, in deg C
    /// * `weather` - current weather
    pub fn classify(
        geometry: &SurfaceGeometry,
        surface_temp: f64,
        weather: &WeatherSample,
    ) -> Option<Self> {
        match geometry.surface_type {
            SurfaceType::Roof => Some(if surface_temp > weather.air_temp_c {
                Self::RoofUnstable
            } else {
                Self::RoofStable
            }),
            SurfaceType::Wall => Some(
                if incidence_angle(weather.wind_direction_deg, geometry.azimuth) <= 90. {
                    Self::VerticalWallWindward
                } else {
                    Self::VerticalWallLeeward
                },
            ),
            SurfaceType::Floor => None,
        }
    }

    fn applies_to(&self, surface_type: SurfaceType) -> bool {
        match self {
            Self::RoofUnstable | Self::RoofStable => surface_type == SurfaceType::Roof,
            Self::VerticalWallWindward | Self::VerticalWallLeeward => {
                surface_type == SurfaceType::Wall
            }
        }
    }
}

/// Correlation(s) resolved for one exterior classification.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ExteriorModel {
    Combined(CombinedCorrelation),
    ForcedNatural {
        forced: ForcedCorrelation,
        natural: NaturalCorrelation,
    },
}

/// Adaptive convection algorithm for outside faces.
#[derive(Clone, Debug)]
pub struct ExteriorConvection {
    models: [Option<ExteriorModel>; ExteriorClassification::COUNT],
    building_volume: f64,
}

impl ExteriorConvection {
    /// Arguments:
    /// * `assignments` - model per classification
    /// * `building_volume` - volume of the building, in m3 (needed by Mitchell)
    pub fn new(
        assignments: impl IntoIterator<Item = (ExteriorClassification, ExteriorModel)>,
        building_volume: f64,
    ) -> Result<Self, ConfigurationError> {
        let mut models = [None; ExteriorClassification::COUNT];
        for (classification, model) in assignments {
            if matches!(
                model,
                ExteriorModel::ForcedNatural {
                    forced: ForcedCorrelation::Mitchell,
                    ..
                }
            ) && !(building_volume.is_finite() && building_volume > 0.)
            {
                return Err(ConfigurationError::invalid(
                    "exterior convection",
                    "building_volume",
                    format!("must be positive to use the Mitchell correlation, got {building_volume}"),
                ));
            }
            models[classification as usize] = Some(model);
        }

        Ok(Self {
            models,
            building_volume,
        })
    }

    /// Resolve correlation names for each classification.
    ///
    /// A forced name naming a combined correlation needs no natural partner; otherwise the natural
    /// name is required.
    ///
    /// Arguments:
    /// * `forced` - classification name to forced (or combined) correlation name
    /// * `natural` - classification name to natural correlation name
    /// * `building_volume` - volume of the building, in m3
    pub fn from_names<'a>(
        forced: impl IntoIterator<Item = (&'a str, &'a str)>,
        natural: impl IntoIterator<Item = (&'a str, &'a str)>,
        building_volume: f64,
    ) -> Result<Self, ConfigurationError> {
        let mut natural_models = [None; ExteriorClassification::COUNT];
        for (classification, name) in natural {
            let classification = parse_classification(classification)?;
            let model = NaturalCorrelation::from_str(name).map_err(|_| {
                ConfigurationError::UnknownCorrelation {
                    kind: KIND,
                    name: name.into(),
                }
            })?;
            natural_models[classification as usize] = Some(model);
        }

        let mut assignments = vec![];
        for (classification, name) in forced {
            let classification = parse_classification(classification)?;
            let model = if let Ok(combined) = CombinedCorrelation::from_str(name) {
                ExteriorModel::Combined(combined)
            } else {
                let forced = ForcedCorrelation::from_str(name).map_err(|_| {
                    ConfigurationError::UnknownCorrelation {
                        kind: KIND,
                        name: name.into(),
                    }
                })?;
                let natural = natural_models[classification as usize].ok_or_else(|| {
                    ConfigurationError::UnassignedClassification {
                        kind: "exterior natural",
                        classification: classification.to_string(),
                    }
                })?;
                ExteriorModel::ForcedNatural { forced, natural }
            };
            assignments.push((classification, model));
        }

        Self::new(assignments, building_volume)
    }

    pub fn model_for(&self, classification: ExteriorClassification) -> Option<ExteriorModel> {
        self.models[classification as usize]
    }

    /// Check that every classification this surface could fall into has a model.
    pub fn check_surface(
        &self,
        surface_name: &str,
        geometry: &SurfaceGeometry,
    ) -> Result<(), ConfigurationError> {
        if geometry.surface_type == SurfaceType::Floor {
            return Err(ConfigurationError::invalid(
                surface_name,
                "exterior",
                "floors cannot be exposed to outdoor air",
            ));
        }
        for classification in ExteriorClassification::iter() {
            if classification.applies_to(geometry.surface_type)
                && self.model_for(classification).is_none()
            {
                return Err(ConfigurationError::UnassignedClassification {
                    kind: KIND,
                    classification: classification.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Outside face convective heat transfer coefficient, in W/(m2.K)
    ///
    /// Arguments:
    /// * `geometry` - the surface
    /// * `surface_temp` - outside face temperature, in deg C
    /// * `weather` - current weather
    pub fn coefficient(
        &self,
        geometry: &SurfaceGeometry,
        surface_temp: f64,
        weather: &WeatherSample,
    ) -> Result<f64, ConfigurationError> {
        let classification = ExteriorClassification::classify(geometry, surface_temp, weather)
            .ok_or_else(|| {
                ConfigurationError::invalid(
                    "exterior convection",
                    "surface_type",
                    "floors have no exterior classification",
                )
            })?;
        let model = self.model_for(classification).ok_or_else(|| {
            ConfigurationError::UnassignedClassification {
                kind: KIND,
                classification: classification.to_string(),
            }
        })?;

        let delta_t = surface_temp - weather.air_temp_c;
        Ok(match model {
            ExteriorModel::Combined(correlation) => {
                correlation.coefficient(delta_t, weather.wind_speed_local_ms)
            }
            ExteriorModel::ForcedNatural { forced, natural } => combine(
                forced.coefficient(geometry, weather, self.building_volume),
                natural.coefficient(delta_t, geometry.tilt),
            ),
        })
    }
}

impl Default for ExteriorConvection {
    /// TARP-like defaults: Sparrow forced with Walton/ASHRAE natural convection
    fn default() -> Self {
        use ExteriorClassification::*;

        let model = |forced, natural| ExteriorModel::ForcedNatural { forced, natural };
        let mut models = [None; ExteriorClassification::COUNT];
        models[RoofUnstable as usize] = Some(model(
            ForcedCorrelation::SparrowWindward,
            NaturalCorrelation::WaltonUnstableHorizontalOrTilt,
        ));
        models[RoofStable as usize] = Some(model(
            ForcedCorrelation::SparrowWindward,
            NaturalCorrelation::WaltonStableHorizontalOrTilt,
        ));
        models[VerticalWallWindward as usize] = Some(model(
            ForcedCorrelation::SparrowWindward,
            NaturalCorrelation::ASHRAEVerticalWall,
        ));
        models[VerticalWallLeeward as usize] = Some(model(
            ForcedCorrelation::SparrowLeeward,
            NaturalCorrelation::ASHRAEVerticalWall,
        ));

        Self {
            models,
            building_volume: 0.,
        }
    }
}

fn parse_classification(name: &str) -> Result<ExteriorClassification, ConfigurationError> {
    ExteriorClassification::from_str(name).map_err(|_| ConfigurationError::invalid(
        "exterior convection",
        "classification",
        format!("'{name}' is not an exterior classification"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::space_heat_demand::surface::Roughness;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;

    const NO_NAMES: [(&str, &str); 0] = [];

    fn wall(azimuth: f64) -> SurfaceGeometry {
        SurfaceGeometry {
            area: 10.,
            perimeter: 13.,
            tilt: 90.,
            azimuth,
            roughness: Roughness::Rough,
            surface_type: SurfaceType::Wall,
        }
    }

    fn roof() -> SurfaceGeometry {
        SurfaceGeometry {
            area: 16.,
            perimeter: 16.,
            tilt: 0.,
            azimuth: 0.,
            roughness: Roughness::MediumRough,
            surface_type: SurfaceType::Roof,
        }
    }

    #[fixture]
    fn weather() -> WeatherSample {
        WeatherSample {
            air_temp_c: 5.,
            wind_speed_local_ms: 3.,
            wind_speed_10m_ms: 2.5,
            wind_direction_deg: 180.,
            solar_irradiance_w_m2: 0.,
        }
    }

    #[rstest]
    #[case(180., ExteriorClassification::VerticalWallWindward)]
    #[case(90., ExteriorClassification::VerticalWallWindward)]
    #[case(89., ExteriorClassification::VerticalWallLeeward)]
    #[case(0., ExteriorClassification::VerticalWallLeeward)]
    #[case(270., ExteriorClassification::VerticalWallWindward)]
    fn should_classify_walls_by_wind_incidence(
        weather: WeatherSample,
        #[case] azimuth: f64,
        #[case] expected: ExteriorClassification,
    ) {
        assert_eq!(
            ExteriorClassification::classify(&wall(azimuth), 5., &weather),
            Some(expected)
        );
    }

    #[rstest]
    fn should_classify_roofs_by_stability(weather: WeatherSample) {
        assert_eq!(
            ExteriorClassification::classify(&roof(), 6., &weather),
            Some(ExteriorClassification::RoofUnstable)
        );
        assert_eq!(
            ExteriorClassification::classify(&roof(), 5., &weather),
            Some(ExteriorClassification::RoofStable)
        );
    }

    #[rstest]
    fn should_combine_forced_and_natural(weather: WeatherSample) {
        let convection = ExteriorConvection::default();
        let geometry = wall(180.);

        let hf = ForcedCorrelation::SparrowWindward.coefficient(&geometry, &weather, 0.);
        let hn = NaturalCorrelation::ASHRAEVerticalWall.coefficient(3., 90.);
        assert_relative_eq!(
            convection.coefficient(&geometry, 8., &weather).unwrap(),
            (hf * hf + hn * hn).sqrt()
        );
    }

    #[rstest]
    fn should_resolve_names(weather: WeatherSample) {
        let convection = ExteriorConvection::from_names(
            [
                ("VerticalWallWindward", "McAdams"),
                ("VerticalWallLeeward", "SparrowLeeward"),
            ],
            [("VerticalWallLeeward", "ASHRAEVerticalWall")],
            0.,
        )
        .unwrap();

        assert_eq!(
            convection.model_for(ExteriorClassification::VerticalWallWindward),
            Some(ExteriorModel::Combined(CombinedCorrelation::McAdams))
        );
        assert_relative_eq!(
            convection.coefficient(&wall(180.), 8., &weather).unwrap(),
            5.7 + 3.8 * 3.
        );
        assert!(convection.check_surface("south wall", &wall(180.)).is_ok());
        assert_eq!(
            convection.check_surface("roof", &roof()),
            Err(ConfigurationError::UnassignedClassification {
                kind: "exterior",
                classification: "RoofUnstable".into(),
            })
        );
    }

    #[rstest]
    fn should_reject_unknown_and_unassigned_names() {
        assert_eq!(
            ExteriorConvection::from_names([("RoofStable", "ClearRoof")], NO_NAMES, 0.).unwrap_err(),
            ConfigurationError::UnknownCorrelation {
                kind: "exterior",
                name: "ClearRoof".into(),
            }
        );
        assert_eq!(
            ExteriorConvection::from_names([("RoofStable", "EmmelRoof")], NO_NAMES, 0.).unwrap_err(),
            ConfigurationError::UnassignedClassification {
                kind: "exterior natural",
                classification: "RoofStable".into(),
            }
        );
        assert_eq!(
            ExteriorConvection::from_names(
                [("RoofStable", "EmmelRoof")],
                [("RoofStable", "Churchill")],
                0.
            )
            .unwrap_err(),
            ConfigurationError::UnknownCorrelation {
                kind: "exterior",
                name: "Churchill".into(),
            }
        );
        assert!(ExteriorConvection::from_names([("Facade", "McAdams")], NO_NAMES, 0.).is_err());
    }

    #[rstest]
    fn should_require_building_volume_for_mitchell() {
        let result = ExteriorConvection::from_names(
            [("RoofStable", "Mitchell")],
            [("RoofStable", "WaltonStableHorizontalOrTilt")],
            0.,
        );
        assert!(matches!(
            result,
            Err(ConfigurationError::InvalidParameter {
                parameter: "building_volume",
                ..
            })
        ));

        assert!(ExteriorConvection::from_names(
            [("RoofStable", "Mitchell")],
            [("RoofStable", "WaltonStableHorizontalOrTilt")],
            40.,
        )
        .is_ok());
    }

    #[rstest]
    fn should_reject_exterior_floor() {
        let floor = SurfaceGeometry {
            tilt: 180.,
            surface_type: SurfaceType::Floor,
            ..roof()
        };
        assert!(ExteriorConvection::default()
            .check_surface("floor", &floor)
            .is_err());
    }
}
