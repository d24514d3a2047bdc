use crate::core::space_heat_demand::convection::correlations::NaturalCorrelation;
use crate::core::space_heat_demand::surface::{SurfaceGeometry, SurfaceType};
use crate::errors::ConfigurationError;
use std::str::FromStr;
use strum::{Display, EnumCount, EnumString};

const KIND: &str = "interior";

/// Tilts within this many degrees of 0, 90 or 180 count as exactly horizontal or vertical
const ORIENTATION_TOLERANCE_DEG: f64 = 1e-6;

#[derive(Clone, Copy, Debug, Display, EnumCount, EnumString, Eq, PartialEq)]
pub enum InteriorClassification {
    VerticalWall,
    StableHorizontal,
    UnstableHorizontal,
    StableTilted,
    UnstableTilted,
}

enum Orientation {
    Vertical,
    Horizontal,
    Tilted,
}

fn orientation(tilt: f64) -> Orientation {
    if (tilt - 90.).abs() < ORIENTATION_TOLERANCE_DEG {
        Orientation::Vertical
    } else if tilt < ORIENTATION_TOLERANCE_DEG || tilt > 180. - ORIENTATION_TOLERANCE_DEG {
        Orientation::Horizontal
    } else {
        Orientation::Tilted
    }
}

/// Whether buoyancy at this face is unstable.
///
/// A heated face is unstable on horizontal floors and roofs, and on tilted surfaces below 90
/// degrees. Cooling reverses each case. A zero difference counts as cooled.
fn is_unstable(geometry: &SurfaceGeometry, delta_t: f64) -> bool {
    let heated = delta_t > 0.;
    match orientation(geometry.tilt) {
        Orientation::Vertical => false,
        Orientation::Horizontal => match geometry.surface_type {
            SurfaceType::Floor | SurfaceType::Roof => heated,
            SurfaceType::Wall => !heated,
        },
        Orientation::Tilted => heated == (geometry.tilt < 90.),
    }
}

impl InteriorClassification {
    /// Arguments:
    /// * `geometry` - the surface
    /// * `surface_temp` - inside face temperature, in deg C
    /// * `air_temp` - zone air temperature, in deg C
    pub fn classify(geometry: &SurfaceGeometry, surface_temp: f64, air_temp: f64) -> Self {
        let unstable = is_unstable(geometry, surface_temp - air_temp);

        match (orientation(geometry.tilt), unstable) {
            (Orientation::Vertical, _) => Self::VerticalWall,
            (Orientation::Horizontal, true) => Self::UnstableHorizontal,
            (Orientation::Horizontal, false) => Self::StableHorizontal,
            (Orientation::Tilted, true) => Self::UnstableTilted,
            (Orientation::Tilted, false) => Self::StableTilted,
        }
    }

    fn candidates(geometry: &SurfaceGeometry) -> &'static [Self] {
        match orientation(geometry.tilt) {
            Orientation::Vertical => &[Self::VerticalWall],
            Orientation::Horizontal => &[Self::StableHorizontal, Self::UnstableHorizontal],
            Orientation::Tilted => &[Self::StableTilted, Self::UnstableTilted],
        }
    }
}

/// Adaptive convection algorithm for inside faces.
#[derive(Clone, Debug)]
pub struct InteriorConvection {
    models: [Option<NaturalCorrelation>; InteriorClassification::COUNT],
}

impl InteriorConvection {
    pub fn new(assignments: impl IntoIterator<Item = (InteriorClassification, NaturalCorrelation)>) -> Self {
        let mut models = [None; InteriorClassification::COUNT];
        for (classification, model) in assignments {
            models[classification as usize] = Some(model);
        }

        Self { models }
    }

    /// Resolve pairs of (classification name, correlation name).
    pub fn from_names<'a>(
        assignments: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, ConfigurationError> {
        let assignments = assignments
            .into_iter()
            .map(|(classification, name)| {
                let classification = InteriorClassification::from_str(classification).map_err(|_| {
                    ConfigurationError::invalid(
                        "interior convection",
                        "classification",
                        format!("'{classification}' is not an interior classification"),
                    )
                })?;
                let model = NaturalCorrelation::from_str(name).map_err(|_| {
                    ConfigurationError::UnknownCorrelation {
                        kind: KIND,
                        name: name.into(),
                    }
                })?;
                Ok((classification, model))
            })
            .collect::<Result<Vec<_>, ConfigurationError>>()?;

        Ok(Self::new(assignments))
    }

    pub fn model_for(&self, classification: InteriorClassification) -> Option<NaturalCorrelation> {
        self.models[classification as usize]
    }

    /// Check that every classification this surface could fall into has a model.
    pub fn check_surface(&self, geometry: &SurfaceGeometry) -> Result<(), ConfigurationError> {
        for classification in InteriorClassification::candidates(geometry) {
            if self.model_for(*classification).is_none() {
                return Err(ConfigurationError::UnassignedClassification {
                    kind: KIND,
                    classification: classification.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Inside face convective heat transfer coefficient, in W/(m2.K)
    pub fn coefficient(
        &self,
        geometry: &SurfaceGeometry,
        surface_temp: f64,
        air_temp: f64,
    ) -> Result<f64, ConfigurationError> {
        let classification = InteriorClassification::classify(geometry, surface_temp, air_temp);
        let model = self.model_for(classification).ok_or_else(|| {
            ConfigurationError::UnassignedClassification {
                kind: KIND,
                classification: classification.to_string(),
            }
        })?;

        Ok(model.coefficient(surface_temp - air_temp, geometry.tilt))
    }
}

impl Default for InteriorConvection {
    fn default() -> Self {
        Self::new([
            (
                InteriorClassification::VerticalWall,
                NaturalCorrelation::ASHRAEVerticalWall,
            ),
            (
                InteriorClassification::StableHorizontal,
                NaturalCorrelation::WaltonStableHorizontalOrTilt,
            ),
            (
                InteriorClassification::UnstableHorizontal,
                NaturalCorrelation::WaltonUnstableHorizontalOrTilt,
            ),
            (
                InteriorClassification::StableTilted,
                NaturalCorrelation::WaltonStableHorizontalOrTilt,
            ),
            (
                InteriorClassification::UnstableTilted,
                NaturalCorrelation::WaltonUnstableHorizontalOrTilt,
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::space_heat_demand::surface::Roughness;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;

    fn geometry(tilt: f64, surface_type: SurfaceType) -> SurfaceGeometry {
        SurfaceGeometry {
            area: 16.,
            perimeter: 16.,
            tilt,
            azimuth: 0.,
            roughness: Roughness::Rough,
            surface_type,
        }
    }

    #[rstest]
    #[case(90., SurfaceType::Wall, 25., InteriorClassification::VerticalWall)]
    #[case(90., SurfaceType::Wall, 15., InteriorClassification::VerticalWall)]
    #[case(180., SurfaceType::Floor, 25., InteriorClassification::UnstableHorizontal)]
    #[case(180., SurfaceType::Floor, 15., InteriorClassification::StableHorizontal)]
    #[case(0., SurfaceType::Roof, 25., InteriorClassification::UnstableHorizontal)]
    #[case(0., SurfaceType::Roof, 15., InteriorClassification::StableHorizontal)]
    #[case(0., SurfaceType::Roof, 20., InteriorClassification::StableHorizontal)]
    #[case(0., SurfaceType::Wall, 25., InteriorClassification::StableHorizontal)]
    #[case(0., SurfaceType::Wall, 15., InteriorClassification::UnstableHorizontal)]
    #[case(30., SurfaceType::Roof, 25., InteriorClassification::UnstableTilted)]
    #[case(45., SurfaceType::Roof, 15., InteriorClassification::StableTilted)]
    #[case(135., SurfaceType::Wall, 25., InteriorClassification::StableTilted)]
    #[case(135., SurfaceType::Wall, 15., InteriorClassification::UnstableTilted)]
    fn should_classify_surfaces(
        #[case] tilt: f64,
        #[case] surface_type: SurfaceType,
        #[case] surface_temp: f64,
        #[case] expected: InteriorClassification,
    ) {
        assert_eq!(
            InteriorClassification::classify(&geometry(tilt, surface_type), surface_temp, 20.),
            expected
        );
    }

    #[rstest]
    fn should_use_default_correlations() {
        let convection = InteriorConvection::default();

        assert_relative_eq!(
            convection
                .coefficient(&geometry(90., SurfaceType::Wall), 12., 20.)
                .unwrap(),
            1.31 * 2.
        );
        assert_relative_eq!(
            convection
                .coefficient(&geometry(180., SurfaceType::Floor), 28., 20.)
                .unwrap(),
            9.482 * 2. / (7.238 - 1.)
        );
        assert_eq!(
            convection
                .coefficient(&geometry(0., SurfaceType::Roof), 20., 20.)
                .unwrap(),
            0.
        );
    }

    #[rstest]
    fn should_report_unassigned_classification() {
        let convection = InteriorConvection::from_names([
            ("VerticalWall", "ASHRAEVerticalWall"),
            ("StableHorizontal", "WaltonStableHorizontalOrTilt"),
        ])
        .unwrap();

        assert!(convection
            .check_surface(&geometry(90., SurfaceType::Wall))
            .is_ok());
        assert_eq!(
            convection.check_surface(&geometry(180., SurfaceType::Floor)),
            Err(ConfigurationError::UnassignedClassification {
                kind: "interior",
                classification: "UnstableHorizontal".into(),
            })
        );
        assert!(convection
            .coefficient(&geometry(180., SurfaceType::Floor), 25., 20.)
            .is_err());
    }

    #[rstest]
    fn should_reject_unknown_names() {
        assert_eq!(
            InteriorConvection::from_names([("VerticalWall", "Khalifa")]).unwrap_err(),
            ConfigurationError::UnknownCorrelation {
                kind: "interior",
                name: "Khalifa".into(),
            }
        );
        assert!(InteriorConvection::from_names([("Ceiling", "ASHRAEVerticalWall")]).is_err());
    }
}
