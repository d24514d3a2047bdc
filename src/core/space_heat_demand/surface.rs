use crate::core::material_properties::Construction;
use crate::core::space_heat_demand::fabric::FabricConductionSolver;
use crate::errors::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum SurfaceType {
    Wall,
    Roof,
    Floor,
}

/// Exterior surface roughness class (Walton 1981), 1 = very rough to 6 = very smooth.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Roughness {
    VeryRough = 1,
    Rough = 2,
    MediumRough = 3,
    MediumSmooth = 4,
    Smooth = 5,
    VerySmooth = 6,
}

impl Roughness {
    /// Multiplier applied to forced convection on this class of surface
    pub fn multiplier(&self) -> f64 {
        match self {
            Self::VeryRough => 2.17,
            Self::Rough => 1.67,
            Self::MediumRough => 1.52,
            Self::MediumSmooth => 1.13,
            Self::Smooth => 1.11,
            Self::VerySmooth => 1.00,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("Roughness class must be between 1 and 6, got {0}")]
pub struct InvalidRoughnessError(pub u8);

impl TryFrom<u8> for Roughness {
    type Error = InvalidRoughnessError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            1 => Self::VeryRough,
            2 => Self::Rough,
            3 => Self::MediumRough,
            4 => Self::MediumSmooth,
            5 => Self::Smooth,
            6 => Self::VerySmooth,
            _ => return Err(InvalidRoughnessError(value)),
        })
    }
}

/// Shape and orientation of a surface, as seen by the convection correlations.
#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceGeometry {
    pub area: f64,      // m2
    pub perimeter: f64, // m
    /// 0 = facing up, 90 = vertical, 180 = facing down
    pub tilt: f64,
    /// Compass bearing the outside face points towards, in degrees
    pub azimuth: f64,
    pub roughness: Roughness,
    pub surface_type: SurfaceType,
}

impl SurfaceGeometry {
    fn validate(&self, owner: &str) -> Result<(), ConfigurationError> {
        if !(self.area.is_finite() && self.area > 0.) {
            return Err(ConfigurationError::invalid(
                owner,
                "area",
                format!("must be positive, got {}", self.area),
            ));
        }
        if !(self.perimeter.is_finite() && self.perimeter >= 0.) {
            return Err(ConfigurationError::invalid(
                owner,
                "perimeter",
                format!("must not be negative, got {}", self.perimeter),
            ));
        }
        if !(0. ..=180.).contains(&self.tilt) {
            return Err(ConfigurationError::invalid(
                owner,
                "tilt",
                format!("must be between 0 and 180 degrees, got {}", self.tilt),
            ));
        }
        if !self.azimuth.is_finite() {
            return Err(ConfigurationError::invalid(owner, "azimuth", "must be finite"));
        }

        Ok(())
    }
}

/// An opaque element bounding the zone, together with the conduction model of its construction.
#[derive(Clone, Debug)]
pub struct Surface {
    name: String,
    geometry: SurfaceGeometry,
    exterior: bool,
    fabric: FabricConductionSolver,
}

impl Surface {
    /// Arguments:
    /// * `name` - unique name of the surface within the zone
    /// * `geometry` - area, orientation etc.
    /// * `exterior` - whether the outside face is exposed to outdoor air
    /// * `construction` - layers of the element, outside to inside
    /// * `timestep` - simulation timestep, in seconds
    /// * `fourier_number` - Fourier number for discretising the construction
    pub fn new(
        name: impl Into<String>,
        geometry: SurfaceGeometry,
        exterior: bool,
        construction: Arc<Construction>,
        timestep: f64,
        fourier_number: f64,
    ) -> Result<Self, ConfigurationError> {
        let name = name.into();
        geometry.validate(&name)?;
        if exterior && geometry.surface_type == SurfaceType::Floor {
            return Err(ConfigurationError::invalid(
                name,
                "exterior",
                "floors cannot be exposed to outdoor air",
            ));
        }

        let fabric = FabricConductionSolver::new(&name, construction, timestep, fourier_number)?;

        Ok(Self {
            name,
            geometry,
            exterior,
            fabric,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn geometry(&self) -> &SurfaceGeometry {
        &self.geometry
    }

    pub fn area(&self) -> f64 {
        self.geometry.area
    }

    pub fn is_exterior(&self) -> bool {
        self.exterior
    }

    pub fn fabric(&self) -> &FabricConductionSolver {
        &self.fabric
    }

    pub(crate) fn fabric_mut(&mut self) -> &mut FabricConductionSolver {
        &mut self.fabric
    }

    /// Take area away from this surface, e.g. to make room for a window.
    pub fn reduce_area(&mut self, delta: f64) -> Result<(), ConfigurationError> {
        if !(delta.is_finite() && delta >= 0.) {
            return Err(ConfigurationError::invalid(
                &self.name,
                "area",
                format!("cannot be reduced by {delta}"),
            ));
        }
        if self.geometry.area - delta <= 0. {
            return Err(ConfigurationError::invalid(
                &self.name,
                "area",
                format!(
                    "reducing {} m2 by {delta} m2 would leave no opaque area",
                    self.geometry.area
                ),
            ));
        }

        self.geometry.area -= delta;
        Ok(())
    }
}
