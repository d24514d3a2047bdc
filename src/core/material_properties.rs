use crate::errors::ConfigurationError;
use std::sync::LazyLock;

/// This module contains data on the properties of materials, and classes to
/// organise this data.

/// A homogeneous layer of a construction.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    name: String,
    thickness: f64,    // m
    conductivity: f64, // W/(m.K)
    density: f64,      // kg/m3
    specific_heat: f64, // J/(kg.K)
}

impl Material {
    pub fn new(
        name: impl Into<String>,
        thickness: f64,
        conductivity: f64,
        density: f64,
        specific_heat: f64,
    ) -> Result<Self, ConfigurationError> {
        let name = name.into();
        for (parameter, value) in [
            ("thickness", thickness),
            ("conductivity", conductivity),
            ("density", density),
            ("specific_heat", specific_heat),
        ] {
            if !(value.is_finite() && value > 0.) {
                return Err(ConfigurationError::invalid(
                    name,
                    parameter,
                    format!("must be a positive number, got {value}"),
                ));
            }
        }

        Ok(Self {
            name,
            thickness,
            conductivity,
            density,
            specific_heat,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn thickness(&self) -> f64 {
        self.thickness
    }

    pub fn conductivity(&self) -> f64 {
        self.conductivity
    }

    pub fn density(&self) -> f64 {
        self.density
    }

    pub fn specific_heat(&self) -> f64 {
        self.specific_heat
    }

    /// Thermal diffusivity, in m2/s
    pub fn diffusivity(&self) -> f64 {
        self.conductivity / (self.density * self.specific_heat)
    }

    /// Steady-state thermal resistance of the layer, in (m2.K)/W
    pub fn thermal_resistance(&self) -> f64 {
        self.thickness / self.conductivity
    }
}

/// Ordered layers of a wall, roof or floor, from the outside face to the inside face.
#[derive(Clone, Debug, PartialEq)]
pub struct Construction {
    name: String,
    layers: Vec<Material>,
}

impl Construction {
    pub fn new(name: impl Into<String>, layers: Vec<Material>) -> Result<Self, ConfigurationError> {
        let name = name.into();
        if layers.is_empty() {
            return Err(ConfigurationError::invalid(
                name,
                "layers",
                "a construction needs at least one material layer",
            ));
        }

        Ok(Self { name, layers })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Layers from outside to inside
    pub fn layers(&self) -> &[Material] {
        &self.layers
    }

    pub fn total_thickness(&self) -> f64 {
        self.layers.iter().map(Material::thickness).sum()
    }

    /// Sum of the layer resistances, excluding surface films, in (m2.K)/W
    pub fn thermal_resistance(&self) -> f64 {
        self.layers.iter().map(Material::thermal_resistance).sum()
    }
}

/// Density and specific heat of a fluid filling a volume.
#[derive(Clone, Copy, Debug)]
pub struct FluidProperties {
    density: f64,       // kg/m3
    specific_heat: f64, // J/(kg.K)
}

impl FluidProperties {
    pub const fn new(density: f64, specific_heat: f64) -> Self {
        Self {
            density,
            specific_heat,
        }
    }

    pub fn density(&self) -> f64 {
        self.density
    }

    pub fn specific_heat(&self) -> f64 {
        self.specific_heat
    }

    /// Volumetric heat capacity, in J/(m3.K)
    pub fn volumetric_heat_capacity(&self) -> f64 {
        self.density * self.specific_heat
    }
}

/// Air at standard conditions
pub static AIR: LazyLock<FluidProperties> = LazyLock::new(|| FluidProperties::new(1.225, 1006.0));
