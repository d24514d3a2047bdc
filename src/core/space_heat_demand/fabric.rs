use crate::core::material_properties::Construction;
use crate::errors::{ConfigurationError, DimensionMismatchError};
use nalgebra::{DMatrix, DVector};
use std::sync::Arc;

/// Fourier number used to pick the target node spacing. Backward Euler is unconditionally stable,
/// so this only controls accuracy.
pub const DEFAULT_FOURIER_NUMBER: f64 = 3.0;

/// A single finite-difference node within a construction.
#[derive(Clone, Debug, PartialEq)]
pub struct FabricNode {
    pub temperature: f64,   // deg C
    pub conductivity: f64,  // W/(m.K)
    pub density: f64,       // kg/m3
    pub specific_heat: f64, // J/(kg.K)
    pub width: f64,         // m
}

impl FabricNode {
    /// Heat capacity per unit area divided by the timestep, in W/(m2.K)
    fn capacitance_rate(&self, timestep: f64) -> f64 {
        self.density * self.specific_heat * self.width / timestep
    }
}

/// Conductance between two adjacent nodes, in W/(m2.K), from the mean conductivity over the mean
/// node width.
fn interface_conductance(a: &FabricNode, b: &FabricNode) -> f64 {
    ((a.conductivity + b.conductivity) / 2.) / ((a.width + b.width) / 2.)
}

/// One-dimensional transient conduction through the layers of a single surface.
///
/// Nodes are stored inside-first: node 0 faces the zone air and the last node faces outdoors (or
/// the adiabatic back face of an internal element).
#[derive(Clone, Debug)]
pub struct FabricConductionSolver {
    owner: String,
    construction: Arc<Construction>,
    timestep: f64,
    nodes: Vec<FabricNode>,
}

impl FabricConductionSolver {
    /// Discretise a construction for the given timestep.
    ///
    /// Arguments:
    /// * `owner` - name of the surface the solver belongs to (used in error messages)
    /// * `construction` - layers, outside to inside
    /// * `timestep` - simulation timestep, in seconds
    /// * `fourier_number` - Fourier number used to derive the target node spacing
    pub fn new(
        owner: impl Into<String>,
        construction: Arc<Construction>,
        timestep: f64,
        fourier_number: f64,
    ) -> Result<Self, ConfigurationError> {
        let owner = owner.into();
        if !(timestep.is_finite() && timestep > 0.) {
            return Err(ConfigurationError::invalid(
                owner,
                "timestep",
                format!("must be a positive number of seconds, got {timestep}"),
            ));
        }
        if !(fourier_number.is_finite() && fourier_number > 0.) {
            return Err(ConfigurationError::invalid(
                owner,
                "fourier_number",
                format!("must be positive, got {fourier_number}"),
            ));
        }

        let nodes = discretise(&construction, timestep, fourier_number);

        Ok(Self {
            owner,
            construction,
            timestep,
            nodes,
        })
    }

    pub fn construction(&self) -> &Construction {
        &self.construction
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &[FabricNode] {
        &self.nodes
    }

    pub fn node_temperatures(&self) -> Vec<f64> {
        self.nodes.iter().map(|node| node.temperature).collect()
    }

    pub fn inside_face_temperature(&self) -> f64 {
        self.nodes[0].temperature
    }

    pub fn outside_face_temperature(&self) -> f64 {
        self.nodes[self.nodes.len() - 1].temperature
    }

    /// Heat stored per unit area relative to 0 deg C, in J/m2
    pub fn stored_heat_per_area(&self) -> f64 {
        self.nodes
            .iter()
            .map(|node| node.density * node.specific_heat * node.width * node.temperature)
            .sum()
    }

    pub fn set_initial_temperatures(&mut self, temperature: f64) {
        for node in self.nodes.iter_mut() {
            node.temperature = temperature;
        }
    }

    /// Write this surface's heat balance rows into the zone system.
    ///
    /// Node rows are per unit area (W/m2), so any power applied to the outer face is divided by the
    /// surface area.
    ///
    /// Arguments:
    /// * `matrix_a` - coefficient matrix for the whole zone
    /// * `vector_b` - right-hand side for the whole zone
    /// * `row_offset` - row (and column) of node 0 within the system
    /// * `air_node_index` - row (and column) of the zone air node
    /// * `h_inside` - convective film coefficient on the inside face, in W/(m2.K)
    /// * `h_outside` - film coefficient on the outside face, in W/(m2.K); 0 for an adiabatic face
    /// * `temp_outside` - temperature the outside face exchanges with, in deg C
    /// * `area` - surface area, in m2
    /// * `outside_face_gain` - power absorbed at the outside face, in W
    #[allow(clippy::too_many_arguments)]
    pub fn populate_matrix_equations(
        &self,
        matrix_a: &mut DMatrix<f64>,
        vector_b: &mut DVector<f64>,
        row_offset: usize,
        air_node_index: usize,
        h_inside: f64,
        h_outside: f64,
        temp_outside: f64,
        area: f64,
        outside_face_gain: f64,
    ) {
        let last = self.nodes.len() - 1;
        let outside_face_flux = outside_face_gain / area;

        for (i, node) in self.nodes.iter().enumerate() {
            let row = row_offset + i;
            let capacitance_rate = node.capacitance_rate(self.timestep);

            // Coeff for temperature of this node, and RHS from stored heat
            matrix_a[(row, row)] = capacitance_rate;
            vector_b[row] = capacitance_rate * node.temperature;

            if i == 0 {
                // Inside face exchanges with zone air
                matrix_a[(row, row)] += h_inside;
                matrix_a[(row, air_node_index)] = -h_inside;
            } else {
                let conductance = interface_conductance(&self.nodes[i - 1], node);
                matrix_a[(row, row)] += conductance;
                matrix_a[(row, row - 1)] = -conductance;
            }

            if i == last {
                // Outside face exchanges with the outdoor boundary
                matrix_a[(row, row)] += h_outside;
                vector_b[row] += h_outside * temp_outside + outside_face_flux;
            } else {
                let conductance = interface_conductance(node, &self.nodes[i + 1]);
                matrix_a[(row, row)] += conductance;
                matrix_a[(row, row + 1)] = -conductance;
            }
        }
    }

    /// Overwrite node temperatures with a solved vector (inside-first).
    pub fn update_temperatures(&mut self, temperatures: &[f64]) -> Result<(), DimensionMismatchError> {
        if temperatures.len() != self.nodes.len() {
            return Err(DimensionMismatchError {
                owner: self.owner.clone(),
                expected: self.nodes.len(),
                actual: temperatures.len(),
            });
        }

        for (node, temperature) in self.nodes.iter_mut().zip(temperatures) {
            node.temperature = *temperature;
        }

        Ok(())
    }
}

/// Split each layer into equal-width nodes no wider than sqrt(Fo.alpha.dt), innermost layer first.
fn discretise(construction: &Construction, timestep: f64, fourier_number: f64) -> Vec<FabricNode> {
    let mut nodes = vec![];

    for material in construction.layers().iter().rev() {
        let target_dx = (fourier_number * material.diffusivity() * timestep).sqrt();
        let node_count = ((material.thickness() / target_dx).ceil() as usize).max(1);
        let width = material.thickness() / node_count as f64;

        nodes.extend((0..node_count).map(|_| FabricNode {
            temperature: 0.,
            conductivity: material.conductivity(),
            density: material.density(),
            specific_heat: material.specific_heat(),
            width,
        }));
    }

    nodes
}
