use crate::errors::ConfigurationError;

/// Glazing described by a U-value and a solar heat gain coefficient.
#[derive(Clone, Debug, PartialEq)]
pub struct Window {
    name: String,
    area: f64,    // m2
    u_value: f64, // W/(m2.K)
    shgc: f64,
}

impl Window {
    pub fn new(
        name: impl Into<String>,
        area: f64,
        u_value: f64,
        shgc: f64,
    ) -> Result<Self, ConfigurationError> {
        let name = name.into();
        if !(area.is_finite() && area > 0.) {
            return Err(ConfigurationError::invalid(
                name,
                "area",
                format!("must be positive, got {area}"),
            ));
        }
        if !(u_value.is_finite() && u_value > 0.) {
            return Err(ConfigurationError::invalid(
                name,
                "u_value",
                format!("must be positive, got {u_value}"),
            ));
        }
        if !(shgc > 0. && shgc <= 1.) {
            return Err(ConfigurationError::invalid(
                name,
                "shgc",
                format!("must be greater than 0 and at most 1, got {shgc}"),
            ));
        }

        Ok(Self {
            name,
            area,
            u_value,
            shgc,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn area(&self) -> f64 {
        self.area
    }

    /// U-value times area, in W/K
    pub fn conductance(&self) -> f64 {
        self.u_value * self.area
    }

    /// Conductive heat flow out of the zone, in W (positive is a loss)
    pub fn conductive_heat_loss(&self, temp_inside: f64, temp_outside: f64) -> f64 {
        self.conductance() * (temp_inside - temp_outside)
    }

    /// Transmitted solar gain, in W
    ///
    /// Arguments:
    /// * `solar_irradiance` - irradiance on the glazing, in W/m2
    pub fn solar_gain(&self, solar_irradiance: f64) -> f64 {
        self.shgc * self.area * solar_irradiance.max(0.)
    }
}
