pub mod air_exchange;
pub mod convection;
pub mod fabric;
pub mod longwave;
pub mod surface;
pub mod window;
pub mod zone;
