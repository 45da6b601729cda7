// Domain layer: generation records and the backend port.

pub mod model;
pub mod ports;
