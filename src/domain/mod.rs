// Domain layer: entities and ports. No knowledge of how queries are evaluated.

pub mod model;
pub mod ports;
