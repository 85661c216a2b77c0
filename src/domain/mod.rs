// Domain layer: deployment models and collaborator ports.

pub mod model;
pub mod ports;
