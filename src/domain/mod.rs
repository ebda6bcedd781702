// Domain layer: core models and ports (interfaces) for the orchestrator.

pub mod model;
pub mod ports;
