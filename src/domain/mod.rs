// Domain layer: core models and ports (interfaces) shared by the cache, the
// workflow engine and the direct executor.

pub mod model;
pub mod ports;
