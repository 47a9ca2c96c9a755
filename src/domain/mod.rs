// Core models and ports. Adapters and pipelines depend on this layer, never the reverse.

pub mod model;
pub mod ports;
