// Domain layer: blocklist records, run state and the ports the pipeline depends on.

pub mod aggregator;
pub mod model;
pub mod ports;
