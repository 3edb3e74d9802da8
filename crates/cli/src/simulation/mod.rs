//! Simulation module: producers, a simulated sink and run statistics.

mod runner;
mod sink;
mod stats;

pub use runner::Simulation;
pub use sink::SimulatedSink;
pub use stats::SimulationStats;
