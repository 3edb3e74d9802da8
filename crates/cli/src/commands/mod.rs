//! Command implementations.

mod simulate;
mod validate;

pub use simulate::run_simulate;
pub use validate::run_validate;
