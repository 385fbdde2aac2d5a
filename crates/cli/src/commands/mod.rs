//! Command implementations.

mod exec;
mod info;
mod run;
mod validate;

pub use exec::run_exec;
pub use info::run_info;
pub use run::run_bridge;
pub use validate::run_validate;
