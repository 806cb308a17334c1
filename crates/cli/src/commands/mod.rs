//! Command implementations.

mod emit;
mod info;
mod pipe;
mod validate;

pub use emit::run_emit;
pub use info::run_info;
pub use pipe::run_pipe;
pub use validate::run_validate;
