//! CLI surface: argument parsing and command entry points.

mod args;
pub mod connect;
pub mod inspect;

pub use args::{Cli, Commands};
