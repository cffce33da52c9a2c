mod aggregate;
mod config;
mod constants;
mod data;

pub use aggregate::*;
pub use config::*;
pub use constants::*;
pub use data::*;
