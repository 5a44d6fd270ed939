pub mod calculator;
pub mod config;
pub mod controller;
pub mod plating_states;
pub mod psu;
pub mod safety;
pub mod state;
pub mod timefmt;
pub mod types;

pub use controller::*;
pub use types::*;
