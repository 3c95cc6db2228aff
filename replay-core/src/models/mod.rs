pub mod clip;
pub mod config;
pub mod error;
pub mod snapshot;
pub mod state;
