pub mod config;
pub mod error;
pub mod net;
pub mod proto;
pub mod run;
pub mod sim;
pub mod trace;

pub use config::SimConfig;
pub use error::{ConfigError, RdtError};
pub use proto::Protocol;
pub use run::{run_protocol, run_with_random_faults, RunReport};

#[cfg(test)]
mod test;
