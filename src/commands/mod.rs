//! CLI command implementations.
//!
//! Available commands:
//! - **run** (default): discover repositories and sweep them
//! - **discover**: print the repositories a run would visit
//! - **status**: print the run registry
//! - **init**: write a template configuration file

pub mod init;
pub mod run;
pub mod status;

pub use init::init_config;
pub use run::{discover_repos, run_sweep};
pub use status::show_status;
