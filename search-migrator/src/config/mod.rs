//! Configuration and dependency wiring for the search migrator.

mod dependencies;
mod migrator_config;

pub use dependencies::Dependencies;
pub use migrator_config::MigratorConfig;
