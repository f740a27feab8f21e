//! Command handlers -- one module per subcommand

pub mod config;
pub mod findings;
pub mod scan;
pub mod status;
