//! State Unfold
//!
//! Compiles guarded-command programs into program graphs and unfolds them
//! into explicit transition systems.
//!
//! This library provides functionality for:
//! - Building and querying transition systems and program graphs
//! - Compiling nanoPromela statement trees into program graphs
//! - Interleaving program graphs and transition systems
//! - Unfolding program graphs, channel systems and circuits into transition systems
//! - Evaluating actions and guards through pluggable evaluators
//! - Loading multi-process models from TOML or JSON files

pub mod cli;
pub mod compiler;
pub mod config;
pub mod error;
pub mod eval;
pub mod graph;
pub mod model;
pub mod program_graph;
pub mod transition_system;
pub mod unfold;

pub use config::Config;
pub use error::{Error, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Initialize logging with the given log level
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
