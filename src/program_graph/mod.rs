//! Program graph module - Control-flow graphs of sequential processes

pub mod channel;
pub mod graph;
pub mod interleave;

// Re-export key types
pub use channel::ChannelSystem;
pub use graph::{Guarded, PgTransition, ProgramGraph};
pub use interleave::interleave;
