//! Compiler module - nanoPromela statement trees to program graphs

pub mod ast;
pub mod locations;

// Re-export key types
pub use ast::{Assignment, GuardedOption, Stmt};
pub use locations::{EXIT, program_graph_from_stmt, sub_locations};
