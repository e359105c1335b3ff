//! CLI command implementations
//!
//! This module contains the implementation for each CLI command.

use crate::Result;
use crate::cli::OutputFormat;
use crate::cli::output::location_name;
use crate::eval::Store;
use crate::model::ModelFile;
use std::path::Path;

fn load_model(path: &Path) -> Result<ModelFile> {
    tracing::info!("Loading model from {:?}", path);
    ModelFile::from_file(path)
}

fn store_suffix(store: &Store) -> String {
    if store.is_empty() {
        String::new()
    } else {
        format!(" {}", store)
    }
}

/// Compile command implementation
pub mod compile {
    use super::*;

    /// Execute the compile command
    pub fn execute(model_path: &Path, format: OutputFormat) -> Result<()> {
        let graphs = load_model(model_path)?.to_program_graphs()?;
        tracing::info!("Compiled {} program graphs", graphs.len());

        let mut stdout = std::io::stdout();
        match format {
            OutputFormat::Json => crate::cli::output::output_program_graphs_json(&mut stdout, &graphs)?,
            OutputFormat::Table => {
                crate::cli::output::output_program_graphs_table(&mut stdout, &graphs)?
            }
            OutputFormat::Dot => {
                for pg in &graphs {
                    println!("{}", pg.to_dot(|l| location_name(l)));
                }
            }
        }
        Ok(())
    }
}

/// Unfold command implementation
pub mod unfold {
    use super::*;
    use crate::config::Composition;
    use crate::eval::{Evaluators, ParserBasedInterleavingActionDef};
    use crate::program_graph::interleave;
    use crate::transition_system::TransitionSystem;
    use crate::unfold::{transition_system_from_channel_system, transition_system_from_program_graph};
    use std::fmt;
    use std::hash::Hash;

    /// Execute the unfold command
    pub fn execute(model_path: &Path, format: OutputFormat, composition: Composition) -> Result<()> {
        let model = load_model(model_path)?;
        let evaluators = Evaluators::parser_based();
        tracing::info!("Unfolding with {} composition", composition);

        match composition {
            Composition::Channel => {
                let cs = model.to_channel_system()?;
                let ts = transition_system_from_channel_system(
                    &cs,
                    &evaluators,
                    &ParserBasedInterleavingActionDef,
                )?;
                write_system(&ts, format, |state| {
                    let locations: Vec<String> =
                        state.first.iter().map(|l| location_name(l)).collect();
                    format!("[{}]{}", locations.join(", "), store_suffix(&state.second))
                })
            }
            Composition::Interleave => {
                let mut graphs = model.to_program_graphs()?.into_iter();
                let Some(first) = graphs.next() else {
                    crate::bail!("model declares no processes");
                };
                let mut composed = first;
                for pg in graphs {
                    composed = interleave(&composed, &pg)?.map_locations(|l| l.to_string())?;
                }
                let ts = transition_system_from_program_graph(&composed, &evaluators)?;
                write_system(&ts, format, |state| {
                    format!("{}{}", location_name(&state.first), store_suffix(&state.second))
                })
            }
        }
    }

    fn write_system<S, A, P>(
        ts: &TransitionSystem<S, A, P>,
        format: OutputFormat,
        state_name: impl Fn(&S) -> String,
    ) -> Result<()>
    where
        S: Clone + Eq + Hash + fmt::Debug,
        A: Clone + Eq + Hash + fmt::Debug + fmt::Display,
        P: Clone + Eq + Hash + fmt::Debug + fmt::Display,
    {
        tracing::info!(
            "Unfolded {} states and {} transitions",
            ts.state_count(),
            ts.transition_count()
        );
        let mut stdout = std::io::stdout();
        match format {
            OutputFormat::Json => crate::cli::output::output_json(&mut stdout, ts, state_name),
            OutputFormat::Table => crate::cli::output::output_table(&mut stdout, ts, state_name),
            OutputFormat::Dot => {
                print!("{}", ts.to_dot(state_name));
                Ok(())
            }
        }
    }
}

/// Validate command implementation
pub mod validate {
    use super::*;

    /// Execute the validate command
    pub fn execute(model_path: &Path) -> Result<()> {
        tracing::info!("Validating model: {:?}", model_path);

        let model = match ModelFile::from_file(model_path) {
            Ok(m) => m,
            Err(e) => {
                eprintln!("❌ Failed to load model: {}", e);
                return Err(e);
            }
        };

        println!("📋 Model Validation Report");
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        println!("File: {:?}", model_path);
        println!();
        println!("Processes: {}", model.processes.len());
        for process in &model.processes {
            let kind = match &process.statement {
                Some(stmt) => format!("statement {}", stmt.text()),
                None => format!("{} explicit transitions", process.transitions.len()),
            };
            println!("    - {} ({})", process.name, kind);
        }
        println!();

        match model.to_program_graphs() {
            Ok(graphs) => {
                for pg in &graphs {
                    println!(
                        "  {}: {} locations, {} transitions",
                        pg.name(),
                        pg.location_count(),
                        pg.transition_count()
                    );
                }
                println!();
                println!("✅ Model is valid!");
                Ok(())
            }
            Err(e) => {
                println!("❌ Errors:");
                println!("   {}", e);
                println!();
                println!("❌ Model validation failed");
                Err(e)
            }
        }
    }
}
