//! CLI module
//!
//! This module defines the command-line interface using clap and implements
//! the command execution logic.

use crate::config::Composition;
use crate::{Config, Error, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub mod commands;
pub mod output;

/// Program graph and transition system builder CLI
#[derive(Parser, Debug)]
#[command(name = "state-unfold")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile every process of a model into its program graph
    Compile {
        /// Path to model file (TOML or JSON)
        #[arg(short, long)]
        model: PathBuf,

        /// Output format (overrides config)
        #[arg(short, long, value_enum)]
        output: Option<OutputFormat>,
    },

    /// Unfold a model into its transition system
    Unfold {
        /// Path to model file (TOML or JSON)
        #[arg(short, long)]
        model: PathBuf,

        /// Output format (overrides config)
        #[arg(short, long, value_enum)]
        output: Option<OutputFormat>,

        /// How processes are combined: channel or interleave (overrides config)
        #[arg(long)]
        composition: Option<Composition>,
    },

    /// Validate a model file
    Validate {
        /// Path to model file
        model: PathBuf,
    },
}

/// Output format types
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// DOT format (Graphviz)
    Dot,
    /// Plain text table
    Table,
}

impl OutputFormat {
    /// The format given on the command line, or the configured default
    pub fn resolve(requested: Option<OutputFormat>, config: &Config) -> Result<Self> {
        match requested {
            Some(format) => Ok(format),
            None => <OutputFormat as ValueEnum>::from_str(&config.default.output, true).map_err(
                |_| Error::Config(format!("Unknown output format: {}", config.default.output)),
            ),
        }
    }
}

/// Execute the CLI command
pub fn execute(args: Cli, config: Config) -> Result<()> {
    match args.command {
        Commands::Compile { model, output } => {
            let format = OutputFormat::resolve(output, &config)?;
            commands::compile::execute(&model, format)
        }
        Commands::Unfold {
            model,
            output,
            composition,
        } => {
            let format = OutputFormat::resolve(output, &config)?;
            let composition = composition.unwrap_or(config.unfold.composition);
            commands::unfold::execute(&model, format, composition)
        }
        Commands::Validate { model } => commands::validate::execute(&model),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from([
            "state-unfold",
            "unfold",
            "--model",
            "model.toml",
            "-o",
            "dot",
            "--composition",
            "interleave",
        ])
        .unwrap();

        match cli.command {
            Commands::Unfold {
                model,
                output,
                composition,
            } => {
                assert_eq!(model, PathBuf::from("model.toml"));
                assert_eq!(output, Some(OutputFormat::Dot));
                assert_eq!(composition, Some(Composition::Interleave));
            }
            other => panic!("unexpected command {:?}", other),
        }

        assert!(Cli::try_parse_from(["state-unfold", "validate", "model.toml"]).is_ok());
        assert!(Cli::try_parse_from(["state-unfold", "unfold", "--composition", "x"]).is_err());
    }

    #[test]
    fn test_output_format_falls_back_to_config() {
        let mut config = Config::default();
        assert_eq!(
            OutputFormat::resolve(None, &config).unwrap(),
            OutputFormat::Table
        );
        assert_eq!(
            OutputFormat::resolve(Some(OutputFormat::Json), &config).unwrap(),
            OutputFormat::Json
        );

        config.default.output = "DOT".to_string();
        assert_eq!(
            OutputFormat::resolve(None, &config).unwrap(),
            OutputFormat::Dot
        );

        config.default.output = "tui".to_string();
        assert!(OutputFormat::resolve(None, &config).is_err());
    }
}
