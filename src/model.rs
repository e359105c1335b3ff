//! Model files
//!
//! A model lists one or more processes. Each process is either a statement
//! tree compiled into a program graph, or an explicit graph given by its
//! initial locations and guarded transitions:
//!
//! ```toml
//! [[process]]
//! name = "counter"
//! initializations = [["x := 0"]]
//!
//! [process.statement]
//! kind = "do"
//! options = [{ guard = "x < 3", body = { kind = "assign", var = "x", expr = "x + 1" } }]
//!
//! [[process]]
//! name = "toggle"
//! initial = ["off"]
//! transition = [
//!     { from = "off", action = "b := true", to = "on" },
//!     { from = "on", guard = "b", action = "b := false", to = "off" },
//! ]
//! ```

use crate::compiler::{Stmt, program_graph_from_stmt};
use crate::error::{Error, Result};
use crate::program_graph::{ChannelSystem, PgTransition, ProgramGraph};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelFile {
    #[serde(default, rename = "process")]
    pub processes: Vec<ProcessDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessDef {
    pub name: String,

    pub statement: Option<Stmt>,

    #[serde(default)]
    pub initial: Vec<String>,

    #[serde(default, rename = "transition")]
    pub transitions: Vec<TransitionDef>,

    #[serde(default)]
    pub initializations: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionDef {
    pub from: String,

    #[serde(default)]
    pub guard: String,

    #[serde(default)]
    pub action: String,

    pub to: String,
}

impl ModelFile {
    /// Loads a model, as JSON for `.json` files and as TOML otherwise
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let contents = std::fs::read_to_string(&path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let parsed = if is_json {
            serde_json::from_str(&contents).map_err(|e| e.to_string())
        } else {
            toml::from_str(&contents).map_err(|e| e.to_string())
        };
        let model: ModelFile = parsed.map_err(|message| Error::ModelParse {
            file: path.clone(),
            message,
        })?;

        tracing::debug!(
            "Loaded {} processes from {}",
            model.processes.len(),
            path.display()
        );
        Ok(model)
    }

    /// Checks the structure of every process, reporting the first problem
    pub fn validate(&self) -> Result<()> {
        if self.processes.is_empty() {
            return Err(Error::model("model declares no processes"));
        }

        let mut names = HashSet::new();
        for process in &self.processes {
            if process.name.trim().is_empty() {
                return Err(Error::model("process without a name"));
            }
            if !names.insert(process.name.as_str()) {
                return Err(Error::model(format!(
                    "duplicate process name {:?}",
                    process.name
                )));
            }
            process.validate()?;
        }
        Ok(())
    }

    /// Validates the model and builds one program graph per process, in
    /// declaration order.
    pub fn to_program_graphs(&self) -> Result<Vec<ProgramGraph<String, String>>> {
        self.validate()?;
        self.processes
            .iter()
            .map(ProcessDef::to_program_graph)
            .collect()
    }

    pub fn to_channel_system(&self) -> Result<ChannelSystem<String>> {
        Ok(ChannelSystem::new(self.to_program_graphs()?))
    }
}

impl ProcessDef {
    fn is_explicit(&self) -> bool {
        !self.initial.is_empty() || !self.transitions.is_empty()
    }

    fn validate(&self) -> Result<()> {
        match (&self.statement, self.is_explicit()) {
            (Some(_), true) => Err(Error::model(format!(
                "process {:?} has both a statement and explicit transitions",
                self.name
            ))),
            (None, false) => Err(Error::model(format!(
                "process {:?} has neither a statement nor explicit transitions",
                self.name
            ))),
            (None, true) if self.initial.is_empty() => Err(Error::model(format!(
                "process {:?} has no initial location",
                self.name
            ))),
            _ => Ok(()),
        }
    }

    fn to_program_graph(&self) -> Result<ProgramGraph<String, String>> {
        let mut pg = match &self.statement {
            Some(stmt) => program_graph_from_stmt(stmt)?,
            None => self.explicit_graph()?,
        };
        pg.set_name(self.name.clone());
        for initialization in &self.initializations {
            pg.add_initialization(initialization.clone());
        }
        Ok(pg)
    }

    fn explicit_graph(&self) -> Result<ProgramGraph<String, String>> {
        let mut pg = ProgramGraph::new();
        for location in &self.initial {
            pg.add_location(location.clone());
            pg.set_initial(location, true)?;
        }
        for transition in &self.transitions {
            pg.add_location(transition.from.clone());
            pg.add_location(transition.to.clone());
            pg.add_transition(PgTransition::new(
                transition.from.clone(),
                transition.guard.clone(),
                transition.action.clone(),
                transition.to.clone(),
            ))?;
        }
        Ok(pg)
    }
}
