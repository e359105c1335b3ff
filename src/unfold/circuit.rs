//! Sequential boolean circuits as transition systems
//!
//! A state pairs the current input valuation with the register valuation.
//! Feeding the next input valuation `a` in state `s` moves to
//! `(a, update_registers(a, s.registers))`.

use crate::graph::{Pair, Reachability};
use crate::transition_system::{Transition, TransitionSystem};
use crate::Result;
use std::collections::BTreeMap;

/// Truth values of named wires
pub type Valuation = BTreeMap<String, bool>;

/// A sequential circuit: registers, inputs, outputs, and the two boolean
/// functions computing the next registers and the outputs.
pub trait Circuit {
    fn register_names(&self) -> Vec<String>;

    fn input_names(&self) -> Vec<String>;

    fn output_names(&self) -> Vec<String>;

    fn update_registers(&self, inputs: &Valuation, registers: &Valuation) -> Valuation;

    fn compute_outputs(&self, inputs: &Valuation, registers: &Valuation) -> Valuation;
}

/// A circuit defined by closures
pub struct FnCircuit<U, O> {
    registers: Vec<String>,
    inputs: Vec<String>,
    outputs: Vec<String>,
    update: U,
    output: O,
}

impl<U, O> FnCircuit<U, O>
where
    U: Fn(&Valuation, &Valuation) -> Valuation,
    O: Fn(&Valuation, &Valuation) -> Valuation,
{
    pub fn new(update: U, output: O) -> Self {
        Self {
            registers: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            update,
            output,
        }
    }

    pub fn registers<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.registers = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn inputs<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.inputs = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn outputs<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.outputs = names.into_iter().map(Into::into).collect();
        self
    }
}

impl<U, O> Circuit for FnCircuit<U, O>
where
    U: Fn(&Valuation, &Valuation) -> Valuation,
    O: Fn(&Valuation, &Valuation) -> Valuation,
{
    fn register_names(&self) -> Vec<String> {
        self.registers.clone()
    }

    fn input_names(&self) -> Vec<String> {
        self.inputs.clone()
    }

    fn output_names(&self) -> Vec<String> {
        self.outputs.clone()
    }

    fn update_registers(&self, inputs: &Valuation, registers: &Valuation) -> Valuation {
        (self.update)(inputs, registers)
    }

    fn compute_outputs(&self, inputs: &Valuation, registers: &Valuation) -> Valuation {
        (self.output)(inputs, registers)
    }
}

/// All `2^n` valuations of `names`
pub fn valuations(names: &[String]) -> Vec<Valuation> {
    let mut all = vec![Valuation::new()];
    for name in names {
        all = all
            .into_iter()
            .flat_map(|valuation| {
                [false, true].map(|value| {
                    let mut extended = valuation.clone();
                    extended.insert(name.clone(), value);
                    extended
                })
            })
            .collect();
    }
    all
}

fn true_names(valuation: &Valuation) -> impl Iterator<Item = &String> {
    valuation
        .iter()
        .filter(|(_, value)| **value)
        .map(|(name, _)| name)
}

/// Unfolds `circuit` into a transition system, pruned to the states
/// reachable from the all-false register valuations.
pub fn transition_system_from_circuit(
    circuit: &impl Circuit,
) -> Result<TransitionSystem<Pair<Valuation, Valuation>, Valuation, String>> {
    let mut ts = TransitionSystem::with_name("circuit");
    let inputs = valuations(&circuit.input_names());
    let registers = valuations(&circuit.register_names());

    for name in circuit
        .register_names()
        .into_iter()
        .chain(circuit.input_names())
        .chain(circuit.output_names())
    {
        ts.add_proposition(name);
    }
    for input in &inputs {
        ts.add_action(input.clone());
    }

    for input in &inputs {
        for register in &registers {
            let state = Pair::new(input.clone(), register.clone());
            ts.add_state(state.clone());
            if register.values().all(|value| !value) {
                ts.set_initial(&state, true)?;
            }

            let outputs = circuit.compute_outputs(input, register);
            let label: Vec<String> = true_names(register)
                .chain(true_names(input))
                .chain(true_names(&outputs))
                .cloned()
                .collect();
            for proposition in label {
                ts.add_label(&state, proposition)?;
            }
        }
    }

    for input in &inputs {
        for register in &registers {
            let from = Pair::new(input.clone(), register.clone());
            for action in &inputs {
                let to = Pair::new(action.clone(), circuit.update_registers(action, register));
                ts.add_transition(Transition::new(from.clone(), action.clone(), to))?;
            }
        }
    }

    let pruned = ts.remove_unreachable();
    tracing::debug!(
        "Unfolded circuit: {} states, {} transitions ({} unreachable pruned)",
        ts.state_count(),
        ts.transition_count(),
        pruned
    );
    Ok(ts)
}
