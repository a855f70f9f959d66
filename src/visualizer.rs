use crate::{Action, PlanningState, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// A visualizer for plans that generates Graphviz DOT files
#[derive(Debug, Default)]
pub struct PlanVisualizer;

impl PlanVisualizer {
    /// Create a new plan visualizer
    pub fn new() -> Self {
        Self
    }

    /// Render `plan` as a DOT digraph, replaying it from `initial`.
    ///
    /// Fails with [`crate::PlanError::PreconditionNotMet`] if a step cannot be
    /// applied to the state the previous steps produced.
    pub fn render_to<W: Write>(&self, out: &mut W, initial: &PlanningState, plan: &[Action]) -> Result<()> {
        // Write DOT file header
        writeln!(out, "digraph Plan {{")?;
        writeln!(out, "    rankdir=LR;")?;
        writeln!(out, "    node [shape=box, style=filled, fillcolor=lightblue];")?;
        writeln!(out, "    edge [fontsize=10];")?;

        // Write initial state
        writeln!(
            out,
            "    initial [label=\"Initial State\\n{}\", fillcolor=lightgreen];",
            Self::totals(initial)
        )?;

        let mut state = initial.clone();
        let mut previous = "initial".to_string();
        for (i, action) in plan.iter().enumerate() {
            state = action.apply(&state)?;
            let node = format!("step_{}", i);
            // Joint steps stand out from single-worker ones
            let fill = if action.is_joint() { ", fillcolor=khaki" } else { "" };
            writeln!(
                out,
                "    {} [label=\"{}\\nCost: {}\\n{}\"{}];",
                node,
                action,
                action.cost(),
                Self::totals(&state),
                fill
            )?;
            writeln!(out, "    {} -> {};", previous, node)?;
            previous = node;
        }

        // Write goal state
        let goal = initial.goal();
        writeln!(
            out,
            "    goal [label=\"Goal State\\ngold: {}\\nwood: {}\\nTotal cost: {}\", fillcolor=lightpink];",
            goal.gold,
            goal.wood,
            state.cost()
        )?;
        if state.is_goal() {
            writeln!(out, "    {} -> goal [label=\"achieves\", color=red, penwidth=2.0];", previous)?;
        } else {
            writeln!(out, "    {} -> goal [label=\"incomplete\", style=dashed];", previous)?;
        }

        // Write closing brace
        writeln!(out, "}}")?;

        Ok(())
    }

    /// Render `plan` as a DOT string.
    pub fn render(&self, initial: &PlanningState, plan: &[Action]) -> Result<String> {
        let mut buffer = Vec::new();
        self.render_to(&mut buffer, initial, plan)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Generate a DOT file visualization of a plan
    pub fn write_to_file<P: AsRef<Path>>(&self, initial: &PlanningState, plan: &[Action], path: P) -> Result<()> {
        let mut file = BufWriter::new(File::create(path)?);
        self.render_to(&mut file, initial, plan)?;
        file.flush()?;
        Ok(())
    }

    /// Helper method to describe the running totals of a state
    fn totals(state: &PlanningState) -> String {
        format!(
            "gold: {}\\nwood: {}",
            state.current_gold(),
            state.current_wood()
        )
    }
}
