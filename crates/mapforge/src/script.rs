//! Scripted gesture steps for `mapforge replay`.
//!
//! A script is a JSON array of steps, each tagged by `step`:
//!
//! ```json
//! [
//!   {"step": "start", "item": "catalog::layer:1"},
//!   {"step": "over", "target": {"target": "container_root", "container": "layers"}},
//!   {"step": "drop", "target": {"target": "container_root", "container": "layers"}},
//!   {"step": "move_up", "container": "layers", "id": "layer:1"}
//! ]
//! ```

use std::path::Path;

use mapforge_tree::{
    ContainerId, DecisionChoice, DragTransition, DropTarget, MutationResult, Organizer,
};
use serde::{Deserialize, Serialize};

use crate::error::{CliError, Result};
use crate::util::read_json;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum ScriptStep {
    Start { item: String },
    Over { target: DropTarget },
    Drop { target: DropTarget },
    Resolve { choice: DecisionChoice },
    Cancel,
    MoveUp { container: ContainerId, id: String },
    MoveDown { container: ContainerId, id: String },
    Remove { id: String },
    Clear { container: ContainerId },
}

impl ScriptStep {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::Over { .. } => "over",
            Self::Drop { .. } => "drop",
            Self::Resolve { .. } => "resolve",
            Self::Cancel => "cancel",
            Self::MoveUp { .. } => "move_up",
            Self::MoveDown { .. } => "move_down",
            Self::Remove { .. } => "remove",
            Self::Clear { .. } => "clear",
        }
    }
}

/// Load a step list. An empty script is refused.
pub fn load_script(path: &Path) -> Result<Vec<ScriptStep>> {
    let steps: Vec<ScriptStep> = read_json(path)?;
    if steps.is_empty() {
        return Err(CliError::invalid(format!(
            "script {} has no steps",
            path.display()
        )));
    }
    Ok(steps)
}

/// One output line per executed step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub step: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<DragTransition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<MutationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Run one step. Bad drag keys are reported in the step, not raised.
pub fn execute(organizer: &mut Organizer, index: usize, step: &ScriptStep) -> StepReport {
    let mut report = StepReport {
        index,
        step: step.name(),
        transition: None,
        result: None,
        error: None,
    };
    match step {
        ScriptStep::Start { item } => match organizer.on_drag_start(item) {
            Ok(transition) => report.transition = Some(transition),
            Err(error) => report.error = Some(error.to_string()),
        },
        ScriptStep::Over { target } => {
            report.transition = Some(organizer.on_drag_over(target.clone()));
        }
        ScriptStep::Drop { target } => {
            report.result = Some(organizer.on_drag_end(target));
            report.transition = organizer.last_transition().cloned();
        }
        ScriptStep::Resolve { choice } => {
            report.result = Some(organizer.resolve(*choice));
            report.transition = organizer.last_transition().cloned();
        }
        ScriptStep::Cancel => {
            report.result = Some(organizer.cancel());
            report.transition = organizer.last_transition().cloned();
        }
        ScriptStep::MoveUp { container, id } => {
            report.result = Some(organizer.move_up(container, id));
        }
        ScriptStep::MoveDown { container, id } => {
            report.result = Some(organizer.move_down(container, id));
        }
        ScriptStep::Remove { id } => report.result = Some(organizer.remove(id)),
        ScriptStep::Clear { container } => report.result = Some(organizer.clear(container)),
    }
    report
}
