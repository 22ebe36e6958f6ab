use serde::{Deserialize, Serialize};

/// The active navigation context: which project is open and which task is
/// focused. Captured with every history snapshot so undo/redo can restore it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub task_id: Option<String>,
}

impl Selection {
    pub fn task(project_id: impl Into<String>, task_id: impl Into<String>) -> Self {
        Selection {
            project_id: Some(project_id.into()),
            task_id: Some(task_id.into()),
        }
    }
}
