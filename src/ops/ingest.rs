use crate::model::config::IngestConfig;
use crate::model::forest::Forest;
use crate::model::task::{Provenance, TaskDraft, TaskId};
use crate::ops::task_ops::{add_roots, add_subtasks};
use crate::parse::outline::{OutlineBody, OutlineNode, parse_outline};

/// Error type for ingest operations
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("no outline nodes found in generated text")]
    Empty,
    #[error("ingest target not found: {0}")]
    TargetNotFound(String),
}

/// Where ingested nodes land
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestTarget {
    /// Appended as children of an existing task
    Parent(TaskId),
    /// Appended as new roots of a project
    Project(String),
}

impl IngestTarget {
    pub fn id(&self) -> &str {
        match self {
            IngestTarget::Parent(id) | IngestTarget::Project(id) => id,
        }
    }
}

/// Result of an ingest operation
#[derive(Debug)]
pub struct IngestResult {
    /// Ids of the newly created top-level tasks
    pub root_ids: Vec<TaskId>,
    /// Total number of tasks created (including descendants)
    pub total_count: usize,
}

/// Convert an outline node into an ai-authored draft.
///
/// Branches keep their title and children. A leaf's content strings become
/// the task description, one per line.
pub fn draft_from_outline(node: &OutlineNode) -> TaskDraft {
    let (description, children) = match &node.body {
        OutlineBody::Branch(children) => (None, children.iter().map(draft_from_outline).collect()),
        OutlineBody::Leaf(content) if content.is_empty() => (None, Vec::new()),
        OutlineBody::Leaf(content) => (Some(content.join("\n")), Vec::new()),
    };
    TaskDraft {
        text: node.title.clone(),
        description,
        provenance: Provenance::Ai,
        children,
    }
}

/// Render a task's subtree as an outline. Branch tasks keep their children;
/// a leaf's description lines become its content.
pub fn outline_from_task(forest: &Forest, id: &str) -> Option<OutlineNode> {
    let task = forest.task(id)?;
    if task.children.is_empty() {
        let content = task
            .description
            .as_deref()
            .map(|d| d.lines().map(str::to_string).collect())
            .unwrap_or_default();
        return Some(OutlineNode::leaf(task.text.clone(), content));
    }
    let children = forest
        .ordered(&task.children)
        .into_iter()
        .filter_map(|child| outline_from_task(forest, &child.id))
        .collect();
    Some(OutlineNode::branch(task.text.clone(), children))
}

/// Parse generated text and insert the resulting tree.
///
/// Parsing happens before the target is touched, so an empty parse leaves the
/// forest exactly as it was.
pub fn ingest_outline(
    forest: &mut Forest,
    text: &str,
    target: &IngestTarget,
    config: &IngestConfig,
) -> Result<IngestResult, IngestError> {
    let nodes = parse_outline(text, config);
    if nodes.is_empty() {
        tracing::warn!(anchor = target.id(), "generated text held no outline nodes");
        return Err(IngestError::Empty);
    }

    let drafts: Vec<TaskDraft> = nodes.iter().map(draft_from_outline).collect();
    let total_count = drafts.iter().map(TaskDraft::len).sum();

    let root_ids = match target {
        IngestTarget::Parent(id) => add_subtasks(forest, id, drafts),
        IngestTarget::Project(id) => add_roots(forest, id, drafts),
    }
    .ok_or_else(|| IngestError::TargetNotFound(target.id().to_string()))?;

    tracing::info!(
        anchor = target.id(),
        roots = root_ids.len(),
        total = total_count,
        "ingested outline"
    );
    Ok(IngestResult {
        root_ids,
        total_count,
    })
}
