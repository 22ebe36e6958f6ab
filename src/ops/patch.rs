//! Whole-subtree replacement plus whitelisted field updates, applied
//! atomically from a collaborator's proposal.

use serde::Deserialize;
use serde_json::Value;

use crate::model::forest::Forest;
use crate::model::task::TaskId;
use crate::ops::ingest::draft_from_outline;
use crate::ops::query::subtree_ids;
use crate::ops::status::propagate;
use crate::ops::task_ops::materialize;
use crate::parse::outline::{OutlineNode, expand_object, parse_json_value, strip_fences};

/// Error type for patch operations
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error("patch proposal is not valid JSON: {0}")]
    Malformed(String),
    #[error("patch proposal has no replacement subtree")]
    EmptyReplacement,
    #[error("patch target not found: {0}")]
    TargetNotFound(String),
}

/// One field change inside an update. Only `text` and `description` are ever
/// applied; everything else is dropped.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FieldChange {
    #[serde(alias = "Op", alias = "operation")]
    pub op: String,
    #[serde(alias = "Path", alias = "field")]
    pub path: String,
    #[serde(default, alias = "Value")]
    pub value: Value,
}

/// Field changes for one existing task
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Update {
    #[serde(alias = "Id", alias = "taskId")]
    pub id: TaskId,
    #[serde(default, alias = "Changes")]
    pub changes: Vec<FieldChange>,
}

/// Update entry before its changes are read one by one
#[derive(Deserialize)]
struct RawUpdate {
    #[serde(alias = "Id", alias = "taskId")]
    id: TaskId,
    #[serde(default, alias = "Changes")]
    changes: Vec<Value>,
}

/// A parsed regenerate proposal
#[derive(Debug, Clone, PartialEq)]
pub struct PatchProposal {
    pub replacement: OutlineNode,
    pub updates: Vec<Update>,
    /// Update entries too malformed to name a task
    pub unreadable_updates: usize,
    /// Change entries too malformed to read
    pub unreadable_changes: usize,
}

/// Whitelisted fields a change may touch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Text,
    Description,
}

impl PatchProposal {
    /// Read a proposal from collaborator output.
    ///
    /// Accepts `{"replacement": {"Title": ...}, "updates": [...]}`, or an
    /// object whose non-`updates` keys are the replacement itself. Fenced and
    /// chatty replies are tolerated the same way outline ingestion tolerates
    /// them.
    pub fn parse(text: &str) -> Result<Self, PatchError> {
        let body = strip_fences(text);
        let Some(Value::Object(mut map)) = parse_json_value(&body) else {
            return Err(PatchError::Malformed("expected a JSON object".into()));
        };

        let entries = match take_key(&mut map, &["updates", "Updates"]) {
            Some(Value::Array(entries)) => entries,
            Some(Value::Null) | None => Vec::new(),
            Some(_) => return Err(PatchError::Malformed("updates must be an array".into())),
        };
        let mut updates = Vec::with_capacity(entries.len());
        let mut unreadable_updates = 0;
        let mut unreadable_changes = 0;
        for entry in entries {
            let raw = match serde_json::from_value::<RawUpdate>(entry) {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::debug!(error = %e, "unreadable patch update");
                    unreadable_updates += 1;
                    continue;
                }
            };
            let mut changes = Vec::with_capacity(raw.changes.len());
            for change in raw.changes {
                match serde_json::from_value::<FieldChange>(change) {
                    Ok(change) => changes.push(change),
                    Err(e) => {
                        tracing::debug!(id = %raw.id, error = %e, "unreadable patch change");
                        unreadable_changes += 1;
                    }
                }
            }
            updates.push(Update {
                id: raw.id,
                changes,
            });
        }

        let outline = match take_key(&mut map, &["replacement", "Replacement"]) {
            Some(Value::Object(inner)) => expand_object(&inner, 0),
            Some(_) => return Err(PatchError::Malformed("replacement must be an object".into())),
            None => expand_object(&map, 0),
        };
        let replacement = outline
            .into_iter()
            .next()
            .ok_or(PatchError::EmptyReplacement)?;

        Ok(PatchProposal {
            replacement,
            updates,
            unreadable_updates,
            unreadable_changes,
        })
    }
}

fn take_key(map: &mut serde_json::Map<String, Value>, keys: &[&str]) -> Option<Value> {
    keys.iter().find_map(|k| map.remove(*k))
}

/// What an applied patch did
#[derive(Debug, Default)]
pub struct PatchOutcome {
    pub target_id: TaskId,
    /// Ids of the freshly created children of the target
    pub new_child_ids: Vec<TaskId>,
    /// Tasks that had at least one change applied
    pub updated_ids: Vec<TaskId>,
    /// Updates naming ids not in the forest, or unreadable
    pub skipped_updates: usize,
    /// Changes outside the whitelist, with an unknown op, or unreadable
    pub dropped_changes: usize,
}

/// Apply a proposal to a copy of `forest`.
///
/// The target keeps its id, parent and position; its text and description
/// come from the replacement root and its old descendants are discarded for
/// the replacement's children. Updates then touch `text`/`description` of
/// existing tasks. On error the input forest is untouched.
pub fn apply_patch(
    forest: &Forest,
    target_id: &str,
    proposal: &PatchProposal,
) -> Result<(Forest, PatchOutcome), PatchError> {
    if !forest.contains_task(target_id) {
        return Err(PatchError::TargetNotFound(target_id.to_string()));
    }
    let mut next = forest.clone();
    let mut outcome = PatchOutcome {
        target_id: target_id.to_string(),
        skipped_updates: proposal.unreadable_updates,
        dropped_changes: proposal.unreadable_changes,
        ..Default::default()
    };

    replace_subtree(&mut next, target_id, &proposal.replacement, &mut outcome);

    for update in &proposal.updates {
        if !next.contains_task(&update.id) {
            tracing::debug!(id = %update.id, "patch update names unknown task");
            outcome.skipped_updates += 1;
            continue;
        }
        if apply_update(&mut next, update, &mut outcome) {
            outcome.updated_ids.push(update.id.clone());
        }
    }

    propagate(&mut next, Some(target_id));
    for id in &outcome.updated_ids {
        propagate(&mut next, Some(id));
    }

    tracing::info!(
        target_id,
        children = outcome.new_child_ids.len(),
        updated = outcome.updated_ids.len(),
        dropped = outcome.dropped_changes,
        "applied patch"
    );
    Ok((next, outcome))
}

fn replace_subtree(
    forest: &mut Forest,
    target_id: &str,
    replacement: &OutlineNode,
    outcome: &mut PatchOutcome,
) {
    let old_children = forest
        .task(target_id)
        .map(|t| t.children.clone())
        .unwrap_or_default();
    for child in &old_children {
        for gone in subtree_ids(forest, child) {
            forest.tasks.remove(&gone);
        }
    }

    let draft = draft_from_outline(replacement);
    let now = forest.stamp();
    let new_children: Vec<TaskId> = draft
        .children
        .into_iter()
        .enumerate()
        .map(|(i, child)| materialize(forest, child, Some(target_id), i as i64, now))
        .collect();

    if let Some(task) = forest.task_mut(target_id) {
        task.text = draft.text;
        task.description = draft.description;
        task.children = new_children.clone();
        task.last_edited = now;
    }
    outcome.new_child_ids = new_children;
}

fn apply_update(forest: &mut Forest, update: &Update, outcome: &mut PatchOutcome) -> bool {
    let mut accepted: Vec<(Field, Option<String>)> = Vec::new();
    for change in &update.changes {
        match accept_change(change) {
            Some(accepted_change) => accepted.push(accepted_change),
            None => {
                tracing::debug!(id = %update.id, path = %change.path, op = %change.op, "dropped patch change");
                outcome.dropped_changes += 1;
            }
        }
    }
    if accepted.is_empty() {
        return false;
    }

    let now = forest.stamp();
    let Some(task) = forest.task_mut(&update.id) else {
        return false;
    };
    for (field, value) in accepted {
        match field {
            Field::Text => {
                if let Some(text) = value {
                    task.text = text;
                }
            }
            Field::Description => task.description = value,
        }
    }
    task.last_edited = now;
    true
}

/// Validate op and path; returns the field and its new value.
/// `null` clears a description and is meaningless for text.
fn accept_change(change: &FieldChange) -> Option<(Field, Option<String>)> {
    let op = change.op.trim().to_ascii_lowercase();
    if op != "replace" && op != "update" {
        return None;
    }
    let field = match change.path.trim().trim_start_matches('/') {
        "text" => Field::Text,
        "description" => Field::Description,
        _ => return None,
    };
    let value = match &change.value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(_) | Value::Bool(_) => Some(change.value.to_string()),
        Value::Array(_) | Value::Object(_) => return None,
    };
    if field == Field::Text && value.as_deref().is_none_or(|t| t.trim().is_empty()) {
        return None;
    }
    Some((field, value))
}
