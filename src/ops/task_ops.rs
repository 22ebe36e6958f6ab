use std::collections::HashSet;

use crate::model::forest::Forest;
use crate::model::task::{Task, TaskDraft, TaskId, TaskStatus};
use crate::ops::query::subtree_ids;
use crate::ops::status::propagate;

/// Field changes for `update_task`. `None` leaves a field alone.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub text: Option<String>,
    /// `Some(None)` clears the description
    pub description: Option<Option<String>>,
    /// Ignored while the task has children
    pub status: Option<TaskStatus>,
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

/// Append a new manual leaf task to a project's root list.
pub fn create_root_task(forest: &mut Forest, project_id: &str, text: &str) -> Option<TaskId> {
    let ids = add_roots(forest, project_id, vec![TaskDraft::manual(text)])?;
    ids.into_iter().next()
}

/// Append drafts (with their subtrees) as children of `anchor_id`.
/// Orders continue from the anchor's current highest child order.
pub fn add_subtasks(
    forest: &mut Forest,
    anchor_id: &str,
    drafts: Vec<TaskDraft>,
) -> Option<Vec<TaskId>> {
    let anchor = forest.task(anchor_id)?;
    let mut next_order = forest.max_order(&anchor.children) + 1;
    let now = forest.stamp();
    let mut ids = Vec::with_capacity(drafts.len());
    for draft in drafts {
        let id = materialize(forest, draft, Some(anchor_id), next_order, now);
        next_order += 1;
        ids.push(id);
    }
    if let Some(anchor) = forest.task_mut(anchor_id) {
        anchor.children.extend(ids.iter().cloned());
    }
    propagate(forest, Some(anchor_id));
    Some(ids)
}

/// Append drafts (with their subtrees) as new roots of a project.
pub fn add_roots(
    forest: &mut Forest,
    project_id: &str,
    drafts: Vec<TaskDraft>,
) -> Option<Vec<TaskId>> {
    let project = forest.project(project_id)?;
    let mut next_order = forest.max_order(&project.roots) + 1;
    let now = forest.stamp();
    let mut ids = Vec::with_capacity(drafts.len());
    for draft in drafts {
        let id = materialize(forest, draft, None, next_order, now);
        next_order += 1;
        ids.push(id);
    }
    if let Some(project) = forest.project_mut(project_id) {
        project.roots.extend(ids.iter().cloned());
        project.last_edited = now;
    }
    Some(ids)
}

/// Insert one draft subtree with fresh ids. Children are ordered by position.
/// Returns the id of the subtree root.
pub(crate) fn materialize(
    forest: &mut Forest,
    draft: TaskDraft,
    parent_id: Option<&str>,
    order: i64,
    now: chrono::DateTime<chrono::Utc>,
) -> TaskId {
    let id = Forest::new_id();
    let mut task = Task::new(id.clone(), draft.text, draft.provenance, order, now);
    task.description = draft.description;
    task.parent_id = parent_id.map(str::to_string);
    task.children = draft
        .children
        .into_iter()
        .enumerate()
        .map(|(i, child)| materialize(forest, child, Some(id.as_str()), i as i64, now))
        .collect();
    forest.tasks.insert(id.clone(), task);
    id
}

// ---------------------------------------------------------------------------
// Deletion
// ---------------------------------------------------------------------------

/// Delete a task with its whole subtree, comments and results included.
pub fn delete_task(forest: &mut Forest, id: &str) -> bool {
    if detach(forest, id).is_none() {
        return false;
    }
    for gone in subtree_ids(forest, id) {
        forest.tasks.remove(&gone);
    }
    propagate(forest, None);
    true
}

/// Delete several tasks in one pass per project. Ids below another selected
/// id go with their ancestor; unknown ids are ignored.
/// Returns the number of tasks removed, descendants included.
pub fn delete_selected(forest: &mut Forest, ids: &[TaskId]) -> usize {
    let selected: HashSet<&str> = ids
        .iter()
        .map(String::as_str)
        .filter(|id| forest.contains_task(id))
        .collect();
    if selected.is_empty() {
        return 0;
    }

    let mut doomed: Vec<TaskId> = Vec::new();
    let mut touched_parents: Vec<TaskId> = Vec::new();
    for project in &forest.projects {
        let mut stack: Vec<&TaskId> = project.roots.iter().collect();
        while let Some(id) = stack.pop() {
            let Some(task) = forest.task(id) else {
                continue;
            };
            if selected.contains(id.as_str()) {
                doomed.extend(subtree_ids(forest, id));
                if let Some(parent) = &task.parent_id {
                    touched_parents.push(parent.clone());
                }
                continue;
            }
            stack.extend(task.children.iter());
        }
    }

    let doomed_set: HashSet<TaskId> = doomed.iter().cloned().collect();
    let now = forest.stamp();
    for project in &mut forest.projects {
        let before = project.roots.len();
        project.roots.retain(|r| !doomed_set.contains(r));
        if project.roots.len() != before {
            project.last_edited = now;
        }
    }
    for parent in &touched_parents {
        if let Some(task) = forest.task_mut(parent) {
            task.children.retain(|c| !doomed_set.contains(c));
            task.last_edited = now;
        }
    }
    for id in &doomed_set {
        forest.tasks.remove(id);
    }
    propagate(forest, None);
    doomed_set.len()
}

// ---------------------------------------------------------------------------
// Moves
// ---------------------------------------------------------------------------

/// Move a task and its subtree to another project, landing as its last root.
pub fn move_task_to_project(
    forest: &mut Forest,
    id: &str,
    source_id: &str,
    target_id: &str,
) -> bool {
    if source_id == target_id || forest.project(target_id).is_none() {
        return false;
    }
    if forest.project_of(id).map(|p| p.id.as_str()) != Some(source_id) {
        return false;
    }
    let Some(old_parent) = detach(forest, id) else {
        return false;
    };
    attach_as_root(forest, id, target_id);
    if let Some(parent) = old_parent {
        propagate(forest, Some(&parent));
    }
    propagate(forest, Some(id));
    true
}

/// Promote a nested task to a root of its own project.
pub fn promote_to_root(forest: &mut Forest, project_id: &str, id: &str) -> bool {
    if forest.project_of(id).map(|p| p.id.as_str()) != Some(project_id) {
        return false;
    }
    if forest.task(id).and_then(|t| t.parent_id.as_ref()).is_none() {
        return false;
    }
    let Some(Some(old_parent)) = detach(forest, id) else {
        return false;
    };
    attach_as_root(forest, id, project_id);
    propagate(forest, Some(&old_parent));
    true
}

/// Move a task to `new_index` among its siblings (clamped) and renumber the
/// sibling group's `order` values to 0..n.
pub fn reorder_task(forest: &mut Forest, id: &str, new_index: usize) -> bool {
    let Some(task) = forest.task(id) else {
        return false;
    };
    let siblings: Vec<TaskId> = match &task.parent_id {
        Some(parent) => match forest.task(parent) {
            Some(p) => p.children.clone(),
            None => return false,
        },
        None => match forest.project_of(id) {
            Some(p) => p.roots.clone(),
            None => return false,
        },
    };
    let mut sequence: Vec<TaskId> = forest
        .ordered(&siblings)
        .into_iter()
        .map(|t| t.id.clone())
        .filter(|s| s != id)
        .collect();
    let index = new_index.min(sequence.len());
    sequence.insert(index, id.to_string());

    let now = forest.stamp();
    for (order, sibling) in sequence.iter().enumerate() {
        if let Some(t) = forest.task_mut(sibling)
            && t.order != order as i64
        {
            t.order = order as i64;
            t.last_edited = now;
        }
    }
    true
}

// ---------------------------------------------------------------------------
// Field edits
// ---------------------------------------------------------------------------

/// Merge field changes into a task. Always stamps `last_edited`; status is
/// applied only to leaves and triggers propagation when it changes.
pub fn update_task(forest: &mut Forest, id: &str, patch: TaskPatch) -> bool {
    if !forest.contains_task(id) {
        return false;
    }
    let now = forest.stamp();
    let Some(task) = forest.task_mut(id) else {
        return false;
    };
    if let Some(text) = patch.text {
        task.text = text;
    }
    if let Some(description) = patch.description {
        task.description = description.filter(|d| !d.trim().is_empty());
    }
    let mut status_changed = false;
    if let Some(status) = patch.status
        && task.is_leaf()
    {
        status_changed = task.set_status(status);
    }
    task.last_edited = now;
    if status_changed {
        propagate(forest, Some(id));
    }
    true
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Unlink `id` from its parent's child list or its project's root list.
/// Returns `Some(old_parent)` on success; `None` if `id` is not linked anywhere.
pub(crate) fn detach(forest: &mut Forest, id: &str) -> Option<Option<TaskId>> {
    let parent_id = forest.task(id)?.parent_id.clone();
    let now = forest.stamp();
    match &parent_id {
        Some(parent) => {
            let parent = forest.task_mut(parent)?;
            let before = parent.children.len();
            parent.children.retain(|c| c != id);
            if parent.children.len() == before {
                return None;
            }
            parent.last_edited = now;
        }
        None => {
            let project = forest
                .projects
                .iter_mut()
                .find(|p| p.roots.iter().any(|r| r == id))?;
            project.roots.retain(|r| r != id);
            project.last_edited = now;
        }
    }
    Some(parent_id)
}

/// Link a detached task as the last root of a project.
fn attach_as_root(forest: &mut Forest, id: &str, project_id: &str) {
    let Some(project) = forest.project(project_id) else {
        return;
    };
    let order = forest.max_order(&project.roots) + 1;
    let now = forest.stamp();
    if let Some(task) = forest.task_mut(id) {
        task.parent_id = None;
        task.order = order;
        task.last_edited = now;
    }
    if let Some(project) = forest.project_mut(project_id) {
        project.roots.push(id.to_string());
        project.last_edited = now;
    }
}

/// Drafts for plain-text subtasks created by hand
pub fn manual_drafts(texts: &[String]) -> Vec<TaskDraft> {
    texts.iter().map(|t| TaskDraft::manual(t.as_str())).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
