//! Derived status rollup.
//!
//! A task with children has a status computed from them: `done` iff every
//! child is done, `inprogress` iff any child is in progress or done, else
//! `todo`. Leaves keep whatever status they were given.

use crate::model::forest::Forest;
use crate::model::task::TaskStatus;

/// Status a parent must have given its children's statuses.
/// Returns `None` for an empty list: leaves are not derived.
pub fn derive_status<I>(children: I) -> Option<TaskStatus>
where
    I: IntoIterator<Item = TaskStatus>,
{
    let mut any = false;
    let mut all_done = true;
    let mut any_started = false;
    for status in children {
        any = true;
        match status {
            TaskStatus::Done => any_started = true,
            TaskStatus::InProgress => {
                any_started = true;
                all_done = false;
            }
            TaskStatus::Todo => all_done = false,
        }
    }
    if !any {
        return None;
    }
    Some(if all_done {
        TaskStatus::Done
    } else if any_started {
        TaskStatus::InProgress
    } else {
        TaskStatus::Todo
    })
}

/// Recompute one task from its current children. `last_edited` moves only if
/// the status actually changed. Returns true on change.
fn recompute(forest: &mut Forest, id: &str) -> bool {
    let Some(task) = forest.task(id) else {
        return false;
    };
    let target = derive_status(
        task.children
            .iter()
            .filter_map(|c| forest.task(c))
            .map(|c| c.status),
    )
    .unwrap_or(task.status);
    let status_changes = target != task.status;
    let mirror_stale = task.completed != (target == TaskStatus::Done);
    if !status_changes && !mirror_stale {
        return false;
    }
    let now = status_changes.then(|| forest.stamp());
    let Some(task) = forest.task_mut(id) else {
        return false;
    };
    task.set_status(target);
    if let Some(now) = now {
        task.last_edited = now;
    }
    status_changes
}

/// Re-derive statuses after a mutation.
///
/// With `Some(id)`, recomputes `id` itself and then each ancestor bottom-up,
/// stopping at the container root. With `None`, recomputes every task that
/// has children across all projects, deepest first.
///
/// Returns the number of tasks whose status changed.
pub fn propagate(forest: &mut Forest, changed: Option<&str>) -> usize {
    match changed {
        Some(id) => propagate_ancestors(forest, id),
        None => propagate_all(forest),
    }
}

fn propagate_ancestors(forest: &mut Forest, id: &str) -> usize {
    let mut changed = 0;
    let mut current = Some(id.to_string());
    while let Some(id) = current {
        if recompute(forest, &id) {
            changed += 1;
        }
        current = forest.task(&id).and_then(|t| t.parent_id.clone());
    }
    changed
}

fn propagate_all(forest: &mut Forest) -> usize {
    // Post-order over every project so children settle before their parents
    let mut post_order = Vec::new();
    for project in &forest.projects {
        let mut stack: Vec<(String, bool)> =
            project.roots.iter().rev().map(|r| (r.clone(), false)).collect();
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                post_order.push(id);
                continue;
            }
            if let Some(task) = forest.task(&id) {
                stack.push((id.clone(), true));
                stack.extend(task.children.iter().rev().map(|c| (c.clone(), false)));
            }
        }
    }
    post_order
        .iter()
        .filter(|id| recompute(forest, id))
        .count()
}
