//! Read-only queries over a forest. Nothing here mutates.

use serde::Serialize;

use crate::model::forest::Forest;
use crate::model::task::{Task, TaskId, TaskStatus};

/// Completion tally
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub completed: usize,
    pub total: usize,
}

/// Tasks from a container root down to `id`, inclusive. Empty if `id` is unknown.
pub fn find_path<'a>(forest: &'a Forest, id: &str) -> Vec<&'a Task> {
    let mut path = Vec::new();
    let mut current = forest.task(id);
    while let Some(task) = current {
        path.push(task);
        current = task.parent_id.as_deref().and_then(|p| forest.task(p));
    }
    path.reverse();
    path
}

pub fn find_node<'a>(forest: &'a Forest, id: &str) -> Option<&'a Task> {
    forest.task(id)
}

/// Count direct children by `done` status
pub fn count_direct_children(forest: &Forest, children: &[TaskId]) -> Counts {
    let mut counts = Counts::default();
    for task in children.iter().filter_map(|id| forest.task(id)) {
        counts.total += 1;
        if task.status == TaskStatus::Done {
            counts.completed += 1;
        }
    }
    counts
}

/// Count only leaves as units of completion, recursing through parents
pub fn count_leaves_recursive(forest: &Forest, tasks: &[TaskId]) -> Counts {
    let mut counts = Counts::default();
    for task in tasks.iter().filter_map(|id| forest.task(id)) {
        if task.is_leaf() {
            counts.total += 1;
            if task.status == TaskStatus::Done {
                counts.completed += 1;
            }
        } else {
            let sub = count_leaves_recursive(forest, &task.children);
            counts.total += sub.total;
            counts.completed += sub.completed;
        }
    }
    counts
}

/// Visit every task under `ids` in pre-order, siblings in display order.
pub fn for_each_task<'a>(forest: &'a Forest, ids: &[TaskId], f: &mut dyn FnMut(&'a Task, usize)) {
    walk(forest, ids, 0, f);
}

fn walk<'a>(forest: &'a Forest, ids: &[TaskId], depth: usize, f: &mut dyn FnMut(&'a Task, usize)) {
    for task in forest.ordered(ids) {
        f(task, depth);
        walk(forest, &task.children, depth + 1, f);
    }
}

/// Ids of `id` and everything below it, pre-order
pub fn subtree_ids(forest: &Forest, id: &str) -> Vec<TaskId> {
    let mut ids = Vec::new();
    let mut stack = vec![id.to_string()];
    while let Some(next) = stack.pop() {
        if let Some(task) = forest.task(&next) {
            stack.extend(task.children.iter().rev().cloned());
            ids.push(next);
        }
    }
    ids
}

/// Number of tasks reachable from a project's roots
pub fn project_task_count(forest: &Forest, project_id: &str) -> usize {
    forest
        .project(project_id)
        .map(|p| p.roots.iter().map(|r| subtree_ids(forest, r).len()).sum())
        .unwrap_or(0)
}

/// Resolve a full id or a unique id prefix
pub fn resolve_id(forest: &Forest, prefix: &str) -> Option<TaskId> {
    if forest.contains_task(prefix) {
        return Some(prefix.to_string());
    }
    if prefix.is_empty() {
        return None;
    }
    let mut matches = forest.tasks.keys().filter(|id| id.starts_with(prefix));
    let first = matches.next()?;
    if matches.next().is_some() {
        return None;
    }
    Some(first.clone())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::model::forest::Forest;
    use crate::model::project::{Project, UNASSIGNED_ID};
    use crate::model::task::{Provenance, Task, TaskStatus};

    /// Insert a task with a readable id under `parent` (or as a root of `project`).
    pub fn put(
        forest: &mut Forest,
        project: &str,
        parent: Option<&str>,
        id: &str,
        status: TaskStatus,
    ) {
        let siblings = match parent {
            Some(p) => forest.task(p).unwrap().children.clone(),
            None => forest.project(project).unwrap().roots.clone(),
        };
        let order = forest.max_order(&siblings) + 1;
        let now = forest.stamp();
        let mut task = Task::new(id.into(), id.to_uppercase(), Provenance::Manual, order, now);
        task.set_status(status);
        task.parent_id = parent.map(str::to_string);
        forest.tasks.insert(id.into(), task);
        match parent {
            Some(p) => forest.task_mut(p).unwrap().children.push(id.into()),
            None => forest.project_mut(project).unwrap().roots.push(id.into()),
        }
    }

    /// Two projects:
    ///
    /// ```text
    /// work:        a ─┬─ a1 ─┬─ a1x
    ///                 │      └─ a1y
    ///                 └─ a2
    ///              b
    /// unassigned:  c
    /// ```
    pub fn sample_forest() -> Forest {
        let mut forest = Forest::new();
        let now = forest.stamp();
        forest
            .projects
            .push(Project::new("work".into(), "Work".into(), 0, now));
        put(&mut forest, "work", None, "a", TaskStatus::Todo);
        put(&mut forest, "work", Some("a"), "a1", TaskStatus::Todo);
        put(&mut forest, "work", Some("a1"), "a1x", TaskStatus::Todo);
        put(&mut forest, "work", Some("a1"), "a1y", TaskStatus::Todo);
        put(&mut forest, "work", Some("a"), "a2", TaskStatus::Todo);
        put(&mut forest, "work", None, "b", TaskStatus::Todo);
        put(&mut forest, UNASSIGNED_ID, None, "c", TaskStatus::Todo);
        forest
    }
}
