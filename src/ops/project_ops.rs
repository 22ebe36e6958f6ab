use crate::model::forest::Forest;
use crate::model::project::{Project, UNASSIGNED_ID};

/// Create a project ordered after every existing one (Unassigned aside).
/// Returns the new project's id.
pub fn create_project(forest: &mut Forest, name: &str) -> String {
    let order = forest
        .projects
        .iter()
        .filter(|p| !p.is_unassigned())
        .map(|p| p.order)
        .max()
        .unwrap_or(-1)
        + 1;
    let now = forest.stamp();
    let id = Forest::new_id();
    forest
        .projects
        .push(Project::new(id.clone(), name.trim().to_string(), order, now));
    id
}

/// Rename a project. The Unassigned project keeps its name.
pub fn rename_project(forest: &mut Forest, id: &str, name: &str) -> bool {
    if id == UNASSIGNED_ID || name.trim().is_empty() {
        return false;
    }
    let now = forest.stamp();
    let Some(project) = forest.project_mut(id) else {
        return false;
    };
    project.name = name.trim().to_string();
    project.last_edited = now;
    true
}

pub fn set_project_description(forest: &mut Forest, id: &str, description: Option<String>) -> bool {
    let now = forest.stamp();
    let Some(project) = forest.project_mut(id) else {
        return false;
    };
    project.description = description.filter(|d| !d.trim().is_empty());
    project.last_edited = now;
    true
}

/// Pin or unpin a project. The Unassigned project is always pinned.
pub fn set_pinned(forest: &mut Forest, id: &str, pinned: bool) -> bool {
    if id == UNASSIGNED_ID {
        return false;
    }
    let now = forest.stamp();
    let Some(project) = forest.project_mut(id) else {
        return false;
    };
    project.pinned = pinned;
    project.last_edited = now;
    true
}

/// Delete a project. Its root tasks (with their subtrees) are re-homed as new
/// roots of Unassigned. The Unassigned project itself cannot be deleted.
pub fn delete_project(forest: &mut Forest, id: &str) -> bool {
    if id == UNASSIGNED_ID {
        return false;
    }
    let Some(index) = forest.projects.iter().position(|p| p.id == id) else {
        return false;
    };
    let removed = forest.projects.remove(index);
    forest.ensure_unassigned();

    let mut order = forest
        .project(UNASSIGNED_ID)
        .map(|p| forest.max_order(&p.roots))
        .unwrap_or(-1);
    let now = forest.stamp();
    let rehomed: Vec<String> = forest
        .ordered(&removed.roots)
        .into_iter()
        .map(|t| t.id.clone())
        .collect();
    for root in &rehomed {
        order += 1;
        if let Some(task) = forest.task_mut(root) {
            task.order = order;
            task.last_edited = now;
        }
    }
    if let Some(unassigned) = forest.project_mut(UNASSIGNED_ID) {
        unassigned.roots.extend(rehomed);
        unassigned.last_edited = now;
    }
    true
}
