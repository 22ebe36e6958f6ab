use indexmap::IndexMap;
use serde::Serialize;

use crate::model::forest::Forest;
use crate::model::project::UNASSIGNED_ID;
use crate::model::task::TaskStatus;
use crate::ops::status::derive_status;

/// Structured result from `scopes check`, suitable for --json output.
#[derive(Debug, Default, Serialize)]
pub struct CheckResult {
    pub valid: bool,
    pub errors: Vec<CheckError>,
    pub warnings: Vec<CheckWarning>,
}

/// A broken forest invariant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum CheckError {
    /// The Unassigned project is absent
    #[serde(rename = "missing_unassigned")]
    MissingUnassigned,
    /// A task is reachable more than once
    #[serde(rename = "duplicate_id")]
    DuplicateId { task_id: String, occurrences: usize },
    /// A children or roots list names an id with no task behind it
    #[serde(rename = "missing_task")]
    MissingTask { container_id: String, task_id: String },
    /// `parentId` disagrees with where the task actually sits
    #[serde(rename = "parent_mismatch")]
    ParentMismatch {
        task_id: String,
        expected: Option<String>,
        found: Option<String>,
    },
    /// Stored but not reachable from any project
    #[serde(rename = "orphan_task")]
    OrphanTask { task_id: String },
    /// A parent whose status does not follow from its children
    #[serde(rename = "status_not_derived")]
    StatusNotDerived {
        task_id: String,
        expected: TaskStatus,
        found: TaskStatus,
    },
    /// `completed` does not mirror `status == done`
    #[serde(rename = "completed_mismatch")]
    CompletedMismatch { task_id: String },
}

/// Something odd but harmless.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum CheckWarning {
    #[serde(rename = "empty_text")]
    EmptyText { task_id: String },
    #[serde(rename = "duplicate_project_name")]
    DuplicateProjectName { name: String },
}

/// Validate every structural and status invariant of a forest.
///
/// Read-only. Checks performed:
/// 1. Unassigned exists
/// 2. Every id in a roots/children list resolves, exactly once
/// 3. `parentId` matches the actual parent (absent for roots)
/// 4. No stored task is unreachable
/// 5. Parents carry the derived status and `completed` mirrors status
pub fn check_forest(forest: &Forest) -> CheckResult {
    let mut result = CheckResult::default();

    if forest.project(UNASSIGNED_ID).is_none() {
        result.errors.push(CheckError::MissingUnassigned);
    }

    let mut seen: IndexMap<String, usize> = IndexMap::new();
    for project in &forest.projects {
        for root in &project.roots {
            walk(forest, &project.id, root, None, &mut seen, &mut result);
        }
    }

    for (task_id, count) in &seen {
        if *count > 1 {
            result.errors.push(CheckError::DuplicateId {
                task_id: task_id.clone(),
                occurrences: *count,
            });
        }
    }

    let mut orphans: Vec<&String> = forest
        .tasks
        .keys()
        .filter(|id| !seen.contains_key(*id))
        .collect();
    orphans.sort();
    for id in orphans {
        result.errors.push(CheckError::OrphanTask {
            task_id: id.clone(),
        });
    }

    let mut names: IndexMap<&str, usize> = IndexMap::new();
    for project in &forest.projects {
        *names.entry(project.name.as_str()).or_default() += 1;
    }
    for (name, count) in names {
        if count > 1 {
            result.warnings.push(CheckWarning::DuplicateProjectName {
                name: name.to_string(),
            });
        }
    }

    result.valid = result.errors.is_empty();
    result
}

fn walk(
    forest: &Forest,
    container_id: &str,
    id: &str,
    parent: Option<&str>,
    seen: &mut IndexMap<String, usize>,
    result: &mut CheckResult,
) {
    let Some(task) = forest.task(id) else {
        result.errors.push(CheckError::MissingTask {
            container_id: container_id.to_string(),
            task_id: id.to_string(),
        });
        return;
    };

    let count = seen.entry(id.to_string()).or_default();
    *count += 1;
    if *count > 1 {
        // Already walked; descending again could loop forever
        return;
    }

    if task.parent_id.as_deref() != parent {
        result.errors.push(CheckError::ParentMismatch {
            task_id: id.to_string(),
            expected: parent.map(str::to_string),
            found: task.parent_id.clone(),
        });
    }
    if task.completed != (task.status == TaskStatus::Done) {
        result.errors.push(CheckError::CompletedMismatch {
            task_id: id.to_string(),
        });
    }
    if task.text.trim().is_empty() {
        result.warnings.push(CheckWarning::EmptyText {
            task_id: id.to_string(),
        });
    }

    let expected = derive_status(
        task.children
            .iter()
            .filter_map(|c| forest.task(c))
            .map(|c| c.status),
    );
    if let Some(expected) = expected
        && expected != task.status
    {
        result.errors.push(CheckError::StatusNotDerived {
            task_id: id.to_string(),
            expected,
            found: task.status,
        });
    }

    for child in &task.children {
        walk(forest, id, child, Some(id), seen, result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::query::fixtures::sample_forest;

    #[test]
    fn sample_forest_is_valid() {
        let result = check_forest(&sample_forest());
        assert!(result.valid, "{:?}", result.errors);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn detects_dangling_child() {
        let mut forest = sample_forest();
        forest.task_mut("a").unwrap().children.push("ghost".into());
        let result = check_forest(&forest);
        assert!(!result.valid);
        assert_eq!(
            result.errors,
            vec![CheckError::MissingTask {
                container_id: "a".into(),
                task_id: "ghost".into()
            }]
        );
    }

    #[test]
    fn detects_wrong_parent_pointer() {
        let mut forest = sample_forest();
        forest.task_mut("a2").unwrap().parent_id = Some("b".into());
        let result = check_forest(&forest);
        assert!(result.errors.contains(&CheckError::ParentMismatch {
            task_id: "a2".into(),
            expected: Some("a".into()),
            found: Some("b".into()),
        }));
    }

    #[test]
    fn detects_orphan_and_duplicate() {
        let mut forest = sample_forest();
        forest.task_mut("a").unwrap().children.retain(|c| c != "a2");
        forest.task_mut("b").unwrap().children.push("a1x".into());
        let result = check_forest(&forest);
        assert!(result.errors.contains(&CheckError::OrphanTask {
            task_id: "a2".into()
        }));
        assert!(result.errors.contains(&CheckError::DuplicateId {
            task_id: "a1x".into(),
            occurrences: 2
        }));
    }

    #[test]
    fn detects_underived_status() {
        let mut forest = sample_forest();
        forest.task_mut("a1x").unwrap().set_status(TaskStatus::Done);
        let result = check_forest(&forest);
        assert!(result.errors.contains(&CheckError::StatusNotDerived {
            task_id: "a1".into(),
            expected: TaskStatus::InProgress,
            found: TaskStatus::Todo,
        }));
    }

    #[test]
    fn detects_completed_mismatch_and_missing_unassigned() {
        let mut forest = sample_forest();
        forest.task_mut("b").unwrap().completed = true;
        forest.projects.retain(|p| !p.is_unassigned());
        let result = check_forest(&forest);
        assert!(result.errors.contains(&CheckError::MissingUnassigned));
        assert!(result.errors.contains(&CheckError::CompletedMismatch {
            task_id: "b".into()
        }));
    }

    #[test]
    fn json_output_is_tagged() {
        let mut forest = sample_forest();
        forest.task_mut("b").unwrap().completed = true;
        let json = serde_json::to_value(check_forest(&forest)).unwrap();
        assert_eq!(json["valid"], false);
        assert_eq!(json["errors"][0]["type"], "completed_mismatch");
    }
}
