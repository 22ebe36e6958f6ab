use crate::model::forest::Forest;
use crate::ops::query::{find_path, for_each_task, subtree_ids};

pub const OUTLINE_SYSTEM: &str = "You plan work as outlines. Reply with one JSON object that has \
exactly one key, the plan's title. Values are nested objects, arrays of strings, or strings. \
Keys are short human-readable titles without underscores. No commentary.";

pub const PATCH_SYSTEM: &str = "You revise plans. Reply with one JSON object with two keys: \
\"replacement\", an object with exactly one key (the revised task title) holding its new \
subtasks, and \"updates\", a list of {\"id\", \"changes\": [{\"op\": \"replace\", \"path\": \
\"/text\" or \"/description\", \"value\"}]} for other listed tasks that should change. \
No commentary.";

/// Prompt asking for an outline of subtasks for `task_id`
pub fn expand_prompt(forest: &Forest, task_id: &str, instructions: Option<&str>) -> Option<String> {
    let task = forest.task(task_id)?;
    let mut out = String::new();
    push_context(forest, task_id, &mut out);
    out.push_str(&format!("Task: {}\n", task.text));
    if let Some(description) = &task.description {
        out.push_str(&format!("Details: {}\n", description));
    }
    if !task.children.is_empty() {
        out.push_str("Existing subtasks (do not repeat them):\n");
        for child in forest.ordered(&task.children) {
            out.push_str(&format!("- {}\n", child.text));
        }
    }
    out.push_str("\nBreak this task into concrete subtasks.\n");
    push_instructions(instructions, &mut out);
    Some(out)
}

/// Prompt asking for a replacement of `task_id`'s subtree plus field updates
/// to other tasks in the same project, which are listed with their ids.
pub fn regenerate_prompt(forest: &Forest, task_id: &str, instructions: Option<&str>) -> Option<String> {
    let task = forest.task(task_id)?;
    let mut out = String::new();
    push_context(forest, task_id, &mut out);
    out.push_str("Task to rewrite, with its current subtasks:\n");
    for_each_task(forest, std::slice::from_ref(&task.id), &mut |t, depth| {
        out.push_str(&format!("{}- {}\n", "  ".repeat(depth), t.text));
    });

    if let Some(project) = forest.project_of(task_id) {
        let rewritten = subtree_ids(forest, task_id);
        let mut others = String::new();
        for_each_task(forest, &project.roots, &mut |t, depth| {
            if !rewritten.contains(&t.id) {
                others.push_str(&format!("{}- [{}] {}\n", "  ".repeat(depth), t.id, t.text));
            }
        });
        if !others.is_empty() {
            out.push_str("\nOther tasks in the project (id in brackets):\n");
            out.push_str(&others);
        }
    }
    out.push_str("\nRewrite the task and its subtasks. Update other tasks only if they must change to stay consistent.\n");
    push_instructions(instructions, &mut out);
    Some(out)
}

fn push_context(forest: &Forest, task_id: &str, out: &mut String) {
    if let Some(project) = forest.project_of(task_id) {
        out.push_str(&format!("Project: {}\n", project.name));
    }
    let path = find_path(forest, task_id);
    if path.len() > 1 {
        let parents: Vec<&str> = path[..path.len() - 1].iter().map(|t| t.text.as_str()).collect();
        out.push_str(&format!("Within: {}\n", parents.join(" > ")));
    }
}

fn push_instructions(instructions: Option<&str>, out: &mut String) {
    if let Some(extra) = instructions.map(str::trim).filter(|s| !s.is_empty()) {
        out.push_str(&format!("Additional instructions: {}\n", extra));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::query::fixtures::sample_forest;
    use insta::assert_snapshot;

    #[test]
    fn expand_prompt_includes_path_and_children() {
        let forest = sample_forest();
        let prompt = expand_prompt(&forest, "a1", Some("keep it short")).unwrap();
        assert_snapshot!(prompt, @r"
        Project: Work
        Within: A
        Task: A1
        Existing subtasks (do not repeat them):
        - A1X
        - A1Y

        Break this task into concrete subtasks.
        Additional instructions: keep it short
        ");
    }

    #[test]
    fn regenerate_prompt_lists_other_tasks_with_ids() {
        let forest = sample_forest();
        let prompt = regenerate_prompt(&forest, "a1", None).unwrap();
        assert!(prompt.contains("Task to rewrite, with its current subtasks:\n- A1\n  - A1X\n  - A1Y\n"));
        assert!(prompt.contains("- [b] B\n"));
        assert!(!prompt.contains("[a1]"));
        assert!(!prompt.contains("[a1x]"));
        assert!(prompt.contains("- [a] A\n"));
    }

    #[test]
    fn unknown_task_has_no_prompt() {
        let forest = sample_forest();
        assert!(expand_prompt(&forest, "zz", None).is_none());
        assert!(regenerate_prompt(&forest, "zz", None).is_none());
    }
}
