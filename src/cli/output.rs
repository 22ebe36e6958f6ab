use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::forest::Forest;
use crate::model::project::Project;
use crate::model::task::{Comment, CommentStatus, ExecutionResult, Provenance, Summary, Task, TaskStatus};
use crate::ops::check::{CheckError, CheckResult, CheckWarning};
use crate::ops::history::Snapshot;
use crate::ops::ingest::IngestResult;
use crate::ops::patch::PatchOutcome;
use crate::ops::query::{self, Counts, find_path};
use crate::ops::search::MatchField;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskJson {
    pub id: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TaskStatus,
    pub provenance: Provenance,
    pub order: i64,
    pub last_edited: DateTime<Utc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TaskJson>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDetailJson {
    #[serde(flatten)]
    pub task: TaskJson,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Ancestor ids, root first
    pub path: Vec<String>,
    pub comments: Vec<Comment>,
    pub results: Vec<ExecutionResult>,
    pub summaries: Vec<Summary>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfoJson {
    pub id: String,
    pub name: String,
    pub pinned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub tasks: usize,
    pub leaves: Counts,
}

#[derive(Serialize)]
pub struct ProjectJson {
    #[serde(flatten)]
    pub info: ProjectInfoJson,
    pub roots: Vec<TaskJson>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHitJson {
    pub project_id: String,
    pub task_id: String,
    pub text: String,
    pub field: MatchField,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntryJson {
    pub label: String,
    pub taken_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct HistoryJson {
    pub limit: usize,
    pub undo: Vec<HistoryEntryJson>,
    pub redo: Vec<HistoryEntryJson>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestJson {
    pub root_ids: Vec<String>,
    pub total_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchJson {
    pub target_id: String,
    pub new_child_ids: Vec<String>,
    pub updated_ids: Vec<String>,
    pub skipped_updates: usize,
    pub dropped_changes: usize,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

pub fn task_to_json(forest: &Forest, task: &Task) -> TaskJson {
    TaskJson {
        id: task.id.clone(),
        text: task.text.clone(),
        description: task.description.clone(),
        status: task.status,
        provenance: task.provenance,
        order: task.order,
        last_edited: task.last_edited,
        children: forest
            .ordered(&task.children)
            .into_iter()
            .map(|child| task_to_json(forest, child))
            .collect(),
    }
}

pub fn task_detail_to_json(forest: &Forest, task: &Task) -> TaskDetailJson {
    let path = find_path(forest, &task.id);
    TaskDetailJson {
        task: task_to_json(forest, task),
        project_id: forest.project_of(&task.id).map(|p| p.id.clone()),
        path: path[..path.len().saturating_sub(1)]
            .iter()
            .map(|t| t.id.clone())
            .collect(),
        comments: task.comments.clone(),
        results: task.results.clone(),
        summaries: task.summaries.clone(),
    }
}

pub fn project_info_to_json(forest: &Forest, project: &Project) -> ProjectInfoJson {
    ProjectInfoJson {
        id: project.id.clone(),
        name: project.name.clone(),
        pinned: project.pinned,
        description: project.description.clone(),
        tasks: query::project_task_count(forest, &project.id),
        leaves: query::count_leaves_recursive(forest, &project.roots),
    }
}

pub fn project_to_json(forest: &Forest, project: &Project) -> ProjectJson {
    ProjectJson {
        info: project_info_to_json(forest, project),
        roots: forest
            .ordered(&project.roots)
            .into_iter()
            .map(|root| task_to_json(forest, root))
            .collect(),
    }
}

pub fn history_entry_to_json(snapshot: &Snapshot) -> HistoryEntryJson {
    HistoryEntryJson {
        label: snapshot.label.clone(),
        taken_at: snapshot.taken_at,
    }
}

pub fn ingest_to_json(result: &IngestResult) -> IngestJson {
    IngestJson {
        root_ids: result.root_ids.clone(),
        total_count: result.total_count,
    }
}

pub fn patch_to_json(outcome: &PatchOutcome) -> PatchJson {
    PatchJson {
        target_id: outcome.target_id.clone(),
        new_child_ids: outcome.new_child_ids.clone(),
        updated_ids: outcome.updated_ids.clone(),
        skipped_updates: outcome.skipped_updates,
        dropped_changes: outcome.dropped_changes,
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

/// First 8 characters of an id; any unique prefix resolves back to the task
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((i, _)) => &id[..i],
        None => id,
    }
}

/// Format a single task as a one-line summary
pub fn format_task_line(task: &Task) -> String {
    let marker = match task.provenance {
        Provenance::Ai => " ~",
        Provenance::Manual => "",
    };
    format!(
        "[{}] {} {}{}",
        task.status.checkbox_char(),
        short_id(&task.id),
        task.text,
        marker
    )
}

/// Format a task with its children, indented
pub fn format_task_tree(forest: &Forest, task: &Task, indent: usize) -> Vec<String> {
    let mut lines = vec![format!("{}{}", "  ".repeat(indent), format_task_line(task))];
    for child in forest.ordered(&task.children) {
        lines.extend(format_task_tree(forest, child, indent + 1));
    }
    lines
}

pub fn format_project_header(project: &Project) -> String {
    format!("== {} ({}) ==", project.name, project.id)
}

/// One line of the `projects` listing
pub fn format_project_info(forest: &Forest, project: &Project) -> String {
    let leaves = query::count_leaves_recursive(forest, &project.roots);
    let pin = if project.pinned { " *" } else { "" };
    format!(
        "  {} ({})  {} tasks, {}/{} done{}",
        project.name,
        project.id,
        query::project_task_count(forest, &project.id),
        leaves.completed,
        leaves.total,
        pin
    )
}

/// A project header followed by its task trees
pub fn format_project_listing(forest: &Forest, project: &Project) -> Vec<String> {
    let mut lines = vec![format_project_header(project)];
    if let Some(description) = &project.description {
        lines.push(format!("> {}", description));
    }
    lines.push(String::new());
    for root in forest.ordered(&project.roots) {
        lines.extend(format_task_tree(forest, root, 0));
    }
    lines
}

fn comment_status_label(status: CommentStatus) -> &'static str {
    match status {
        CommentStatus::Active => "",
        CommentStatus::Accepted => " [accepted]",
        CommentStatus::Rejected => " [rejected]",
    }
}

fn format_comment(comment: &Comment, depth: usize, lines: &mut Vec<String>) {
    let edited = if comment.edited { " (edited)" } else { "" };
    lines.push(format!(
        "{}- {} {}{}{}",
        "  ".repeat(depth + 1),
        short_id(&comment.id),
        comment.text,
        comment_status_label(comment.status),
        edited
    ));
    for reply in &comment.replies {
        format_comment(reply, depth + 1, lines);
    }
}

/// Format detailed task view
pub fn format_task_detail(forest: &Forest, task: &Task) -> Vec<String> {
    let mut lines = vec![format!(
        "[{}] {} {}",
        task.status.checkbox_char(),
        task.id,
        task.text
    )];

    if let Some(project) = forest.project_of(&task.id) {
        lines.push(format!("project: {} ({})", project.name, project.id));
    }
    let path = find_path(forest, &task.id);
    if path.len() > 1 {
        let parents: Vec<&str> = path[..path.len() - 1].iter().map(|t| t.text.as_str()).collect();
        lines.push(format!("within: {}", parents.join(" > ")));
    }
    lines.push(format!("status: {}", task.status.as_str()));
    if task.provenance == Provenance::Ai {
        lines.push("provenance: ai".to_string());
    }
    lines.push(format!("edited: {}", task.last_edited.format("%Y-%m-%d %H:%M:%S")));

    if let Some(description) = &task.description {
        lines.push("description:".to_string());
        for line in description.lines() {
            lines.push(format!("  {}", line));
        }
    }

    if !task.children.is_empty() {
        lines.push(String::new());
        lines.push("subtasks:".to_string());
        for child in forest.ordered(&task.children) {
            lines.extend(format_task_tree(forest, child, 1));
        }
    }

    if !task.comments.is_empty() {
        lines.push(String::new());
        lines.push("comments:".to_string());
        for comment in &task.comments {
            format_comment(comment, 0, &mut lines);
        }
    }

    if !task.results.is_empty() {
        lines.push(String::new());
        lines.push("results:".to_string());
        for result in &task.results {
            lines.push(format!("  {}:", result.created.format("%Y-%m-%d %H:%M")));
            for line in result.output.lines() {
                lines.push(format!("    {}", line));
            }
        }
    }

    if !task.summaries.is_empty() {
        lines.push(String::new());
        lines.push("summaries:".to_string());
        for summary in &task.summaries {
            lines.push(format!(
                "  {}: {}",
                summary.created.format("%Y-%m-%d %H:%M"),
                summary.text
            ));
        }
    }

    lines
}

pub fn format_patch_outcome(outcome: &PatchOutcome) -> Vec<String> {
    let mut lines = vec![format!(
        "replaced {} ({} new subtasks)",
        outcome.target_id,
        outcome.new_child_ids.len()
    )];
    for id in &outcome.updated_ids {
        lines.push(format!("updated {}", id));
    }
    if outcome.skipped_updates > 0 {
        lines.push(format!("skipped {} unreadable or unknown-task updates", outcome.skipped_updates));
    }
    if outcome.dropped_changes > 0 {
        lines.push(format!("dropped {} changes (unreadable or outside text/description)", outcome.dropped_changes));
    }
    lines
}

pub fn format_check(result: &CheckResult) -> Vec<String> {
    let mut lines = Vec::new();
    if !result.errors.is_empty() {
        lines.push("Errors:".to_string());
        for err in &result.errors {
            lines.push(format!("  {}", describe_check_error(err)));
        }
    }
    if !result.warnings.is_empty() {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push("Warnings:".to_string());
        for warning in &result.warnings {
            let text = match warning {
                CheckWarning::EmptyText { task_id } => format!("{} has empty text", task_id),
                CheckWarning::DuplicateProjectName { name } => {
                    format!("more than one project is named \"{}\"", name)
                }
            };
            lines.push(format!("  {}", text));
        }
    }
    if result.valid && result.warnings.is_empty() {
        lines.push("ok".to_string());
    }
    lines
}

fn describe_check_error(err: &CheckError) -> String {
    match err {
        CheckError::MissingUnassigned => "the Unassigned project is missing".to_string(),
        CheckError::DuplicateId {
            task_id,
            occurrences,
        } => format!("{} is reachable {} times", task_id, occurrences),
        CheckError::MissingTask {
            container_id,
            task_id,
        } => format!("{} lists missing task {}", container_id, task_id),
        CheckError::ParentMismatch {
            task_id,
            expected,
            found,
        } => format!(
            "{} has parent {} but sits under {}",
            task_id,
            found.as_deref().unwrap_or("(none)"),
            expected.as_deref().unwrap_or("(root)")
        ),
        CheckError::OrphanTask { task_id } => format!("{} is not reachable from any project", task_id),
        CheckError::StatusNotDerived {
            task_id,
            expected,
            found,
        } => format!(
            "{} is {} but its children say {}",
            task_id,
            found.as_str(),
            expected.as_str()
        ),
        CheckError::CompletedMismatch { task_id } => {
            format!("{} has a completed flag that disagrees with its status", task_id)
        }
    }
}

/// Parse a status string into TaskStatus
pub fn parse_task_status(s: &str) -> Result<TaskStatus, String> {
    TaskStatus::parse_status(s)
        .ok_or_else(|| format!("unknown status '{}' (expected: todo, inprogress, done)", s))
}

pub fn parse_comment_status(s: &str) -> Result<CommentStatus, String> {
    CommentStatus::parse_status(s).ok_or_else(|| {
        format!(
            "unknown comment status '{}' (expected: active, accepted, rejected)",
            s
        )
    })
}
