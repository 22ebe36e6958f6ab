use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque task identity, unique across every project in a forest
pub type TaskId = String;

/// Task status. Leaves set it freely; parents derive it from their children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    /// The character used inside the checkbox `[ ]` in text output
    pub fn checkbox_char(self) -> char {
        match self {
            TaskStatus::Todo => ' ',
            TaskStatus::InProgress => '>',
            TaskStatus::Done => 'x',
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "inprogress",
            TaskStatus::Done => "done",
        }
    }

    /// Parse a user-supplied status name
    pub fn parse_status(s: &str) -> Option<TaskStatus> {
        match s.trim().to_ascii_lowercase().as_str() {
            "todo" | "open" => Some(TaskStatus::Todo),
            "inprogress" | "in-progress" | "in_progress" | "active" | "doing" => {
                Some(TaskStatus::InProgress)
            }
            "done" | "complete" | "completed" => Some(TaskStatus::Done),
            _ => None,
        }
    }
}

/// Where a task came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Ai,
    #[default]
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentStatus {
    #[default]
    Active,
    Accepted,
    Rejected,
}

impl CommentStatus {
    pub fn parse_status(s: &str) -> Option<CommentStatus> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Some(CommentStatus::Active),
            "accepted" | "accept" => Some(CommentStatus::Accepted),
            "rejected" | "reject" => Some(CommentStatus::Rejected),
            _ => None,
        }
    }
}

/// A threaded comment. Replies are owned by their parent comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub status: CommentStatus,
    #[serde(default)]
    pub edited: bool,
    #[serde(default)]
    pub replies: Vec<Comment>,
}

impl Comment {
    pub fn new(id: String, text: String, timestamp: DateTime<Utc>) -> Self {
        Comment {
            id,
            text,
            timestamp,
            status: CommentStatus::Active,
            edited: false,
            replies: Vec::new(),
        }
    }

    /// Total number of comments in this thread, including this one
    pub fn thread_len(&self) -> usize {
        1 + self.replies.iter().map(Comment::thread_len).sum::<usize>()
    }
}

/// Output captured from running a task. Never edited once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub id: String,
    pub output: String,
    pub created: DateTime<Utc>,
}

/// A point-in-time summary. Never edited once appended; lists are newest-first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub id: String,
    pub text: String,
    pub created: DateTime<Utc>,
}

/// One node in the work-item tree.
///
/// `children` is the ownership edge; `parent_id` is only a back-reference kept
/// in sync by the operations in `ops::task_ops`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Mirrors `status == Done`
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub children: Vec<TaskId>,
    #[serde(default)]
    pub order: i64,
    pub last_edited: DateTime<Utc>,
    #[serde(default)]
    pub parent_id: Option<TaskId>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub results: Vec<ExecutionResult>,
    #[serde(default)]
    pub summaries: Vec<Summary>,
    #[serde(default)]
    pub provenance: Provenance,
}

impl Task {
    /// Create a new leaf task in the `todo` state
    pub fn new(
        id: TaskId,
        text: String,
        provenance: Provenance,
        order: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Task {
            id,
            text,
            description: None,
            completed: false,
            status: TaskStatus::Todo,
            children: Vec::new(),
            order,
            last_edited: now,
            parent_id: None,
            comments: Vec::new(),
            results: Vec::new(),
            summaries: Vec::new(),
            provenance,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Set status and keep `completed` in step. Returns true if anything changed.
    pub fn set_status(&mut self, status: TaskStatus) -> bool {
        let completed = status == TaskStatus::Done;
        if self.status == status && self.completed == completed {
            return false;
        }
        self.status = status;
        self.completed = completed;
        true
    }
}

/// A new subtree to be inserted into a forest. Ids, orders and parent links
/// are assigned at insertion time.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDraft {
    pub text: String,
    pub description: Option<String>,
    pub provenance: Provenance,
    pub children: Vec<TaskDraft>,
}

impl TaskDraft {
    pub fn manual(text: impl Into<String>) -> Self {
        TaskDraft {
            text: text.into(),
            description: None,
            provenance: Provenance::Manual,
            children: Vec::new(),
        }
    }

    /// Number of tasks this draft will create, including itself
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(TaskDraft::len).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_status_keeps_completed_in_step() {
        let mut task = Task::new("a".into(), "A".into(), Provenance::Manual, 0, Utc::now());
        assert!(!task.completed);
        assert!(task.set_status(TaskStatus::Done));
        assert!(task.completed);
        assert!(!task.set_status(TaskStatus::Done));
        assert!(task.set_status(TaskStatus::InProgress));
        assert!(!task.completed);
    }

    #[test]
    fn set_status_repairs_stale_completed_flag() {
        let mut task = Task::new("a".into(), "A".into(), Provenance::Manual, 0, Utc::now());
        task.completed = true;
        assert!(task.set_status(TaskStatus::Todo));
        assert!(!task.completed);
    }

    #[test]
    fn parse_status_accepts_aliases() {
        assert_eq!(TaskStatus::parse_status("done"), Some(TaskStatus::Done));
        assert_eq!(
            TaskStatus::parse_status("In-Progress"),
            Some(TaskStatus::InProgress)
        );
        assert_eq!(TaskStatus::parse_status("todo"), Some(TaskStatus::Todo));
        assert_eq!(TaskStatus::parse_status("blocked"), None);
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"inprogress\"");
        let back: TaskStatus = serde_json::from_str("\"done\"").unwrap();
        assert_eq!(back, TaskStatus::Done);
    }

    #[test]
    fn draft_len_counts_subtree() {
        let mut draft = TaskDraft::manual("root");
        let mut child = TaskDraft::manual("child");
        child.children.push(TaskDraft::manual("grandchild"));
        draft.children.push(child);
        draft.children.push(TaskDraft::manual("sibling"));
        assert_eq!(draft.len(), 4);
    }
}
