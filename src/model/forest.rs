use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::project::{Project, UNASSIGNED_ID};
use super::task::{Task, TaskId};

/// Every project and every task in the workspace.
///
/// Tasks live in a flat persistent map keyed by id; parent/child links are id
/// lists. Cloning a forest is cheap and later edits copy only the touched
/// entries, so history snapshots and patch scratch copies never alias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forest {
    pub projects: Vec<Project>,
    pub tasks: im::HashMap<TaskId, Task>,
    /// Last timestamp handed out by `stamp`
    #[serde(default = "epoch")]
    clock: DateTime<Utc>,
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::default()
}

impl Default for Forest {
    fn default() -> Self {
        Self::new()
    }
}

impl Forest {
    /// An empty forest holding only the Unassigned project
    pub fn new() -> Self {
        let mut forest = Forest {
            projects: Vec::new(),
            tasks: im::HashMap::new(),
            clock: epoch(),
        };
        let now = forest.stamp();
        forest.projects.push(Project::unassigned(now));
        forest
    }

    /// Re-add the Unassigned project if a loaded forest lacks it
    pub fn ensure_unassigned(&mut self) {
        if self.project(UNASSIGNED_ID).is_none() {
            let now = self.stamp();
            self.projects.push(Project::unassigned(now));
        }
    }

    /// A strictly increasing timestamp for `last_edited` fields
    pub fn stamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        self.clock = if now > self.clock {
            now
        } else {
            self.clock + Duration::milliseconds(1)
        };
        self.clock
    }

    pub fn new_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    pub fn project(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn project_mut(&mut self, id: &str) -> Option<&mut Project> {
        self.projects.iter_mut().find(|p| p.id == id)
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub fn task_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.get_mut(id)
    }

    pub fn contains_task(&self, id: &str) -> bool {
        self.tasks.contains_key(id)
    }

    /// Walk parent links up to the container root of `id`
    pub fn root_of(&self, id: &str) -> Option<&Task> {
        let mut current = self.task(id)?;
        while let Some(parent_id) = current.parent_id.as_deref() {
            current = self.task(parent_id)?;
        }
        Some(current)
    }

    /// The project that owns `id`, directly or through its ancestors
    pub fn project_of(&self, id: &str) -> Option<&Project> {
        let root = self.root_of(id)?;
        self.projects
            .iter()
            .find(|p| p.roots.iter().any(|r| *r == root.id))
    }

    /// Resolve ids to tasks in sibling order: ascending `order`, ties broken by
    /// position in `ids`. Unknown ids are skipped.
    pub fn ordered<'a>(&'a self, ids: &[TaskId]) -> Vec<&'a Task> {
        let mut tasks: Vec<&Task> = ids.iter().filter_map(|id| self.task(id)).collect();
        tasks.sort_by_key(|t| t.order);
        tasks
    }

    /// Projects in display order, Unassigned last
    pub fn ordered_projects(&self) -> Vec<&Project> {
        let mut projects: Vec<&Project> = self.projects.iter().collect();
        projects.sort_by_key(|p| (p.is_unassigned(), p.order));
        projects
    }

    /// Highest `order` among the given siblings, or -1 when there are none
    pub fn max_order(&self, ids: &[TaskId]) -> i64 {
        ids.iter()
            .filter_map(|id| self.task(id))
            .map(|t| t.order)
            .max()
            .unwrap_or(-1)
    }
}
