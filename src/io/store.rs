use serde::{Deserialize, Serialize};

use crate::io::blob::BlobStore;
use crate::model::config::{Config, IngestConfig};
use crate::model::forest::Forest;
use crate::model::selection::Selection;
use crate::model::task::{CommentStatus, TaskDraft, TaskId};
use crate::ops::history::History;
use crate::ops::ingest::{IngestError, IngestResult, IngestTarget, ingest_outline};
use crate::ops::patch::{PatchError, PatchOutcome, PatchProposal, apply_patch};
use crate::ops::query::find_path;
use crate::ops::task_ops::TaskPatch;
use crate::ops::{comment_ops, project_ops, task_ops};

pub const FOREST_KEY: &str = "forest";
pub const HISTORY_KEY: &str = "history";

/// Error type for loading a store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("could not read {key}: {source}")]
    ReadError {
        key: String,
        source: std::io::Error,
    },
    #[error("stored {key} is corrupt: {source}")]
    Corrupt {
        key: String,
        source: serde_json::Error,
    },
}

/// A save that did not reach the blob store. The in-memory state is still
/// authoritative; the next successful save catches up.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("could not save {key}: {message}")]
pub struct SaveWarning {
    pub key: String,
    pub message: String,
}

/// History and selection travel together in one blob
#[derive(Debug, Default, Serialize, Deserialize)]
struct Session {
    #[serde(default)]
    selection: Selection,
    #[serde(default)]
    history: History,
}

/// Owns the live forest, its history and the selection, and persists all of
/// them after every successful mutation.
///
/// Every mutation runs against a clone of the forest; only a mutation that
/// succeeds replaces the live forest and records a history snapshot.
pub struct Store<B: BlobStore> {
    blobs: B,
    forest: Forest,
    history: History,
    selection: Selection,
    ingest: IngestConfig,
    warnings: Vec<SaveWarning>,
}

impl<B: BlobStore> Store<B> {
    /// Load state from `blobs`. Missing blobs mean a fresh workspace; an
    /// unreadable forest is an error, an unreadable history is discarded.
    pub fn open(blobs: B, config: &Config) -> Result<Self, StoreError> {
        let mut forest = match load(&blobs, FOREST_KEY)? {
            Some(bytes) => {
                serde_json::from_slice::<Forest>(&bytes).map_err(|source| StoreError::Corrupt {
                    key: FOREST_KEY.to_string(),
                    source,
                })?
            }
            None => Forest::new(),
        };
        forest.ensure_unassigned();

        let session = match load(&blobs, HISTORY_KEY)? {
            Some(bytes) => serde_json::from_slice::<Session>(&bytes).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "discarding unreadable history");
                Session::default()
            }),
            None => Session::default(),
        };
        let mut history = session.history;
        history.set_limit(config.history.limit);

        tracing::debug!(
            projects = forest.projects.len(),
            tasks = forest.tasks.len(),
            undo = history.past().count(),
            "store opened"
        );
        Ok(Store {
            blobs,
            forest,
            history,
            selection: session.selection,
            ingest: config.ingest.clone(),
            warnings: Vec::new(),
        })
    }

    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn blobs(&self) -> &B {
        &self.blobs
    }

    pub fn blobs_mut(&mut self) -> &mut B {
        &mut self.blobs
    }

    /// Save failures since the last call
    pub fn take_warnings(&mut self) -> Vec<SaveWarning> {
        std::mem::take(&mut self.warnings)
    }

    /// Change the selection without recording history
    pub fn select(&mut self, selection: Selection) {
        self.selection = selection;
        self.save_session();
    }

    // -----------------------------------------------------------------------
    // Mutation plumbing
    // -----------------------------------------------------------------------

    /// Run `op` on a copy of the forest and keep the copy only if `op`
    /// returns `Some`.
    pub fn mutate<T>(&mut self, label: &str, op: impl FnOnce(&mut Forest) -> Option<T>) -> Option<T> {
        let mut next = self.forest.clone();
        let out = op(&mut next)?;
        self.commit(label, next, None);
        Some(out)
    }

    fn mutate_bool(&mut self, label: &str, op: impl FnOnce(&mut Forest) -> bool) -> bool {
        self.mutate(label, |f| op(f).then_some(())).is_some()
    }

    fn commit(&mut self, label: &str, next: Forest, selection: Option<Selection>) {
        let previous = std::mem::replace(&mut self.forest, next);
        self.history.record(label, previous, self.selection.clone());
        if let Some(selection) = selection {
            self.selection = selection;
        }
        tracing::debug!(label, "committed");
        self.save_forest();
        self.save_session();
    }

    /// Selection to install alongside `next` when the selected task does not
    /// survive into it: the nearest ancestor that does, or just the project.
    fn surviving_selection(&self, next: &Forest) -> Option<Selection> {
        let selected = self.selection.task_id.as_deref()?;
        if next.contains_task(selected) {
            return None;
        }
        let task_id = find_path(&self.forest, selected)
            .into_iter()
            .rev()
            .map(|t| t.id.clone())
            .find(|id| next.contains_task(id));
        Some(Selection {
            project_id: self.selection.project_id.clone(),
            task_id,
        })
    }

    fn project_of(&self, id: &str) -> Option<String> {
        self.forest.project_of(id).map(|p| p.id.clone())
    }

    // -----------------------------------------------------------------------
    // Tasks
    // -----------------------------------------------------------------------

    pub fn create_root_task(&mut self, project_id: &str, text: &str) -> Option<TaskId> {
        let mut next = self.forest.clone();
        let id = task_ops::create_root_task(&mut next, project_id, text)?;
        self.commit("add task", next, Some(Selection::task(project_id, id.clone())));
        Some(id)
    }

    pub fn add_subtasks(&mut self, anchor_id: &str, drafts: Vec<TaskDraft>) -> Option<Vec<TaskId>> {
        self.mutate("add subtasks", |f| task_ops::add_subtasks(f, anchor_id, drafts))
    }

    pub fn add_roots(&mut self, project_id: &str, drafts: Vec<TaskDraft>) -> Option<Vec<TaskId>> {
        self.mutate("add tasks", |f| task_ops::add_roots(f, project_id, drafts))
    }

    /// Delete a task and its subtree. A selection inside the subtree moves to
    /// the deleted task's parent.
    pub fn delete_task(&mut self, id: &str) -> bool {
        let mut next = self.forest.clone();
        if !task_ops::delete_task(&mut next, id) {
            return false;
        }
        let selection = self.surviving_selection(&next);
        self.commit("delete task", next, selection);
        true
    }

    pub fn delete_selected(&mut self, ids: &[TaskId]) -> usize {
        let mut next = self.forest.clone();
        let removed = task_ops::delete_selected(&mut next, ids);
        if removed == 0 {
            return 0;
        }
        let selection = self.surviving_selection(&next);
        self.commit("delete tasks", next, selection);
        removed
    }

    pub fn move_task_to_project(&mut self, id: &str, source: &str, target: &str) -> bool {
        self.mutate_bool("move task", |f| task_ops::move_task_to_project(f, id, source, target))
    }

    pub fn promote_to_root(&mut self, project_id: &str, id: &str) -> bool {
        self.mutate_bool("promote task", |f| task_ops::promote_to_root(f, project_id, id))
    }

    pub fn reorder_task(&mut self, id: &str, new_index: usize) -> bool {
        self.mutate_bool("reorder task", |f| task_ops::reorder_task(f, id, new_index))
    }

    pub fn update_task(&mut self, id: &str, patch: TaskPatch) -> bool {
        self.mutate_bool("edit task", |f| task_ops::update_task(f, id, patch))
    }

    // -----------------------------------------------------------------------
    // Projects
    // -----------------------------------------------------------------------

    pub fn create_project(&mut self, name: &str) -> String {
        let mut next = self.forest.clone();
        let id = project_ops::create_project(&mut next, name);
        let selection = Selection {
            project_id: Some(id.clone()),
            task_id: None,
        };
        self.commit("add project", next, Some(selection));
        id
    }

    pub fn rename_project(&mut self, id: &str, name: &str) -> bool {
        self.mutate_bool("rename project", |f| project_ops::rename_project(f, id, name))
    }

    pub fn set_project_description(&mut self, id: &str, description: Option<String>) -> bool {
        self.mutate_bool("describe project", |f| {
            project_ops::set_project_description(f, id, description)
        })
    }

    pub fn set_pinned(&mut self, id: &str, pinned: bool) -> bool {
        self.mutate_bool("pin project", |f| project_ops::set_pinned(f, id, pinned))
    }

    pub fn delete_project(&mut self, id: &str) -> bool {
        let mut next = self.forest.clone();
        if !project_ops::delete_project(&mut next, id) {
            return false;
        }
        let selection = (self.selection.project_id.as_deref() == Some(id)).then(Selection::default);
        self.commit("delete project", next, selection);
        true
    }

    // -----------------------------------------------------------------------
    // Comments, results, summaries
    // -----------------------------------------------------------------------

    pub fn add_comment(&mut self, task_id: &str, text: &str) -> Option<String> {
        self.mutate("comment", |f| comment_ops::add_comment(f, task_id, text))
    }

    pub fn reply_to_comment(&mut self, task_id: &str, comment_id: &str, text: &str) -> Option<String> {
        self.mutate("reply", |f| {
            comment_ops::reply_to_comment(f, task_id, comment_id, text)
        })
    }

    pub fn edit_comment(&mut self, task_id: &str, comment_id: &str, text: &str) -> bool {
        self.mutate_bool("edit comment", |f| {
            comment_ops::edit_comment(f, task_id, comment_id, text)
        })
    }

    pub fn set_comment_status(&mut self, task_id: &str, comment_id: &str, status: CommentStatus) -> bool {
        self.mutate_bool("resolve comment", |f| {
            comment_ops::set_comment_status(f, task_id, comment_id, status)
        })
    }

    pub fn delete_comment(&mut self, task_id: &str, comment_id: &str) -> bool {
        self.mutate_bool("delete comment", |f| {
            comment_ops::delete_comment(f, task_id, comment_id)
        })
    }

    pub fn append_execution_result(&mut self, task_id: &str, output: &str) -> Option<String> {
        self.mutate("record result", |f| {
            comment_ops::append_execution_result(f, task_id, output)
        })
    }

    pub fn append_task_summary(&mut self, task_id: &str, text: &str) -> Option<String> {
        self.mutate("summarize task", |f| {
            comment_ops::append_task_summary(f, task_id, text)
        })
    }

    pub fn append_project_summary(&mut self, project_id: &str, text: &str) -> Option<String> {
        self.mutate("summarize project", |f| {
            comment_ops::append_project_summary(f, project_id, text)
        })
    }

    // -----------------------------------------------------------------------
    // Generated content
    // -----------------------------------------------------------------------

    /// Ingest generated outline text at `target` against the current forest.
    pub fn ingest_outline(&mut self, text: &str, target: &IngestTarget) -> Result<IngestResult, IngestError> {
        let mut next = self.forest.clone();
        let result = ingest_outline(&mut next, text, target, &self.ingest)?;
        let project = match target {
            IngestTarget::Parent(id) => self.project_of(id),
            IngestTarget::Project(id) => Some(id.clone()),
        };
        let selection = project
            .zip(result.root_ids.first())
            .map(|(project, first)| Selection::task(project, first.clone()));
        self.commit("ingest outline", next, selection);
        Ok(result)
    }

    /// Apply a regenerate proposal. Nothing changes unless the whole patch
    /// applies.
    pub fn apply_patch(&mut self, target_id: &str, proposal: &PatchProposal) -> Result<PatchOutcome, PatchError> {
        let (next, outcome) = apply_patch(&self.forest, target_id, proposal)?;
        let selection = self.surviving_selection(&next);
        self.commit("regenerate", next, selection);
        Ok(outcome)
    }

    // -----------------------------------------------------------------------
    // History
    // -----------------------------------------------------------------------

    /// Returns the label of the undone mutation
    pub fn undo(&mut self) -> Option<String> {
        let label = self.history.undo(&mut self.forest, &mut self.selection)?;
        self.save_forest();
        self.save_session();
        Some(label)
    }

    pub fn redo(&mut self) -> Option<String> {
        let label = self.history.redo(&mut self.forest, &mut self.selection)?;
        self.save_forest();
        self.save_session();
        Some(label)
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    fn save_forest(&mut self) {
        let result = serde_json::to_vec(&self.forest);
        self.save_encoded(FOREST_KEY, result);
    }

    fn save_session(&mut self) {
        let session = SessionRef {
            selection: &self.selection,
            history: &self.history,
        };
        let result = serde_json::to_vec(&session);
        self.save_encoded(HISTORY_KEY, result);
    }

    fn save_encoded(&mut self, key: &str, encoded: serde_json::Result<Vec<u8>>) {
        let outcome = match encoded {
            Ok(bytes) => self.blobs.save_blob(key, &bytes).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        if let Err(message) = outcome {
            tracing::warn!(key, error = %message, "save failed");
            self.warnings.push(SaveWarning {
                key: key.to_string(),
                message,
            });
        }
    }
}

/// Borrowed view of `Session` for saving without cloning the history
#[derive(Serialize)]
struct SessionRef<'a> {
    selection: &'a Selection,
    history: &'a History,
}

fn load<B: BlobStore>(blobs: &B, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
    blobs.load_blob(key).map_err(|source| StoreError::ReadError {
        key: key.to_string(),
        source,
    })
}
