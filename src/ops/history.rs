use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::forest::Forest;
use crate::model::selection::Selection;

/// Default bound on each of the undo and redo stacks
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Full copy of the forest and selection taken just before a mutation.
/// Forest clones share structure, so holding many of these is cheap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Short description of the mutation this snapshot precedes
    pub label: String,
    pub taken_at: DateTime<Utc>,
    pub forest: Forest,
    pub selection: Selection,
}

/// Bounded undo/redo stacks of whole-forest snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct History {
    past: Vec<Snapshot>,
    future: Vec<Snapshot>,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        History::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl History {
    pub fn new(limit: usize) -> Self {
        History {
            past: Vec::new(),
            future: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Change the bound, dropping the oldest snapshots if needed
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit.max(1);
        trim(&mut self.past, self.limit);
        trim(&mut self.future, self.limit);
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Record the state before a mutation. Clears the redo stack.
    pub fn record(&mut self, label: &str, forest: Forest, selection: Selection) {
        self.past.push(Snapshot {
            label: label.to_string(),
            taken_at: Utc::now(),
            forest,
            selection,
        });
        trim(&mut self.past, self.limit);
        self.future.clear();
    }

    /// Restore the most recent snapshot, pushing the current state onto the
    /// redo stack. Returns the label of the undone mutation, or `None` (with
    /// nothing changed) when there is nothing to undo.
    pub fn undo(&mut self, forest: &mut Forest, selection: &mut Selection) -> Option<String> {
        let snapshot = self.past.pop()?;
        let label = snapshot.label.clone();
        let current = swap_in(snapshot, forest, selection);
        self.future.push(current);
        trim(&mut self.future, self.limit);
        Some(label)
    }

    /// Mirror of `undo`
    pub fn redo(&mut self, forest: &mut Forest, selection: &mut Selection) -> Option<String> {
        let snapshot = self.future.pop()?;
        let label = snapshot.label.clone();
        let current = swap_in(snapshot, forest, selection);
        self.past.push(current);
        trim(&mut self.past, self.limit);
        Some(label)
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn peek_undo(&self) -> Option<&Snapshot> {
        self.past.last()
    }

    /// Undo stack, most recent first
    pub fn past(&self) -> impl Iterator<Item = &Snapshot> {
        self.past.iter().rev()
    }

    /// Redo stack, next redo first
    pub fn future(&self) -> impl Iterator<Item = &Snapshot> {
        self.future.iter().rev()
    }
}

/// Install `snapshot` as the live state and return the displaced state,
/// labelled the same so the opposite stack reports the same mutation.
fn swap_in(snapshot: Snapshot, forest: &mut Forest, selection: &mut Selection) -> Snapshot {
    let previous_forest = std::mem::replace(forest, snapshot.forest);
    let previous_selection = std::mem::replace(selection, snapshot.selection);
    Snapshot {
        label: snapshot.label,
        taken_at: Utc::now(),
        forest: previous_forest,
        selection: previous_selection,
    }
}

fn trim(stack: &mut Vec<Snapshot>, limit: usize) {
    if stack.len() > limit {
        stack.drain(..stack.len() - limit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::query::fixtures::sample_forest;
    use crate::ops::task_ops::{create_root_task, delete_task};

    /// Apply a mutation the way the store does: snapshot first
    fn mutate(
        history: &mut History,
        forest: &mut Forest,
        selection: &Selection,
        label: &str,
        f: impl FnOnce(&mut Forest),
    ) {
        history.record(label, forest.clone(), selection.clone());
        f(forest);
    }

    #[test]
    fn new_history_is_empty() {
        let history = History::default();
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert_eq!(history.limit(), DEFAULT_HISTORY_LIMIT);
    }

    #[test]
    fn undo_then_redo_round_trips() {
        let mut history = History::default();
        let mut forest = sample_forest();
        let mut selection = Selection::default();
        let original = forest.clone();

        mutate(&mut history, &mut forest, &selection, "delete a", |f| {
            delete_task(f, "a");
        });
        let after = forest.clone();

        assert_eq!(
            history.undo(&mut forest, &mut selection).as_deref(),
            Some("delete a")
        );
        assert_eq!(forest, original);
        assert_eq!(
            history.redo(&mut forest, &mut selection).as_deref(),
            Some("delete a")
        );
        assert_eq!(forest, after);
    }

    #[test]
    fn undo_restores_selection() {
        let mut history = History::default();
        let mut forest = sample_forest();
        let mut selection = Selection::task("work", "a");
        history.record("select b", forest.clone(), selection.clone());
        selection = Selection::task("work", "b");

        history.undo(&mut forest, &mut selection);
        assert_eq!(selection, Selection::task("work", "a"));
        history.redo(&mut forest, &mut selection);
        assert_eq!(selection, Selection::task("work", "b"));
    }

    #[test]
    fn record_clears_redo() {
        let mut history = History::default();
        let mut forest = sample_forest();
        let mut selection = Selection::default();
        mutate(&mut history, &mut forest, &selection, "add", |f| {
            create_root_task(f, "work", "x");
        });
        history.undo(&mut forest, &mut selection);
        assert!(history.can_redo());

        mutate(&mut history, &mut forest, &selection, "add again", |f| {
            create_root_task(f, "work", "y");
        });
        assert!(!history.can_redo());
        assert!(history.redo(&mut forest, &mut selection).is_none());
    }

    #[test]
    fn empty_stacks_change_nothing() {
        let mut history = History::default();
        let mut forest = sample_forest();
        let mut selection = Selection::default();
        let before = forest.clone();
        assert!(history.undo(&mut forest, &mut selection).is_none());
        assert!(history.redo(&mut forest, &mut selection).is_none());
        assert_eq!(forest, before);
    }

    #[test]
    fn limit_drops_oldest() {
        let mut history = History::new(3);
        let forest = sample_forest();
        for i in 0..5 {
            history.record(&format!("op {i}"), forest.clone(), Selection::default());
        }
        let labels: Vec<&str> = history.past().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["op 4", "op 3", "op 2"]);

        history.set_limit(1);
        assert_eq!(history.past().count(), 1);
        assert_eq!(history.peek_undo().unwrap().label, "op 4");
    }

    #[test]
    fn multi_step_undo_walks_back_in_order() {
        let mut history = History::default();
        let mut forest = sample_forest();
        let mut selection = Selection::default();
        let states: Vec<Forest> = (0..3)
            .map(|i| {
                let before = forest.clone();
                mutate(&mut history, &mut forest, &selection, "add", |f| {
                    create_root_task(f, "work", &format!("t{i}"));
                });
                before
            })
            .collect();
        for expected in states.iter().rev() {
            history.undo(&mut forest, &mut selection);
            assert_eq!(&forest, expected);
        }
        assert!(!history.can_undo());
    }

    #[test]
    fn serializes_for_persistence() {
        let mut history = History::new(5);
        history.record("x", sample_forest(), Selection::default());
        let json = serde_json::to_string(&history).unwrap();
        let back: History = serde_json::from_str(&json).unwrap();
        assert_eq!(back, history);
    }
}
