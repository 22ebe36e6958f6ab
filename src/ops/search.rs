use std::ops::Range;

use regex::Regex;
use serde::Serialize;

use crate::model::forest::Forest;
use crate::model::task::{Comment, Task};
use crate::ops::query::for_each_task;

/// Which field of a task matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchField {
    Text,
    Description,
    Comment,
}

/// A search hit for a task field
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub project_id: String,
    pub task_id: String,
    pub field: MatchField,
    #[serde(skip)]
    pub spans: Vec<Range<usize>>,
}

/// Collect all non-overlapping match byte-ranges for a regex in the given text.
fn find_matches(re: &Regex, text: &str) -> Vec<Range<usize>> {
    re.find_iter(text).map(|m| m.start()..m.end()).collect()
}

/// Search task text, descriptions and comment threads in display order.
///
/// If `project_filter` is `Some`, only that project is searched.
pub fn search_tasks(forest: &Forest, re: &Regex, project_filter: Option<&str>) -> Vec<SearchHit> {
    let mut hits = Vec::new();
    for project in forest.ordered_projects() {
        if project_filter.is_some_and(|p| p != project.id) {
            continue;
        }
        for_each_task(forest, &project.roots, &mut |task, _depth| {
            search_task(re, task, &project.id, &mut hits);
        });
    }
    hits
}

fn search_task(re: &Regex, task: &Task, project_id: &str, hits: &mut Vec<SearchHit>) {
    let mut push = |field: MatchField, spans: Vec<Range<usize>>| {
        if !spans.is_empty() {
            hits.push(SearchHit {
                project_id: project_id.to_string(),
                task_id: task.id.clone(),
                field,
                spans,
            });
        }
    };

    push(MatchField::Text, find_matches(re, &task.text));
    if let Some(description) = &task.description {
        push(MatchField::Description, find_matches(re, description));
    }
    let mut spans = Vec::new();
    for comment in &task.comments {
        collect_comment_matches(re, comment, &mut spans);
    }
    push(MatchField::Comment, spans);
}

/// Spans from a whole thread are pooled into one hit; offsets are relative to
/// each comment's own text.
fn collect_comment_matches(re: &Regex, comment: &Comment, spans: &mut Vec<Range<usize>>) {
    spans.extend(find_matches(re, &comment.text));
    for reply in &comment.replies {
        collect_comment_matches(re, reply, spans);
    }
}
