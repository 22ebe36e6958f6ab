use crate::model::forest::Forest;
use crate::model::task::{Comment, CommentStatus, ExecutionResult, Summary};

/// Start a new top-level comment thread on a task
pub fn add_comment(forest: &mut Forest, task_id: &str, text: &str) -> Option<String> {
    let now = forest.stamp();
    let task = forest.task_mut(task_id)?;
    let id = Forest::new_id();
    task.comments.push(Comment::new(id.clone(), text.to_string(), now));
    task.last_edited = now;
    Some(id)
}

/// Reply to any comment in a task's threads
pub fn reply_to_comment(
    forest: &mut Forest,
    task_id: &str,
    parent_comment_id: &str,
    text: &str,
) -> Option<String> {
    let now = forest.stamp();
    let task = forest.task_mut(task_id)?;
    let parent = find_comment_mut(&mut task.comments, parent_comment_id)?;
    let id = Forest::new_id();
    parent
        .replies
        .push(Comment::new(id.clone(), text.to_string(), now));
    task.last_edited = now;
    Some(id)
}

pub fn edit_comment(forest: &mut Forest, task_id: &str, comment_id: &str, text: &str) -> bool {
    let now = forest.stamp();
    let Some(task) = forest.task_mut(task_id) else {
        return false;
    };
    let Some(comment) = find_comment_mut(&mut task.comments, comment_id) else {
        return false;
    };
    comment.text = text.to_string();
    comment.edited = true;
    task.last_edited = now;
    true
}

pub fn set_comment_status(
    forest: &mut Forest,
    task_id: &str,
    comment_id: &str,
    status: CommentStatus,
) -> bool {
    let now = forest.stamp();
    let Some(task) = forest.task_mut(task_id) else {
        return false;
    };
    let Some(comment) = find_comment_mut(&mut task.comments, comment_id) else {
        return false;
    };
    comment.status = status;
    task.last_edited = now;
    true
}

/// Remove a comment and all of its replies
pub fn delete_comment(forest: &mut Forest, task_id: &str, comment_id: &str) -> bool {
    let now = forest.stamp();
    let Some(task) = forest.task_mut(task_id) else {
        return false;
    };
    if !remove_comment(&mut task.comments, comment_id) {
        return false;
    }
    task.last_edited = now;
    true
}

/// Record the output of running a task
pub fn append_execution_result(forest: &mut Forest, task_id: &str, output: &str) -> Option<String> {
    let now = forest.stamp();
    let task = forest.task_mut(task_id)?;
    let id = Forest::new_id();
    task.results.push(ExecutionResult {
        id: id.clone(),
        output: output.to_string(),
        created: now,
    });
    task.last_edited = now;
    Some(id)
}

/// Prepend a summary to a task (newest first)
pub fn append_task_summary(forest: &mut Forest, task_id: &str, text: &str) -> Option<String> {
    let now = forest.stamp();
    let task = forest.task_mut(task_id)?;
    let id = Forest::new_id();
    task.summaries.insert(0, summary(id.clone(), text, now));
    task.last_edited = now;
    Some(id)
}

/// Prepend a summary to a project (newest first)
pub fn append_project_summary(forest: &mut Forest, project_id: &str, text: &str) -> Option<String> {
    let now = forest.stamp();
    let project = forest.project_mut(project_id)?;
    let id = Forest::new_id();
    project.summaries.insert(0, summary(id.clone(), text, now));
    project.last_edited = now;
    Some(id)
}

fn summary(id: String, text: &str, now: chrono::DateTime<chrono::Utc>) -> Summary {
    Summary {
        id,
        text: text.to_string(),
        created: now,
    }
}

fn find_comment_mut<'a>(comments: &'a mut [Comment], id: &str) -> Option<&'a mut Comment> {
    for comment in comments.iter_mut() {
        if comment.id == id {
            return Some(comment);
        }
        if let Some(found) = find_comment_mut(&mut comment.replies, id) {
            return Some(found);
        }
    }
    None
}

fn remove_comment(comments: &mut Vec<Comment>, id: &str) -> bool {
    if let Some(pos) = comments.iter().position(|c| c.id == id) {
        comments.remove(pos);
        return true;
    }
    comments
        .iter_mut()
        .any(|c| remove_comment(&mut c.replies, id))
}
