pub mod check;
pub mod comment_ops;
pub mod history;
pub mod ingest;
pub mod patch;
pub mod project_ops;
pub mod query;
pub mod search;
pub mod status;
pub mod task_ops;
