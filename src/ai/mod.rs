//! Requests to the text-generation collaborator.
//!
//! These functions only read the forest to build a prompt and return the
//! reply. Applying the reply is the caller's job, against whatever forest is
//! current when the reply arrives.

pub mod generator;
pub mod prompt;

use crate::model::config::GeneratorConfig;
use crate::model::forest::Forest;
use crate::ops::patch::{PatchError, PatchProposal};

pub use generator::{CommandGenerator, GenerateError, GenerateRequest, Generator};

/// Error type for AI flows
#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("task not found: {0}")]
    TaskNotFound(String),
    #[error(transparent)]
    Generate(#[from] GenerateError),
    #[error(transparent)]
    Patch(#[from] PatchError),
}

fn system_prompt(base: &str, config: &GeneratorConfig) -> String {
    match config.system.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(extra) => format!("{}\n\n{}", extra, base),
        None => base.to_string(),
    }
}

/// Ask for an outline of subtasks for `task_id`; returns the raw reply for
/// outline ingestion.
pub async fn request_expansion(
    generator: &dyn Generator,
    forest: &Forest,
    task_id: &str,
    instructions: Option<&str>,
    config: &GeneratorConfig,
) -> Result<String, AiError> {
    let prompt = prompt::expand_prompt(forest, task_id, instructions)
        .ok_or_else(|| AiError::TaskNotFound(task_id.to_string()))?;
    let request = GenerateRequest {
        prompt,
        system: Some(system_prompt(prompt::OUTLINE_SYSTEM, config)),
        max_output: config.max_output,
    };
    Ok(generator.generate(&request).await?)
}

/// Ask for a replacement of `task_id`'s subtree and parse the reply.
pub async fn request_patch(
    generator: &dyn Generator,
    forest: &Forest,
    task_id: &str,
    instructions: Option<&str>,
    config: &GeneratorConfig,
) -> Result<PatchProposal, AiError> {
    let prompt = prompt::regenerate_prompt(forest, task_id, instructions)
        .ok_or_else(|| AiError::TaskNotFound(task_id.to_string()))?;
    let request = GenerateRequest {
        prompt,
        system: Some(system_prompt(prompt::PATCH_SYSTEM, config)),
        max_output: config.max_output,
    };
    let reply = generator.generate_structured(&request).await?;
    Ok(PatchProposal::parse(&reply)?)
}
