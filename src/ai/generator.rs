use std::io;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::model::config::GeneratorConfig;

/// Transport or provider failure. Surfaced to the caller as-is; never retried.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("could not start generator `{command}`: {source}")]
    Spawn { command: String, source: io::Error },
    #[error("generator i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("generator `{command}` exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
    #[error("generator output is not valid UTF-8")]
    NotUtf8,
    #[error("generator returned no output")]
    EmptyOutput,
}

/// One text-generation request
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub prompt: String,
    pub system: Option<String>,
    /// Upper bound on response size, passed through to the provider
    pub max_output: usize,
}

/// The external text-generation collaborator.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Free-form text for a prompt
    async fn generate(&self, request: &GenerateRequest) -> Result<String, GenerateError>;

    /// JSON-ish text for the patch flow. Providers without a dedicated
    /// structured mode answer through `generate`.
    async fn generate_structured(&self, request: &GenerateRequest) -> Result<String, GenerateError> {
        self.generate(request).await
    }
}

/// Runs an external program per request: the prompt goes to its stdin and
/// its stdout is the reply. The system prompt and output bound travel in
/// `SCOPES_SYSTEM_PROMPT` and `SCOPES_MAX_OUTPUT`; structured requests also
/// set `SCOPES_STRUCTURED=1`.
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    command: String,
    args: Vec<String>,
}

impl CommandGenerator {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        CommandGenerator {
            command: command.into(),
            args,
        }
    }

    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self::new(config.command.clone(), config.args.clone())
    }

    async fn run(&self, request: &GenerateRequest, structured: bool) -> Result<String, GenerateError> {
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args)
            .env("SCOPES_MAX_OUTPUT", request.max_output.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(system) = &request.system {
            cmd.env("SCOPES_SYSTEM_PROMPT", system);
        }
        if structured {
            cmd.env("SCOPES_STRUCTURED", "1");
        }

        tracing::debug!(command = %self.command, structured, prompt_len = request.prompt.len(), "invoking generator");
        let mut child = cmd.spawn().map_err(|source| GenerateError::Spawn {
            command: self.command.clone(),
            source,
        })?;

        let stdin = child.stdin.take();
        let prompt = request.prompt.as_bytes();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(prompt).await?;
                stdin.shutdown().await?;
            }
            Ok::<(), io::Error>(())
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output?;
        // A generator may exit without reading its input; only its status matters then
        if let Err(e) = fed
            && e.kind() != io::ErrorKind::BrokenPipe
        {
            return Err(GenerateError::Io(e));
        }

        if !output.status.success() {
            return Err(GenerateError::Failed {
                command: self.command.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        let text = String::from_utf8(output.stdout).map_err(|_| GenerateError::NotUtf8)?;
        if text.trim().is_empty() {
            return Err(GenerateError::EmptyOutput);
        }
        tracing::debug!(reply_len = text.len(), "generator replied");
        Ok(text)
    }
}

#[async_trait]
impl Generator for CommandGenerator {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, GenerateError> {
        self.run(request, false).await
    }

    async fn generate_structured(&self, request: &GenerateRequest) -> Result<String, GenerateError> {
        self.run(request, true).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(prompt: &str) -> GenerateRequest {
        GenerateRequest {
            prompt: prompt.to_string(),
            system: Some("be brief".into()),
            max_output: 64,
        }
    }

    #[tokio::test]
    async fn echoes_prompt_through_cat() {
        let generator = CommandGenerator::new("cat", vec![]);
        let reply = generator.generate(&request("- Alpha\n- Beta")).await.unwrap();
        assert_eq!(reply, "- Alpha\n- Beta");
    }

    #[tokio::test]
    async fn passes_settings_in_environment() {
        let generator = CommandGenerator::new(
            "sh",
            vec![
                "-c".into(),
                "cat >/dev/null; printf '%s|%s|%s' \"$SCOPES_SYSTEM_PROMPT\" \"$SCOPES_MAX_OUTPUT\" \"$SCOPES_STRUCTURED\"".into(),
            ],
        );
        let reply = generator.generate_structured(&request("x")).await.unwrap();
        assert_eq!(reply, "be brief|64|1");
    }

    #[tokio::test]
    async fn nonzero_exit_is_a_failure() {
        let generator = CommandGenerator::new("sh", vec!["-c".into(), "echo quota >&2; exit 3".into()]);
        let err = generator.generate(&request("x")).await.unwrap_err();
        match err {
            GenerateError::Failed { stderr, .. } => assert_eq!(stderr, "quota"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_program_fails_to_spawn() {
        let generator = CommandGenerator::new("scopes-no-such-generator", vec![]);
        let err = generator.generate(&request("x")).await.unwrap_err();
        assert!(matches!(err, GenerateError::Spawn { .. }));
    }

    #[tokio::test]
    async fn blank_output_is_rejected() {
        let generator = CommandGenerator::new("sh", vec!["-c".into(), "cat >/dev/null; echo".into()]);
        let err = generator.generate(&request("x")).await.unwrap_err();
        assert!(matches!(err, GenerateError::EmptyOutput));
    }
}
