//! External program responder
//!
//! The prompt is written to the program's stdin and its stdout is the answer.
//! Generation options are exposed through environment variables:
//!
//! | Variable                  | Option          |
//! |---------------------------|-----------------|
//! | `ENSEMBLE_SYSTEM_PROMPT`  | `system_prompt` |
//! | `ENSEMBLE_MAX_TOKENS`     | `max_tokens`    |
//! | `ENSEMBLE_TEMPERATURE`    | `temperature`   |
//! | `ENSEMBLE_STOP`           | `stop` (newline separated) |
//!
//! Processes are spawned with `kill_on_drop`, so a call abandoned because its
//! context ended takes the process down with it.

use async_trait::async_trait;
use ensemble_application::{CallContext, GenerateOptions, Responder, ResponderError, StreamHandle};
use ensemble_domain::StreamEvent;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::debug;

/// Events buffered between the reader task and the caller
const STREAM_BUFFER: usize = 32;

/// Responder backed by an external program
#[derive(Debug, Clone)]
pub struct CommandResponder {
    program: String,
    args: Vec<String>,
}

impl CommandResponder {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn command(&self, options: &GenerateOptions) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(ref system_prompt) = options.system_prompt {
            cmd.env("ENSEMBLE_SYSTEM_PROMPT", system_prompt);
        }
        if let Some(max_tokens) = options.max_tokens {
            cmd.env("ENSEMBLE_MAX_TOKENS", max_tokens.to_string());
        }
        if let Some(temperature) = options.temperature {
            cmd.env("ENSEMBLE_TEMPERATURE", temperature.to_string());
        }
        if !options.stop.is_empty() {
            cmd.env("ENSEMBLE_STOP", options.stop.join("\n"));
        }
        cmd
    }

    /// Spawn the program and feed it `prompt`.
    ///
    /// The prompt is written from a separate task so a program that answers
    /// before draining its input cannot deadlock against us.
    fn spawn(&self, prompt: &str, options: &GenerateOptions) -> Result<Child, ResponderError> {
        debug!(program = %self.program, "Spawning responder process");
        let mut child = self.command(options).spawn().map_err(|e| {
            ResponderError::Process(format!("failed to spawn '{}': {}", self.program, e))
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            let prompt = prompt.to_string();
            let program = self.program.clone();
            tokio::spawn(async move {
                // A program that ignores stdin closes the pipe early
                if let Err(e) = stdin.write_all(prompt.as_bytes()).await {
                    debug!(program = %program, "Prompt not fully written: {}", e);
                }
            });
        }
        Ok(child)
    }

    async fn output(&self, prompt: &str, options: &GenerateOptions) -> Result<String, ResponderError> {
        let child = self.spawn(prompt, options)?;
        let output = child.wait_with_output().await.map_err(|e| {
            ResponderError::Process(format!("failed to wait for '{}': {}", self.program, e))
        })?;

        if !output.status.success() {
            return Err(ResponderError::Process(exit_message(
                &self.program,
                output.status,
                &output.stderr,
            )));
        }
        String::from_utf8(output.stdout)
            .map_err(|e| ResponderError::InvalidOutput(format!("stdout is not UTF-8: {}", e)))
    }
}

fn exit_message(program: &str, status: ExitStatus, stderr: &[u8]) -> String {
    let stderr = String::from_utf8_lossy(stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("'{}' exited with {}", program, status)
    } else {
        format!("'{}' exited with {}: {}", program, status, stderr)
    }
}

#[async_trait]
impl Responder for CommandResponder {
    async fn generate(
        &self,
        ctx: &CallContext,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<String, ResponderError> {
        ctx.check()?;
        match ctx.run(self.output(prompt, options)).await {
            Ok(result) => result,
            Err(reason) => {
                debug!(program = %self.program, reason = %reason, "Abandoning responder process");
                Err(reason.into())
            }
        }
    }

    async fn generate_structured(
        &self,
        ctx: &CallContext,
        prompt: &str,
        _schema: &serde_json::Value,
        options: &GenerateOptions,
    ) -> Result<serde_json::Value, ResponderError> {
        let text = self.generate(ctx, prompt, options).await?;
        serde_json::from_str(text.trim()).map_err(|e| {
            ResponderError::InvalidOutput(format!("'{}' did not print JSON: {}", self.program, e))
        })
    }

    /// One `Delta` per stdout line, then `Completed` once the program exits
    /// successfully.
    async fn stream(
        &self,
        ctx: &CallContext,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<StreamHandle, ResponderError> {
        ctx.check()?;
        let mut child = self.spawn(prompt, options)?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ResponderError::Process("stdout was not captured".to_string()))?;

        // Drained concurrently so a chatty program cannot block on a full stderr pipe
        let stderr = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut buffer = Vec::new();
                let _ = stderr.read_to_end(&mut buffer).await;
                buffer
            })
        });

        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let ctx = ctx.clone();
        let program = self.program.clone();

        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            let mut full_text = String::new();

            loop {
                let line = tokio::select! {
                    biased;
                    reason = ctx.done() => {
                        let _ = tx.send(StreamEvent::Error(reason.to_string())).await;
                        return;
                    }
                    line = lines.next_line() => line,
                };
                match line {
                    Ok(Some(mut line)) => {
                        line.push('\n');
                        full_text.push_str(&line);
                        if tx.send(StreamEvent::Delta(line)).await.is_err() {
                            return;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        let _ = tx
                            .send(StreamEvent::Error(format!("failed to read stdout: {}", e)))
                            .await;
                        return;
                    }
                }
            }

            let event = tokio::select! {
                biased;
                reason = ctx.done() => StreamEvent::Error(reason.to_string()),
                status = child.wait() => match status {
                    Ok(status) if status.success() => StreamEvent::Completed(full_text),
                    Ok(status) => {
                        let stderr = match stderr {
                            Some(task) => task.await.unwrap_or_default(),
                            None => Vec::new(),
                        };
                        StreamEvent::Error(exit_message(&program, status, &stderr))
                    }
                    Err(e) => StreamEvent::Error(format!("failed to wait for '{}': {}", program, e)),
                },
            };
            let _ = tx.send(event).await;
        });

        Ok(StreamHandle::new(rx))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sh(script: &str) -> CommandResponder {
        CommandResponder::new("sh", vec!["-c".to_string(), script.to_string()])
    }

    #[tokio::test]
    async fn test_prompt_goes_to_stdin() {
        let responder = CommandResponder::new("cat", vec![]);
        let text = responder
            .generate(&CallContext::new(), "What is the capital of France?", &GenerateOptions::default())
            .await
            .unwrap();
        assert_eq!(text, "What is the capital of France?");
    }

    #[tokio::test]
    async fn test_program_ignoring_stdin() {
        let responder = CommandResponder::new("echo", vec!["Paris".to_string()]);
        let text = responder
            .generate(&CallContext::new(), "ignored", &GenerateOptions::default())
            .await
            .unwrap();
        assert_eq!(text, "Paris\n");
    }

    #[tokio::test]
    async fn test_options_are_exported_as_env() {
        let responder = sh(r#"printf '%s|%s' "$ENSEMBLE_SYSTEM_PROMPT" "$ENSEMBLE_MAX_TOKENS""#);
        let options = GenerateOptions::default()
            .with_system_prompt("be brief")
            .with_max_tokens(64);
        let text = responder
            .generate(&CallContext::new(), "q", &options)
            .await
            .unwrap();
        assert_eq!(text, "be brief|64");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_a_process_error() {
        let responder = sh("echo 'model not loaded' >&2; exit 3");
        let err = responder
            .generate(&CallContext::new(), "q", &GenerateOptions::default())
            .await
            .unwrap_err();
        match err {
            ResponderError::Process(message) => assert!(message.contains("model not loaded")),
            other => panic!("expected Process, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_program_is_a_process_error() {
        let responder = CommandResponder::new("ensemble-quorum-no-such-program", vec![]);
        let err = responder
            .generate(&CallContext::new(), "q", &GenerateOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ResponderError::Process(m) if m.contains("failed to spawn")));
    }

    #[tokio::test]
    async fn test_deadline_abandons_the_process() {
        let responder = CommandResponder::new("sleep", vec!["5".to_string()]);
        let ctx = CallContext::with_timeout(Duration::from_millis(100));
        let err = responder
            .generate(&ctx, "q", &GenerateOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ResponderError::Timeout));
    }

    #[tokio::test]
    async fn test_cancelled_context_is_not_spawned() {
        let ctx = CallContext::new();
        ctx.cancel();
        let err = CommandResponder::new("cat", vec![])
            .generate(&ctx, "q", &GenerateOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ResponderError::Cancelled));
    }

    #[tokio::test]
    async fn test_stream_yields_lines() {
        let responder = sh(r"printf 'Paris is\nthe capital\n'");
        let mut handle = responder
            .stream(&CallContext::new(), "q", &GenerateOptions::default())
            .await
            .unwrap();

        let mut events = Vec::new();
        while let Some(event) = handle.next().await {
            events.push(event);
        }
        assert_eq!(
            events,
            vec![
                StreamEvent::Delta("Paris is\n".to_string()),
                StreamEvent::Delta("the capital\n".to_string()),
                StreamEvent::Completed("Paris is\nthe capital\n".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_stream_reports_failed_exit() {
        let responder = sh("echo partial; exit 1");
        let handle = responder
            .stream(&CallContext::new(), "q", &GenerateOptions::default())
            .await
            .unwrap();
        assert!(handle.collect_text().await.is_err());
    }

    #[tokio::test]
    async fn test_stream_survives_chatty_stderr() {
        // Far more than a pipe buffer holds, written before any stdout
        let responder = sh(r"head -c 200000 /dev/zero | tr '\0' x >&2; echo Paris");
        let ctx = CallContext::with_timeout(Duration::from_secs(5));
        let handle = responder
            .stream(&ctx, "q", &GenerateOptions::default())
            .await
            .unwrap();
        assert_eq!(handle.collect_text().await.unwrap(), "Paris\n");
    }

    #[tokio::test]
    async fn test_stream_failure_carries_stderr() {
        let responder = sh("echo 'model not loaded' >&2; exit 2");
        let handle = responder
            .stream(&CallContext::new(), "q", &GenerateOptions::default())
            .await
            .unwrap();
        let err = handle.collect_text().await.unwrap_err();
        assert!(err.to_string().contains("model not loaded"));
    }

    #[tokio::test]
    async fn test_structured_parses_stdout() {
        let responder = CommandResponder::new("echo", vec![r#"{"city": "Paris"}"#.to_string()]);
        let value = responder
            .generate_structured(
                &CallContext::new(),
                "q",
                &serde_json::json!({"type": "object"}),
                &GenerateOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(value, serde_json::json!({"city": "Paris"}));
    }

    #[tokio::test]
    async fn test_structured_rejects_plain_text() {
        let responder = CommandResponder::new("echo", vec!["Paris".to_string()]);
        let err = responder
            .generate_structured(
                &CallContext::new(),
                "q",
                &serde_json::json!({}),
                &GenerateOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ResponderError::InvalidOutput(_)));
    }
}
