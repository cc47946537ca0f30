//! Locally-invoked inference process (Ollama-style CLI).
//!
//! One process spawn per prediction: the built prompt is fed through stdin
//! and everything the process writes to stdout is collected as the raw
//! completion. Blocks (asynchronously) until the process exits or the
//! configured timeout fires.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;

use nlu_core::prompt::{PromptStyle, build_prompt};
use nlu_core::schema::Schema;

use super::{AdapterError, ModelAdapter};

/// Adapter that shells out to a local inference CLI (`<command> run <model>`).
#[derive(Debug)]
pub struct LocalProcessAdapter {
    command: String,
    model: String,
    timeout: Duration,
    style: PromptStyle,
}

impl LocalProcessAdapter {
    pub fn new(command: String, model: String, timeout_secs: u64, style: PromptStyle) -> Self {
        Self {
            command,
            model,
            timeout: Duration::from_secs(timeout_secs),
            style,
        }
    }
}

#[async_trait]
impl ModelAdapter for LocalProcessAdapter {
    async fn predict(&self, text: &str, schema: &Schema) -> Result<String, AdapterError> {
        let prompt = build_prompt(text, schema, self.style);

        let mut child = Command::new(&self.command)
            .arg("run")
            .arg(&self.model)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| AdapterError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        // Feed the prompt and close stdin so the process sees EOF.
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(prompt.as_bytes()).await?;
        }

        let output = timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| AdapterError::Timeout(self.timeout.as_secs()))??;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();

        // Local runners write progress noise to stderr even on success;
        // only an empty stdout counts as a failed call.
        if stdout.trim().is_empty() {
            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(AdapterError::ProcessFailed {
                    code: output.status.code(),
                    stderr: stderr.chars().take(300).collect(),
                });
            }
            return Err(AdapterError::EmptyCompletion);
        }

        tracing::debug!(
            model = %self.model,
            bytes = stdout.len(),
            "local model completion collected"
        );
        Ok(stdout)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::from_json_str(
            r#"{"intents": [{"name": "greet", "examples": ["hi"]}], "entities": {}}"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn spawn_failure_is_reported() {
        let adapter = LocalProcessAdapter::new(
            "/nonexistent/model-runner".into(),
            "gemma".into(),
            5,
            PromptStyle::Classifier,
        );
        let err = adapter.predict("hello", &schema()).await.unwrap_err();
        assert!(matches!(err, AdapterError::Spawn { .. }));
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        /// Write an executable script standing in for the model CLI.
        fn fake_runner(dir: &tempfile::TempDir, body: &str) -> String {
            let path = dir.path().join("fake-runner");
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path.to_string_lossy().into_owned()
        }

        #[tokio::test]
        async fn stdout_collected_as_raw_text() {
            let dir = tempfile::tempdir().unwrap();
            // Consume stdin (the prompt), then emit a completion.
            let runner = fake_runner(
                &dir,
                r#"cat > /dev/null
echo '{"intent": "greet", "confidence": 0.9, "entities": {}}'"#,
            );

            let adapter =
                LocalProcessAdapter::new(runner, "gemma".into(), 5, PromptStyle::Classifier);
            let raw = adapter.predict("hello", &schema()).await.unwrap();
            assert!(raw.contains(r#""intent": "greet""#));
        }

        #[tokio::test]
        async fn nonzero_exit_with_empty_stdout_fails() {
            let dir = tempfile::tempdir().unwrap();
            let runner = fake_runner(
                &dir,
                r#"cat > /dev/null
echo "model not found" >&2
exit 1"#,
            );

            let adapter =
                LocalProcessAdapter::new(runner, "gemma".into(), 5, PromptStyle::Classifier);
            let err = adapter.predict("hello", &schema()).await.unwrap_err();
            match err {
                AdapterError::ProcessFailed { code, stderr } => {
                    assert_eq!(code, Some(1));
                    assert!(stderr.contains("model not found"));
                }
                other => panic!("expected ProcessFailed, got {other:?}"),
            }
        }

        #[tokio::test]
        async fn slow_process_times_out() {
            let dir = tempfile::tempdir().unwrap();
            let runner = fake_runner(
                &dir,
                r#"cat > /dev/null
sleep 30"#,
            );

            let adapter =
                LocalProcessAdapter::new(runner, "gemma".into(), 1, PromptStyle::Classifier);
            let err = adapter.predict("hello", &schema()).await.unwrap_err();
            assert!(matches!(err, AdapterError::Timeout(1)));
        }
    }
}
