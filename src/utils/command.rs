use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::process::Command;

/// Failure of an external tool invocation
#[derive(thiserror::Error, Debug)]
pub enum ToolError {
    #[error("failed to start {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} timed out after {seconds} seconds")]
    Timeout { tool: String, seconds: u64 },

    #[error("{tool} exited with {status}: {stderr}")]
    Failed {
        tool: String,
        status: String,
        stderr: String,
    },
}

/// Run an external tool to completion, capturing its output.
///
/// The child is killed when the timeout elapses. A non-zero exit status is an error
/// carrying the tail of stderr.
pub async fn run_tool(command: &mut Command, timeout: Duration) -> Result<Output, ToolError> {
    let tool = command
        .as_std()
        .get_program()
        .to_string_lossy()
        .into_owned();

    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    tracing::debug!(tool = %tool, args = ?command.as_std().get_args().collect::<Vec<_>>(), "Running external tool");

    let output = match tokio::time::timeout(timeout, command.output()).await {
        Ok(result) => result.map_err(|source| ToolError::Spawn {
            tool: tool.clone(),
            source,
        })?,
        Err(_) => {
            return Err(ToolError::Timeout {
                tool,
                seconds: timeout.as_secs(),
            })
        }
    };

    if !output.status.success() {
        return Err(ToolError::Failed {
            tool,
            status: output.status.to_string(),
            stderr: stderr_tail(&output.stderr),
        });
    }

    Ok(output)
}

/// Last few lines of a tool's stderr, enough to explain a failure
fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(10);
    lines[start..].join("\n")
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_tool_success() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo hello"]);

        let output = run_tool(&mut cmd, Duration::from_secs(5)).await.unwrap();
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello");
    }

    #[tokio::test]
    async fn test_run_tool_non_zero_exit() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo broken >&2; exit 3"]);

        let err = run_tool(&mut cmd, Duration::from_secs(5)).await.unwrap_err();
        match err {
            ToolError::Failed { tool, stderr, .. } => {
                assert_eq!(tool, "sh");
                assert_eq!(stderr, "broken");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_run_tool_timeout() {
        let mut cmd = Command::new("sleep");
        cmd.arg("5");

        let err = run_tool(&mut cmd, Duration::from_millis(100)).await.unwrap_err();
        assert!(matches!(err, ToolError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_run_tool_missing_binary() {
        let mut cmd = Command::new("definitely-not-a-real-tool-binary");

        let err = run_tool(&mut cmd, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, ToolError::Spawn { .. }));
    }

    #[test]
    fn test_stderr_tail_keeps_last_lines() {
        let stderr: String = (1..=15).map(|i| format!("line {}\n", i)).collect();
        let tail = stderr_tail(stderr.as_bytes());

        assert!(tail.starts_with("line 6"));
        assert!(tail.ends_with("line 15"));
    }
}
