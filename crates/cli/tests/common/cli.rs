//! CLI command execution helpers
//!
//! Wraps the `marksync` binary with an isolated home directory and
//! provides convenient assertion methods.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::io::Write;
use std::process::{Command, Stdio};

/// CLI command builder
pub struct MarksCommand {
    binary_path: PathBuf,
    working_dir: PathBuf,
    args: Vec<String>,
    env: HashMap<String, String>,
    stdin_data: Option<String>,
}

impl MarksCommand {
    /// Create a new command whose marksync home and `$HOME` are `home`
    ///
    /// Pointing `$HOME` at the test directory keeps browser auto-detection
    /// away from the real profile.
    pub fn new(home: impl AsRef<Path>) -> Self {
        let home = home.as_ref().to_path_buf();
        let mut env = HashMap::new();
        env.insert("MARKSYNC_HOME".to_string(), home.join("marksync").display().to_string());
        env.insert("HOME".to_string(), home.display().to_string());
        Self {
            binary_path: find_marksync_binary(),
            working_dir: home,
            args: Vec::new(),
            env,
            stdin_data: None,
        }
    }

    /// Add command arguments
    pub fn args(&mut self, args: &[&str]) -> &mut Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    /// Provide stdin data
    pub fn stdin(&mut self, data: &str) -> &mut Self {
        self.stdin_data = Some(data.to_string());
        self
    }

    /// Run the binary to completion; stdin is closed unless data was given
    pub fn execute(&self) -> Result<CommandResult> {
        let mut child = Command::new(&self.binary_path)
            .args(&self.args)
            .current_dir(&self.working_dir)
            .envs(&self.env)
            .stdin(if self.stdin_data.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to spawn {}", self.binary_path.display()))?;

        if let (Some(data), Some(mut stdin)) = (&self.stdin_data, child.stdin.take()) {
            stdin.write_all(data.as_bytes())?;
        }
        let output = child.wait_with_output().context("Failed to wait for marksync")?;

        Ok(CommandResult {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }

    /// Execute and require exit code 0
    pub fn assert_success(&self) -> Result<CommandResult> {
        let result = self.execute()?;
        if !result.success() {
            anyhow::bail!(
                "marksync {:?} exited with {}\nstdout:\n{}\nstderr:\n{}",
                self.args,
                result.exit_code,
                result.stdout,
                result.stderr
            );
        }
        Ok(result)
    }

    /// Execute and require a non-zero exit code
    pub fn assert_failure(&self) -> Result<CommandResult> {
        let result = self.execute()?;
        if result.success() {
            anyhow::bail!("marksync {:?} should have failed:\n{}", self.args, result.stdout);
        }
        Ok(result)
    }
}

/// Captured output of one run
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandResult {
    /// Check if command succeeded
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Check if stdout contains text
    pub fn contains_stdout(&self, text: &str) -> bool {
        self.stdout.contains(text)
    }
}

/// Find the marksync binary built for this test run
fn find_marksync_binary() -> PathBuf {
    if let Some(path) = option_env!("CARGO_BIN_EXE_marksync") {
        return PathBuf::from(path);
    }

    // Go up from the test binary location
    let mut path = std::env::current_exe().expect("Failed to get current exe path");
    path.pop(); // Remove test binary name
    path.pop(); // Remove deps/
    path.join("marksync")
}

/// Macro for convenient command construction
///
/// Usage:
/// ```ignore
/// marks!(home, "init").assert_success()?;
/// marks!(home, "push", "chrome").stdin("y\n").assert_success()?;
/// ```
#[macro_export]
macro_rules! marks {
    ($home:expr, $($arg:expr),*) => {{
        let mut cmd = $crate::common::cli::MarksCommand::new($home);
        cmd.args(&[$($arg),*]);
        cmd
    }};
}
