//! Runtime abstraction for system operations.
//!
//! Environment lookups and external commands go through the [`Runtime`] trait
//! so configuration loading and token acquisition can be tested with a mock.

use anyhow::{Context, Result, bail};
use std::env as std_env;
use std::process::Command;

#[cfg_attr(test, mockall::automock)]
pub trait Runtime: Send + Sync {
    // Environment
    fn env_var(&self, key: &str) -> Result<String, std_env::VarError>;

    // Processes
    /// Run a program to completion and return its trimmed stdout.
    /// A non-zero exit status is an error carrying the program's stderr.
    fn command_output(&self, program: &str, args: &[String]) -> Result<String>;
}

pub struct RealRuntime;

impl Runtime for RealRuntime {
    #[tracing::instrument(skip(self))]
    fn env_var(&self, key: &str) -> Result<String, std_env::VarError> {
        std_env::var(key)
    }

    #[tracing::instrument(skip(self))]
    fn command_output(&self, program: &str, args: &[String]) -> Result<String> {
        let output = Command::new(program)
            .args(args)
            .output()
            .with_context(|| format!("Failed to run {}", program))?;

        if !output.status.success() {
            bail!(
                "{} exited with {}: {}",
                program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
