//! Subprocess launching with output streamed straight to disk.
//!
//! The tool can run for hours and is chatty; piping its output through this
//! process would buffer it in memory, so both streams go to the log file.

use std::fs::{self, File};
use std::process::{Command, Stdio};

use super::{ToolInvocation, ToolRunner};
use crate::errors::RepoError;

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ToolRunner for ProcessRunner {
    fn run(&self, invocation: &ToolInvocation) -> Result<Option<i32>, RepoError> {
        let program = which::which(&invocation.program).map_err(|e| {
            RepoError::execution(&invocation.program, format!("not found in PATH: {}", e))
        })?;

        let log_path = &invocation.log_path;
        if let Some(parent) = log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| RepoError::io(parent, e))?;
        }
        let stdout = File::create(log_path).map_err(|e| RepoError::io(log_path, e))?;
        let stderr = stdout.try_clone().map_err(|e| RepoError::io(log_path, e))?;

        let status = Command::new(&program)
            .args(&invocation.args)
            .current_dir(&invocation.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .status()
            .map_err(|e| RepoError::execution(&invocation.program, e.to_string()))?;

        Ok(status.code())
    }
}
