//! Blocking subprocess execution for toolchain calls.

use std::ffi::OsString;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::Command;

/// One external program call: executable plus ordered arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl ToolInvocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Value following the first `-o` flag, if any.
    pub fn output_arg(&self) -> Option<&OsString> {
        self.args
            .iter()
            .position(|a| a == "-o")
            .and_then(|i| self.args.get(i + 1))
    }
}

impl fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Exit status of a launched process. `code` is `None` when killed by a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolExit {
    pub code: Option<i32>,
}

impl ToolExit {
    pub const SUCCESS: ToolExit = ToolExit { code: Some(0) };

    pub fn from_code(code: i32) -> Self {
        Self { code: Some(code) }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl fmt::Display for ToolExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{code}"),
            None => f.write_str("terminated by signal"),
        }
    }
}

/// Runs a tool to completion.
///
/// `Err` means the process never started; a started process always yields `Ok`
/// with its exit status, successful or not.
pub trait ToolRunner {
    fn run(&mut self, invocation: &ToolInvocation) -> io::Result<ToolExit>;
}

/// Spawns real processes with inherited stdio so compiler output reaches the log.
#[derive(Debug, Default)]
pub struct ProcessRunner;

impl ToolRunner for ProcessRunner {
    fn run(&mut self, invocation: &ToolInvocation) -> io::Result<ToolExit> {
        tracing::debug!("exec: {}", invocation);
        let status = Command::new(&invocation.program)
            .args(&invocation.args)
            .status()?;
        Ok(ToolExit {
            code: status.code(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_display() {
        let inv = ToolInvocation::new("/usr/bin/xcrun")
            .arg("metallib")
            .args(["-o", "/c/a.metallib"]);
        assert_eq!(inv.to_string(), "/usr/bin/xcrun metallib -o /c/a.metallib");
        assert_eq!(inv.output_arg(), Some(&OsString::from("/c/a.metallib")));
    }

    #[test]
    fn test_output_arg_missing() {
        let inv = ToolInvocation::new("tool").arg("-o");
        assert_eq!(inv.output_arg(), None);
    }

    #[test]
    fn test_tool_exit_display() {
        assert!(ToolExit::SUCCESS.success());
        assert!(!ToolExit::from_code(3).success());
        assert_eq!(ToolExit::from_code(3).to_string(), "3");
        assert_eq!(ToolExit { code: None }.to_string(), "terminated by signal");
    }

    #[test]
    fn test_process_runner_launch_failure() {
        let inv = ToolInvocation::new("/nonexistent/cimetal-test-binary");
        let err = ProcessRunner.run(&inv).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[cfg(unix)]
    #[test]
    fn test_process_runner_reports_exit_code() {
        let ok = ToolInvocation::new("sh").args(["-c", "exit 0"]);
        assert_eq!(ProcessRunner.run(&ok).unwrap(), ToolExit::SUCCESS);

        let failing = ToolInvocation::new("sh").args(["-c", "exit 7"]);
        assert_eq!(ProcessRunner.run(&failing).unwrap(), ToolExit::from_code(7));
    }
}
