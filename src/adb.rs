//! Thin wrapper over the `adb` command-line tool.
//! Every device interaction (screencap, input, getprop, wm) goes through here so the target
//! serial and error reporting stay in one place.

use anyhow::{Context, Result, bail};
use std::ffi::OsStr;
use std::process::{Command, Output};
use tracing::trace;

#[derive(Clone, Debug)]
pub struct Adb {
    program: String,
    serial: Option<String>,
}

impl Default for Adb {
    fn default() -> Self {
        Self::new("adb", None)
    }
}

impl Adb {
    pub fn new(program: impl Into<String>, serial: Option<String>) -> Self {
        Self {
            program: program.into(),
            serial,
        }
    }

    fn command<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(&self.program);
        if let Some(serial) = &self.serial {
            cmd.arg("-s").arg(serial);
        }
        cmd.args(args);
        cmd
    }

    /// Runs `adb <args>` and returns its raw output, failing on a non-zero exit status.
    pub fn run<I, S>(&self, args: I) -> Result<Output>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = self.command(args);
        trace!(command = ?cmd, "adb");
        let output = cmd.output().with_context(|| {
            format!("Failed to run `{}`. Is adb installed and on PATH?", self.program)
        })?;

        if !output.status.success() {
            bail!(
                "`{:?}` exited with {}: {}",
                cmd,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(output)
    }

    /// Runs `adb shell <args>` and returns trimmed stdout.
    pub fn shell(&self, args: &[&str]) -> Result<String> {
        let output = self.run(std::iter::once("shell").chain(args.iter().copied()))?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
